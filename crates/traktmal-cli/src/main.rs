use anime_sync_config::PathManager;
use anime_sync_core::PassOptions;
use clap::{ArgAction, Parser};
use commands::run;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "traktmal")]
#[command(about = "Keep a MyAnimeList conversion mapping in step with your Trakt watch history")]
#[command(long_about = "Runs one reconciliation pass: fetches your Trakt watch history, classifies new or changed items as anime, matches them against the anime cross-reference list, and updates the conversion mapping files. Items that cannot be matched are reported and retried on the next run.")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,

    /// Output format
    #[arg(long, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Reclassify every watched item, including ones already known not to be anime
    #[arg(long, action = ArgAction::SetTrue)]
    force_refresh: bool,

    /// Download the anime cross-reference list even if the cached copy is recent
    #[arg(long, action = ArgAction::SetTrue)]
    refresh_catalog: bool,

    /// Never prompt; unmatched items are left pending and missing authorization fails the run
    #[arg(long, action = ArgAction::SetTrue)]
    non_interactive: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let paths = PathManager::default();

    logging::init_logging(cli.verbose, cli.quiet, Some(paths.log_file()))
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);
    let options = PassOptions {
        force_refresh: cli.force_refresh,
        refresh_catalog: cli.refresh_catalog,
    };

    run::run_pass(paths, options, cli.non_interactive, &output).await
}
