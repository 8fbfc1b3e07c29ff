use super::progress::{is_interactive, PassProgress};
use super::prompts::TerminalGateway;
use crate::output::{Output, OutputFormat};
use anime_sync_config::{Config, PathManager};
use anime_sync_core::{
    CatalogFreshness, DecliningGateway, PassOptions, PassSummary, ReconcileWarning, ReconciliationPass,
    ResolutionGateway,
};
use anime_sync_sources::{HttpCatalogList, TraktClient};
use color_eyre::Result;
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

pub async fn run_pass(paths: PathManager, options: PassOptions, non_interactive: bool, output: &Output) -> Result<()> {
    tracing::debug!("Reconciliation command started");

    let config_file = paths.config_file();
    let config = Config::load_or_create(&config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
    config
        .validate()
        .map_err(|e| color_eyre::eyre::eyre!("Invalid configuration in {}: {}", config_file.display(), e))?;

    let prompts_allowed = !non_interactive && std::io::stdin().is_terminal() && is_interactive();
    let ask_catalog_ids = config.reconcile.interactive;
    let catalog_list = HttpCatalogList::new(Duration::from_secs(config.catalog.request_timeout_seconds));

    let mut pass = ReconciliationPass::new(config, paths, Arc::new(TraktClient::new()), Arc::new(catalog_list))
        .with_options(options);

    let progress = PassProgress::new(!output.is_quiet() && output.format() == OutputFormat::Human);
    let mut terminal;
    let mut declining = DecliningGateway;
    let gateway: &mut dyn ResolutionGateway = if prompts_allowed {
        terminal = TerminalGateway::new(output, ask_catalog_ids);
        &mut terminal
    } else {
        &mut declining
    };

    match pass.run(gateway, &progress).await {
        Ok(summary) => {
            report(&summary, output);
            Ok(())
        }
        Err(e) => {
            // Human mode gets the full error report from color-eyre on exit
            if output.format() != OutputFormat::Human {
                output.error(format!("Reconciliation pass failed: {}", e));
            }
            Err(color_eyre::eyre::eyre!(e))
        }
    }
}

fn report(summary: &PassSummary, output: &Output) {
    match output.format() {
        OutputFormat::Human => {
            output.info(format!(
                "Anime list: {} ({})",
                summary.catalog_date,
                match summary.catalog {
                    CatalogFreshness::Cached => "cached",
                    CatalogFreshness::Refreshed => "downloaded",
                    CatalogFreshness::Stale => "stale, download failed",
                }
            ));
            for (label, counts) in [("Shows", &summary.shows), ("Movies", &summary.movies)] {
                if counts.unavailable {
                    output.warn(format!("{}: could not be listed from Trakt; kept previous state", label));
                    continue;
                }
                output.info(format!(
                    "{}: {} checked, {} unchanged, {} anime, {} other, {} unclassified",
                    label, counts.inspected, counts.skipped, counts.anime, counts.other, counts.unclassified
                ));
            }
            let stats = &summary.reconcile;
            output.info(format!(
                "Mapping: {} new, {} auto-mapped, {} manual, {} ignored",
                stats.new_entries, stats.auto_mapped, stats.manual, stats.ignored
            ));

            for warning in &summary.warnings {
                match warning {
                    ReconcileWarning::MissingCrossRef { .. } => output.warn(warning.to_string()),
                    ReconcileWarning::AmbiguousMapping { .. } => {
                        output.warn(format!("{} {}", warning, "(edit the mapping file to resolve)".dimmed()))
                    }
                }
            }

            output.success(format!(
                "Reconciliation completed in {:.1}s ({} pending)",
                summary.duration_ms as f64 / 1000.0,
                summary.warnings.len()
            ));
        }
        OutputFormat::Json | OutputFormat::JsonPretty => match serde_json::to_value(summary) {
            Ok(mut value) => {
                if let Some(object) = value.as_object_mut() {
                    object.insert("success".to_string(), serde_json::Value::Bool(true));
                }
                output.json(&value);
            }
            Err(e) => output.error(format!("Failed to serialize summary: {}", e)),
        },
    }
}
