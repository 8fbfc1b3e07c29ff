use anime_sync_core::{CatalogFreshness, ClassifySummary, PassObserver};
use anime_sync_models::{Classification, MediaKind, WatchedItem};
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::io::IsTerminal;

/// Progress bar per classified feed on a terminal, structured log lines
/// otherwise
pub struct PassProgress {
    interactive: bool,
    bar: RefCell<Option<ProgressBar>>,
}

impl PassProgress {
    pub fn new(enabled: bool) -> Self {
        let interactive = enabled && is_interactive();
        if !interactive {
            tracing::info!(
                operation = "ui_init",
                mode = "non_interactive",
                "Running in non-interactive mode - progress bars disabled, using structured logging"
            );
        }

        Self {
            interactive,
            bar: RefCell::new(None),
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
    }
}

impl PassObserver for PassProgress {
    fn catalog_ready(&self, freshness: CatalogFreshness, date: NaiveDate) {
        tracing::debug!(operation = "progress", freshness = ?freshness, date = %date, "Anime list ready");
    }

    fn classify_started(&self, kind: MediaKind, total: usize) {
        if !self.interactive {
            tracing::info!(operation = "progress", kind = %kind, total = total, "Classifying watched {}", kind.plural());
            return;
        }

        let bar = ProgressBar::new(total as u64);
        bar.set_style(Self::style());
        bar.set_message(format!("Classifying {}", kind.plural()));
        *self.bar.borrow_mut() = Some(bar);
    }

    fn item_classified(&self, _kind: MediaKind, item: &WatchedItem, _classification: Option<Classification>) {
        if let Some(bar) = self.bar.borrow().as_ref() {
            bar.set_message(item.title.clone());
            bar.inc(1);
        }
    }

    fn classify_finished(&self, kind: MediaKind, summary: &ClassifySummary) {
        if let Some(bar) = self.bar.borrow_mut().take() {
            bar.finish_and_clear();
        } else {
            tracing::info!(
                operation = "progress",
                kind = %kind,
                processed = summary.processed,
                "Finished classifying {}",
                kind.plural()
            );
        }
    }
}

pub fn is_interactive() -> bool {
    std::io::stdout().is_terminal() && std::io::stderr().is_terminal()
}
