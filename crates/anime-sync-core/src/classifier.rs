use anime_sync_models::{Classification, MediaKind, WatchedItem};
use anime_sync_sources::{SourceError, TrackingService, TraktSession};
use serde::Serialize;
use tracing::{debug, warn};

use crate::pass::PassObserver;
use crate::watch_state::{should_inspect, WatchState};

/// Genre slug that marks an item as anime
pub const ANIME_GENRE: &str = "anime";

/// Counts for one classification run over a feed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassifySummary {
    /// Items handled so far; where a resumed run picks up
    pub processed: usize,
    pub inspected: usize,
    pub skipped: usize,
    pub anime: usize,
    pub other: usize,
    pub unclassified: usize,
    /// The feed could not be listed this pass; stored state was kept as is
    pub unavailable: bool,
}

/// Map a genre set to a classification. An empty set classifies nothing.
pub fn classify_genres(genres: &[String]) -> Option<Classification> {
    if genres.is_empty() {
        return None;
    }
    if genres.iter().any(|g| g.trim().eq_ignore_ascii_case(ANIME_GENRE)) {
        Some(Classification::Anime)
    } else {
        Some(Classification::Other)
    }
}

/// Decides anime/other for watched items using the tracking service's genres
pub struct Classifier<'a> {
    service: &'a dyn TrackingService,
    session: &'a TraktSession,
}

impl<'a> Classifier<'a> {
    pub fn new(service: &'a dyn TrackingService, session: &'a TraktSession) -> Self {
        Self { service, session }
    }

    /// Classify one item. Only authentication failures are returned as
    /// errors; any other lookup failure leaves the item unclassified.
    pub async fn classify(&self, item: &WatchedItem) -> Result<Option<Classification>, SourceError> {
        let genres = match self
            .service
            .get_genres(self.session, item.kind(), &item.external_id)
            .await
        {
            Ok(genres) => genres,
            Err(e) if e.is_auth() => return Err(e),
            Err(e) => {
                warn!(
                    operation = "classify",
                    item = %item.external_id,
                    status = "error",
                    error = %e,
                    "Genre lookup failed for '{}'; leaving it unclassified",
                    item.title
                );
                return Ok(None);
            }
        };

        let classification = classify_genres(&genres);
        if classification.is_none() {
            warn!(
                operation = "classify",
                item = %item.external_id,
                "No genres listed for '{}'; leaving it unclassified",
                item.title
            );
        }
        Ok(classification)
    }

    /// Run the skip gate and classifier over `items`, starting at
    /// `summary.processed`, and record outcomes in `state`.
    ///
    /// Stops at the first authentication failure with `summary.processed`
    /// still pointing at the failed item, so calling again with a fresh
    /// session resumes where this one left off.
    pub async fn classify_pending(
        &self,
        kind: MediaKind,
        items: &[WatchedItem],
        state: &mut WatchState,
        force_refresh: bool,
        summary: &mut ClassifySummary,
        observer: &dyn PassObserver,
    ) -> Result<(), SourceError> {
        for item in items.iter().skip(summary.processed) {
            let record = state.record(&item.external_id);
            if !should_inspect(item, record.as_ref(), force_refresh) {
                debug!("Skipping unchanged {} '{}'", kind, item.external_id);
                summary.skipped += 1;
                summary.processed += 1;
                observer.item_classified(kind, item, None);
                continue;
            }

            let classification = self.classify(item).await?;
            summary.inspected += 1;
            match classification {
                Some(Classification::Anime) => summary.anime += 1,
                Some(Classification::Other) => summary.other += 1,
                None => summary.unclassified += 1,
            }
            state.apply(item, classification);
            summary.processed += 1;
            observer.item_classified(kind, item, classification);
        }
        Ok(())
    }
}
