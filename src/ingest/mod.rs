//! One ingestion cycle: select a feed, mark it fetched, fetch, normalize and
//! store its items.

use std::sync::Arc;

use crate::app::{CancelToken, GatorError, Result};
use crate::domain::Feed;
use crate::fetcher::Fetcher;
use crate::normalizer::{FeedItem, Normalizer};
use crate::store::FeedGateway;

/// Outcome of a cycle that got as far as storing items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub feed_id: i64,
    pub feed_name: String,
    pub items_found: usize,
    pub stored: usize,
    pub duplicates: usize,
    pub failed: usize,
}

pub struct Aggregator<G> {
    gateway: Arc<G>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    normalizer: Normalizer,
}

impl<G: FeedGateway> Aggregator<G> {
    pub fn new(
        gateway: Arc<G>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        normalizer: Normalizer,
    ) -> Self {
        Self {
            gateway,
            fetcher,
            normalizer,
        }
    }

    /// Run one cycle and return its report.
    ///
    /// Selection, mark-fetched, fetch and decode failures end the cycle with
    /// an error. Per-item storage failures never do: duplicates are counted
    /// and skipped, other failures are logged and skipped.
    pub async fn run_cycle(&self, cancel: &CancelToken) -> Result<CycleReport> {
        let feed = self.gateway.select_next_feed()?;
        tracing::info!("Selected feed {} ({})", feed.display_title(), feed.url);

        // Marked before fetching so a failing feed goes to the back of the queue.
        self.gateway.mark_feed_fetched(feed.id)?;

        let body = self.fetcher.fetch(&feed.url, cancel).await?;
        let document = self.normalizer.normalize(&body)?;

        Ok(self.store_items(&feed, &document.items))
    }

    fn store_items(&self, feed: &Feed, items: &[FeedItem]) -> CycleReport {
        let mut report = CycleReport {
            feed_id: feed.id,
            feed_name: feed.display_title().to_string(),
            items_found: items.len(),
            stored: 0,
            duplicates: 0,
            failed: 0,
        };

        for item in items {
            match self.gateway.create_post(&item.to_new_post(feed.id)) {
                Ok(_) => report.stored += 1,
                Err(GatorError::DuplicateKey(url)) => {
                    tracing::debug!("Skipping already stored post {}", url);
                    report.duplicates += 1;
                }
                Err(e) => {
                    tracing::warn!("Couldn't store post {} from {}: {}", item.link, feed.url, e);
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Run one cycle and absorb its outcome into log output.
    pub async fn tick(&self, cancel: &CancelToken) -> Option<CycleReport> {
        match self.run_cycle(cancel).await {
            Ok(report) => {
                tracing::info!(
                    "Feed {} collected, {} posts found ({} new, {} already stored, {} failed)",
                    report.feed_name,
                    report.items_found,
                    report.stored,
                    report.duplicates,
                    report.failed
                );
                Some(report)
            }
            Err(GatorError::NoFeedsAvailable) => {
                tracing::info!("No feeds to fetch");
                None
            }
            Err(GatorError::Cancelled) => {
                tracing::info!("Fetch cancelled");
                None
            }
            Err(e) => {
                tracing::warn!("Ingestion cycle failed: {}", e);
                None
            }
        }
    }
}
