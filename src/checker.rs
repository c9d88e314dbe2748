use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use crate::config::{Settings, TargetSpec};
use crate::extract;
use crate::fetch::PageFetcher;
use crate::notify::Notifier;
use crate::store::KeyValueStore;
use crate::tracker::ChangeTracker;
use crate::utils::error::{AppError, Result};

/// What one check cycle observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOutcome {
    /// At least one target's text differed from the saved value.
    pub changed: bool,
    /// A fetch/extract problem was reported to the error topic.
    pub error_notified: bool,
    /// The tracker state reached the store (vacuously true when
    /// nothing changed). A false here is logged, not fatal: sending
    /// the notification takes priority, and a duplicate message next
    /// cycle beats a missed one.
    pub persisted: bool,
}

/// Runs one complete check cycle over all configured targets: fetch
/// and extract everything concurrently, diff against the tracker,
/// send one aggregated notification, flush the new state.
pub struct CheckRunner {
    settings: Arc<Settings>,
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
}

impl CheckRunner {
    pub fn new(
        settings: Arc<Settings>,
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings,
            fetcher,
            store,
            notifier,
        }
    }

    pub async fn run(&self, state_file: &str) -> Result<CheckOutcome> {
        info!("starting check cycle over {} targets", self.settings.targets().len());

        // The page fetches and the tracker load are independent, so
        // they run overlapped. Fan-out equals the target count, which
        // stays small by configuration.
        let fetches = join_all(
            self.settings
                .targets()
                .iter()
                .map(|target| self.fetch_target(target)),
        );
        let (page_results, tracker) =
            tokio::join!(fetches, ChangeTracker::load(Arc::clone(&self.store), state_file));
        let mut tracker = tracker?;

        let mut changes: Vec<String> = Vec::new();
        let mut errors: Vec<String> = Vec::new();
        for (index, result) in page_results.into_iter().enumerate() {
            match result {
                Ok(new_text) => {
                    if tracker.has_changed(index, &new_text) {
                        let url = &self.settings.targets()[index].url;
                        changes.push(format!(
                            "The web page {url} changed, new value is {new_text}"
                        ));
                    }
                }
                // A broken target must not stall the rest of the
                // batch; it becomes part of the error notification.
                Err(e) => {
                    warn!("target {index} failed: {e}");
                    errors.push(Self::error_fragment(&e));
                }
            }
        }

        let error_notified = if errors.is_empty() {
            false
        } else {
            self.send(&errors.join("\n\n")).await
        };

        let changed = !changes.is_empty();
        let persisted = if changed {
            let message = changes.join("\n\n");
            let (sent, persisted) = tokio::join!(self.send(&message), tracker.flush());
            if !sent {
                warn!("change notification was not delivered");
            }
            persisted
        } else {
            // No-op flush; nothing was staged.
            tracker.flush().await
        };
        if !persisted {
            warn!("tracker state was not persisted; expect a duplicate notification next cycle");
        }

        info!("finished check cycle, changed={changed}, error_notified={error_notified}");
        Ok(CheckOutcome {
            changed,
            error_notified,
            persisted,
        })
    }

    async fn fetch_target(&self, target: &TargetSpec) -> Result<String> {
        let page_text = self.fetcher.fetch(&target.url).await?;
        extract::extract(&page_text, target)
    }

    fn error_fragment(err: &AppError) -> String {
        match err {
            AppError::Fetch { url, .. } => {
                format!("There was a problem retrieving the url:\n{url}\n{err}")
            }
            other => other.to_string(),
        }
    }

    /// Sends to the configured topic; delivery problems are logged and
    /// reported as false, never propagated.
    async fn send(&self, message: &str) -> bool {
        let topic = self.settings.value("notifyTopic");
        match self.notifier.send(topic, message).await {
            Ok(sent) => sent,
            Err(e) => {
                warn!("notification send failed: {e}");
                false
            }
        }
    }
}
