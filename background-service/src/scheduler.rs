use crate::cycle::{run_cycle, Delivery, ItemSource};
use crate::filter::ContentFilter;
use crate::seen::SeenSet;
use llm_interface::LlmProvider;
use std::path::PathBuf;
use std::time::Duration;
use subwatch_core::{CoreError, ErrorExt};
use tracing::{error, info};

/// Drives the poll cycle at a fixed interval, forever. One cycle at a
/// time; the sleep between cycles is the only suspension point.
pub struct BackgroundService<S, P, D> {
    source: S,
    filter: ContentFilter<P>,
    delivery: D,
    seen: SeenSet,
    subreddits: Vec<String>,
    state_path: PathBuf,
    poll_interval: Duration,
}

impl<S, P, D> BackgroundService<S, P, D>
where
    S: ItemSource,
    P: LlmProvider,
    D: Delivery,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: S,
        filter: ContentFilter<P>,
        delivery: D,
        seen: SeenSet,
        subreddits: Vec<String>,
        state_path: PathBuf,
        poll_interval_secs: u64,
    ) -> Self {
        Self {
            source,
            filter,
            delivery,
            seen,
            subreddits,
            state_path,
            poll_interval: Duration::from_secs(poll_interval_secs),
        }
    }

    /// Runs one cycle immediately, then sleeps the fixed interval between
    /// the end of each cycle and the start of the next. Cycle failures are
    /// logged and never terminate the loop.
    pub async fn run(mut self) -> Result<(), CoreError> {
        info!(
            "Polling r/{} every {}s",
            self.subreddits.join("+"),
            self.poll_interval.as_secs()
        );

        loop {
            self.tick().await;
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn tick(&mut self) {
        match run_cycle(
            &self.source,
            &self.subreddits,
            &mut self.seen,
            &self.filter,
            &self.delivery,
            &self.state_path,
        )
        .await
        {
            Ok(outcome) => info!(
                "Cycle complete: {} fetched, {} already seen, {} delivered",
                outcome.fetched, outcome.already_seen, outcome.delivered
            ),
            Err(e) => error!("Poll cycle failed ({}): {}", e.error_code(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterMode;
    use crate::testing::{item, FlakySource, MockProvider, RecordingDelivery};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_fetch_error_does_not_stop_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen_items.json");
        let seen = SeenSet::load_or_init(&path).unwrap();

        let source = FlakySource::new(1, vec![item("abc", "a subwatch mention")]);
        let delivery = Arc::new(RecordingDelivery::default());
        let filter: ContentFilter<MockProvider> =
            ContentFilter::new("subwatch", FilterMode::KeywordOnly);

        let mut service = BackgroundService::new(
            source,
            filter,
            Arc::clone(&delivery),
            seen,
            vec!["rust".to_string()],
            path,
            10,
        );

        // First tick hits the transport error; nothing is delivered and
        // nothing panics.
        service.tick().await;
        assert!(delivery.payloads.lock().unwrap().is_empty());

        // The next tick proceeds normally.
        service.tick().await;
        assert_eq!(delivery.payloads.lock().unwrap().len(), 1);
    }
}
