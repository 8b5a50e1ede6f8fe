use crate::filter::ContentFilter;
use crate::notify::build_payload;
use crate::seen::SeenSet;
use discord_webhook::WebhookPayload;
use llm_interface::LlmProvider;
use std::path::Path;
use subwatch_core::{CandidateItem, CoreError};
use tracing::{debug, info, warn};

/// Newest items fetched per listing per cycle.
pub const FETCH_LIMIT: u32 = 20;

/// Read-only forum source consumed by the poll cycle.
pub trait ItemSource {
    async fn fetch_recent_comments(
        &self,
        subreddits: &[String],
        limit: u32,
    ) -> Result<Vec<CandidateItem>, CoreError>;

    async fn fetch_recent_posts(
        &self,
        subreddits: &[String],
        limit: u32,
    ) -> Result<Vec<CandidateItem>, CoreError>;
}

/// Outbound notification channel. Fire-and-forget per item.
pub trait Delivery {
    async fn post(&self, payload: &WebhookPayload) -> Result<u16, CoreError>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    pub fetched: usize,
    pub already_seen: usize,
    pub delivered: usize,
}

/// One fetch-filter-deliver-persist pass. A fetch failure aborts the rest
/// of the cycle; per-item delivery failures do not. The seen set is
/// persisted at the end when it picked up new ids.
pub async fn run_cycle<S, P, D>(
    source: &S,
    subreddits: &[String],
    seen: &mut SeenSet,
    filter: &ContentFilter<P>,
    delivery: &D,
    state_path: &Path,
) -> Result<CycleOutcome, CoreError>
where
    S: ItemSource,
    P: LlmProvider,
    D: Delivery,
{
    let mut outcome = CycleOutcome::default();

    let comments = source.fetch_recent_comments(subreddits, FETCH_LIMIT).await?;
    process_items(comments, seen, filter, delivery, &mut outcome).await;

    let posts = source.fetch_recent_posts(subreddits, FETCH_LIMIT).await?;
    process_items(posts, seen, filter, delivery, &mut outcome).await;

    if let Err(e) = seen.save_if_dirty(state_path) {
        warn!("Failed to persist seen set, will retry next cycle: {}", e);
    }

    Ok(outcome)
}

async fn process_items<P, D>(
    items: Vec<CandidateItem>,
    seen: &mut SeenSet,
    filter: &ContentFilter<P>,
    delivery: &D,
    outcome: &mut CycleOutcome,
) where
    P: LlmProvider,
    D: Delivery,
{
    for item in items {
        outcome.fetched += 1;

        if seen.contains(&item.id) {
            outcome.already_seen += 1;
            continue;
        }
        if !filter.matches_keyword(&item.body) {
            continue;
        }

        // Mark once the keyword gate passes, before the AI gate: each
        // candidate gets at most one judgment attempt and at most one
        // delivery attempt, even across cycles.
        seen.add(item.id.clone());

        if !filter.passes_ai_gate(&item).await {
            debug!("AI gate rejected {} {}", item.kind, item.id);
            continue;
        }

        let payload = build_payload(&item);
        match delivery.post(&payload).await {
            Ok(status) => {
                outcome.delivered += 1;
                info!(
                    "Delivered {} {} from r/{} (status {})",
                    item.kind, item.id, item.source_group, status
                );
            }
            Err(e) => {
                warn!("Delivery failed for {} {}: {}", item.kind, item.id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterMode;
    use crate::testing::{item, MockProvider, RecordingDelivery, StaticSource};
    use std::path::PathBuf;

    fn keyword_filter() -> ContentFilter<MockProvider> {
        ContentFilter::new("subwatch", FilterMode::KeywordOnly)
    }

    fn state_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("seen_items.json")
    }

    #[tokio::test]
    async fn test_seen_items_are_not_redelivered() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_path(&dir);
        std::fs::write(&path, r#"["abc"]"#).unwrap();
        let mut seen = SeenSet::load_or_init(&path).unwrap();

        let source = StaticSource {
            comments: vec![
                item("abc", "old subwatch mention"),
                item("xyz", "new subwatch mention"),
            ],
            posts: vec![],
        };
        let delivery = RecordingDelivery::default();
        let filter = keyword_filter();

        let outcome = run_cycle(&source, &["rust".to_string()], &mut seen, &filter, &delivery, &path)
            .await
            .unwrap();

        assert_eq!(outcome.fetched, 2);
        assert_eq!(outcome.already_seen, 1);
        assert_eq!(outcome.delivered, 1);

        let attempts = delivery.payloads.lock().unwrap();
        assert_eq!(attempts.len(), 1);
        assert!(attempts[0].embeds[0].description.contains("new subwatch"));
        drop(attempts);

        assert!(seen.contains("abc"));
        assert!(seen.contains("xyz"));

        // Persistence happened because the cycle added "xyz".
        let persisted = SeenSet::load_or_init(&path).unwrap();
        assert!(persisted.contains("abc"));
        assert!(persisted.contains("xyz"));
    }

    #[tokio::test]
    async fn test_second_identical_cycle_delivers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_path(&dir);
        let mut seen = SeenSet::load_or_init(&path).unwrap();

        let source = StaticSource {
            comments: vec![item("abc", "a subwatch mention")],
            posts: vec![item("def", "another subwatch mention")],
        };
        let delivery = RecordingDelivery::default();
        let filter = keyword_filter();
        let groups = ["rust".to_string()];

        let first = run_cycle(&source, &groups, &mut seen, &filter, &delivery, &path)
            .await
            .unwrap();
        assert_eq!(first.delivered, 2);

        let second = run_cycle(&source, &groups, &mut seen, &filter, &delivery, &path)
            .await
            .unwrap();
        assert_eq!(second.delivered, 0);
        assert_eq!(second.already_seen, 2);
        assert_eq!(delivery.payloads.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_keyword_miss_is_not_marked_seen() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_path(&dir);
        let mut seen = SeenSet::load_or_init(&path).unwrap();

        let source = StaticSource {
            comments: vec![item("abc", "unrelated chatter")],
            posts: vec![],
        };
        let delivery = RecordingDelivery::default();
        let filter = keyword_filter();

        run_cycle(&source, &["rust".to_string()], &mut seen, &filter, &delivery, &path)
            .await
            .unwrap();

        assert!(!seen.contains("abc"));
        assert!(!seen.is_dirty());
    }

    #[tokio::test]
    async fn test_ai_rejected_item_is_marked_seen_but_not_delivered() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_path(&dir);
        let mut seen = SeenSet::load_or_init(&path).unwrap();

        let provider = MockProvider::replying(vec![Ok("No, not relevant".to_string())]);
        let filter = ContentFilter::new(
            "subwatch",
            FilterMode::KeywordPlusAi {
                provider,
                prompt: "Relevant? Answer yes or no.".to_string(),
            },
        );
        let source = StaticSource {
            comments: vec![item("abc", "a subwatch mention")],
            posts: vec![],
        };
        let delivery = RecordingDelivery::default();

        let outcome = run_cycle(&source, &["rust".to_string()], &mut seen, &filter, &delivery, &path)
            .await
            .unwrap();

        assert_eq!(outcome.delivered, 0);
        assert!(seen.contains("abc"));
        assert!(delivery.payloads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_abort_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_path(&dir);
        let mut seen = SeenSet::load_or_init(&path).unwrap();

        let source = StaticSource {
            comments: vec![
                item("abc", "first subwatch mention"),
                item("xyz", "second subwatch mention"),
            ],
            posts: vec![],
        };
        let delivery = RecordingDelivery::failing_first(1);
        let filter = keyword_filter();

        let outcome = run_cycle(&source, &["rust".to_string()], &mut seen, &filter, &delivery, &path)
            .await
            .unwrap();

        // Both were attempted; only the second succeeded. Neither is
        // retried: both ids are seen now.
        assert_eq!(delivery.payloads.lock().unwrap().len(), 2);
        assert_eq!(outcome.delivered, 1);
        assert!(seen.contains("abc"));
        assert!(seen.contains("xyz"));
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_path(&dir);
        let mut seen = SeenSet::load_or_init(&path).unwrap();

        let source = crate::testing::FlakySource::new(1, vec![]);
        let delivery = RecordingDelivery::default();
        let filter = keyword_filter();

        let result = run_cycle(&source, &["rust".to_string()], &mut seen, &filter, &delivery, &path).await;
        assert!(result.is_err());
    }
}
