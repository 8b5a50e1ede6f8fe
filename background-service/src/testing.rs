use crate::cycle::{Delivery, ItemSource};
use discord_webhook::WebhookPayload;
use llm_interface::LlmProvider;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use subwatch_core::{CandidateItem, CoreError, DeliveryError, ItemKind, LlmError, RedditApiError};

pub(crate) fn item(id: &str, body: &str) -> CandidateItem {
    CandidateItem {
        id: id.to_string(),
        kind: ItemKind::Comment,
        body: body.to_string(),
        source_group: "rust".to_string(),
        permalink: format!("/r/rust/comments/xyz/thread/{id}/"),
        author_name: Some("some_user".to_string()),
        author_avatar_url: None,
        group_display_name: Some("rust".to_string()),
        group_icon_url: None,
        group_community_icon_url: None,
    }
}

/// Scripted judgment provider. Replies are consumed in order; once the
/// script runs out it answers "yes".
#[derive(Default)]
pub(crate) struct MockProvider {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn replying(responses: Vec<Result<String, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LlmProvider for MockProvider {
    async fn judge(&self, prompt: &str) -> Result<String, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(e)) => Err(CoreError::Llm(e)),
            None => Ok("yes".to_string()),
        }
    }
}

/// Source serving the same listings on every fetch.
pub(crate) struct StaticSource {
    pub comments: Vec<CandidateItem>,
    pub posts: Vec<CandidateItem>,
}

impl ItemSource for StaticSource {
    async fn fetch_recent_comments(
        &self,
        _subreddits: &[String],
        _limit: u32,
    ) -> Result<Vec<CandidateItem>, CoreError> {
        Ok(self.comments.clone())
    }

    async fn fetch_recent_posts(
        &self,
        _subreddits: &[String],
        _limit: u32,
    ) -> Result<Vec<CandidateItem>, CoreError> {
        Ok(self.posts.clone())
    }
}

/// Source whose comment fetch fails a scripted number of times before
/// serving items. Post fetches always return nothing.
pub(crate) struct FlakySource {
    remaining_failures: Mutex<usize>,
    comments: Vec<CandidateItem>,
}

impl FlakySource {
    pub fn new(failures: usize, comments: Vec<CandidateItem>) -> Self {
        Self {
            remaining_failures: Mutex::new(failures),
            comments,
        }
    }
}

impl ItemSource for FlakySource {
    async fn fetch_recent_comments(
        &self,
        _subreddits: &[String],
        _limit: u32,
    ) -> Result<Vec<CandidateItem>, CoreError> {
        let mut remaining = self.remaining_failures.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(CoreError::RedditApi(RedditApiError::ServerError {
                status_code: 503,
            }));
        }
        Ok(self.comments.clone())
    }

    async fn fetch_recent_posts(
        &self,
        _subreddits: &[String],
        _limit: u32,
    ) -> Result<Vec<CandidateItem>, CoreError> {
        Ok(vec![])
    }
}

/// Records every delivery attempt; optionally fails the first N of them.
#[derive(Default)]
pub(crate) struct RecordingDelivery {
    pub payloads: Mutex<Vec<WebhookPayload>>,
    remaining_failures: Mutex<usize>,
}

impl RecordingDelivery {
    pub fn failing_first(failures: usize) -> Self {
        Self {
            payloads: Mutex::new(Vec::new()),
            remaining_failures: Mutex::new(failures),
        }
    }
}

impl Delivery for RecordingDelivery {
    async fn post(&self, payload: &WebhookPayload) -> Result<u16, CoreError> {
        self.payloads.lock().unwrap().push(payload.clone());

        let mut remaining = self.remaining_failures.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(CoreError::Delivery(DeliveryError::Rejected { status: 500 }));
        }
        Ok(204)
    }
}

impl Delivery for Arc<RecordingDelivery> {
    async fn post(&self, payload: &WebhookPayload) -> Result<u16, CoreError> {
        self.as_ref().post(payload).await
    }
}
