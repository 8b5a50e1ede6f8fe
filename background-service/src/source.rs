use crate::cycle::{Delivery, ItemSource};
use discord_webhook::{WebhookClient, WebhookPayload};
use reddit_client::RedditClient;
use subwatch_core::{CandidateItem, CoreError};

impl ItemSource for RedditClient {
    async fn fetch_recent_comments(
        &self,
        subreddits: &[String],
        limit: u32,
    ) -> Result<Vec<CandidateItem>, CoreError> {
        self.recent_comments(subreddits, limit).await
    }

    async fn fetch_recent_posts(
        &self,
        subreddits: &[String],
        limit: u32,
    ) -> Result<Vec<CandidateItem>, CoreError> {
        self.recent_posts(subreddits, limit).await
    }
}

impl Delivery for WebhookClient {
    async fn post(&self, payload: &WebhookPayload) -> Result<u16, CoreError> {
        WebhookClient::post(self, payload).await
    }
}
