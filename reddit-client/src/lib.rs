pub mod api;

use api::{
    RedditCommentData, RedditListing, RedditListingChild, RedditPostData, RedditSubredditData,
    RedditUserData, TokenResponse, REDDIT_API_BASE, REDDIT_TOKEN_URL,
};
use reqwest::Client;
use std::collections::HashMap;
use std::time::{Duration, SystemTime};
use subwatch_core::{CandidateItem, CoreError, ItemKind, RedditApiError};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// Refresh the app token slightly before Reddit expires it.
const TOKEN_EXPIRY_SKEW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct AppToken {
    pub access_token: String,
    pub expires_at: SystemTime,
}

impl AppToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() + TOKEN_EXPIRY_SKEW >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct SubredditInfo {
    pub display_name: String,
    pub icon_img: Option<String>,
    pub community_icon: Option<String>,
}

/// Read-only Reddit API client using the application-only OAuth2 grant.
/// Subreddit and author `about` lookups are cached for the process lifetime
/// so listing fetches stay cheap across cycles.
#[derive(Debug)]
pub struct RedditClient {
    http_client: Client,
    client_id: String,
    client_secret: String,
    user_agent: String,
    token: Mutex<Option<AppToken>>,
    subreddit_cache: Mutex<HashMap<String, SubredditInfo>>,
    author_cache: Mutex<HashMap<String, Option<String>>>,
}

impl RedditClient {
    pub fn new(
        client_id: String,
        client_secret: String,
        user_agent: String,
    ) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            client_id,
            client_secret,
            user_agent,
            token: Mutex::new(None),
            subreddit_cache: Mutex::new(HashMap::new()),
            author_cache: Mutex::new(HashMap::new()),
        })
    }

    /// Newest comments across the combined subreddit set, in listing order.
    pub async fn recent_comments(
        &self,
        subreddits: &[String],
        limit: u32,
    ) -> Result<Vec<CandidateItem>, CoreError> {
        let endpoint = format!("/r/{}/comments", subreddits.join("+"));
        let limit_str = limit.to_string();
        let listing: RedditListing<RedditCommentData> = self
            .get_json(&endpoint, Some(&[("limit", limit_str.as_str())]))
            .await?;

        info!(
            "Retrieved {} comments from r/{}",
            listing.data.children.len(),
            subreddits.join("+")
        );

        let mut items = Vec::with_capacity(listing.data.children.len());
        for child in listing.data.children {
            let data = child.data;
            let sub = self.subreddit_info(&data.subreddit).await;
            let author_icon = self.author_icon(&data.author).await;
            items.push(candidate_from_comment(data, &sub, author_icon));
        }
        Ok(items)
    }

    /// Newest posts across the combined subreddit set, in listing order.
    pub async fn recent_posts(
        &self,
        subreddits: &[String],
        limit: u32,
    ) -> Result<Vec<CandidateItem>, CoreError> {
        let endpoint = format!("/r/{}/new", subreddits.join("+"));
        let limit_str = limit.to_string();
        let listing: RedditListing<RedditPostData> = self
            .get_json(&endpoint, Some(&[("limit", limit_str.as_str())]))
            .await?;

        info!(
            "Retrieved {} posts from r/{}",
            listing.data.children.len(),
            subreddits.join("+")
        );

        let mut items = Vec::with_capacity(listing.data.children.len());
        for child in listing.data.children {
            let data = child.data;
            let sub = self.subreddit_info(&data.subreddit).await;
            let author_icon = self.author_icon(&data.author).await;
            items.push(candidate_from_post(data, &sub, author_icon));
        }
        Ok(items)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        query_params: Option<&[(&str, &str)]>,
    ) -> Result<T, CoreError> {
        let access_token = self.access_token().await?;
        let url = format!("{REDDIT_API_BASE}{endpoint}");

        let mut request_builder = self
            .http_client
            .get(&url)
            .bearer_auth(&access_token)
            .header("User-Agent", &self.user_agent);

        if let Some(params) = query_params {
            request_builder = request_builder.query(params);
        }

        debug!("Making Reddit API request: GET {}", endpoint);
        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                if e.is_timeout() {
                    return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("Request failed with status {} for {}", status, endpoint);

            if status.as_u16() == 429 {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                return Err(CoreError::RedditApi(RedditApiError::RateLimitExceeded {
                    retry_after,
                }));
            } else if status.as_u16() == 401 {
                // Token may have been revoked server-side; drop it so the
                // next cycle re-authenticates.
                *self.token.lock().await = None;
                return Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                    reason: "access token rejected".to_string(),
                }));
            } else if status.as_u16() == 403 {
                return Err(CoreError::RedditApi(RedditApiError::Forbidden {
                    resource: endpoint.to_string(),
                }));
            } else if status.is_server_error() {
                return Err(CoreError::RedditApi(RedditApiError::ServerError {
                    status_code: status.as_u16(),
                }));
            }
            return Err(CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("unexpected status {status} for {endpoint}"),
            }));
        }

        response.json().await.map_err(|e| {
            warn!("Failed to parse response for {}: {}", endpoint, e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("failed to parse response for {endpoint}"),
            })
        })
    }

    async fn access_token(&self) -> Result<String, CoreError> {
        let mut token = self.token.lock().await;
        if let Some(current) = token.as_ref() {
            if !current.is_expired() {
                return Ok(current.access_token.clone());
            }
        }

        info!("Requesting application-only Reddit token");
        let response = self
            .http_client
            .post(REDDIT_TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CoreError::RedditApi(RedditApiError::RequestTimeout)
                } else {
                    CoreError::Network(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                reason: format!("token endpoint returned {status}"),
            }));
        }

        let granted: TokenResponse = response.json().await.map_err(|_| {
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: "failed to parse token response".to_string(),
            })
        })?;

        let fresh = AppToken {
            access_token: granted.access_token.clone(),
            expires_at: SystemTime::now() + Duration::from_secs(granted.expires_in),
        };
        *token = Some(fresh);
        Ok(granted.access_token)
    }

    /// Cached `/r/<name>/about` lookup. Failures degrade to a bare fallback
    /// (name only, no icons) and are not cached, so a transient error does
    /// not pin the fallback for the process lifetime.
    async fn subreddit_info(&self, name: &str) -> SubredditInfo {
        if let Some(info) = self.subreddit_cache.lock().await.get(name) {
            return info.clone();
        }

        let endpoint = format!("/r/{name}/about");
        match self
            .get_json::<RedditListingChild<RedditSubredditData>>(&endpoint, None)
            .await
        {
            Ok(about) => {
                let info = SubredditInfo {
                    display_name: about.data.display_name,
                    icon_img: normalize_icon(about.data.icon_img),
                    community_icon: normalize_icon(about.data.community_icon),
                };
                self.subreddit_cache
                    .lock()
                    .await
                    .insert(name.to_string(), info.clone());
                info
            }
            Err(e) => {
                debug!("Subreddit about lookup failed for r/{}: {}", name, e);
                SubredditInfo {
                    display_name: name.to_string(),
                    icon_img: None,
                    community_icon: None,
                }
            }
        }
    }

    /// Cached `/user/<name>/about` avatar lookup. Deleted authors and
    /// lookup failures yield no icon.
    async fn author_icon(&self, author: &str) -> Option<String> {
        if author.is_empty() || author == "[deleted]" {
            return None;
        }
        if let Some(icon) = self.author_cache.lock().await.get(author) {
            return icon.clone();
        }

        let endpoint = format!("/user/{author}/about");
        match self
            .get_json::<RedditListingChild<RedditUserData>>(&endpoint, None)
            .await
        {
            Ok(about) => {
                let icon = normalize_icon(about.data.icon_img);
                self.author_cache
                    .lock()
                    .await
                    .insert(author.to_string(), icon.clone());
                icon
            }
            Err(e) => {
                debug!("Author about lookup failed for u/{}: {}", author, e);
                None
            }
        }
    }
}

/// Reddit reports absent icons as empty strings; map those to `None`.
fn normalize_icon(icon: Option<String>) -> Option<String> {
    icon.filter(|i| !i.is_empty())
}

fn candidate_from_comment(
    data: RedditCommentData,
    sub: &SubredditInfo,
    author_icon: Option<String>,
) -> CandidateItem {
    CandidateItem {
        id: data.id,
        kind: ItemKind::Comment,
        body: data.body,
        source_group: data.subreddit,
        permalink: data.permalink,
        author_name: Some(data.author).filter(|a| !a.is_empty()),
        author_avatar_url: author_icon,
        group_display_name: Some(sub.display_name.clone()),
        group_icon_url: sub.icon_img.clone(),
        group_community_icon_url: sub.community_icon.clone(),
    }
}

fn candidate_from_post(
    data: RedditPostData,
    sub: &SubredditInfo,
    author_icon: Option<String>,
) -> CandidateItem {
    CandidateItem {
        id: data.id,
        kind: ItemKind::Post,
        body: data.selftext,
        source_group: data.subreddit,
        permalink: data.permalink,
        author_name: Some(data.author).filter(|a| !a.is_empty()),
        author_avatar_url: author_icon,
        group_display_name: Some(sub.display_name.clone()),
        group_icon_url: sub.icon_img.clone(),
        group_community_icon_url: sub.community_icon.clone(),
    }
}
