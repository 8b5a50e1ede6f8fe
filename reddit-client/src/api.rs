use serde::{Deserialize, Serialize};

pub const REDDIT_API_BASE: &str = "https://oauth.reddit.com";
pub const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditCommentData {
    pub id: String,
    pub body: String,
    pub author: String,
    pub subreddit: String,
    pub permalink: String,
    pub created_utc: f64,
    pub score: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    pub title: String,
    pub selftext: String,
    pub author: String,
    pub subreddit: String,
    pub permalink: String,
    pub created_utc: f64,
    pub score: i32,
    pub num_comments: u32,
    pub is_self: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditSubredditData {
    pub display_name: String,
    pub title: Option<String>,
    pub subscribers: Option<u32>,
    pub icon_img: Option<String>,
    pub community_icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditUserData {
    pub name: String,
    pub icon_img: Option<String>,
}

/// Response of the application-only `client_credentials` token grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}
