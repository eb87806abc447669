use async_trait::async_trait;
use reqwest::{
    Client, StatusCode,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde::Deserialize;
use tracing::debug;

use crate::error::FeedError;
use crate::price_client::REQUEST_TIMEOUT;

/// Social feed upstream: username lookup and recent posts.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Resolve a username to the upstream user id.
    async fn user_id(&self, username: &str) -> Result<String, FeedError>;

    /// Most recent post ids for a user, newest first.
    async fn recent_posts(&self, user_id: &str, max_results: u8) -> Result<Vec<String>, FeedError>;
}

#[derive(Clone)]
pub struct TwitterClient {
    client: Client,
    base_api: String,
}

impl TwitterClient {
    pub fn new(base_api: impl Into<String>, bearer_token: &str) -> Result<Self, anyhow::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {bearer_token}"))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_api: base_api.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/2/{}", self.base_api.trim_end_matches('/'), path)
    }

    async fn get_body(&self, request: reqwest::RequestBuilder) -> Result<String, FeedError> {
        let res = request.send().await?;
        let status = res.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let reset_at = res
                .headers()
                .get("x-rate-limit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(FeedError::RateLimited { reset_at });
        }
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        Ok(res.text().await?)
    }
}

#[async_trait]
impl FeedSource for TwitterClient {
    async fn user_id(&self, username: &str) -> Result<String, FeedError> {
        debug!(username, "looking up user");
        let body = self
            .get_body(self.client.get(self.url(&format!("users/by/username/{username}"))))
            .await?;
        parse_user(username, &body)
    }

    async fn recent_posts(&self, user_id: &str, max_results: u8) -> Result<Vec<String>, FeedError> {
        // The endpoint accepts 5..=100.
        let max_results = max_results.clamp(5, 100).to_string();
        let body = self
            .get_body(
                self.client
                    .get(self.url(&format!("users/{user_id}/tweets")))
                    .query(&[("max_results", max_results.as_str())]),
            )
            .await?;
        parse_posts(&body)
    }
}

//
// Match X API v2 JSON
// https://docs.x.com/x-api/users/user-lookup-by-username
//
#[derive(Debug, Deserialize)]
struct UserResponse {
    data: Option<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PostsResponse {
    #[serde(default)]
    data: Vec<Post>,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
}

/// Lookups for unknown users answer 200 with an `errors` array and no `data`.
pub fn parse_user(username: &str, body: &str) -> Result<String, FeedError> {
    let res: UserResponse = serde_json::from_str(body)?;
    res.data
        .map(|u| u.id)
        .ok_or_else(|| FeedError::UnknownUser(username.to_string()))
}

/// A user without posts has no `data` field at all.
pub fn parse_posts(body: &str) -> Result<Vec<String>, FeedError> {
    let res: PostsResponse = serde_json::from_str(body)?;
    Ok(res.data.into_iter().map(|p| p.id).collect())
}

pub fn post_url(username: &str, post_id: &str) -> String {
    format!("https://twitter.com/{username}/status/{post_id}")
}
