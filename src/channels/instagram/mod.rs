pub mod payload;

use crate::channels::base::UserDirectory;
use crate::config::InstagramConfig;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use moka::sync::Cache;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

const USERNAME_TTL: Duration = Duration::from_secs(3600);
const USERNAME_CACHE_CAPACITY: u64 = 10_000;

/// Graph API version used for the send API.
const SEND_API_VERSION: &str = "v12.0";

#[derive(Deserialize)]
struct UsernameResponse {
    username: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SendResponse {
    #[serde(default)]
    pub recipient_id: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
}

/// Instagram Graph API client for username lookups and replies.
///
/// The access token travels as a query parameter, so transport errors are
/// stripped of their URL before they reach logs or users.
pub struct InstagramClient {
    client: Client,
    graph_base: String,
    access_token: String,
    usernames: Cache<String, String>,
}

impl InstagramClient {
    pub fn new(config: &InstagramConfig, client: Client) -> Self {
        Self {
            client,
            graph_base: config.graph_api_base.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            usernames: Cache::builder()
                .max_capacity(USERNAME_CACHE_CAPACITY)
                .time_to_live(USERNAME_TTL)
                .build(),
        }
    }

    /// Look up the username for an Instagram-scoped id. Successful lookups
    /// are cached for an hour; failures are never cached.
    pub async fn fetch_username(&self, sender_id: &str) -> Result<String> {
        if let Some(name) = self.usernames.get(sender_id) {
            return Ok(name);
        }

        let url = format!("{}/{}", self.graph_base, sender_id);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("fields", "username"),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("username lookup request failed")?;

        if !resp.status().is_success() {
            bail!("username lookup returned {}", resp.status());
        }
        let body: UsernameResponse = resp
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("invalid username lookup response")?;
        let Some(name) = body.username.filter(|n| !n.is_empty()) else {
            bail!("username missing for {}", sender_id);
        };

        debug!("resolved instagram user {} -> {}", sender_id, name);
        self.usernames.insert(sender_id.to_string(), name.clone());
        Ok(name)
    }

    /// Send a text DM to an Instagram user as the bot account.
    pub async fn send_direct_message(&self, recipient_id: &str, text: &str) -> Result<SendResponse> {
        let url = format!("{}/{}/me/messages", self.graph_base, SEND_API_VERSION);
        let body = serde_json::json!({
            "recipient": { "id": recipient_id },
            "message": { "text": text },
        });
        let resp = self
            .client
            .post(&url)
            .query(&[("access_token", self.access_token.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("instagram send request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            bail!("instagram send returned {}: {}", status, detail);
        }
        let sent: SendResponse = resp.json().await.unwrap_or_default();
        info!("sent instagram reply to {}", recipient_id);
        Ok(sent)
    }
}

#[async_trait]
impl UserDirectory for InstagramClient {
    async fn username(&self, sender_id: &str) -> Result<String> {
        self.fetch_username(sender_id).await
    }
}
