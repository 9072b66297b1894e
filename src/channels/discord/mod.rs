pub mod format;
pub mod interactions;

use crate::bus::{Destination, OutboundMessage};
use crate::channels::base::{Dispatcher, split_message};
use crate::config::{DiscordConfig, RelayConfig};
use crate::utils::media::{DownloadedMedia, MediaFetch, download_media, media_dir};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use format::{DISCORD_MAX_CHARS, link_notice, message_lines, quote, unavailable_notice};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

#[derive(Deserialize)]
struct ChannelResponse {
    id: String,
}

/// Sends relayed messages through the Discord REST API.
pub struct DiscordChannel {
    client: Client,
    media_client: Client,
    api_base: String,
    token: String,
    channel_id: String,
    mentions: HashMap<String, String>,
    max_media_bytes: u64,
    media_dir: PathBuf,
    /// Discord user id → DM channel id.
    dm_channels: Mutex<HashMap<String, String>>,
}

impl DiscordChannel {
    pub fn new(
        discord: &DiscordConfig,
        relay: &RelayConfig,
        client: Client,
        media_client: Client,
    ) -> Result<Self> {
        Ok(Self {
            client,
            media_client,
            api_base: discord.api_base.trim_end_matches('/').to_string(),
            token: discord.token.clone(),
            channel_id: discord.channel_id.clone(),
            mentions: discord.user_ids.clone(),
            max_media_bytes: relay.max_media_bytes,
            media_dir: media_dir(relay.media_dir.as_deref())?,
            dm_channels: Mutex::new(HashMap::new()),
        })
    }

    fn bot_auth(&self) -> String {
        format!("Bot {}", self.token)
    }

    /// Channel id to post into for `destination`, opening a DM if needed.
    async fn target_channel(&self, destination: &Destination) -> Result<String> {
        match destination {
            Destination::Channel => Ok(self.channel_id.clone()),
            Destination::DirectMessage { user_id } => self.dm_channel(user_id).await,
        }
    }

    async fn dm_channel(&self, user_id: &str) -> Result<String> {
        let cached = self
            .dm_channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned();
        if let Some(id) = cached {
            return Ok(id);
        }

        let resp = self
            .client
            .post(format!("{}/users/@me/channels", self.api_base))
            .header("Authorization", self.bot_auth())
            .json(&json!({ "recipient_id": user_id }))
            .send()
            .await
            .context("failed to open Discord DM channel")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("Discord DM channel open failed ({}): {}", status, body);
        }
        let channel: ChannelResponse = resp.json().await?;
        debug!("opened DM channel {} for user {}", channel.id, user_id);
        self.dm_channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id.to_string(), channel.id.clone());
        Ok(channel.id)
    }

    fn messages_url(&self, channel_id: &str) -> String {
        format!("{}/channels/{}/messages", self.api_base, channel_id)
    }

    async fn post_json(&self, channel_id: &str, payload: &Value) -> Result<()> {
        let resp = self
            .client
            .post(self.messages_url(channel_id))
            .header("Authorization", self.bot_auth())
            .json(payload)
            .send()
            .await
            .context("Discord send request failed")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("Discord send message failed ({}): {}", status, body);
        }
        Ok(())
    }

    async fn post_text(&self, channel_id: &str, content: &str) -> Result<()> {
        for chunk in split_message(content, DISCORD_MAX_CHARS) {
            self.post_json(channel_id, &json!({ "content": chunk }))
                .await?;
        }
        Ok(())
    }

    /// Post `content` with the file attached to the first chunk.
    async fn post_with_file(
        &self,
        channel_id: &str,
        content: &str,
        media: &DownloadedMedia,
    ) -> Result<()> {
        let mut chunks = split_message(content, DISCORD_MAX_CHARS).into_iter();
        let first = chunks.next().unwrap_or_default();

        let bytes = tokio::fs::read(media.path())
            .await
            .with_context(|| format!("failed to read {}", media.path().display()))?;
        let payload = json!({ "content": first });
        let form = Form::new()
            .text("payload_json", payload.to_string())
            .part(
                "files[0]",
                Part::bytes(bytes).file_name(media.file_name().to_string()),
            );

        let resp = self
            .client
            .post(self.messages_url(channel_id))
            .header("Authorization", self.bot_auth())
            .multipart(form)
            .send()
            .await
            .context("Discord upload request failed")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("Discord upload failed ({}): {}", status, body);
        }

        for chunk in chunks {
            self.post_json(channel_id, &json!({ "content": chunk }))
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Dispatcher for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    async fn dispatch(&self, msg: &OutboundMessage) -> Result<()> {
        let channel_id = self.target_channel(&msg.destination).await?;
        let mut lines = message_lines(msg, &self.mentions);

        let Some(media) = &msg.media else {
            return self.post_text(&channel_id, &quote(&lines)).await;
        };

        let fetched = download_media(
            &self.media_client,
            &media.url,
            media.kind,
            self.max_media_bytes,
            &self.media_dir,
        )
        .await;

        match fetched {
            Ok(MediaFetch::Downloaded(file)) => {
                match self.post_with_file(&channel_id, &quote(&lines), &file).await {
                    Ok(()) => {
                        info!("sent {} as file ({} bytes)", media.kind, file.size());
                        return Ok(());
                    }
                    Err(e) => {
                        warn!("{} upload failed, falling back to link: {:#}", media.kind, e);
                        lines.push(link_notice(&media.url, self.max_media_bytes));
                    }
                }
                // `file` drops here, removing the temp file
            }
            Ok(MediaFetch::TooLarge { bytes }) => {
                info!("sending {} as link (size: {} bytes)", media.kind, bytes);
                lines.push(link_notice(&media.url, self.max_media_bytes));
            }
            Ok(MediaFetch::NotFound) => {
                info!("{} unavailable, sending text only", media.kind);
                lines.push(unavailable_notice(media.kind));
            }
            Err(e) => {
                warn!("{} download failed, sending as link: {:#}", media.kind, e);
                lines.push(link_notice(&media.url, self.max_media_bytes));
            }
        }
        self.post_text(&channel_id, &quote(&lines)).await
    }
}
