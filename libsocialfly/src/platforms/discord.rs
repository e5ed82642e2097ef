//! Discord platform adapter
//!
//! Posts land as messages in the channel named by the account metadata
//! (`channelId`, falling back to `defaultChannelId`). Authorization is a
//! single bot token from configuration; every connected Discord account
//! shares that bot identity. Media attachments are sent as a multipart
//! message with a `payload_json` part plus one `files[N]` part per file.

use async_trait::async_trait;
use reqwest::multipart;
use std::path::Path;

use crate::config::{resolve_media_path, DiscordConfig};
use crate::error::{PlatformError, Result};
use crate::types::{Account, Post, PublishOutcome};

use super::PlatformClient;

// Discord message content cap
const CHARACTER_LIMIT: usize = 2000;

pub struct DiscordClient {
    config: DiscordConfig,
    media_root: String,
    http: reqwest::Client,
}

impl DiscordClient {
    pub fn new(config: DiscordConfig, media_root: String) -> Self {
        Self {
            config,
            media_root,
            http: reqwest::Client::new(),
        }
    }

    fn messages_url(&self, channel_id: &str) -> String {
        format!("{}/channels/{}/messages", self.config.api_base, channel_id)
    }

    async fn send_text(&self, channel_id: &str, content: &str) -> Result<String> {
        // Discord rejects an empty content field outright
        let content = if content.is_empty() { " " } else { content };

        let response = self
            .http
            .post(self.messages_url(channel_id))
            .header("Authorization", format!("Bot {}", self.config.bot_token))
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .map_err(PlatformError::from)?;

        message_id_from_response(response).await
    }

    async fn send_with_media(
        &self,
        channel_id: &str,
        content: &str,
        media_urls: &[String],
    ) -> Result<String> {
        let mut payload = serde_json::Map::new();
        if !content.trim().is_empty() {
            payload.insert("content".to_string(), content.into());
        }

        let mut form = multipart::Form::new().part(
            "payload_json",
            multipart::Part::text(serde_json::Value::Object(payload).to_string())
                .mime_str("application/json")
                .map_err(|e| PlatformError::Network(e.to_string()))?,
        );

        let mut attached = 0;
        for url in media_urls {
            let Some(path) = resolve_media_path(&self.media_root, url) else {
                tracing::warn!(url = %url, "skipping remote media url for Discord upload");
                continue;
            };

            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable media file");
                    continue;
                }
            };

            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("file{}", attached));

            form = form.part(
                format!("files[{}]", attached),
                multipart::Part::bytes(bytes)
                    .file_name(filename)
                    .mime_str(mime_for_path(&path))
                    .map_err(|e| PlatformError::Network(e.to_string()))?,
            );
            attached += 1;
        }

        if attached == 0 {
            // Nothing readable to attach; post the text alone
            return self.send_text(channel_id, content).await;
        }

        let response = self
            .http
            .post(self.messages_url(channel_id))
            .header("Authorization", format!("Bot {}", self.config.bot_token))
            .multipart(form)
            .send()
            .await
            .map_err(PlatformError::from)?;

        message_id_from_response(response).await
    }
}

async fn message_id_from_response(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message")?.as_str().map(String::from))
            .unwrap_or(body);
        return Err(PlatformError::api(status.as_u16(), message).into());
    }

    let message: serde_json::Value = response
        .json()
        .await
        .map_err(|e| PlatformError::Network(e.to_string()))?;

    message
        .get("id")
        .and_then(|id| id.as_str())
        .map(String::from)
        .ok_or_else(|| {
            PlatformError::Network("Discord response missing message id".to_string()).into()
        })
}

fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        _ => "image/jpeg",
    }
}

#[async_trait]
impl PlatformClient for DiscordClient {
    fn name(&self) -> &str {
        "discord"
    }

    fn character_limit(&self) -> Option<usize> {
        Some(CHARACTER_LIMIT)
    }

    fn validate(&self, account: &Account, post: &Post) -> Result<()> {
        if account.discord_channel_id().is_none() {
            return Err(
                PlatformError::Config("No Discord channel configured".to_string()).into(),
            );
        }
        super::validate_content(self, post)
    }

    async fn publish(&self, account: &Account, post: &Post) -> Result<PublishOutcome> {
        let channel_id = account.discord_channel_id().ok_or_else(|| {
            PlatformError::Config("No Discord channel configured".to_string())
        })?;

        let message_id = if post.media_urls.is_empty() {
            self.send_text(channel_id, &post.content).await?
        } else {
            self.send_with_media(channel_id, &post.content, &post.media_urls)
                .await?
        };

        Ok(PublishOutcome::new(message_id))
    }
}
