//! YouTube platform adapter
//!
//! A YouTube post is a video upload: the first local video file among the
//! post's media is streamed to the Data API v3 resumable upload endpoint.
//! Access tokens are short-lived, so the adapter refreshes the stored token
//! when it is expired or expiring within five minutes and reports the new
//! credentials in the publish outcome for the caller to persist.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::config::{resolve_media_path, YouTubeConfig};
use crate::error::{PlatformError, Result};
use crate::types::{Account, Post, PublishOutcome, TokenRefresh};

use super::PlatformClient;

/// Refresh when the token expires within this many seconds
const TOKEN_REFRESH_WINDOW: i64 = 300;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "webm", "mkv", "m4v"];

pub struct YouTubeClient {
    config: YouTubeConfig,
    media_root: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: i64,
}

impl YouTubeClient {
    pub fn new(config: YouTubeConfig, media_root: String) -> Self {
        Self {
            config,
            media_root,
            http: reqwest::Client::new(),
        }
    }

    /// First media entry that resolves to a local video file.
    fn find_video(&self, media_urls: &[String]) -> Option<PathBuf> {
        media_urls
            .iter()
            .filter_map(|url| resolve_media_path(&self.media_root, url))
            .find(|path| is_video(path))
    }

    /// Exchange the refresh token for a fresh access token.
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenRefresh> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(PlatformError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::api(status.as_u16(), body).into());
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        Ok(TokenRefresh {
            access_token: refreshed.access_token,
            token_expiry: Some(Utc::now().timestamp() + refreshed.expires_in),
        })
    }

    /// Two-step resumable upload: create the session, then send the bytes.
    async fn upload_video(
        &self,
        access_token: &str,
        post: &Post,
        video_path: &Path,
    ) -> Result<String> {
        let metadata = serde_json::json!({
            "snippet": {
                "title": video_title(&post.content),
                "description": post.content,
            },
            "status": { "privacyStatus": "public" },
        });

        let session = self
            .http
            .post(format!(
                "{}/videos?uploadType=resumable&part=snippet,status",
                self.config.upload_base
            ))
            .header("Authorization", format!("Bearer {}", access_token))
            .json(&metadata)
            .send()
            .await
            .map_err(PlatformError::from)?;

        let status = session.status();
        if !status.is_success() {
            let body = session.text().await.unwrap_or_default();
            return Err(PlatformError::api(status.as_u16(), body).into());
        }

        let upload_url = session
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .ok_or_else(|| {
                PlatformError::Network("YouTube upload session missing location".to_string())
            })?;

        let bytes = tokio::fs::read(video_path).await.map_err(|e| {
            PlatformError::Config(format!(
                "Cannot read video file {}: {}",
                video_path.display(),
                e
            ))
        })?;

        let response = self
            .http
            .put(upload_url)
            .header("Authorization", format!("Bearer {}", access_token))
            .header("Content-Type", "video/*")
            .body(bytes)
            .send()
            .await
            .map_err(PlatformError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::api(status.as_u16(), body).into());
        }

        let video: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        video
            .get("id")
            .and_then(|id| id.as_str())
            .map(String::from)
            .ok_or_else(|| {
                PlatformError::Network("YouTube response missing video id".to_string()).into()
            })
    }
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Video title: first line of the content, truncated to YouTube's 100-char
/// title limit.
fn video_title(content: &str) -> String {
    let first_line = content.lines().next().unwrap_or("").trim();
    if first_line.is_empty() {
        return "Untitled video".to_string();
    }
    first_line.chars().take(100).collect()
}

#[async_trait]
impl PlatformClient for YouTubeClient {
    fn name(&self) -> &str {
        "youtube"
    }

    fn validate(&self, _account: &Account, post: &Post) -> Result<()> {
        if self.find_video(&post.media_urls).is_none() {
            return Err(PlatformError::Config(
                "YouTube posts require a local video file".to_string(),
            )
            .into());
        }
        Ok(())
    }

    async fn publish(&self, account: &Account, post: &Post) -> Result<PublishOutcome> {
        let video_path = self.find_video(&post.media_urls).ok_or_else(|| {
            PlatformError::Config("YouTube posts require a local video file".to_string())
        })?;

        let mut access_token = account.access_token.clone();
        let mut refreshed = None;

        if account.token_expires_within(TOKEN_REFRESH_WINDOW) {
            let refresh_token = account.refresh_token.as_deref().ok_or_else(|| {
                PlatformError::Config(
                    "YouTube access token expired and no refresh token is stored".to_string(),
                )
            })?;

            let refresh = self.refresh_access_token(refresh_token).await?;
            access_token = refresh.access_token.clone();
            refreshed = Some(refresh);
        }

        let video_id = self.upload_video(&access_token, post, &video_path).await?;

        let outcome = PublishOutcome::new(video_id);
        Ok(match refreshed {
            Some(refresh) => outcome.with_refresh(refresh),
            None => outcome,
        })
    }
}
