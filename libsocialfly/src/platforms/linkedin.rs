//! LinkedIn platform adapter
//!
//! Shares are created through the ugcPosts endpoint with per-account bearer
//! tokens. A post with media is first attempted as an IMAGE share; when the
//! upstream rejects that (the media URL is often not reachable from
//! LinkedIn's fetchers), the adapter degrades to a text share that references
//! the media URL in the body. Which branch ran is reported explicitly so
//! callers and tests do not have to infer it.

use async_trait::async_trait;

use crate::config::LinkedInConfig;
use crate::error::{PlatformError, Result};
use crate::types::{Account, Post, PublishOutcome};

use super::PlatformClient;

const CHARACTER_LIMIT: usize = 3000;

/// Which share variant produced the returned post id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishPath {
    /// The IMAGE share succeeded
    Image,
    /// The IMAGE share failed upstream; a text share carrying a media
    /// reference was posted instead
    TextFallback,
    /// The post had no media; a plain text share was posted
    Text,
}

pub struct LinkedInClient {
    config: LinkedInConfig,
    http: reqwest::Client,
}

impl LinkedInClient {
    pub fn new(config: LinkedInConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Publish a share, reporting which variant produced the post id.
    pub async fn publish_share(
        &self,
        account: &Account,
        post: &Post,
    ) -> Result<(PublishPath, String)> {
        let author = self.author_urn(account).await?;

        match post.media_urls.first() {
            Some(media_url) => {
                match self
                    .create_share(account, &author, &post.content, Some(media_url))
                    .await
                {
                    Ok(id) => Ok((PublishPath::Image, id)),
                    Err(e) if is_upstream_rejection(&e) => {
                        tracing::warn!(
                            error = %e,
                            media_url = %media_url,
                            "LinkedIn image share rejected, falling back to text"
                        );
                        let text = format!("{}\n\n[media: {}]", post.content, media_url);
                        let id = self.create_share(account, &author, &text, None).await?;
                        Ok((PublishPath::TextFallback, id))
                    }
                    Err(e) => Err(e),
                }
            }
            None => {
                let id = self
                    .create_share(account, &author, &post.content, None)
                    .await?;
                Ok((PublishPath::Text, id))
            }
        }
    }

    /// Resolve the author URN: stored person URN, then an organization id from
    /// metadata, then a profile lookup.
    async fn author_urn(&self, account: &Account) -> Result<String> {
        if let Some(urn) = account.metadata_str("personUrn") {
            if urn.starts_with("urn:") {
                return Ok(urn.to_string());
            }
            return Ok(format!("urn:li:person:{}", urn));
        }

        if let Some(org) = account.metadata_str("organizationId") {
            return Ok(format!("urn:li:organization:{}", org));
        }

        let response = self
            .http
            .get(format!("{}/v2/userinfo", self.config.api_base))
            .header("Authorization", format!("Bearer {}", account.access_token))
            .send()
            .await
            .map_err(PlatformError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::api(status.as_u16(), body).into());
        }

        let profile: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        profile
            .get("sub")
            .and_then(|s| s.as_str())
            .map(|sub| format!("urn:li:person:{}", sub))
            .ok_or_else(|| {
                PlatformError::Network("LinkedIn userinfo missing sub".to_string()).into()
            })
    }

    async fn create_share(
        &self,
        account: &Account,
        author: &str,
        text: &str,
        media_url: Option<&str>,
    ) -> Result<String> {
        let share_content = match media_url {
            Some(url) => serde_json::json!({
                "shareCommentary": { "text": text },
                "shareMediaCategory": "IMAGE",
                "media": [{ "status": "READY", "originalUrl": url }],
            }),
            None => serde_json::json!({
                "shareCommentary": { "text": text },
                "shareMediaCategory": "NONE",
            }),
        };

        let body = serde_json::json!({
            "author": author,
            "lifecycleState": "PUBLISHED",
            "specificContent": { "com.linkedin.ugc.ShareContent": share_content },
            "visibility": { "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC" },
        });

        let response = self
            .http
            .post(format!("{}/v2/ugcPosts", self.config.api_base))
            .header("Authorization", format!("Bearer {}", account.access_token))
            .header("X-Restli-Protocol-Version", "2.0.0")
            .json(&body)
            .send()
            .await
            .map_err(PlatformError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::api(status.as_u16(), body).into());
        }

        let share: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        share
            .get("id")
            .and_then(|id| id.as_str())
            .map(String::from)
            .ok_or_else(|| {
                PlatformError::Network("LinkedIn response missing share id".to_string()).into()
            })
    }
}

/// An upstream 4xx/5xx on the image share triggers the text fallback; local
/// failures (network, config) do not.
fn is_upstream_rejection(error: &crate::SocialFlyError) -> bool {
    matches!(
        error,
        crate::SocialFlyError::Platform(PlatformError::Api { .. })
    )
}

#[async_trait]
impl PlatformClient for LinkedInClient {
    fn name(&self) -> &str {
        "linkedin"
    }

    fn character_limit(&self) -> Option<usize> {
        Some(CHARACTER_LIMIT)
    }

    async fn publish(&self, account: &Account, post: &Post) -> Result<PublishOutcome> {
        let (_, share_id) = self.publish_share(account, post).await?;
        Ok(PublishOutcome::new(share_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_with_metadata(metadata: serde_json::Value) -> Account {
        Account {
            metadata: Some(metadata),
            ..Account::new(
                "user-1".to_string(),
                "linkedin".to_string(),
                "profile-1".to_string(),
                "Jane".to_string(),
                "token".to_string(),
            )
        }
    }

    #[tokio::test]
    async fn test_author_urn_from_person_metadata() {
        let client = LinkedInClient::new(LinkedInConfig::default());
        let account = account_with_metadata(serde_json::json!({ "personUrn": "abc123" }));
        let urn = client.author_urn(&account).await.unwrap();
        assert_eq!(urn, "urn:li:person:abc123");
    }

    #[tokio::test]
    async fn test_author_urn_passes_through_full_urn() {
        let client = LinkedInClient::new(LinkedInConfig::default());
        let account =
            account_with_metadata(serde_json::json!({ "personUrn": "urn:li:person:abc123" }));
        let urn = client.author_urn(&account).await.unwrap();
        assert_eq!(urn, "urn:li:person:abc123");
    }

    #[tokio::test]
    async fn test_author_urn_prefers_organization() {
        let client = LinkedInClient::new(LinkedInConfig::default());
        let account = account_with_metadata(serde_json::json!({ "organizationId": "999" }));
        let urn = client.author_urn(&account).await.unwrap();
        assert_eq!(urn, "urn:li:organization:999");
    }

    #[test]
    fn test_upstream_rejection_classification() {
        let api: crate::SocialFlyError = PlatformError::api(400, "bad media").into();
        assert!(is_upstream_rejection(&api));

        let network: crate::SocialFlyError =
            PlatformError::Network("connection refused".to_string()).into();
        assert!(!is_upstream_rejection(&network));
    }
}
