//! Core types for SocialFly

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A linked identity on one external platform for one user.
///
/// `metadata` carries platform-specific fields as JSON: Discord `channelId` /
/// `defaultChannelId` / `guildName`, LinkedIn `personUrn` / `organizationId`,
/// and whatever the next platform needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub user_id: String,
    pub platform: String,
    pub platform_id: String,
    pub account_name: String,
    pub avatar_url: Option<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_expiry: Option<i64>,
    pub metadata: Option<serde_json::Value>,
    pub is_active: bool,
    pub created_at: i64,
}

impl Account {
    pub fn new(
        user_id: String,
        platform: String,
        platform_id: String,
        account_name: String,
        access_token: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            platform: platform.to_lowercase(),
            platform_id,
            account_name,
            avatar_url: None,
            access_token,
            refresh_token: None,
            token_expiry: None,
            metadata: None,
            is_active: true,
            created_at: Utc::now().timestamp(),
        }
    }

    /// Look up a string field in the platform metadata.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key)?.as_str()
    }

    /// Discord channel to post into: `channelId`, falling back to
    /// `defaultChannelId`.
    pub fn discord_channel_id(&self) -> Option<&str> {
        self.metadata_str("channelId")
            .or_else(|| self.metadata_str("defaultChannelId"))
    }

    /// Whether the access token is expired or expires within `window` seconds.
    pub fn token_expires_within(&self, window: i64) -> bool {
        match self.token_expiry {
            Some(expiry) => expiry <= Utc::now().timestamp() + window,
            None => false,
        }
    }
}

/// Lifecycle status of a post.
///
/// `Publishing` is the claim stamp: the scheduler moves due posts from
/// `Scheduled` to `Publishing` in the same query that selects them, so two
/// concurrent pollers cannot double-claim a row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Scheduled,
    Publishing,
    Published,
    Failed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Publishing => "publishing",
            PostStatus::Published => "published",
            PostStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PostStatus::Draft),
            "scheduled" => Some(PostStatus::Scheduled),
            "publishing" => Some(PostStatus::Publishing),
            "published" => Some(PostStatus::Published),
            "failed" => Some(PostStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One logical content item targeted at exactly one account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub social_account_id: String,
    pub content: String,
    pub media_urls: Vec<String>,
    pub status: PostStatus,
    pub scheduled_for: Option<i64>,
    pub published_at: Option<i64>,
    pub platform_post_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: i64,
}

impl Post {
    /// Create a post. Status is `Scheduled` when a schedule time is supplied,
    /// `Draft` otherwise (the draft is published immediately by the caller).
    pub fn new(
        user_id: String,
        social_account_id: String,
        content: String,
        media_urls: Vec<String>,
        scheduled_for: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            social_account_id,
            content,
            media_urls,
            status: if scheduled_for.is_some() {
                PostStatus::Scheduled
            } else {
                PostStatus::Draft
            },
            scheduled_for: scheduled_for.map(|t| t.timestamp()),
            published_at: None,
            platform_post_id: None,
            error_message: None,
            created_at: Utc::now().timestamp(),
        }
    }
}

/// Refreshed OAuth credentials reported by an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRefresh {
    pub access_token: String,
    pub token_expiry: Option<i64>,
}

/// Result of a successful adapter publish.
///
/// `token_refresh` is set when the adapter had to refresh the account's
/// OAuth token on the way (YouTube); the dispatcher persists it.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub platform_post_id: String,
    pub token_refresh: Option<TokenRefresh>,
}

impl PublishOutcome {
    pub fn new(platform_post_id: impl Into<String>) -> Self {
        Self {
            platform_post_id: platform_post_id.into(),
            token_refresh: None,
        }
    }

    pub fn with_refresh(mut self, refresh: TokenRefresh) -> Self {
        self.token_refresh = Some(refresh);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_account_new_defaults() {
        let account = Account::new(
            "user-1".to_string(),
            "Discord".to_string(),
            "guild-123".to_string(),
            "My Server".to_string(),
            "token".to_string(),
        );

        assert!(Uuid::parse_str(&account.id).is_ok());
        assert_eq!(account.platform, "discord", "platform is normalized to lowercase");
        assert!(account.is_active);
        assert_eq!(account.refresh_token, None);
        assert_eq!(account.metadata, None);
    }

    #[test]
    fn test_discord_channel_id_prefers_channel_id() {
        let mut account = Account::new(
            "u".into(),
            "discord".into(),
            "p".into(),
            "n".into(),
            "t".into(),
        );
        account.metadata = Some(serde_json::json!({
            "channelId": "111",
            "defaultChannelId": "222"
        }));
        assert_eq!(account.discord_channel_id(), Some("111"));
    }

    #[test]
    fn test_discord_channel_id_fallback() {
        let mut account = Account::new(
            "u".into(),
            "discord".into(),
            "p".into(),
            "n".into(),
            "t".into(),
        );
        account.metadata = Some(serde_json::json!({ "defaultChannelId": "222" }));
        assert_eq!(account.discord_channel_id(), Some("222"));

        account.metadata = None;
        assert_eq!(account.discord_channel_id(), None);
    }

    #[test]
    fn test_token_expires_within() {
        let mut account = Account::new(
            "u".into(),
            "youtube".into(),
            "p".into(),
            "n".into(),
            "t".into(),
        );

        // No expiry recorded: assume the token is usable
        assert!(!account.token_expires_within(300));

        account.token_expiry = Some((Utc::now() + Duration::minutes(2)).timestamp());
        assert!(account.token_expires_within(300));

        account.token_expiry = Some((Utc::now() + Duration::hours(1)).timestamp());
        assert!(!account.token_expires_within(300));
    }

    #[test]
    fn test_post_new_without_schedule_is_draft() {
        let post = Post::new(
            "user-1".to_string(),
            "acct-1".to_string(),
            "hello".to_string(),
            vec![],
            None,
        );

        assert_eq!(post.status, PostStatus::Draft);
        assert_eq!(post.scheduled_for, None);
        assert_eq!(post.platform_post_id, None);
        assert_eq!(post.error_message, None);
    }

    #[test]
    fn test_post_new_with_schedule_is_scheduled() {
        let when = Utc::now() + Duration::minutes(5);
        let post = Post::new(
            "user-1".to_string(),
            "acct-1".to_string(),
            "hello".to_string(),
            vec!["/uploads/pic.png".to_string()],
            Some(when),
        );

        assert_eq!(post.status, PostStatus::Scheduled);
        assert_eq!(post.scheduled_for, Some(when.timestamp()));
        assert_eq!(post.media_urls.len(), 1);
    }

    #[test]
    fn test_post_status_round_trip() {
        for status in [
            PostStatus::Draft,
            PostStatus::Scheduled,
            PostStatus::Publishing,
            PostStatus::Published,
            PostStatus::Failed,
        ] {
            assert_eq!(PostStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PostStatus::parse("pending"), None);
    }

    #[test]
    fn test_post_serialization() {
        let post = Post::new(
            "user-1".to_string(),
            "acct-1".to_string(),
            "hello".to_string(),
            vec!["/uploads/a.png".to_string()],
            None,
        );

        let json = serde_json::to_string(&post).unwrap();
        let deserialized: Post = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.id, post.id);
        assert_eq!(deserialized.media_urls, post.media_urls);
        assert_eq!(deserialized.status, PostStatus::Draft);
    }

    #[test]
    fn test_publish_outcome_with_refresh() {
        let outcome = PublishOutcome::new("video-1").with_refresh(TokenRefresh {
            access_token: "fresh".to_string(),
            token_expiry: Some(1_900_000_000),
        });

        assert_eq!(outcome.platform_post_id, "video-1");
        let refresh = outcome.token_refresh.unwrap();
        assert_eq!(refresh.access_token, "fresh");
    }
}
