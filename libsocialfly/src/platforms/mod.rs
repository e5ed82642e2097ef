//! Platform adapters
//!
//! Each connected platform gets an adapter implementing [`PlatformClient`].
//! Adapters translate a post and its account credentials into the platform's
//! publish call and report the resulting platform post id. The dispatcher
//! looks adapters up by platform name in a [`PlatformRegistry`] built from
//! configuration, so adding a platform means adding an adapter and a registry
//! entry, not another branch in the dispatch path.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{PlatformError, Result};
use crate::types::{Account, Post, PublishOutcome};

pub mod discord;
pub mod facebook;
pub mod linkedin;
pub mod twitter;
pub mod youtube;

// Mock client is available for all builds (not just tests) to support integration tests
pub mod mock;

/// A client for one social platform.
///
/// Implementations are stateless with respect to accounts: credentials arrive
/// with every call in the [`Account`], so one client serves every connected
/// account on its platform.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Lowercase platform identifier (e.g. "discord", "twitter")
    fn name(&self) -> &str;

    /// The platform's character limit, if it has a hard one
    fn character_limit(&self) -> Option<usize> {
        None
    }

    /// Check account and content before attempting a publish
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Config` when the account lacks settings the
    /// platform needs, or `InvalidInput` when the content cannot be posted.
    fn validate(&self, account: &Account, post: &Post) -> Result<()> {
        let _ = account;
        validate_content(self, post)
    }

    /// Publish the post on behalf of the account.
    ///
    /// Returns the platform post id, plus refreshed credentials when the
    /// adapter had to rotate the account's token to complete the call.
    async fn publish(&self, account: &Account, post: &Post) -> Result<PublishOutcome>;
}

/// Shared content validation: non-empty unless media is attached, and within
/// the platform's character limit.
pub fn validate_content<C: PlatformClient + ?Sized>(client: &C, post: &Post) -> Result<()> {
    if post.content.trim().is_empty() && post.media_urls.is_empty() {
        return Err(PlatformError::Config("Post has no content and no media".to_string()).into());
    }

    if let Some(limit) = client.character_limit() {
        let len = post.content.chars().count();
        if len > limit {
            return Err(PlatformError::Config(format!(
                "Content exceeds {} character limit for {} (got {} characters)",
                limit,
                client.name(),
                len
            ))
            .into());
        }
    }

    Ok(())
}

/// Registry of platform adapters, keyed by lowercase platform name.
#[derive(Clone, Default)]
pub struct PlatformRegistry {
    clients: HashMap<String, Arc<dyn PlatformClient>>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configuration.
    ///
    /// Adapters whose platform section requires credentials (Discord's bot
    /// token, Facebook's page, YouTube's OAuth client) are registered only
    /// when that section is present. LinkedIn and Twitter authenticate with
    /// per-account tokens and are always available.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();

        if let Some(discord) = &config.discord {
            registry.register(Arc::new(discord::DiscordClient::new(
                discord.clone(),
                config.media.root.clone(),
            )));
        }

        if let Some(facebook) = &config.facebook {
            registry.register(Arc::new(facebook::FacebookClient::new(facebook.clone())));
        }

        if let Some(youtube) = &config.youtube {
            registry.register(Arc::new(youtube::YouTubeClient::new(
                youtube.clone(),
                config.media.root.clone(),
            )));
        }

        registry.register(Arc::new(linkedin::LinkedInClient::new(
            config.linkedin.clone().unwrap_or_default(),
        )));

        registry.register(Arc::new(twitter::TwitterClient::new(
            config.twitter.clone().unwrap_or_default(),
        )));

        registry
    }

    /// Register a client under its own name.
    pub fn register(&mut self, client: Arc<dyn PlatformClient>) {
        self.clients.insert(client.name().to_lowercase(), client);
    }

    /// Look up a client by platform name, case-insensitively.
    pub fn get(&self, platform: &str) -> Option<Arc<dyn PlatformClient>> {
        self.clients.get(&platform.to_lowercase()).cloned()
    }

    /// Names of registered platforms, sorted.
    pub fn platforms(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clients.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::mock::MockClient;

    #[test]
    fn test_registry_lookup_is_case_insensitive() {
        let mut registry = PlatformRegistry::new();
        registry.register(Arc::new(MockClient::success("discord")));

        assert!(registry.get("discord").is_some());
        assert!(registry.get("Discord").is_some());
        assert!(registry.get("DISCORD").is_some());
        assert!(registry.get("telegram").is_none());
    }

    #[test]
    fn test_registry_platforms_sorted() {
        let mut registry = PlatformRegistry::new();
        registry.register(Arc::new(MockClient::success("twitter")));
        registry.register(Arc::new(MockClient::success("discord")));

        assert_eq!(registry.platforms(), vec!["discord", "twitter"]);
    }

    #[test]
    fn test_from_config_skips_unconfigured_sections() {
        let config = Config::default_config();
        let registry = PlatformRegistry::from_config(&config);

        // Token-per-account platforms are always present
        assert!(registry.get("linkedin").is_some());
        assert!(registry.get("twitter").is_some());
        // Credentialed sections are absent from a default config
        assert!(registry.get("discord").is_none());
        assert!(registry.get("facebook").is_none());
        assert!(registry.get("youtube").is_none());
    }

    #[test]
    fn test_validate_content_empty() {
        let client = MockClient::success("mock");
        let post = Post::new(
            "u".into(),
            "a".into(),
            "   ".into(),
            vec![],
            None,
        );
        assert!(validate_content(&client, &post).is_err());
    }

    #[test]
    fn test_validate_content_media_only_is_allowed() {
        let client = MockClient::success("mock");
        let post = Post::new(
            "u".into(),
            "a".into(),
            String::new(),
            vec!["/uploads/pic.png".into()],
            None,
        );
        assert!(validate_content(&client, &post).is_ok());
    }

    #[test]
    fn test_validate_content_limit() {
        let client = MockClient::with_limit("mock", 5);
        let post = Post::new("u".into(), "a".into(), "too long".into(), vec![], None);
        let err = validate_content(&client, &post).unwrap_err();
        assert!(err.to_string().contains("character limit"));
    }
}
