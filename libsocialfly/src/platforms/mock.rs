//! Mock platform client for testing
//!
//! A configurable client that records every publish call and can simulate
//! failures, latency, and token refreshes. Available outside `cfg(test)` so
//! integration tests can drive the dispatcher and scheduler with it.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{PlatformError, Result};
use crate::types::{Account, Post, PublishOutcome, TokenRefresh};

use super::PlatformClient;

/// Configuration for mock client behavior
#[derive(Debug, Clone)]
pub struct MockClientConfig {
    /// Platform name the client registers under
    pub name: String,

    /// Whether publishing should succeed
    pub publish_succeeds: bool,

    /// Error to return on publish failure
    pub publish_error: Option<String>,

    /// Delay before completing operations (simulates network latency)
    pub delay: Duration,

    /// Character limit for validation
    pub character_limit: Option<usize>,

    /// Token refresh to report alongside a successful publish
    pub token_refresh: Option<TokenRefresh>,

    /// Number of times publish has been called
    pub publish_call_count: Arc<Mutex<usize>>,

    /// Content of every published post (for verification)
    pub published_content: Arc<Mutex<Vec<String>>>,
}

impl Default for MockClientConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            publish_succeeds: true,
            publish_error: None,
            delay: Duration::from_millis(0),
            character_limit: None,
            token_refresh: None,
            publish_call_count: Arc::new(Mutex::new(0)),
            published_content: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Mock platform client for testing
pub struct MockClient {
    config: MockClientConfig,
}

impl MockClient {
    pub fn new(config: MockClientConfig) -> Self {
        Self { config }
    }

    /// A client that always succeeds
    pub fn success(name: &str) -> Self {
        Self::new(MockClientConfig {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// A client whose publish calls fail with the given message
    pub fn failure(name: &str, error: &str) -> Self {
        Self::new(MockClientConfig {
            name: name.to_string(),
            publish_succeeds: false,
            publish_error: Some(error.to_string()),
            ..Default::default()
        })
    }

    /// A client that sleeps before answering
    pub fn with_delay(name: &str, delay: Duration) -> Self {
        Self::new(MockClientConfig {
            name: name.to_string(),
            delay,
            ..Default::default()
        })
    }

    /// A client with a character limit
    pub fn with_limit(name: &str, limit: usize) -> Self {
        Self::new(MockClientConfig {
            name: name.to_string(),
            character_limit: Some(limit),
            ..Default::default()
        })
    }

    /// A client that reports refreshed credentials on every publish
    pub fn with_token_refresh(name: &str, refresh: TokenRefresh) -> Self {
        Self::new(MockClientConfig {
            name: name.to_string(),
            token_refresh: Some(refresh),
            ..Default::default()
        })
    }

    /// Number of times publish was called
    pub fn publish_call_count(&self) -> usize {
        *self.config.publish_call_count.lock().unwrap()
    }

    /// Content of every post published through this client
    pub fn published_content(&self) -> Vec<String> {
        self.config.published_content.lock().unwrap().clone()
    }

    /// Handles to the shared counters, for asserting after the client has
    /// been moved into a registry.
    pub fn counters(&self) -> (Arc<Mutex<usize>>, Arc<Mutex<Vec<String>>>) {
        (
            self.config.publish_call_count.clone(),
            self.config.published_content.clone(),
        )
    }
}

#[async_trait]
impl PlatformClient for MockClient {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn character_limit(&self) -> Option<usize> {
        self.config.character_limit
    }

    async fn publish(&self, _account: &Account, post: &Post) -> Result<PublishOutcome> {
        *self.config.publish_call_count.lock().unwrap() += 1;

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        if !self.config.publish_succeeds {
            let message = self
                .config
                .publish_error
                .clone()
                .unwrap_or_else(|| "Mock publish failed".to_string());
            return Err(PlatformError::api(500, message).into());
        }

        self.config
            .published_content
            .lock()
            .unwrap()
            .push(post.content.clone());

        let post_id = format!("{}:mock-{}", self.config.name, uuid::Uuid::new_v4());
        let outcome = PublishOutcome::new(post_id);

        Ok(match &self.config.token_refresh {
            Some(refresh) => outcome.with_refresh(refresh.clone()),
            None => outcome,
        })
    }
}
