//! Publish dispatcher
//!
//! One dispatch call takes a post to exactly one terminal status: the adapter
//! for the account's platform runs once, and the post record ends up
//! `published` or `failed`. There are no retries here; a failed post stays
//! failed until someone reschedules it.
//!
//! Dispatch itself does not claim the post. Two concurrent dispatch calls for
//! the same post will both invoke the adapter; callers that need exclusivity
//! (the scheduler) claim rows before calling in. If the terminal status write
//! fails the post is left in its prior state with no trace of the attempt.

use chrono::Utc;

use crate::db::Database;
use crate::error::{PlatformError, Result};
use crate::platforms::PlatformRegistry;
use crate::types::{Account, Post, PostStatus};

#[derive(Clone)]
pub struct Dispatcher {
    db: Database,
    registry: PlatformRegistry,
}

impl Dispatcher {
    pub fn new(db: Database, registry: PlatformRegistry) -> Self {
        Self { db, registry }
    }

    pub fn registry(&self) -> &PlatformRegistry {
        &self.registry
    }

    /// Publish `post` through the adapter for `account.platform` and record
    /// the terminal status.
    ///
    /// Adapter failures are absorbed into the post record; the returned post
    /// carries the resulting status. An `Err` here means the store write
    /// itself failed.
    pub async fn dispatch(&self, post: &Post, account: &Account) -> Result<Post> {
        let Some(client) = self.registry.get(&account.platform) else {
            let error = PlatformError::Unsupported(format!(
                "No adapter registered for platform '{}'",
                account.platform
            ));
            tracing::error!(post_id = %post.id, platform = %account.platform, "{}", error);
            self.db.mark_failed(&post.id, &error.to_string()).await?;
            return self.reload(post).await;
        };

        if !account.is_active {
            let message = format!("Account {} is disconnected", account.id);
            tracing::warn!(post_id = %post.id, account_id = %account.id, "{}", message);
            self.db.mark_failed(&post.id, &message).await?;
            return self.reload(post).await;
        }

        tracing::info!(
            post_id = %post.id,
            platform = %account.platform,
            account = %account.account_name,
            "publishing post"
        );

        match client.publish(account, post).await {
            Ok(outcome) => {
                self.db
                    .mark_published(
                        &post.id,
                        &outcome.platform_post_id,
                        Utc::now().timestamp(),
                    )
                    .await?;

                if let Some(refresh) = outcome.token_refresh {
                    self.db
                        .update_account_tokens(
                            &account.id,
                            &refresh.access_token,
                            refresh.token_expiry,
                        )
                        .await?;
                    tracing::debug!(account_id = %account.id, "stored refreshed platform token");
                }

                tracing::info!(
                    post_id = %post.id,
                    platform_post_id = %outcome.platform_post_id,
                    "post published"
                );
            }
            Err(e) => {
                tracing::warn!(post_id = %post.id, error = %e, "publish failed");
                self.db.mark_failed(&post.id, &e.to_string()).await?;
            }
        }

        self.reload(post).await
    }

    async fn reload(&self, post: &Post) -> Result<Post> {
        self.db
            .get_post(&post.id)
            .await?
            .ok_or_else(|| crate::SocialFlyError::InvalidInput(format!("Post {} vanished", post.id)))
    }
}

/// Convenience check for callers reporting dispatch results.
pub fn is_terminal(status: PostStatus) -> bool {
    matches!(status, PostStatus::Published | PostStatus::Failed)
}
