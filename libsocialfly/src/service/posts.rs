//! Post operations
//!
//! Creating a post either publishes it immediately (no schedule) or stores it
//! for the scheduler poller to pick up. Validation runs before anything is
//! written so a bad post never enters the queue.

use tracing::info;

use crate::db::{Database, QueueStats};
use crate::dispatcher::Dispatcher;
use crate::error::{PlatformError, Result, SocialFlyError};
use crate::types::{Post, PostStatus};

#[derive(Clone)]
pub struct PostService {
    db: Database,
    dispatcher: Dispatcher,
}

/// Request to create a post
#[derive(Debug, Clone)]
pub struct CreatePostRequest {
    pub user_id: String,
    pub account_id: String,
    pub content: String,
    pub media_urls: Vec<String>,
    /// When set, the post is queued instead of published immediately
    pub scheduled_for: Option<chrono::DateTime<chrono::Utc>>,
}

impl PostService {
    pub fn new(db: Database, dispatcher: Dispatcher) -> Self {
        Self { db, dispatcher }
    }

    /// Create a post and either publish it now or queue it.
    ///
    /// Returns the stored post; for an immediate publish its status reflects
    /// the dispatch outcome (`published` or `failed`).
    pub async fn create(&self, request: CreatePostRequest) -> Result<Post> {
        let account = self
            .db
            .get_account(&request.account_id)
            .await?
            .ok_or_else(|| {
                SocialFlyError::InvalidInput(format!(
                    "Account {} not found",
                    request.account_id
                ))
            })?;

        if !account.is_active {
            return Err(SocialFlyError::InvalidInput(format!(
                "Account {} ({}) is disconnected",
                account.account_name, account.platform
            )));
        }

        if account.user_id != request.user_id {
            return Err(SocialFlyError::InvalidInput(format!(
                "Account {} does not belong to user {}",
                request.account_id, request.user_id
            )));
        }

        let post = Post::new(
            request.user_id,
            account.id.clone(),
            request.content,
            request.media_urls,
            request.scheduled_for,
        );

        // Validate against the adapter before writing anything
        match self.dispatcher.registry().get(&account.platform) {
            Some(client) => client.validate(&account, &post)?,
            None => {
                return Err(PlatformError::Unsupported(format!(
                    "No adapter registered for platform '{}'",
                    account.platform
                ))
                .into())
            }
        }

        self.db.create_post(&post).await?;

        match post.status {
            PostStatus::Scheduled => {
                info!(
                    post_id = %post.id,
                    platform = %account.platform,
                    scheduled_for = ?post.scheduled_for,
                    "post queued"
                );
                Ok(post)
            }
            _ => self.dispatcher.dispatch(&post, &account).await,
        }
    }

    /// Fetch one post.
    pub async fn get(&self, post_id: &str) -> Result<Option<Post>> {
        self.db.get_post(post_id).await
    }

    /// List a user's posts, newest-scheduled first, optionally by status.
    pub async fn list(
        &self,
        user_id: &str,
        status: Option<PostStatus>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Post>> {
        self.db.list_posts(user_id, status, limit, offset).await
    }

    /// Cancel a scheduled post.
    pub async fn cancel(&self, post_id: &str) -> Result<()> {
        if self.db.cancel_scheduled_post(post_id).await? {
            info!(post_id = %post_id, "post cancelled");
            Ok(())
        } else {
            Err(SocialFlyError::InvalidInput(format!(
                "Post {} is not scheduled (already published, failed, or unknown)",
                post_id
            )))
        }
    }

    /// Move a scheduled post to a new time. Failed posts can be requeued the
    /// same way after an operator fixes the cause, and a post stuck in
    /// `publishing` (claimed, but the daemon died before recording the
    /// outcome) can be put back in the queue.
    pub async fn reschedule(
        &self,
        post_id: &str,
        when: chrono::DateTime<chrono::Utc>,
    ) -> Result<()> {
        let post = self.db.get_post(post_id).await?.ok_or_else(|| {
            SocialFlyError::InvalidInput(format!("Post {} not found", post_id))
        })?;

        match post.status {
            PostStatus::Scheduled => {
                self.db.reschedule_post(post_id, when.timestamp()).await?;
            }
            PostStatus::Failed | PostStatus::Draft | PostStatus::Publishing => {
                self.db.requeue_post(post_id, when.timestamp()).await?;
            }
            status => {
                return Err(SocialFlyError::InvalidInput(format!(
                    "Post {} is {} and cannot be rescheduled",
                    post_id, status
                )))
            }
        }

        info!(post_id = %post_id, when = %when.to_rfc3339(), "post rescheduled");
        Ok(())
    }

    /// Queue counts per status.
    pub async fn stats(&self, user_id: &str) -> Result<QueueStats> {
        self.db.queue_stats(user_id).await
    }
}
