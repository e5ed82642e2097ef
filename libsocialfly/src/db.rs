//! Database operations for SocialFly
//!
//! Accounts and posts live in SQLite. The one query with teeth is
//! `claim_due_posts`: it stamps due rows as `publishing` in the same statement
//! that selects them, so overlapping poller runs cannot double-claim a post.

use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use std::path::Path;

use crate::error::Result;
use crate::types::{Account, Post, PostStatus};

/// Counts of posts per lifecycle status.
#[derive(Debug, Clone, Default)]
pub struct QueueStats {
    pub draft: i64,
    pub scheduled: i64,
    pub publishing: i64,
    pub published: i64,
    pub failed: i64,
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    pub async fn new(db_path: &str) -> Result<Self> {
        // Expand path and create parent directories
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(crate::error::DbError::IoError)?;
        }

        // Use mode=rwc to allow creating the database file if it doesn't exist
        let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(crate::error::DbError::SqlxError)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(crate::error::DbError::MigrationError)?;

        Ok(Self { pool })
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    /// Insert or update an account, keyed on (user_id, platform, platform_id).
    ///
    /// A reconnect refreshes credentials and reactivates the row. Returns the
    /// stored account, which keeps its original id on conflict.
    pub async fn upsert_account(&self, account: &Account) -> Result<Account> {
        sqlx::query(
            r#"
            INSERT INTO social_accounts
                (id, user_id, platform, platform_id, account_name, avatar_url,
                 access_token, refresh_token, token_expiry, metadata, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, platform, platform_id) DO UPDATE SET
                account_name = excluded.account_name,
                avatar_url = excluded.avatar_url,
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                token_expiry = excluded.token_expiry,
                metadata = excluded.metadata,
                is_active = 1
            "#,
        )
        .bind(&account.id)
        .bind(&account.user_id)
        .bind(&account.platform)
        .bind(&account.platform_id)
        .bind(&account.account_name)
        .bind(&account.avatar_url)
        .bind(&account.access_token)
        .bind(&account.refresh_token)
        .bind(account.token_expiry)
        .bind(account.metadata.as_ref().map(|m| m.to_string()))
        .bind(if account.is_active { 1 } else { 0 })
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        let row = sqlx::query(
            r#"
            SELECT * FROM social_accounts
            WHERE user_id = ? AND platform = ? AND platform_id = ?
            "#,
        )
        .bind(&account.user_id)
        .bind(&account.platform)
        .bind(&account.platform_id)
        .fetch_one(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(account_from_row(&row))
    }

    /// Get an account by ID
    pub async fn get_account(&self, account_id: &str) -> Result<Option<Account>> {
        let row = sqlx::query("SELECT * FROM social_accounts WHERE id = ?")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(crate::error::DbError::SqlxError)?;

        Ok(row.map(|r| account_from_row(&r)))
    }

    /// List a user's connected accounts, active first.
    pub async fn list_accounts(&self, user_id: &str) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM social_accounts
            WHERE user_id = ?
            ORDER BY is_active DESC, platform, account_name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(rows.iter().map(account_from_row).collect())
    }

    /// Deactivate an account on disconnect; its posts stay on record.
    pub async fn deactivate_account(&self, account_id: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE social_accounts SET is_active = 0 WHERE id = ?")
            .bind(account_id)
            .execute(&self.pool)
            .await
            .map_err(crate::error::DbError::SqlxError)?;

        Ok(result.rows_affected() > 0)
    }

    /// Persist a refreshed access token and its expiry.
    pub async fn update_account_tokens(
        &self,
        account_id: &str,
        access_token: &str,
        token_expiry: Option<i64>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE social_accounts SET access_token = ?, token_expiry = ? WHERE id = ?
            "#,
        )
        .bind(access_token)
        .bind(token_expiry)
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(())
    }

    // ========================================================================
    // Posts
    // ========================================================================

    /// Create a new post
    pub async fn create_post(&self, post: &Post) -> Result<()> {
        let media_urls = serde_json::to_string(&post.media_urls).unwrap_or_else(|_| "[]".into());

        sqlx::query(
            r#"
            INSERT INTO posts
                (id, user_id, social_account_id, content, media_urls, status,
                 scheduled_for, published_at, platform_post_id, error_message, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(&post.user_id)
        .bind(&post.social_account_id)
        .bind(&post.content)
        .bind(media_urls)
        .bind(post.status.as_str())
        .bind(post.scheduled_for)
        .bind(post.published_at)
        .bind(&post.platform_post_id)
        .bind(&post.error_message)
        .bind(post.created_at)
        .execute(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(())
    }

    /// Get a post by ID
    pub async fn get_post(&self, post_id: &str) -> Result<Option<Post>> {
        let row = sqlx::query("SELECT * FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(crate::error::DbError::SqlxError)?;

        Ok(row.map(|r| post_from_row(&r)))
    }

    /// List a user's posts, optionally filtered by status.
    ///
    /// Ordered by schedule time ascending then creation time descending, the
    /// order the dashboard shows them in.
    pub async fn list_posts(
        &self,
        user_id: &str,
        status: Option<PostStatus>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Post>> {
        let rows = match status {
            Some(status) => {
                sqlx::query(
                    r#"
                    SELECT * FROM posts
                    WHERE user_id = ? AND status = ?
                    ORDER BY scheduled_for ASC, created_at DESC
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(user_id)
                .bind(status.as_str())
                .bind(limit as i64)
                .bind(offset as i64)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT * FROM posts
                    WHERE user_id = ?
                    ORDER BY scheduled_for ASC, created_at DESC
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(user_id)
                .bind(limit as i64)
                .bind(offset as i64)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    /// Claim every scheduled post whose time has passed.
    ///
    /// The status flips to `publishing` in the same statement that selects the
    /// rows, so a second concurrent tick gets an empty batch instead of the
    /// same posts.
    pub async fn claim_due_posts(&self, now: i64) -> Result<Vec<Post>> {
        let rows = sqlx::query(
            r#"
            UPDATE posts SET status = 'publishing'
            WHERE status = 'scheduled' AND scheduled_for <= ?
            RETURNING *
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    /// Record a successful publish: terminal status, platform id, timestamp.
    pub async fn mark_published(
        &self,
        post_id: &str,
        platform_post_id: &str,
        published_at: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE posts
            SET status = 'published', published_at = ?, platform_post_id = ?,
                error_message = NULL
            WHERE id = ?
            "#,
        )
        .bind(published_at)
        .bind(platform_post_id)
        .bind(post_id)
        .execute(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(())
    }

    /// Record a failed publish attempt. Failed posts are not retried; an
    /// operator has to reschedule them.
    pub async fn mark_failed(&self, post_id: &str, error_message: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE posts
            SET status = 'failed', error_message = ?, platform_post_id = NULL
            WHERE id = ?
            "#,
        )
        .bind(error_message)
        .bind(post_id)
        .execute(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(())
    }

    /// Cancel a scheduled post. Returns false if the post was not in the
    /// scheduled state (already claimed, published, or failed).
    pub async fn cancel_scheduled_post(&self, post_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ? AND status = 'scheduled'")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(crate::error::DbError::SqlxError)?;

        Ok(result.rows_affected() > 0)
    }

    /// Move a scheduled post to a new time.
    pub async fn reschedule_post(&self, post_id: &str, scheduled_for: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE posts SET scheduled_for = ? WHERE id = ? AND status = 'scheduled'
            "#,
        )
        .bind(scheduled_for)
        .bind(post_id)
        .execute(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(result.rows_affected() > 0)
    }

    /// Put a draft, failed, or stranded publishing post back in the queue at
    /// a new time.
    ///
    /// `publishing` is included because a claimed post whose terminal write
    /// never landed (daemon crash mid-dispatch) has no other way back: the
    /// poller only claims `scheduled` rows.
    pub async fn requeue_post(&self, post_id: &str, scheduled_for: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET status = 'scheduled', scheduled_for = ?, error_message = NULL
            WHERE id = ? AND status IN ('draft', 'failed', 'publishing')
            "#,
        )
        .bind(scheduled_for)
        .bind(post_id)
        .execute(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(result.rows_affected() > 0)
    }

    /// Queue statistics for a user's posts.
    pub async fn queue_stats(&self, user_id: &str) -> Result<QueueStats> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) AS n FROM posts WHERE user_id = ? GROUP BY status
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        let mut stats = QueueStats::default();
        for row in rows {
            let n: i64 = row.get("n");
            match row.get::<String, _>("status").as_str() {
                "draft" => stats.draft = n,
                "scheduled" => stats.scheduled = n,
                "publishing" => stats.publishing = n,
                "published" => stats.published = n,
                "failed" => stats.failed = n,
                _ => {}
            }
        }

        Ok(stats)
    }
}

fn account_from_row(row: &sqlx::sqlite::SqliteRow) -> Account {
    Account {
        id: row.get("id"),
        user_id: row.get("user_id"),
        platform: row.get("platform"),
        platform_id: row.get("platform_id"),
        account_name: row.get("account_name"),
        avatar_url: row.get("avatar_url"),
        access_token: row.get("access_token"),
        refresh_token: row.get("refresh_token"),
        token_expiry: row.get("token_expiry"),
        metadata: row
            .get::<Option<String>, _>("metadata")
            .and_then(|m| serde_json::from_str(&m).ok()),
        is_active: row.get::<i32, _>("is_active") != 0,
        created_at: row.get("created_at"),
    }
}

fn post_from_row(row: &sqlx::sqlite::SqliteRow) -> Post {
    Post {
        id: row.get("id"),
        user_id: row.get("user_id"),
        social_account_id: row.get("social_account_id"),
        content: row.get("content"),
        media_urls: serde_json::from_str(&row.get::<String, _>("media_urls"))
            .unwrap_or_default(),
        status: PostStatus::parse(&row.get::<String, _>("status")).unwrap_or(PostStatus::Draft),
        scheduled_for: row.get("scheduled_for"),
        published_at: row.get("published_at"),
        platform_post_id: row.get("platform_post_id"),
        error_message: row.get("error_message"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    async fn test_db() -> Database {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        Database { pool }
    }

    fn test_account(user_id: &str, platform: &str, platform_id: &str) -> Account {
        Account::new(
            user_id.to_string(),
            platform.to_string(),
            platform_id.to_string(),
            "Test Account".to_string(),
            "access-token".to_string(),
        )
    }

    fn test_post(account_id: &str, scheduled_for: Option<i64>) -> Post {
        let mut post = Post::new(
            "user-1".to_string(),
            account_id.to_string(),
            "hello".to_string(),
            vec![],
            None,
        );
        if let Some(ts) = scheduled_for {
            post.status = PostStatus::Scheduled;
            post.scheduled_for = Some(ts);
        }
        post
    }

    #[tokio::test]
    async fn test_account_upsert_preserves_id_on_reconnect() {
        let db = test_db().await;

        let first = test_account("user-1", "discord", "guild-1");
        let stored = db.upsert_account(&first).await.unwrap();
        assert_eq!(stored.id, first.id);

        // Same (user, platform, platform_id) with a fresh row id: reconnect
        let mut second = test_account("user-1", "discord", "guild-1");
        second.access_token = "rotated-token".to_string();
        let stored = db.upsert_account(&second).await.unwrap();

        assert_eq!(stored.id, first.id, "upsert keeps the original row id");
        assert_eq!(stored.access_token, "rotated-token");

        let accounts = db.list_accounts("user-1").await.unwrap();
        assert_eq!(accounts.len(), 1);
    }

    #[tokio::test]
    async fn test_account_upsert_reactivates() {
        let db = test_db().await;

        let account = db
            .upsert_account(&test_account("user-1", "discord", "guild-1"))
            .await
            .unwrap();
        assert!(db.deactivate_account(&account.id).await.unwrap());

        let fetched = db.get_account(&account.id).await.unwrap().unwrap();
        assert!(!fetched.is_active);

        db.upsert_account(&test_account("user-1", "discord", "guild-1"))
            .await
            .unwrap();
        let fetched = db.get_account(&account.id).await.unwrap().unwrap();
        assert!(fetched.is_active, "reconnect reactivates the account");
    }

    #[tokio::test]
    async fn test_account_metadata_round_trip() {
        let db = test_db().await;

        let mut account = test_account("user-1", "discord", "guild-1");
        account.metadata = Some(serde_json::json!({
            "channelId": "123",
            "guildName": "My Server"
        }));

        let stored = db.upsert_account(&account).await.unwrap();
        assert_eq!(stored.discord_channel_id(), Some("123"));
        assert_eq!(stored.metadata_str("guildName"), Some("My Server"));
    }

    #[tokio::test]
    async fn test_update_account_tokens() {
        let db = test_db().await;

        let account = db
            .upsert_account(&test_account("user-1", "youtube", "chan-1"))
            .await
            .unwrap();

        db.update_account_tokens(&account.id, "fresh-token", Some(1_900_000_000))
            .await
            .unwrap();

        let fetched = db.get_account(&account.id).await.unwrap().unwrap();
        assert_eq!(fetched.access_token, "fresh-token");
        assert_eq!(fetched.token_expiry, Some(1_900_000_000));
    }

    #[tokio::test]
    async fn test_post_round_trip_with_media() {
        let db = test_db().await;
        let account = db
            .upsert_account(&test_account("user-1", "discord", "guild-1"))
            .await
            .unwrap();

        let mut post = test_post(&account.id, None);
        post.media_urls = vec!["/uploads/a.png".to_string(), "/uploads/b.png".to_string()];
        db.create_post(&post).await.unwrap();

        let fetched = db.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(fetched.media_urls, post.media_urls);
        assert_eq!(fetched.status, PostStatus::Draft);
    }

    #[tokio::test]
    async fn test_claim_due_posts_flips_status() {
        let db = test_db().await;
        let account = db
            .upsert_account(&test_account("user-1", "discord", "guild-1"))
            .await
            .unwrap();

        let now = Utc::now().timestamp();
        let due = test_post(&account.id, Some(now - 60));
        let future = test_post(&account.id, Some(now + 3600));
        db.create_post(&due).await.unwrap();
        db.create_post(&future).await.unwrap();

        let claimed = db.claim_due_posts(now).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].id, due.id);
        assert_eq!(claimed[0].status, PostStatus::Publishing);

        // A second claim finds nothing: the row is stamped
        let claimed_again = db.claim_due_posts(now).await.unwrap();
        assert!(claimed_again.is_empty());

        let fetched = db.get_post(&future.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, PostStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_mark_published_and_failed_are_exclusive() {
        let db = test_db().await;
        let account = db
            .upsert_account(&test_account("user-1", "discord", "guild-1"))
            .await
            .unwrap();

        let post = test_post(&account.id, None);
        db.create_post(&post).await.unwrap();

        db.mark_failed(&post.id, "upstream 500").await.unwrap();
        let fetched = db.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, PostStatus::Failed);
        assert_eq!(fetched.error_message.as_deref(), Some("upstream 500"));
        assert!(fetched.platform_post_id.is_none());

        db.mark_published(&post.id, "msg-1", Utc::now().timestamp())
            .await
            .unwrap();
        let fetched = db.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, PostStatus::Published);
        assert_eq!(fetched.platform_post_id.as_deref(), Some("msg-1"));
        assert!(fetched.error_message.is_none());
    }

    #[tokio::test]
    async fn test_list_posts_status_filter_and_pagination() {
        let db = test_db().await;
        let account = db
            .upsert_account(&test_account("user-1", "discord", "guild-1"))
            .await
            .unwrap();

        let now = Utc::now().timestamp();
        for i in 0..5 {
            db.create_post(&test_post(&account.id, Some(now + i * 60)))
                .await
                .unwrap();
        }
        db.create_post(&test_post(&account.id, None)).await.unwrap();

        let scheduled = db
            .list_posts("user-1", Some(PostStatus::Scheduled), 10, 0)
            .await
            .unwrap();
        assert_eq!(scheduled.len(), 5);

        let page = db
            .list_posts("user-1", Some(PostStatus::Scheduled), 2, 2)
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].scheduled_for, Some(now + 120));

        let all = db.list_posts("user-1", None, 100, 0).await.unwrap();
        assert_eq!(all.len(), 6);
    }

    #[tokio::test]
    async fn test_cancel_only_affects_scheduled() {
        let db = test_db().await;
        let account = db
            .upsert_account(&test_account("user-1", "discord", "guild-1"))
            .await
            .unwrap();

        let scheduled = test_post(&account.id, Some(Utc::now().timestamp() + 3600));
        db.create_post(&scheduled).await.unwrap();
        assert!(db.cancel_scheduled_post(&scheduled.id).await.unwrap());
        assert!(db.get_post(&scheduled.id).await.unwrap().is_none());

        let draft = test_post(&account.id, None);
        db.create_post(&draft).await.unwrap();
        assert!(!db.cancel_scheduled_post(&draft.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_requeue_failed_post() {
        let db = test_db().await;
        let account = db
            .upsert_account(&test_account("user-1", "discord", "guild-1"))
            .await
            .unwrap();

        let post = test_post(&account.id, None);
        db.create_post(&post).await.unwrap();
        db.mark_failed(&post.id, "boom").await.unwrap();

        let later = Utc::now().timestamp() + 600;
        assert!(db.requeue_post(&post.id, later).await.unwrap());

        let fetched = db.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, PostStatus::Scheduled);
        assert_eq!(fetched.scheduled_for, Some(later));
        assert!(fetched.error_message.is_none());

        // Published posts cannot be requeued
        db.mark_published(&post.id, "id-1", Utc::now().timestamp())
            .await
            .unwrap();
        assert!(!db.requeue_post(&post.id, later).await.unwrap());
    }

    #[tokio::test]
    async fn test_requeue_claimed_post() {
        let db = test_db().await;
        let account = db
            .upsert_account(&test_account("user-1", "discord", "guild-1"))
            .await
            .unwrap();

        let due = Utc::now().timestamp() - 60;
        let post = test_post(&account.id, Some(due));
        db.create_post(&post).await.unwrap();
        assert_eq!(db.claim_due_posts(Utc::now().timestamp()).await.unwrap().len(), 1);

        // The claim stamp is not a dead end: requeue accepts it
        let later = Utc::now().timestamp() + 600;
        assert!(db.requeue_post(&post.id, later).await.unwrap());

        let fetched = db.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, PostStatus::Scheduled);
        assert_eq!(fetched.scheduled_for, Some(later));
    }

    #[tokio::test]
    async fn test_queue_stats() {
        let db = test_db().await;
        let account = db
            .upsert_account(&test_account("user-1", "discord", "guild-1"))
            .await
            .unwrap();

        let now = Utc::now().timestamp();
        db.create_post(&test_post(&account.id, Some(now + 60)))
            .await
            .unwrap();
        db.create_post(&test_post(&account.id, Some(now + 120)))
            .await
            .unwrap();
        let failed = test_post(&account.id, None);
        db.create_post(&failed).await.unwrap();
        db.mark_failed(&failed.id, "boom").await.unwrap();

        let stats = db.queue_stats("user-1").await.unwrap();
        assert_eq!(stats.scheduled, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.published, 0);
    }
}
