//! Scheduler poller
//!
//! Periodically claims due posts and hands them to the dispatcher, one at a
//! time. Claiming flips the rows to `publishing` inside the query itself, so
//! two overlapping ticks (two daemons, or a slow tick lapping the interval)
//! split the batch instead of double-publishing it.
//!
//! The tick is best-effort: a per-post failure becomes that post's `failed`
//! status and the batch continues; an unreachable store abandons the whole
//! tick with a warning and the next tick retries.

use chrono::Utc;

use crate::db::Database;
use crate::dispatcher::Dispatcher;
use crate::types::PostStatus;

pub struct SchedulerPoller {
    db: Database,
    dispatcher: Dispatcher,
}

/// What one tick did, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub claimed: usize,
    pub published: usize,
    pub failed: usize,
}

impl SchedulerPoller {
    pub fn new(db: Database, dispatcher: Dispatcher) -> Self {
        Self { db, dispatcher }
    }

    /// Process every scheduled post that is due.
    ///
    /// Never returns an error: store unavailability is logged and the tick
    /// abandoned, to be retried on the next interval.
    pub async fn tick(&self) -> TickSummary {
        self.tick_at(Utc::now().timestamp()).await
    }

    /// Tick against an explicit clock. Tests drive time through this.
    pub async fn tick_at(&self, now: i64) -> TickSummary {
        let due = match self.db.claim_due_posts(now).await {
            Ok(due) => due,
            Err(e) => {
                tracing::warn!(error = %e, "store unreachable, abandoning tick");
                return TickSummary::default();
            }
        };

        if due.is_empty() {
            tracing::debug!("no posts due");
            return TickSummary::default();
        }

        tracing::info!(count = due.len(), "claimed due posts");

        let mut summary = TickSummary {
            claimed: due.len(),
            ..Default::default()
        };

        for post in due {
            let account = match self.db.get_account(&post.social_account_id).await {
                Ok(Some(account)) => account,
                Ok(None) => {
                    let message =
                        format!("Account {} no longer exists", post.social_account_id);
                    tracing::warn!(post_id = %post.id, "{}", message);
                    if let Err(e) = self.db.mark_failed(&post.id, &message).await {
                        tracing::warn!(post_id = %post.id, error = %e, "could not record failure");
                    }
                    summary.failed += 1;
                    continue;
                }
                Err(e) => {
                    // Claimed but unloadable; leave it publishing for an
                    // operator, keep going with the rest of the batch
                    tracing::warn!(post_id = %post.id, error = %e, "could not load account");
                    continue;
                }
            };

            match self.dispatcher.dispatch(&post, &account).await {
                Ok(updated) => match updated.status {
                    PostStatus::Published => summary.published += 1,
                    _ => summary.failed += 1,
                },
                Err(e) => {
                    tracing::warn!(post_id = %post.id, error = %e, "dispatch could not record status");
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            claimed = summary.claimed,
            published = summary.published,
            failed = summary.failed,
            "tick complete"
        );

        summary
    }
}
