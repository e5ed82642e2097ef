//! Account operations
//!
//! Connecting an account is an upsert keyed on (user, platform, platform id):
//! reconnecting refreshes credentials in place. Disconnecting deactivates the
//! row so published posts keep their account reference.

use tracing::info;

use crate::db::Database;
use crate::error::{Result, SocialFlyError};
use crate::types::Account;

#[derive(Clone)]
pub struct AccountService {
    db: Database,
}

/// Request to connect (or reconnect) a platform account
#[derive(Debug, Clone)]
pub struct ConnectAccountRequest {
    pub user_id: String,
    pub platform: String,
    pub platform_id: String,
    pub account_name: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_expiry: Option<i64>,
    pub metadata: Option<serde_json::Value>,
}

impl AccountService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Connect a platform account, refreshing credentials on reconnect.
    pub async fn connect(&self, request: ConnectAccountRequest) -> Result<Account> {
        if request.platform.trim().is_empty() {
            return Err(SocialFlyError::InvalidInput(
                "Platform cannot be empty".to_string(),
            ));
        }
        if request.access_token.trim().is_empty() {
            return Err(SocialFlyError::InvalidInput(
                "Access token cannot be empty".to_string(),
            ));
        }

        let mut account = Account::new(
            request.user_id,
            request.platform,
            request.platform_id,
            request.account_name,
            request.access_token,
        );
        account.refresh_token = request.refresh_token;
        account.token_expiry = request.token_expiry;
        account.metadata = request.metadata;

        let stored = self.db.upsert_account(&account).await?;
        info!(
            account_id = %stored.id,
            platform = %stored.platform,
            name = %stored.account_name,
            "account connected"
        );
        Ok(stored)
    }

    pub async fn get(&self, account_id: &str) -> Result<Option<Account>> {
        self.db.get_account(account_id).await
    }

    /// All of a user's accounts, active first.
    pub async fn list(&self, user_id: &str) -> Result<Vec<Account>> {
        self.db.list_accounts(user_id).await
    }

    /// Disconnect an account. The row is deactivated, not deleted.
    pub async fn disconnect(&self, account_id: &str) -> Result<()> {
        if self.db.deactivate_account(account_id).await? {
            info!(account_id = %account_id, "account disconnected");
            Ok(())
        } else {
            Err(SocialFlyError::InvalidInput(format!(
                "Account {} not found",
                account_id
            )))
        }
    }
}
