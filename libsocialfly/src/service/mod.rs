//! Service layer for SocialFly
//!
//! A thin facade over the store, registry, and dispatcher so every binary
//! consumes the same business logic. `SocialFlyService` wires the pieces
//! together from configuration; the sub-services own the operations:
//!
//! - `PostService`: create, list, cancel, and reschedule posts
//! - `AccountService`: connect, list, and disconnect platform accounts

pub mod accounts;
pub mod posts;

use std::sync::Arc;

use self::accounts::AccountService;
use self::posts::PostService;
use crate::db::Database;
use crate::dispatcher::Dispatcher;
use crate::platforms::PlatformRegistry;
use crate::scheduler::SchedulerPoller;
use crate::{Config, Result};

pub struct SocialFlyService {
    config: Arc<Config>,
    db: Database,
    dispatcher: Dispatcher,
    posts: PostService,
    accounts: AccountService,
}

impl SocialFlyService {
    /// Load configuration from the default location and connect.
    pub async fn new() -> Result<Self> {
        let config = Config::load()?;
        Self::with_config(config).await
    }

    /// Connect with explicit configuration.
    pub async fn with_config(config: Config) -> Result<Self> {
        let db = Database::new(&config.database.path).await?;
        let registry = PlatformRegistry::from_config(&config);
        Self::assemble(config, db, registry)
    }

    /// Wire the service over an existing store and registry. Tests use this
    /// with in-memory databases and mock clients.
    pub fn assemble(config: Config, db: Database, registry: PlatformRegistry) -> Result<Self> {
        let config = Arc::new(config);
        let dispatcher = Dispatcher::new(db.clone(), registry);
        let posts = PostService::new(db.clone(), dispatcher.clone());
        let accounts = AccountService::new(db.clone());

        Ok(Self {
            config,
            db,
            dispatcher,
            posts,
            accounts,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn posts(&self) -> &PostService {
        &self.posts
    }

    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Build the poller that drives scheduled publishing.
    pub fn scheduler(&self) -> SchedulerPoller {
        SchedulerPoller::new(self.db.clone(), self.dispatcher.clone())
    }
}
