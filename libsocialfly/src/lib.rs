//! SocialFly - multi-platform social media publishing
//!
//! This library provides account storage, a post queue, per-platform publish
//! adapters, and the scheduler that drains the queue. The CLI binaries are
//! thin wrappers over the service layer here.

pub mod config;
pub mod db;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod platforms;
pub mod scheduler;
pub mod scheduling;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use dispatcher::Dispatcher;
pub use error::{Result, SocialFlyError};
pub use scheduler::SchedulerPoller;
pub use types::{Account, Post, PostStatus, PublishOutcome, TokenRefresh};
