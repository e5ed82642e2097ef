//! Configuration management for SocialFly

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    pub discord: Option<DiscordConfig>,
    pub facebook: Option<FacebookConfig>,
    pub linkedin: Option<LinkedInConfig>,
    pub twitter: Option<TwitterConfig>,
    pub youtube: Option<YouTubeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Where `/uploads/...` media paths resolve on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub root: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: "~/.local/share/socialfly/media".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between poller ticks.
    pub poll_interval: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { poll_interval: 60 }
    }
}

/// Discord uses one bot identity for every connected account; posting
/// authorization is the bot token, not per-account OAuth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub bot_token: String,
    #[serde(default = "default_discord_api_base")]
    pub api_base: String,
}

fn default_discord_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacebookConfig {
    pub page_id: String,
    /// Fallback page token when the account row has none.
    pub page_access_token: Option<String>,
    #[serde(default = "default_facebook_api_base")]
    pub api_base: String,
}

fn default_facebook_api_base() -> String {
    "https://graph.facebook.com/v21.0".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedInConfig {
    #[serde(default = "default_linkedin_api_base")]
    pub api_base: String,
}

impl Default for LinkedInConfig {
    fn default() -> Self {
        Self {
            api_base: default_linkedin_api_base(),
        }
    }
}

fn default_linkedin_api_base() -> String {
    "https://api.linkedin.com".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    #[serde(default = "default_twitter_api_base")]
    pub api_base: String,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            api_base: default_twitter_api_base(),
        }
    }
}

fn default_twitter_api_base() -> String {
    "https://api.twitter.com/2".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_youtube_upload_base")]
    pub upload_base: String,
    #[serde(default = "default_youtube_token_url")]
    pub token_url: String,
}

fn default_youtube_upload_base() -> String {
    "https://www.googleapis.com/upload/youtube/v3".to_string()
}

fn default_youtube_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            database: DatabaseConfig {
                path: "~/.local/share/socialfly/socialfly.db".to_string(),
            },
            media: MediaConfig::default(),
            scheduler: SchedulerConfig::default(),
            discord: None,
            facebook: None,
            linkedin: Some(LinkedInConfig::default()),
            twitter: Some(TwitterConfig::default()),
            youtube: None,
        }
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("SOCIALFLY_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("socialfly").join("config.toml"))
}

/// Resolve a media URL to a path on disk.
///
/// Remote URLs pass through as `None`; local `/uploads/...` paths resolve
/// under the configured media root.
pub fn resolve_media_path(media_root: &str, url: &str) -> Option<PathBuf> {
    if url.starts_with("http://") || url.starts_with("https://") {
        return None;
    }
    let root = shellexpand::tilde(media_root).to_string();
    Some(PathBuf::from(root).join(url.trim_start_matches('/')))
}
