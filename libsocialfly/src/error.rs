//! Error types for SocialFly

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SocialFlyError>;

#[derive(Error, Debug)]
pub enum SocialFlyError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SocialFlyError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            SocialFlyError::InvalidInput(_) => 3,
            SocialFlyError::Platform(PlatformError::Config(_)) => 2,
            SocialFlyError::Platform(_) => 1,
            SocialFlyError::Config(_) => 1,
            SocialFlyError::Database(_) => 1,
        }
    }

    /// Whether this error stems from the store being unreachable rather than
    /// from the request itself.
    ///
    /// The scheduler swallows these and retries on the next tick; interactive
    /// callers surface them as retryable.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, SocialFlyError::Database(_))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    /// Required platform-specific configuration is missing (bot token,
    /// channel id, organization id). Never retried.
    #[error("Platform configuration missing: {0}")]
    Config(String),

    /// The upstream platform API returned a non-2xx response.
    #[error("Platform API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    /// Feature deliberately stubbed (e.g. X media posting).
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// No adapter registered for the account's platform.
    #[error("Unsupported platform: {0}")]
    Unsupported(String),
}

impl PlatformError {
    /// Build an `Api` error from an upstream response status and body.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        PlatformError::Api {
            status,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for PlatformError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => PlatformError::Api {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None => PlatformError::Network(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_input() {
        let error = SocialFlyError::InvalidInput("Empty content".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_platform_config_error() {
        let error =
            SocialFlyError::Platform(PlatformError::Config("No Discord channel".to_string()));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_api_error() {
        let error = SocialFlyError::Platform(PlatformError::api(403, "Forbidden"));
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_unsupported_platform() {
        let error = SocialFlyError::Platform(PlatformError::Unsupported("myspace".to_string()));
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_config_error() {
        let error = SocialFlyError::Config(ConfigError::MissingField("database.path".to_string()));
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_database_error() {
        let error = SocialFlyError::Database(DbError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "File not found",
        )));
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_api_error_formatting() {
        let error = PlatformError::api(400, "LinkedIn posting failed");
        assert_eq!(
            format!("{}", error),
            "Platform API error (400): LinkedIn posting failed"
        );
    }

    #[test]
    fn test_unsupported_platform_formatting() {
        let error = SocialFlyError::Platform(PlatformError::Unsupported("tiktok".to_string()));
        assert_eq!(format!("{}", error), "Platform error: Unsupported platform: tiktok");
    }

    #[test]
    fn test_store_unavailability_detection() {
        let db_error = SocialFlyError::Database(DbError::IoError(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "locked",
        )));
        assert!(db_error.is_store_unavailable());

        let platform_error = SocialFlyError::Platform(PlatformError::api(500, "upstream down"));
        assert!(!platform_error.is_store_unavailable());
    }

    #[test]
    fn test_error_conversion_from_platform_error() {
        let platform_error = PlatformError::NotImplemented("X media posting".to_string());
        let error: SocialFlyError = platform_error.into();

        match error {
            SocialFlyError::Platform(PlatformError::NotImplemented(msg)) => {
                assert!(msg.contains("X media"));
            }
            _ => panic!("Expected SocialFlyError::Platform"),
        }
    }

    #[test]
    fn test_platform_error_clone() {
        let original = PlatformError::Network("Connection failed".to_string());
        let cloned = original.clone();
        assert_eq!(format!("{}", original), format!("{}", cloned));
    }
}
