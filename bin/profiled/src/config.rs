//! Command line and environment configuration.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Minimum JWT secret length (256 bits).
const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Parser)]
#[command(name = "profiled", about = "User profile service")]
pub struct Config {
    /// Path to the profile database directory
    #[arg(long, env = "DB_PATH", default_value = "./data")]
    pub db_path: PathBuf,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(long, env = "LOG_LEVEL", default_value = "INFO")]
    pub log_level: String,

    /// Use JSON log format
    #[arg(long, env = "JSON_LOGS", default_value = "false")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Create or replace a user account
    AddUser(AddUserArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Listen address
    #[arg(long, env = "HTTP_ADDRESS", default_value = "0.0.0.0:8000")]
    pub address: String,

    /// JWT secret key used to verify access tokens (min 32 chars)
    #[arg(long, env = "JWT_SECRET_KEY")]
    pub jwt_secret_key: String,

    /// Max avatar upload size in bytes (default: 1MB)
    #[arg(long, env = "MAX_AVATAR_BYTES", default_value = "1048576")]
    pub max_avatar_bytes: usize,

    /// CORS allowed origins (comma-separated, or "*" for any)
    #[arg(long, env = "CORS_ALLOW_ORIGINS", value_delimiter = ',')]
    pub cors_allow_origins: Vec<String>,

    /// Object storage backend
    #[arg(long, env = "STORAGE_BACKEND", value_enum, default_value = "local")]
    pub storage: StorageBackend,

    /// Root directory for the local storage backend
    #[arg(long, env = "LOCAL_STORAGE_ROOT", default_value = "./media")]
    pub local_storage_root: PathBuf,

    /// Public base URL for objects in the local storage backend
    #[arg(long, env = "LOCAL_STORAGE_URL", default_value = "http://localhost:8000/media")]
    pub local_storage_url: String,

    /// S3 endpoint URL (e.g., http://localhost:9000/bucket-name/)
    #[arg(long, env = "S3_URL")]
    pub s3_url: Option<String>,

    /// S3 access key ID
    #[arg(long, env = "S3_ACCESS_KEY_ID")]
    pub s3_access_key_id: Option<String>,

    /// S3 secret access key
    #[arg(long, env = "S3_SECRET_ACCESS_KEY")]
    pub s3_secret_access_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackend {
    Local,
    S3,
}

#[derive(Debug, Clone, Args)]
pub struct AddUserArgs {
    #[arg(long)]
    pub id: i64,

    /// Group id; 3 grants admin rights
    #[arg(long, default_value = "1")]
    pub group_id: i64,

    #[arg(long)]
    pub inactive: bool,

    /// Print an access token for the user, signed with this secret
    #[arg(long, env = "JWT_SECRET_KEY")]
    pub token_secret: Option<String>,

    /// Token lifetime in minutes
    #[arg(long, default_value = "60")]
    pub token_ttl_minutes: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT secret must be at least {MIN_JWT_SECRET_LEN} characters")]
    JwtSecretTooShort,
    #[error("Max avatar size must be > 0")]
    InvalidAvatarLimit,
    #[error("S3 storage requires {0}")]
    MissingS3Setting(&'static str),
}

impl Config {
    /// Parse and validate configuration.
    pub fn init() -> anyhow::Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match &self.command {
            Command::Serve(args) => args.validate(),
            Command::AddUser(_) => Ok(()),
        }
    }
}

impl ServeArgs {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret_key.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::JwtSecretTooShort);
        }
        if self.max_avatar_bytes == 0 {
            return Err(ConfigError::InvalidAvatarLimit);
        }
        if self.storage == StorageBackend::S3 {
            if self.s3_url.is_none() {
                return Err(ConfigError::MissingS3Setting("S3_URL"));
            }
            if self.s3_access_key_id.is_none() {
                return Err(ConfigError::MissingS3Setting("S3_ACCESS_KEY_ID"));
            }
            if self.s3_secret_access_key.is_none() {
                return Err(ConfigError::MissingS3Setting("S3_SECRET_ACCESS_KEY"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret_key_minimum_32_chars!";

    #[test]
    fn parses_serve_defaults() {
        let config = Config::try_parse_from(["profiled", "serve", "--jwt-secret-key", SECRET]).unwrap();

        let Command::Serve(args) = &config.command else {
            panic!("expected serve command");
        };
        assert_eq!(args.max_avatar_bytes, 1024 * 1024);
        assert_eq!(args.storage, StorageBackend::Local);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_short_secret() {
        let config = Config::try_parse_from(["profiled", "serve", "--jwt-secret-key", "short"]).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::JwtSecretTooShort)));
    }

    #[test]
    fn s3_requires_credentials() {
        let config = Config::try_parse_from([
            "profiled",
            "serve",
            "--jwt-secret-key",
            SECRET,
            "--storage",
            "s3",
            "--s3-url",
            "http://localhost:9000/media",
        ])
        .unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingS3Setting("S3_ACCESS_KEY_ID"))
        ));
    }

    #[test]
    fn splits_cors_origins() {
        let config = Config::try_parse_from([
            "profiled",
            "serve",
            "--jwt-secret-key",
            SECRET,
            "--cors-allow-origins",
            "http://a.test,http://b.test",
        ])
        .unwrap();

        let Command::Serve(args) = config.command else {
            panic!("expected serve command");
        };
        assert_eq!(args.cors_allow_origins, vec!["http://a.test", "http://b.test"]);
    }
}
