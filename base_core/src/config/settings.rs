use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::storage::local::parse_permissions;

pub const DEFAULT_JWT_SECRET: &str = "change-me-change-me-change-me-0123456789";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BaseConfig {
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub storage: StorageConfig,
    #[validate(nested)]
    pub security: SecurityConfig,
    #[validate(nested)]
    pub cache: CacheConfig,
    #[validate(nested)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    pub shutdown_timeout_seconds: u64,
}

/// File storage provider selection. Permission strings are symbolic modes
/// (`rw-r--r--`) applied on Unix to written files and newly created
/// directories. `max_upload_bytes` caps the request body of an upload.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StorageConfig {
    #[validate(length(min = 1))]
    pub provider: String,
    pub base_path: PathBuf,
    pub auto_create_directories: bool,
    #[validate(length(equal = 9))]
    pub file_permissions: String,
    #[validate(length(equal = 9))]
    pub directory_permissions: String,
    pub max_list_results: i64,
    #[validate(range(min = 1))]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SecurityConfig {
    #[validate(length(min = 32, message = "JWT secret must be at least 32 characters long"))]
    pub jwt_secret: String,
    pub issuer: Option<String>,
    #[validate(range(min = 1))]
    pub expiration_seconds: i64,
    pub default_roles: Vec<String>,
    pub default_permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CacheConfig {
    #[validate(length(min = 1))]
    pub provider: String,
    #[validate(range(min = 1))]
    pub max_size: usize,
    pub default_ttl_seconds: u64,
    pub record_stats: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoggingConfig {
    #[validate(length(min = 1))]
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            security: SecurityConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 10,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            base_path: PathBuf::from("./storage"),
            auto_create_directories: true,
            file_permissions: "rw-r--r--".to_string(),
            directory_permissions: "rwxr-xr-x".to_string(),
            max_list_results: 1000,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            issuer: None,
            expiration_seconds: 3600,
            default_roles: vec!["USER".to_string()],
            default_permissions: vec!["READ".to_string()],
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            provider: "memory".to_string(),
            max_size: 1000,
            default_ttl_seconds: 3600,
            record_stats: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl BaseConfig {
    /// Loads defaults, then `config.toml` from the working directory if
    /// present, then `BASE_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("config.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&BaseConfig::default())?);

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("BASE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("security.default_roles")
                .with_list_parse_key("security.default_permissions"),
        );

        let config = builder.build()?;
        let base_config: BaseConfig = config.try_deserialize()?;

        base_config.validate_all()?;

        Ok(base_config)
    }

    pub fn validate_all(&self) -> Result<(), ConfigError> {
        self.validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;

        if self.storage.base_path.as_os_str().is_empty() {
            return Err(ConfigError::Message(
                "Storage base path cannot be empty".to_string(),
            ));
        }

        for permissions in [&self.storage.file_permissions, &self.storage.directory_permissions] {
            parse_permissions(permissions).map_err(|e| ConfigError::Message(e.to_string()))?;
        }

        if self.security.default_roles.iter().any(|r| r.trim().is_empty()) {
            return Err(ConfigError::Message(
                "Default roles cannot contain blank entries".to_string(),
            ));
        }

        if self.security.jwt_secret == DEFAULT_JWT_SECRET {
            tracing::warn!("Using default JWT secret - change this in production!");
        }

        Ok(())
    }

    pub fn create_directories(&self) -> Result<(), std::io::Error> {
        if self.storage.auto_create_directories {
            std::fs::create_dir_all(&self.storage.base_path)?;
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn shutdown_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.server.shutdown_timeout_seconds)
    }
}
