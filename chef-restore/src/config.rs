//! Configuration management for the restore tool.
//!
//! Loads configuration from an optional TOML file with `CHEF_RESTORE__*`
//! environment variable overrides (`CHEF_RESTORE__RESTORE__CONCURRENCY=4`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub restore: RestoreConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Chef server URL, including the organization path when there is one
    #[serde(default = "default_server_url")]
    pub url: String,

    /// Server root for requests outside any organization (user creation).
    /// Defaults to `url` without its `/organizations/<org>` suffix.
    #[serde(default)]
    pub root_url: Option<String>,

    /// Client name sent as the request user id
    #[serde(default = "default_client_name")]
    pub client_name: String,

    /// Pre-shared bearer token
    #[serde(default)]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Value of the X-Chef-Version header
    #[serde(default = "default_chef_version")]
    pub chef_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreConfig {
    /// Directory holding the backup to restore
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// Number of concurrent restore jobs per component
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Keep going when a cookbook has unparseable metadata
    #[serde(default)]
    pub ignore_metadata_errors: bool,

    /// Password given to every restored user
    #[serde(default = "default_user_password")]
    pub user_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values
fn default_server_url() -> String {
    "https://localhost".to_string()
}

fn default_client_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "chef-restore".to_string())
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_chef_version() -> String {
    "12.0.0".to_string()
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from(".chef").join("chef_server_backup")
}

fn default_concurrency() -> usize {
    1
}

fn default_user_password() -> String {
    "12345678".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            root_url: None,
            client_name: default_client_name(),
            token: None,
            timeout_secs: default_timeout_secs(),
            chef_version: default_chef_version(),
        }
    }
}

impl ServerConfig {
    /// The configured root URL, or `url` with its organization path removed
    pub fn root_url(&self) -> String {
        if let Some(root) = self.root_url.as_deref().filter(|r| !r.is_empty()) {
            return root.trim_end_matches('/').to_string();
        }

        let url = self.url.trim_end_matches('/');
        match url.rsplit_once("/organizations/") {
            Some((root, org)) if !org.is_empty() && !org.contains('/') => root.to_string(),
            _ => url.to_string(),
        }
    }
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            backup_dir: default_backup_dir(),
            concurrency: default_concurrency(),
            ignore_metadata_errors: false,
            user_password: default_user_password(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file plus the environment
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("CHEF_RESTORE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
