//! Configuration management for the iServe CLI and SDK

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{IserveError, Result};

/// Storage key for the persisted user session
pub const USER_STORAGE_KEY: &str = "user-storage";
/// Storage key for the persisted demand/response dataset
pub const DEMAND_STORAGE_KEY: &str = "demand-storage";

/// CLI-level configuration persisted as JSON in the user's config directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub endpoint: String,
    pub timeout: u64,
    pub verbose: bool,
    pub storage_dir: PathBuf,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/api".to_string(),
            timeout: 10,
            verbose: false,
            storage_dir: default_storage_dir(),
        }
    }
}

impl CliConfig {
    pub async fn load(config_path: Option<&Path>) -> Result<Self> {
        let config_file = match config_path {
            Some(path) => path.to_path_buf(),
            None => default_config_path(),
        };

        if config_file.exists() {
            let content = fs::read_to_string(&config_file).await?;

            match serde_json::from_str::<Self>(&content) {
                Ok(config) => Ok(config),
                Err(_) => {
                    let config = Self::default();
                    config.save(&config_file).await?;
                    Ok(config)
                }
            }
        } else {
            let config = Self::default();
            config.save(&config_file).await?;
            Ok(config)
        }
    }

    pub async fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, content).await?;
        Ok(())
    }

    /// Build the SDK client configuration from this CLI configuration
    pub fn to_client_config(&self) -> ClientConfig {
        let normalized_endpoint = if self.endpoint.ends_with("/api") {
            self.endpoint.clone()
        } else if self.endpoint.ends_with('/') {
            format!("{}api", self.endpoint)
        } else {
            format!("{}/api", self.endpoint)
        };

        let use_proxy = !normalized_endpoint.contains("localhost")
            && !normalized_endpoint.contains("127.0.0.1");

        ClientConfigBuilder::new()
            .base_url(&normalized_endpoint)
            .timeout(self.timeout)
            .verbose(self.verbose)
            .use_proxy(use_proxy)
            .storage(StorageConfig {
                dir: self.storage_dir.clone(),
            })
            .build()
            .unwrap_or_else(|_| ClientConfig::default())
    }
}

pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("iserve")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.json")
}

pub fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("iserve")
}

/// Durable client storage location
///
/// Session state and the offline dataset live here as one JSON file per
/// storage key.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
        }
    }
}

impl StorageConfig {
    /// Path of the JSON file backing a storage key
    pub fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    pub fn session_path(&self) -> PathBuf {
        self.key_path(USER_STORAGE_KEY)
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.key_path(DEMAND_STORAGE_KEY)
    }
}

/// Client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default = "default_use_proxy")]
    pub use_proxy: bool,
}

fn default_timeout() -> u64 {
    10
}

fn default_use_proxy() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout: default_timeout(),
            verbose: false,
            storage: StorageConfig::default(),
            use_proxy: default_use_proxy(),
        }
    }
}

/// Builder for ClientConfig
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    timeout: Option<u64>,
    verbose: Option<bool>,
    storage: Option<StorageConfig>,
    config_file: Option<PathBuf>,
    use_proxy: Option<bool>,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    pub fn use_proxy(mut self, use_proxy: bool) -> Self {
        self.use_proxy = Some(use_proxy);
        self
    }

    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn build(self) -> Result<ClientConfig> {
        let mut config = ClientConfig::from_file_and_env(self.config_file.as_deref())?;

        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(verbose) = self.verbose {
            config.verbose = verbose;
        }
        if let Some(storage) = self.storage {
            config.storage = storage;
        }
        if let Some(use_proxy) = self.use_proxy {
            config.use_proxy = use_proxy;
        }

        config.validate()?;
        Ok(config)
    }
}

impl ClientConfig {
    pub fn new() -> Result<Self> {
        Self::from_file_and_env::<&str>(None)
    }

    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Layer defaults, an optional config file, and `ISERVE_*` environment
    /// variables into a client configuration
    pub fn from_file_and_env<P: AsRef<Path>>(config_file: Option<P>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("base_url", "http://localhost:8080/api")?
            .set_default("timeout", 10)?
            .set_default("verbose", false)?
            .set_default("use_proxy", true)?
            .set_default(
                "storage.dir",
                default_storage_dir().to_string_lossy().to_string(),
            )?;

        if let Some(config_path) = config_file {
            if config_path.as_ref().exists() {
                builder = builder.add_source(File::from(config_path.as_ref()));
            }
        }
        builder = builder.add_source(
            Environment::with_prefix("ISERVE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(IserveError::invalid_input("Base URL cannot be empty"));
        }
        Ok(())
    }

    /// Resolve an endpoint path against the configured base URL
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        let endpoint = endpoint.strip_prefix('/').unwrap_or(endpoint);
        let base_url = if self.base_url.starts_with("http://") || self.base_url.starts_with("https://")
        {
            self.base_url.clone()
        } else {
            format!("http://{}", self.base_url)
        };

        format!("{}/{}", base_url.trim_end_matches('/'), endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_joins_cleanly() {
        let config = ClientConfig {
            base_url: "http://localhost:8080/api/".to_string(),
            ..ClientConfig::default()
        };
        assert_eq!(
            config.endpoint_url("/auth/login"),
            "http://localhost:8080/api/auth/login"
        );
        assert_eq!(
            config.endpoint_url("demands/1/file"),
            "http://localhost:8080/api/demands/1/file"
        );
    }

    #[test]
    fn endpoint_url_defaults_scheme() {
        let config = ClientConfig {
            base_url: "iserve.example.org/api".to_string(),
            ..ClientConfig::default()
        };
        assert_eq!(
            config.endpoint_url("statistics/demand/creation/monthly"),
            "http://iserve.example.org/api/statistics/demand/creation/monthly"
        );
    }

    #[test]
    fn cli_config_normalizes_api_suffix() {
        let cli = CliConfig {
            endpoint: "http://localhost:8080".to_string(),
            ..CliConfig::default()
        };
        let client = cli.to_client_config();
        assert_eq!(client.base_url, "http://localhost:8080/api");
        assert!(!client.use_proxy);
    }

    #[test]
    fn storage_paths_use_fixed_keys() {
        let storage = StorageConfig {
            dir: PathBuf::from("/tmp/iserve"),
        };
        assert_eq!(
            storage.session_path(),
            PathBuf::from("/tmp/iserve/user-storage.json")
        );
        assert_eq!(
            storage.dataset_path(),
            PathBuf::from("/tmp/iserve/demand-storage.json")
        );
    }
}
