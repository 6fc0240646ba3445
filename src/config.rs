use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path:?}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path:?}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    pub api_host: String,
    pub api_token: String,
    pub request_timeout_secs: u64,
    pub max_concurrent_checks: usize,
    pub log_dir: Option<String>,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialProvisionConfig {
    api_host: Option<String>,
    api_token: Option<String>,
    request_timeout_secs: Option<u64>,
    max_concurrent_checks: Option<usize>,
    log_dir: Option<String>,
}

fn default_api_host() -> String {
    "http://localhost:8080".to_string()
}

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CONCURRENT_CHECKS: usize = 1;

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(None),
    }
}

impl PartialProvisionConfig {
    fn from_file(path_str: &str) -> Result<Self, ConfigError> {
        let path = Path::new(path_str);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path_str.to_string(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path_str.to_string(),
            source,
        })
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            api_host: lookup("API_HOST"),
            api_token: lookup("API_TOKEN"),
            request_timeout_secs: parse_var(&lookup, "PROVISION_REQUEST_TIMEOUT_SECS")?,
            max_concurrent_checks: parse_var(&lookup, "PROVISION_MAX_CONCURRENT_CHECKS")?,
            log_dir: lookup("PROVISION_LOG_DIR"),
        })
    }
}

impl ProvisionConfig {
    /// Loads configuration: environment overrides the optional TOML file,
    /// which overrides built-in defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::load_with(config_path, |key| env::var(key).ok())
    }

    pub fn load_with(
        config_path: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        // 1. Load from file (optional)
        let file_config = match config_path {
            Some(path) => PartialProvisionConfig::from_file(path)?,
            None => PartialProvisionConfig::default(),
        };

        // 2. Load from environment variables
        let env_config = PartialProvisionConfig::from_lookup(lookup)?;

        // 3. Merge: environment overrides file
        Ok(ProvisionConfig {
            api_host: env_config
                .api_host
                .or(file_config.api_host)
                .unwrap_or_else(default_api_host),
            api_token: env_config
                .api_token
                .or(file_config.api_token)
                .unwrap_or_default(),
            request_timeout_secs: env_config
                .request_timeout_secs
                .or(file_config.request_timeout_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_concurrent_checks: env_config
                .max_concurrent_checks
                .or(file_config.max_concurrent_checks)
                .unwrap_or(DEFAULT_MAX_CONCURRENT_CHECKS)
                .max(1),
            log_dir: env_config.log_dir.or(file_config.log_dir),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}
