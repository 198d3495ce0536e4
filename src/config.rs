use crate::rates::{cbr, CacheFile, CbrRateSource, RateCache, RateError, SystemClock};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings file picked up from the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "dutyc.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub rates: RateSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateSettings {
    /// Endpoint serving the daily rates JSON
    pub url: String,
    /// Where the last fetched snapshot is kept
    pub cache_file: PathBuf,
    /// Hours a cached snapshot stays fresh
    pub ttl_hours: u32,
    /// Timeout for the rate request
    pub timeout_seconds: u64,
}

impl Default for RateSettings {
    fn default() -> Self {
        RateSettings {
            url: cbr::DEFAULT_URL.to_string(),
            cache_file: PathBuf::from("currency_cache.json"),
            ttl_hours: 6,
            timeout_seconds: 10,
        }
    }
}

impl Settings {
    /// Load settings from an explicit file, or `dutyc.toml` if present, or defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => {
                log::debug!("No config file, using defaults");
                Ok(Settings::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let rates = &self.rates;
        let invalid = |field, reason: &str| ConfigError::Invalid {
            field,
            reason: reason.to_string(),
        };

        let url = reqwest::Url::parse(&rates.url)
            .map_err(|err| invalid("rates.url", &err.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("rates.url", "must be an http or https URL"));
        }
        if rates.cache_file.as_os_str().is_empty() {
            return Err(invalid("rates.cache_file", "cannot be empty"));
        }
        if rates.ttl_hours == 0 {
            return Err(invalid("rates.ttl_hours", "must be at least 1"));
        }
        if rates.timeout_seconds == 0 {
            return Err(invalid("rates.timeout_seconds", "must be at least 1"));
        }
        Ok(())
    }

    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.rates.ttl_hours))
    }

    /// Rate cache backed by the configured endpoint and cache file
    pub fn rate_cache(&self) -> Result<RateCache<CbrRateSource>, RateError> {
        let source = CbrRateSource::new(
            self.rates.url.clone(),
            Duration::from_secs(self.rates.timeout_seconds),
        )?;
        Ok(RateCache::new(
            source,
            CacheFile::new(&self.rates.cache_file),
            SystemClock,
            self.ttl(),
        ))
    }
}
