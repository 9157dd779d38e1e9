use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::domain::value_objects::QuotaLimits;
use crate::infrastructure::external_services::EmbeddingClientConfig;

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { key: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue { key, message } => {
                write!(f, "Invalid value for {}: {}", key, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub upload_dir: PathBuf,
    pub public_base_url: Url,
    /// `None` selects the in-memory metadata store.
    pub database_url: Option<String>,
    pub feed_poll_interval: Duration,
    pub embeddings: EmbeddingClientConfig,
    /// No timeout on embedding generation unless set.
    pub embedding_timeout: Option<Duration>,
    pub quota_limits: QuotaLimits,
}

impl AppConfig {
    /// Reads configuration from the process environment (and `.env` if loaded).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = EmbeddingClientConfig::default();
        let quota_defaults = QuotaLimits::default();

        let public_base_url = lookup("PUBLIC_BASE_URL")
            .unwrap_or_else(|| "http://localhost:3000/blobs/".to_string());
        // `Url::join` drops the last segment unless the base ends with a slash.
        let public_base_url = if public_base_url.ends_with('/') {
            public_base_url
        } else {
            format!("{}/", public_base_url)
        };
        let public_base_url = Url::parse(&public_base_url).map_err(|e| ConfigError::InvalidValue {
            key: "PUBLIC_BASE_URL".to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            port: parse(&lookup, "PORT", 3000)?,
            upload_dir: PathBuf::from(
                lookup("UPLOAD_DIR").unwrap_or_else(|| "./uploads".to_string()),
            ),
            public_base_url,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            feed_poll_interval: Duration::from_millis(parse(&lookup, "FEED_POLL_INTERVAL_MS", 1000)?),
            embeddings: EmbeddingClientConfig {
                service_url: lookup("EMBEDDINGS_SERVICE_URL").unwrap_or(defaults.service_url),
                max_retries: parse(&lookup, "EMBEDDINGS_MAX_RETRIES", defaults.max_retries)?,
                timeout_secs: parse(&lookup, "EMBEDDINGS_TIMEOUT_SECS", defaults.timeout_secs)?,
                backoff_factor: parse(&lookup, "EMBEDDINGS_BACKOFF_FACTOR", defaults.backoff_factor)?,
            },
            embedding_timeout: parse_optional::<u64, _>(&lookup, "EMBEDDING_TIMEOUT_SECS")?
                .map(Duration::from_secs),
            quota_limits: QuotaLimits::new(
                parse(&lookup, "QUOTA_FREE_LIMIT", quota_defaults.free)?,
                parse(&lookup, "QUOTA_PRO_LIMIT", quota_defaults.pro)?,
            ),
        })
    }
}

fn parse_optional<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
        _ => Ok(None),
    }
}

fn parse<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_optional(lookup, key)?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.quota_limits, QuotaLimits::new(2, 20));
        assert!(config.database_url.is_none());
        assert!(config.embedding_timeout.is_none());
        assert_eq!(config.public_base_url.as_str(), "http://localhost:3000/blobs/");
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("QUOTA_FREE_LIMIT", "5"),
            ("QUOTA_PRO_LIMIT", "100"),
            ("EMBEDDING_TIMEOUT_SECS", "30"),
            ("DATABASE_URL", "postgres://localhost/docs"),
            ("PUBLIC_BASE_URL", "https://cdn.example.com/files"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.quota_limits, QuotaLimits::new(5, 100));
        assert_eq!(config.embedding_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/docs"));
        assert_eq!(
            config.public_base_url.as_str(),
            "https://cdn.example.com/files/"
        );
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let error = config_from(&[("QUOTA_FREE_LIMIT", "two")]).unwrap_err();
        assert!(error.to_string().contains("QUOTA_FREE_LIMIT"));
    }
}
