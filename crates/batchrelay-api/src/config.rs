//! Environment configuration for the trigger service.
//!
//! Configuration is environment-sourced only: defaults first, then plain
//! (unprefixed) environment variables, e.g. `BATCH_SIZE=25`. The loaded
//! value is validated eagerly — a missing required value aborts startup
//! before the process serves any traffic.

use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

/// Immutable service configuration, constructed once at startup and
/// threaded explicitly into every component that needs it.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AppConfig {
    /// Record store project identifier. Required.
    #[serde(default)]
    pub record_store_project_id: String,

    /// Outbound dispatch topic. Required.
    #[serde(default)]
    pub dispatch_topic_id: String,

    /// Audience this service expects bearer tokens to be addressed to.
    /// Required; tokens minted for other services are rejected.
    #[serde(default)]
    pub expected_audience: String,

    /// Work-item collection name within the record store.
    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// Items claimed per transaction.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Per-request cap across all batches of one trigger invocation.
    #[serde(default = "default_max_documents")]
    pub max_documents_per_request: usize,

    /// HS256 shared secret for token verification. One of this or
    /// `jwt_jwks_url` is required.
    #[serde(default)]
    pub jwt_hs256_secret: Option<String>,

    /// JWKS endpoint for asymmetric token verification.
    #[serde(default)]
    pub jwt_jwks_url: Option<String>,

    /// Optional issuer pin; when set, tokens must carry this `iss`.
    #[serde(default)]
    pub jwt_issuer: Option<String>,

    /// Bind host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Use JSON log format (true for production, false for development).
    #[serde(default)]
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            record_store_project_id: String::new(),
            dispatch_topic_id: String::new(),
            expected_audience: String::new(),
            collection_name: default_collection_name(),
            batch_size: default_batch_size(),
            max_documents_per_request: default_max_documents(),
            jwt_hs256_secret: None,
            jwt_jwks_url: None,
            jwt_issuer: None,
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

fn default_collection_name() -> String {
    "staging_articles".to_string()
}

fn default_batch_size() -> usize {
    50
}

fn default_max_documents() -> usize {
    500
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl AppConfig {
    /// Loads configuration from environment variables over defaults.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(Environment::default())
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Validates the configuration, rejecting anything the process cannot
    /// safely serve traffic with.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        let required = [
            ("RECORD_STORE_PROJECT_ID", &self.record_store_project_id),
            ("DISPATCH_TOPIC_ID", &self.dispatch_topic_id),
            ("EXPECTED_AUDIENCE", &self.expected_audience),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigLoadError::Invalid {
                    message: format!("{name} is required"),
                });
            }
        }

        if self.jwt_hs256_secret.as_deref().map_or(true, str::is_empty)
            && self.jwt_jwks_url.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigLoadError::Invalid {
                message: "a token key source is required: set JWT_HS256_SECRET or JWT_JWKS_URL"
                    .to_string(),
            });
        }

        if self.batch_size == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "BATCH_SIZE must be greater than 0".to_string(),
            });
        }

        if self.max_documents_per_request == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "MAX_DOCUMENTS_PER_REQUEST must be greater than 0".to_string(),
            });
        }

        if self.port == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "PORT must be greater than 0".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "LOG_LEVEL must be one of: {:?}, got: {}",
                    valid_levels, self.log_level
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn set_required_env() {
        std::env::set_var("RECORD_STORE_PROJECT_ID", "proj-test");
        std::env::set_var("DISPATCH_TOPIC_ID", "topic-test");
        std::env::set_var("EXPECTED_AUDIENCE", "https://trigger.example.com");
        std::env::set_var("JWT_HS256_SECRET", "test-secret");
    }

    fn clear_env() {
        for name in [
            "RECORD_STORE_PROJECT_ID",
            "DISPATCH_TOPIC_ID",
            "EXPECTED_AUDIENCE",
            "JWT_HS256_SECRET",
            "BATCH_SIZE",
            "MAX_DOCUMENTS_PER_REQUEST",
            "COLLECTION_NAME",
            "LOG_LEVEL",
        ] {
            std::env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_applies_defaults() {
        clear_env();
        set_required_env();

        let config = AppConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.record_store_project_id, "proj-test");
        assert_eq!(config.collection_name, "staging_articles");
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.max_documents_per_request, 500);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_level, "info");
        assert!(!config.log_json);
    }

    #[test]
    #[serial]
    fn test_env_overrides_defaults() {
        clear_env();
        set_required_env();
        std::env::set_var("BATCH_SIZE", "25");
        std::env::set_var("COLLECTION_NAME", "inbox");
        std::env::set_var("LOG_LEVEL", "debug");

        let config = AppConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.batch_size, 25);
        assert_eq!(config.collection_name, "inbox");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    #[serial]
    fn test_missing_required_value_refuses_to_start() {
        clear_env();
        set_required_env();
        std::env::remove_var("DISPATCH_TOPIC_ID");

        let result = AppConfig::from_env();
        clear_env();

        let err = result.unwrap_err();
        assert!(matches!(err, ConfigLoadError::Invalid { .. }));
        assert!(err.to_string().contains("DISPATCH_TOPIC_ID"));
    }

    #[test]
    #[serial]
    fn test_missing_key_source_is_rejected() {
        clear_env();
        set_required_env();
        std::env::remove_var("JWT_HS256_SECRET");

        let result = AppConfig::from_env();
        clear_env();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("JWT_HS256_SECRET"));
    }

    #[test]
    fn test_validation_rejects_zero_sizes() {
        let mut config = AppConfig {
            record_store_project_id: "p".into(),
            dispatch_topic_id: "t".into(),
            expected_audience: "a".into(),
            jwt_hs256_secret: Some("s".into()),
            ..AppConfig::default()
        };
        assert!(config.validate().is_ok());

        config.batch_size = 0;
        assert!(config.validate().is_err());

        config.batch_size = 50;
        config.max_documents_per_request = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_unknown_log_level() {
        let config = AppConfig {
            record_store_project_id: "p".into(),
            dispatch_topic_id: "t".into(),
            expected_audience: "a".into(),
            jwt_hs256_secret: Some("s".into()),
            log_level: "loud".into(),
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("LOG_LEVEL"));
    }
}
