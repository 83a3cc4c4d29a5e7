//! Configuration management for Glyphgate.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{GlyphgateError, Result};
use crate::ratelimit::RateLimitPolicy;

/// Prefix for environment variable overrides, e.g. `GLYPHGATE__SERVER__HTTP_ADDR`.
const ENV_PREFIX: &str = "GLYPHGATE";

/// Main configuration for the Glyphgate service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlyphgateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Contact intake configuration
    #[serde(default)]
    pub contact: ContactConfig,

    /// OCR configuration
    #[serde(default)]
    pub ocr: OcrConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

/// Rate limiting configuration for the contact endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Requests admitted per client within one window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// How often expired client windows are swept, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_ms: default_window_ms(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_max_requests() -> u32 {
    3
}

fn default_window_ms() -> u64 {
    60 * 60 * 1000
}

fn default_sweep_interval() -> u64 {
    10 * 60
}

impl RateLimitingConfig {
    /// The admission policy described by this configuration.
    pub fn policy(&self) -> RateLimitPolicy {
        RateLimitPolicy::new(self.max_requests, Duration::from_millis(self.window_ms))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Contact intake configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactConfig {
    /// Address submissions are meant for
    #[serde(default = "default_recipient")]
    pub recipient: String,

    /// Maximum length of any sanitized field, in characters
    #[serde(default = "default_max_field_len")]
    pub max_field_len: usize,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            recipient: default_recipient(),
            max_field_len: default_max_field_len(),
        }
    }
}

fn default_recipient() -> String {
    "mail@imagetotext.net".to_string()
}

fn default_max_field_len() -> usize {
    5000
}

/// OCR configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Language used when none is given on the command line
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Path to the tesseract executable
    #[serde(default = "default_tesseract_path")]
    pub tesseract_path: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            default_language: default_language(),
            tesseract_path: default_tesseract_path(),
        }
    }
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_tesseract_path() -> String {
    "tesseract".to_string()
}

impl GlyphgateConfig {
    /// Load configuration from an optional YAML file, then apply
    /// `GLYPHGATE__*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            info!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Yaml)
                    .required(true),
            );
        }

        let config: GlyphgateConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: GlyphgateConfig = serde_yaml::from_str(yaml)
            .map_err(|e| GlyphgateError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the limiter cannot meaningfully enforce.
    pub fn validate(&self) -> Result<()> {
        let rl = &self.rate_limiting;
        if rl.max_requests == 0 {
            return Err(GlyphgateError::Config(
                "rate_limiting.max_requests must be at least 1".to_string(),
            ));
        }
        if rl.window_ms == 0 {
            return Err(GlyphgateError::Config(
                "rate_limiting.window_ms must be at least 1".to_string(),
            ));
        }
        if rl.sweep_interval_secs == 0 {
            return Err(GlyphgateError::Config(
                "rate_limiting.sweep_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_contact_policy() {
        let config = GlyphgateConfig::default();
        assert_eq!(config.rate_limiting.max_requests, 3);
        assert_eq!(config.rate_limiting.window_ms, 3_600_000);
        assert_eq!(config.rate_limiting.sweep_interval(), Duration::from_secs(600));
        assert_eq!(config.server.http_addr.port(), 3000);
        assert_eq!(config.ocr.default_language, "eng");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
rate_limiting:
  max_requests: 10
contact:
  recipient: hello@example.com
"#;
        let config = GlyphgateConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.rate_limiting.max_requests, 10);
        assert_eq!(config.rate_limiting.window_ms, 3_600_000);
        assert_eq!(config.contact.recipient, "hello@example.com");
        assert_eq!(config.contact.max_field_len, 5000);
    }

    #[test]
    fn test_policy_from_config() {
        let config = RateLimitingConfig {
            max_requests: 5,
            window_ms: 1500,
            sweep_interval_secs: 1,
        };
        let policy = config.policy();
        assert_eq!(policy.max_requests, 5);
        assert_eq!(policy.window, Duration::from_millis(1500));
    }

    #[test]
    fn test_zero_limit_rejected() {
        let yaml = r#"
rate_limiting:
  max_requests: 0
"#;
        let err = GlyphgateConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, GlyphgateError::Config(_)));
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = GlyphgateConfig::default();
        config.rate_limiting.window_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        let err = GlyphgateConfig::from_yaml("server: [not, a, map").unwrap_err();
        assert!(matches!(err, GlyphgateError::Config(_)));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = GlyphgateConfig::load(None).unwrap();
        assert!(config.rate_limiting.max_requests >= 1);
    }
}
