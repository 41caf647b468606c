//! Node configuration loading and management.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use kycgate_core::{EngineConfig, Environment, ProviderConfig};

/// Full configuration for the kycgate node.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KycgateConfig {
    /// Deployment environment (development, production).
    #[serde(default)]
    pub environment: Environment,

    /// API server settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Verification provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Orchestration engine settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Workflow state retention.
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API listen address.
    #[serde(default = "default_api_addr")]
    pub listen_addr: String,
    /// API port.
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Largest accepted request body. Bodies carry base64 images.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Seconds after the last write before a workflow record expires.
    /// Zero keeps live records forever.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Seconds a termination tombstone is kept. Applies even when
    /// `ttl_secs` is zero; the shorter of the two wins.
    #[serde(default = "default_tombstone_ttl_secs")]
    pub tombstone_ttl_secs: u64,
    /// How often the janitor purges expired records and idle locks.
    #[serde(default = "default_janitor_interval_secs")]
    pub janitor_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_api_addr() -> String {
    "127.0.0.1".into()
}
fn default_api_port() -> u16 {
    8088
}
fn default_max_body_bytes() -> usize {
    crate::state::DEFAULT_MAX_BODY_BYTES
}
fn default_ttl_secs() -> u64 {
    7 * 24 * 3600
}
fn default_tombstone_ttl_secs() -> u64 {
    24 * 3600
}
fn default_janitor_interval_secs() -> u64 {
    300
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_api_addr(),
            port: default_api_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            tombstone_ttl_secs: default_tombstone_ttl_secs(),
            janitor_interval_secs: default_janitor_interval_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl WorkflowConfig {
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }

    pub fn tombstone_ttl(&self) -> Duration {
        Duration::from_secs(self.tombstone_ttl_secs)
    }

    pub fn janitor_interval(&self) -> Duration {
        Duration::from_secs(self.janitor_interval_secs.max(1))
    }
}

impl KycgateConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: KycgateConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject combinations the node must not run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.provider.validate(self.environment)?;
        self.engine.validate()?;
        if self.api.max_body_bytes == 0 {
            anyhow::bail!("api.max_body_bytes must be greater than zero");
        }
        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!(
                "logging.format must be \"text\" or \"json\", got {:?}",
                self.logging.format
            );
        }
        Ok(())
    }

    /// API listen socket address string.
    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.api.listen_addr, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kycgate_core::{ConfigError, ProviderCredentials, ProviderMode};

    #[test]
    fn test_default_config() {
        let config = KycgateConfig::default();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.api.port, 8088);
        assert_eq!(config.provider.timeout_secs, 60);
        assert_eq!(config.engine.match_threshold, 0.8);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.api_addr(), "127.0.0.1:8088");
        assert_eq!(config.api.max_body_bytes, 20 * 1024 * 1024);
        assert_eq!(config.workflow.tombstone_ttl(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = KycgateConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let decoded: KycgateConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(decoded.api.port, config.api.port);
        assert_eq!(decoded.provider, config.provider);
        assert_eq!(decoded.engine, config.engine);
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let config = KycgateConfig::load(Path::new("/nonexistent/kycgate.toml")).unwrap();
        assert_eq!(config.api.port, 8088);
    }

    #[test]
    fn test_config_from_toml_partial() {
        let toml_str = r#"
environment = "production"

[provider]
base_url = "https://kyc.provider.example"
host_header = "kyc.provider.example"
max_concurrent_requests = 4

[provider.credentials]
type = "client_credentials"
client_id = "gate"
client_secret = "hunter2"

[api]
max_body_bytes = 8388608

[workflow]
ttl_secs = 0
"#;
        let config: KycgateConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.provider.max_concurrent_requests, 4);
        assert!(matches!(
            config.provider.credentials,
            ProviderCredentials::ClientCredentials { .. }
        ));
        assert_eq!(config.workflow.ttl(), None);
        assert_eq!(config.workflow.tombstone_ttl_secs, 24 * 3600);
        assert_eq!(config.api.max_body_bytes, 8 * 1024 * 1024);
        // Defaults for unspecified
        assert_eq!(config.provider.timeout_secs, 60);
        assert_eq!(config.api.port, 8088);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_insecure_tls_rejected_in_production() {
        let toml_str = r#"
environment = "production"

[provider]
accept_invalid_certs = true

[provider.credentials]
type = "bearer"
token = "tok"
"#;
        let config: KycgateConfig = toml::from_str(toml_str).expect("parse");
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InsecureTlsInProduction)
        ));
    }

    #[test]
    fn test_sandbox_default_validates() {
        let mut config = KycgateConfig::default();
        config.provider.mode = ProviderMode::Sandbox;
        assert!(config.validate().is_ok());
        config.logging.format = "xml".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_body_limit_rejected() {
        let mut config = KycgateConfig::default();
        config.provider.mode = ProviderMode::Sandbox;
        config.api.max_body_bytes = 0;
        assert!(config.validate().is_err());
    }
}
