use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use zeroize::Zeroize;

use crate::types::{ChallengeType, LivenessOptions};

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("TLS certificate validation cannot be disabled in production")]
    InsecureTlsInProduction,

    #[error("provider credentials are required in {0} mode")]
    MissingCredentials(&'static str),
}

/// Deployment environment. Governs TLS relaxation and error verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Whether provider error payloads may be passed through to callers.
    pub fn verbose_errors(&self) -> bool {
        !self.is_production()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// A secret string, wiped on drop and redacted in debug output.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// How the adapter authenticates against the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderCredentials {
    /// Credential pair exchanged for a bearer token at the token endpoint.
    ClientCredentials {
        client_id: String,
        client_secret: Secret,
    },
    /// Pre-issued bearer token.
    Bearer { token: Secret },
}

impl ProviderCredentials {
    fn is_blank(&self) -> bool {
        match self {
            Self::ClientCredentials {
                client_id,
                client_secret,
            } => client_id.trim().is_empty() || client_secret.is_empty(),
            Self::Bearer { token } => token.is_empty(),
        }
    }
}

impl Default for ProviderCredentials {
    fn default() -> Self {
        Self::ClientCredentials {
            client_id: String::new(),
            client_secret: Secret::default(),
        }
    }
}

/// Which adapter implementation backs the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderMode {
    /// The real HTTPS provider.
    #[default]
    Http,
    /// Deterministic in-memory provider for local runs.
    Sandbox,
}

impl fmt::Display for ProviderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Sandbox => write!(f, "sandbox"),
        }
    }
}

/// Provider adapter configuration, passed explicitly into the adapter factory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub mode: ProviderMode,
    /// Provider base URL, e.g. `https://api.provider.example`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Fixed `Host` header sent with every request.
    #[serde(default)]
    pub host_header: Option<String>,
    #[serde(default)]
    pub credentials: ProviderCredentials,
    /// Token endpoint path, relative to `base_url`.
    #[serde(default = "default_token_path")]
    pub token_path: String,
    /// Connect/read timeout per provider call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum in-flight provider calls.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    /// Skip TLS certificate validation. Rejected in production.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_base_url() -> String {
    "https://api.verification-provider.example".into()
}
fn default_token_path() -> String {
    "/oauth/token".into()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_concurrent_requests() -> usize {
    16
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            mode: ProviderMode::default(),
            base_url: default_base_url(),
            host_header: None,
            credentials: ProviderCredentials::default(),
            token_path: default_token_path(),
            timeout_secs: default_timeout_secs(),
            max_concurrent_requests: default_max_concurrent_requests(),
            accept_invalid_certs: false,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Connection setup shares the call timeout; there is no separate cap.
    pub fn connect_timeout(&self) -> Duration {
        self.timeout()
    }

    /// Check the configuration against the deployment environment.
    pub fn validate(&self, environment: Environment) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "provider.timeout_secs",
                reason: "must be greater than zero".into(),
            });
        }
        if self.max_concurrent_requests == 0 {
            return Err(ConfigError::InvalidValue {
                field: "provider.max_concurrent_requests",
                reason: "must be greater than zero".into(),
            });
        }
        if self.mode == ProviderMode::Sandbox {
            return Ok(());
        }

        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(ConfigError::InvalidValue {
                field: "provider.base_url",
                reason: format!("expected an http(s) URL, got {}", self.base_url),
            });
        }
        if environment.is_production() {
            if self.accept_invalid_certs {
                return Err(ConfigError::InsecureTlsInProduction);
            }
            if !self.base_url.starts_with("https://") {
                return Err(ConfigError::InvalidValue {
                    field: "provider.base_url",
                    reason: "production requires https".into(),
                });
            }
        }
        if self.credentials.is_blank() {
            return Err(ConfigError::MissingCredentials("http"));
        }
        Ok(())
    }
}

/// Orchestration engine tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Similarity at or above which a comparison counts as matched, when the
    /// provider gives no explicit decision.
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,
    /// Challenge type used when liveness runs without a challenge.
    #[serde(default)]
    pub default_challenge_type: ChallengeType,
    /// Options applied to liveness calls that do not specify their own.
    #[serde(default)]
    pub default_liveness_options: LivenessOptions,
}

fn default_match_threshold() -> f64 {
    0.8
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            match_threshold: default_match_threshold(),
            default_challenge_type: ChallengeType::Passive,
            default_liveness_options: LivenessOptions::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "engine.match_threshold",
                reason: format!("{} is outside [0, 1]", self.match_threshold),
            });
        }
        Ok(())
    }
}
