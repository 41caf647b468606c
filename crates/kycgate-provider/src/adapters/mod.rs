pub mod http;
pub mod sandbox;

use std::sync::Arc;

use kycgate_core::{ConfigError, Environment, ProviderConfig, ProviderMode};

use crate::traits::VerificationProvider;

/// Build the adapter selected by `config.mode`.
pub fn build_provider(
    config: &ProviderConfig,
    environment: Environment,
) -> Result<Arc<dyn VerificationProvider>, ConfigError> {
    match config.mode {
        ProviderMode::Http => {
            let provider = http::HttpProvider::new(config, environment)?;
            tracing::info!(
                base_url = %config.base_url,
                max_concurrent = config.max_concurrent_requests,
                timeout_secs = config.timeout_secs,
                "verification provider: http"
            );
            Ok(Arc::new(provider))
        }
        ProviderMode::Sandbox => {
            if environment.is_production() {
                tracing::warn!("sandbox verification provider selected in production");
            }
            tracing::info!("verification provider: sandbox");
            Ok(Arc::new(sandbox::SandboxProvider::new()))
        }
    }
}
