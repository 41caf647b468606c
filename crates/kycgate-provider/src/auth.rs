//! Provider authentication: static bearer token or client-credentials grant
//! with a cached access token.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::RequestBuilder;
use tokio::sync::RwLock;
use tracing::debug;

use kycgate_core::{ProviderCredentials, Secret, VerificationError};

use crate::error;
use crate::wire::TokenResponse;

/// Tokens are refreshed this long before the provider says they expire.
const EXPIRY_MARGIN_SECS: u64 = 30;

/// How long a token with the given lifetime is used. The margin never
/// exceeds a tenth of the lifetime, so short-lived tokens still get reused.
fn usable_for(expires_in: u64) -> Duration {
    Duration::from_secs(expires_in - EXPIRY_MARGIN_SECS.min(expires_in / 10))
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: Secret,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() >= exp)
    }
}

/// Supplies bearer tokens for provider requests.
///
/// Clones share the token cache.
#[derive(Debug, Clone)]
pub struct TokenSource {
    credentials: ProviderCredentials,
    token_url: String,
    host_header: Option<String>,
    timeout_secs: u64,
    cached: Arc<RwLock<Option<CachedToken>>>,
    http: reqwest::Client,
}

impl TokenSource {
    pub fn new(
        credentials: ProviderCredentials,
        token_url: String,
        host_header: Option<String>,
        timeout_secs: u64,
        http: reqwest::Client,
    ) -> Self {
        Self {
            credentials,
            token_url,
            host_header,
            timeout_secs,
            cached: Arc::new(RwLock::new(None)),
            http,
        }
    }

    /// Current bearer token, fetching a fresh one when the cache is cold.
    pub async fn bearer_token(&self) -> Result<Secret, VerificationError> {
        let (client_id, client_secret) = match &self.credentials {
            ProviderCredentials::Bearer { token } => return Ok(token.clone()),
            ProviderCredentials::ClientCredentials {
                client_id,
                client_secret,
            } => (client_id, client_secret),
        };

        {
            let cache = self.cached.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| !c.is_expired()) {
                return Ok(cached.access_token.clone());
            }
        }

        let mut cache = self.cached.write().await;
        // Another task may have refreshed while we waited for the write lock.
        if let Some(cached) = cache.as_ref().filter(|c| !c.is_expired()) {
            return Ok(cached.access_token.clone());
        }

        debug!(url = %self.token_url, "fetching provider access token");
        let mut request = self
            .http
            .post(&self.token_url)
            .basic_auth(client_id, Some(client_secret.expose()))
            .form(&[("grant_type", "client_credentials")]);
        if let Some(host) = &self.host_header {
            request = request.header(reqwest::header::HOST, host);
        }

        let response = request
            .send()
            .await
            .map_err(|e| error::from_transport("fetch_token", self.timeout_secs, &e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| error::from_transport("fetch_token", self.timeout_secs, &e))?;
        if !status.is_success() {
            return Err(error::from_status("fetch_token", status.as_u16(), &body));
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            VerificationError::NormalizationFailure(format!("token response: {e}"))
        })?;
        let expires_at = token.expires_in.map(|secs| Instant::now() + usable_for(secs));
        let access_token = Secret::new(token.access_token);
        *cache = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at,
        });
        Ok(access_token)
    }

    /// Attach the bearer token to a request.
    pub async fn apply(&self, builder: RequestBuilder) -> Result<RequestBuilder, VerificationError> {
        let token = self.bearer_token().await?;
        Ok(builder.bearer_auth(token.expose()))
    }

    /// Drop the cached token (after the provider answered 401).
    pub async fn invalidate(&self) {
        let mut cache = self.cached.write().await;
        if cache.take().is_some() {
            debug!("provider access token invalidated");
        }
    }
}
