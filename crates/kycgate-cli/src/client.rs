//! Thin HTTP client for the node API.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Response envelope shared by every node endpoint.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Envelope {
    /// The `data` payload, or the node's error as an `anyhow` error.
    pub fn into_data(self, status: StatusCode) -> anyhow::Result<Value> {
        if self.success {
            return Ok(self.data.unwrap_or(Value::Null));
        }
        let kind = self.error.as_deref().unwrap_or("error");
        match self.message {
            Some(message) => anyhow::bail!("{kind} (HTTP {status}): {message}"),
            None => anyhow::bail!("{kind} (HTTP {status})"),
        }
    }
}

pub struct ApiClient {
    endpoint: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.endpoint, path)
    }

    pub async fn get(&self, path: &str) -> anyhow::Result<Value> {
        self.send(Method::GET, path, None::<&()>).await
    }

    pub async fn post<B: Serialize>(&self, path: &str, body: &B) -> anyhow::Result<Value> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> anyhow::Result<Value> {
        self.send(Method::DELETE, path, None::<&()>).await
    }

    async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> anyhow::Result<Value> {
        let mut request = self.http.request(method, self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let resp = request.send().await.map_err(|e| {
            anyhow::anyhow!(
                "could not reach node at {}: {e}\nIs the node running? Start it with: kycgate-node",
                self.endpoint
            )
        })?;
        let status = resp.status();
        let envelope: Envelope = resp
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("unexpected response (HTTP {status}): {e}"))?;
        envelope.into_data(status)
    }
}

/// Read an image file and encode it as standard base64.
pub fn read_image(path: &Path) -> anyhow::Result<String> {
    let bytes = std::fs::read(path)
        .map_err(|e| anyhow::anyhow!("cannot read image {}: {e}", path.display()))?;
    if bytes.is_empty() {
        anyhow::bail!("image {} is empty", path.display());
    }
    Ok(BASE64.encode(bytes))
}

/// Render a JSON field for display, `-` when absent.
pub fn field(value: &Value, key: &str) -> String {
    match value.get(key) {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
