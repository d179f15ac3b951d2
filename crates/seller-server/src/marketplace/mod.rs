//! Marketplace (Ozon Seller API) HTTP client
//!
//! Thin JSON-over-POST client. Every call carries the seller's `Client-Id` and
//! `Api-Key` headers and returns the `result` member of the response envelope.
//! There is no retry; the configured timeout is the only deadline.

use axum::http::HeaderMap;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::MarketplaceConfig;

pub const CLIENT_ID_HEADER: &str = "Client-Id";
pub const API_KEY_HEADER: &str = "Api-Key";

/// Upstream call failures
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Marketplace request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Marketplace returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Marketplace response could not be decoded: {0}")]
    Decode(String),

    #[error("Failed to build marketplace client: {0}")]
    Client(String),
}

impl UpstreamError {
    /// HTTP status reported by the upstream, when there was one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            UpstreamError::Transport(e) => e.status().map(|s| s.as_u16()),
            UpstreamError::Decode(_) | UpstreamError::Client(_) => None,
        }
    }
}

/// Seller credentials as received from the caller; either part may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub client_id: Option<String>,
    pub api_key: Option<String>,
}

/// Credentials with both parts present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiAuth {
    client_id: String,
    api_key: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            api_key: Some(api_key.into()),
        }
    }

    /// Read `Client-Id` / `Api-Key` request headers
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
        };
        Self {
            client_id: read(CLIENT_ID_HEADER),
            api_key: read(API_KEY_HEADER),
        }
    }

    /// Both parts present and non-blank
    pub fn authorize(&self) -> Option<ApiAuth> {
        let present = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        Some(ApiAuth {
            client_id: present(&self.client_id)?,
            api_key: present(&self.api_key)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

/// Client for the seller API
#[derive(Clone)]
pub struct MarketplaceClient {
    http: Client,
    base_url: String,
}

impl MarketplaceClient {
    pub fn new(config: &MarketplaceConfig) -> Result<Self, UpstreamError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("seller-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpstreamError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// POST `body` to `path` and decode `result`
    pub async fn post<B, R>(&self, path: &str, auth: &ApiAuth, body: &B) -> Result<R, UpstreamError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "Marketplace request");

        let response = self
            .http
            .post(&url)
            .header(CLIENT_ID_HEADER, &auth.client_id)
            .header(API_KEY_HEADER, &auth.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message: upstream_message(&message, status.canonical_reason()),
            });
        }

        let bytes = response.bytes().await?;
        let envelope: Envelope<R> =
            serde_json::from_slice(&bytes).map_err(|e| UpstreamError::Decode(e.to_string()))?;
        Ok(envelope.result)
    }
}

/// Seller API errors come as `{"code": .., "message": ".."}`; fall back to the raw body
fn upstream_message(body: &str, reason: Option<&str>) -> String {
    #[derive(Deserialize)]
    struct ApiFailure {
        message: String,
    }

    if let Ok(failure) = serde_json::from_str::<ApiFailure>(body) {
        return failure.message;
    }
    let body = body.trim();
    if body.is_empty() {
        reason.unwrap_or("unknown error").to_string()
    } else {
        body.to_string()
    }
}
