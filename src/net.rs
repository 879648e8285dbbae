//! Network abstraction for origin fetches.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use crate::error::{Error, Result};
use crate::key::RequestKey;
use crate::response::CachedResponse;

/// Abstraction over origin fetches for testability.
///
/// Transport failures (DNS, connect, timeout) are `Err`; an HTTP error status
/// is still a response and passes through as `Ok`, matching how the gate
/// relays origin answers unmodified on a cache miss.
#[async_trait]
pub trait Network: Send + Sync {
    /// Fetches `key` from the origin.
    async fn fetch(&self, key: &RequestKey) -> Result<CachedResponse>;
}

/// Default network implementation backed by `reqwest` against one origin.
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    client: reqwest::Client,
    origin: String,
}

impl HttpNetwork {
    /// Creates a network rooted at `origin` (e.g. `http://127.0.0.1:5000`)
    /// with a connection-pooled client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(origin: impl Into<String>) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;
        Ok(Self::with_client(client, origin))
    }

    /// Creates a network from an existing client.
    pub fn with_client(client: reqwest::Client, origin: impl Into<String>) -> Self {
        let mut origin = origin.into();
        while origin.ends_with('/') {
            origin.pop();
        }
        Self { client, origin }
    }

    /// Origin this network fetches from.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    fn url_for(&self, key: &RequestKey) -> String {
        format!("{}{}", self.origin, key)
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, key: &RequestKey) -> Result<CachedResponse> {
        let response = self
            .client
            .get(self.url_for(key))
            .send()
            .await
            .map_err(Error::Http)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let body = response.bytes().await.map_err(Error::Http)?;

        Ok(CachedResponse::new(status, content_type, body))
    }
}
