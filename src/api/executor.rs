//! Typed request executor

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{Error, Result};

/// A fully formed HTTP request
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// HTTP method
    pub method: Method,
    /// Absolute URL including query
    pub url: Url,
    /// Extra headers
    pub headers: Vec<(String, String)>,
    /// Optional request body
    pub body: Option<String>,
}

impl RequestDescriptor {
    /// Create a request without headers or body
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    /// GET request
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// POST request
    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    /// DELETE request
    pub fn delete(url: Url) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Add a header
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// Add `Authorization: Bearer <token>`
    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    /// Set the request body
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Stateless wrapper around [`reqwest::Client`] that classifies every outcome.
///
/// Cloning is cheap and clones share the connection pool.
#[derive(Debug, Clone, Default)]
pub struct RequestExecutor {
    client: Client,
}

impl RequestExecutor {
    /// Create an executor with a default client
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an executor around an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Perform the request and decode a JSON body into `T`.
    pub async fn execute<T: DeserializeOwned>(&self, request: RequestDescriptor) -> Result<T> {
        self.execute_with(request, |body| serde_json::from_slice(body))
            .await
    }

    /// Perform the request and decode the body with a caller-supplied function.
    pub async fn execute_with<T, F>(&self, request: RequestDescriptor, decode: F) -> Result<T>
    where
        F: FnOnce(&[u8]) -> serde_json::Result<T>,
    {
        let body = self.send(request).await?;

        decode(&body).map_err(|source| {
            let body = String::from_utf8_lossy(&body).into_owned();
            tracing::warn!(error = %source, len = body.len(), "Response body did not decode");
            Error::Decoding { source, body }
        })
    }

    /// Perform the request and ignore whatever body comes back.
    pub async fn execute_discarding(&self, request: RequestDescriptor) -> Result<()> {
        self.send(request).await.map(|_| ())
    }

    /// Send the request and return the raw body of a 2xx response.
    async fn send(&self, request: RequestDescriptor) -> Result<Vec<u8>> {
        let RequestDescriptor {
            method,
            url,
            headers,
            body,
        } = request;

        // The query can carry secrets (client secret, auth code), so only the path is logged.
        tracing::debug!(%method, host = url.host_str(), path = url.path(), "Sending request");
        let path = url.path().to_string();

        let mut builder = self.client.request(method, url);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                tracing::warn!(path = %path, error = %e, "Request could not be built");
                Error::InvalidRequest
            } else {
                tracing::warn!(path = %path, error = %e, "Transport error");
                Error::Transport(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(path = %path, status = status.as_u16(), "Non-success status");
            return Err(Error::from_status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(Error::Transport)?;
        Ok(bytes.to_vec())
    }
}
