//! Traced HTTP client.
//!
//! Wraps `reqwest::Client` so that every outgoing request runs inside an
//! `outgoing_http` span recording method, URL and response status.

use serde::Serialize;
use tracing::{field, Instrument, Level};

/// A `reqwest::Client` whose requests are wrapped in a tracing span.
#[derive(Clone, Debug)]
pub struct TracedClient {
    inner: reqwest::Client,
}

impl TracedClient {
    /// Create a new TracedClient wrapping the provided reqwest::Client
    pub fn new(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    /// Execute a built request inside an `outgoing_http` span.
    pub async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let span = tracing::span!(
            Level::INFO, "outgoing_http",
            http.method = %req.method(),
            http.url = %req.url(),
            http.status_code = field::Empty,
            error = field::Empty,
            otel.kind = "client",
        );

        let response = self.inner.execute(req).instrument(span.clone()).await;

        match &response {
            Ok(resp) => {
                let status = resp.status();
                span.record("http.status_code", status.as_u16());
                if status.is_client_error() || status.is_server_error() {
                    span.record("error", true);
                }
            }
            Err(_) => {
                span.record("error", true);
            }
        }

        response
    }

    pub async fn get(&self, url: &str) -> reqwest::Result<reqwest::Response> {
        let req = self.inner.get(url).build()?;
        self.execute(req).await
    }

    /// POST with a JSON body
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> reqwest::Result<reqwest::Response> {
        let req = self.inner.post(url).json(body).build()?;
        self.execute(req).await
    }

    /// PUT with a JSON body
    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> reqwest::Result<reqwest::Response> {
        let req = self.inner.put(url).json(body).build()?;
        self.execute(req).await
    }

    pub async fn delete(&self, url: &str) -> reqwest::Result<reqwest::Response> {
        let req = self.inner.delete(url).build()?;
        self.execute(req).await
    }

    /// Get a reference to the underlying reqwest::Client for advanced usage
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }
}

impl From<reqwest::Client> for TracedClient {
    fn from(c: reqwest::Client) -> Self {
        Self::new(c)
    }
}

impl Default for TracedClient {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}
