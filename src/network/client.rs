//! HTTP client for executing requests live

use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Method, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, warn};

use super::{POOL_IDLE_TIMEOUT_SECS, POOL_MAX_IDLE_PER_HOST};
use crate::request::Request;
use crate::response::Response;
use crate::{Result, ShantyError};

/// Plain-HTTP client producing [`Response`]s
///
/// TLS is left to the host application's own transport.
pub struct HttpClient {
    client: Client<HttpConnector, Full<Bytes>>,
    timeout: Option<Duration>,
}

impl HttpClient {
    /// Create a new HTTP client
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS))
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .build_http();

        Self {
            client,
            timeout: None,
        }
    }

    /// Fail calls that take longer than `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Execute a request against the network
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the request cannot be built or sent, or times out
    pub async fn execute(&self, request: &Request) -> Result<Response> {
        let http_request = build_request(request)?;
        debug!("Executing {} {}", http_request.method(), http_request.uri());

        let send = self.client.request(http_request);
        let response = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, send).await.map_err(|_| {
                ShantyError::Transport(format!("Request timed out after {timeout:?}"))
            })?,
            None => send.await,
        }
        .map_err(|e| {
            warn!("Request failed: {e}");
            ShantyError::Transport(format!("Request failed: {e}"))
        })?;

        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| ShantyError::Transport(format!("Failed to read response body: {e}")))?
            .to_bytes();

        Ok(Response::from(hyper::Response::from_parts(parts, body)))
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the wire request; methods go out upper-cased
fn build_request(request: &Request) -> Result<hyper::Request<Full<Bytes>>> {
    let url = request.url();
    if url.scheme() != "http" {
        return Err(ShantyError::Transport(format!(
            "Unsupported scheme '{}': only http is supported",
            url.scheme()
        )));
    }

    let uri = url
        .as_str()
        .parse::<Uri>()
        .map_err(|e| ShantyError::Transport(format!("Invalid URI '{url}': {e}")))?;

    let method = Method::from_bytes(request.method().to_uppercase().as_bytes()).map_err(|e| {
        ShantyError::Transport(format!("Invalid HTTP method '{}': {e}", request.method()))
    })?;

    let mut builder = hyper::Request::builder().method(method).uri(uri);
    for (name, value) in request.headers() {
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder
        .body(Full::new(request.body().cloned().unwrap_or_default()))
        .map_err(|e| ShantyError::Transport(format!("Failed to build request: {e}")))
}
