//! Outbound request model

use bytes::Bytes;
use url::Url;

use crate::{Result, ShantyError};

/// Ordered header list, names kept in the case they were received
pub type Headers = Vec<(String, String)>;

/// An outbound HTTP call, reduced to what the fixture store needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: String,
    raw_url: String,
    url: Url,
    headers: Headers,
    body: Option<Bytes>,
}

impl Request {
    /// Parse `url` and build a request
    ///
    /// The string is kept as written for fingerprinting and override matching;
    /// the parsed form supplies the host and path segments.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` if the URL is malformed or has no host
    pub fn new(
        method: impl Into<String>,
        url: &str,
        headers: Headers,
        body: Option<Bytes>,
    ) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| ShantyError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let mut request = Self::with_url(method, parsed, headers, body)?;
        request.raw_url = url.to_string();
        Ok(request)
    }

    /// Build a request from an already parsed URL
    ///
    /// The URL as written is the serialized form of `url`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` if the URL has no host
    pub fn with_url(
        method: impl Into<String>,
        url: Url,
        headers: Headers,
        body: Option<Bytes>,
    ) -> Result<Self> {
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ShantyError::InvalidUrl {
                url: url.to_string(),
                reason: "URL has no host".to_string(),
            });
        }

        Ok(Self {
            method: method.into(),
            raw_url: url.as_str().to_string(),
            url,
            headers,
            body,
        })
    }

    /// HTTP method as given by the caller
    pub fn method(&self) -> &str {
        &self.method
    }

    /// URL exactly as the caller wrote it
    pub fn raw_url(&self) -> &str {
        &self.raw_url
    }

    /// Parsed URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Host component; always present for a constructed request
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Request headers in received order
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Raw body, `None` when the call carried no body
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}
