//! Response model

use std::hash::{Hash, Hasher};

use bytes::Bytes;

use crate::request::Headers;
use crate::{Result, ShantyError};

/// Result of an HTTP call, either live or replayed from a fixture
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    message: String,
    headers: Headers,
    body: Option<Bytes>,
    was_replayed: bool,
}

impl Response {
    /// Build a live response
    pub fn new(
        status: u16,
        message: impl Into<String>,
        headers: Headers,
        body: Option<Bytes>,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            headers,
            body,
            was_replayed: false,
        }
    }

    /// Build a live response from a textual status code such as `"200"`
    ///
    /// # Errors
    ///
    /// Returns `InvalidFixture` if the status is not a non-negative integer
    pub fn with_status_text(
        status: &str,
        message: impl Into<String>,
        headers: Headers,
        body: Option<Bytes>,
    ) -> Result<Self> {
        Ok(Self::new(parse_status(status)?, message, headers, body))
    }

    pub(crate) fn replayed(mut self) -> Self {
        self.was_replayed = true;
        self
    }

    /// Status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Status line text
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Response headers in received order
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Body, `None` when the response had no body
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// True only when this response was decoded from a stored fixture
    pub fn was_replayed(&self) -> bool {
        self.was_replayed
    }
}

/// Coerce a numeric status string
pub(crate) fn parse_status(status: &str) -> Result<u16> {
    status
        .trim()
        .parse::<u16>()
        .map_err(|e| ShantyError::InvalidFixture(format!("Invalid status code '{status}': {e}")))
}

impl PartialEq for Response {
    fn eq(&self, other: &Self) -> bool {
        self.status == other.status
            && self.message == other.message
            && self.headers == other.headers
            && self.body == other.body
    }
}

impl Eq for Response {}

impl Hash for Response {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.status.hash(state);
        self.message.hash(state);
        self.headers.hash(state);
        self.body.hash(state);
    }
}
