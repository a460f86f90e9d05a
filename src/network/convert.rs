//! Conversions between `http` types and the fixture model

use hyper::body::Bytes;
use hyper::StatusCode;

use crate::request::{Headers, Request};
use crate::response::Response;
use crate::{Result, ShantyError};

fn collect_headers(headers: &hyper::HeaderMap) -> Headers {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

/// An empty request body is treated as no body
impl TryFrom<&hyper::Request<Bytes>> for Request {
    type Error = ShantyError;

    fn try_from(request: &hyper::Request<Bytes>) -> Result<Self> {
        let body = Some(request.body().clone()).filter(|b| !b.is_empty());
        Request::new(
            request.method().as_str(),
            &request.uri().to_string(),
            collect_headers(request.headers()),
            body,
        )
    }
}

impl From<hyper::Response<Bytes>> for Response {
    fn from(response: hyper::Response<Bytes>) -> Self {
        let status = response.status();
        let headers = collect_headers(response.headers());
        Response::new(
            status.as_u16(),
            status.canonical_reason().unwrap_or_default(),
            headers,
            Some(response.into_body()),
        )
    }
}

/// Translate a (possibly replayed) response back into an `http` response
///
/// # Errors
///
/// Returns `InvalidFixture` if the stored status or a header is not valid HTTP
pub fn into_http_response(response: &Response) -> Result<hyper::Response<Bytes>> {
    let status = StatusCode::from_u16(response.status())
        .map_err(|e| ShantyError::InvalidFixture(format!("Invalid status code: {e}")))?;

    let mut builder = hyper::Response::builder().status(status);
    for (name, value) in response.headers() {
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder
        .body(response.body().cloned().unwrap_or_default())
        .map_err(|e| ShantyError::InvalidFixture(format!("Invalid stored response: {e}")))
}
