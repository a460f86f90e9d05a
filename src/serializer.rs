//! Redaction-filtered structural forms of requests and responses
//!
//! The [`RequestSerializer`] owns the header and body filters. Every derived
//! view of a request (stored projection, digest, fixture path) goes through the
//! same filters, so redacting a body also changes which fixture it maps to.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::request::{Headers, Request};
use crate::response::{parse_status, Response};
use crate::{fingerprint, Result, ShantyError};

/// Encoding marker for text bodies
pub const ENCODING_UTF8: &str = "UTF-8";

/// Encoding marker for bodies that are not UTF-8; the stored string is hex
pub const ENCODING_HEX: &str = "hex";

/// Default replacement for redacted values
pub const DEFAULT_REPLACEMENT: &str = "<REDACTED>";

/// Rewrites a single header value before it is stored
pub trait HeaderFilter: Send + Sync {
    /// Return the value to store for header `name`
    fn filter(&self, name: &str, value: &str) -> String;
}

impl<F> HeaderFilter for F
where
    F: Fn(&str, &str) -> String + Send + Sync,
{
    fn filter(&self, name: &str, value: &str) -> String {
        self(name, value)
    }
}

/// Rewrites a whole request body before it is hashed and stored
pub trait BodyFilter: Send + Sync {
    /// Return the replacement body
    fn filter(&self, body: Option<Bytes>) -> Option<Bytes>;
}

impl<F> BodyFilter for F
where
    F: Fn(Option<Bytes>) -> Option<Bytes> + Send + Sync,
{
    fn filter(&self, body: Option<Bytes>) -> Option<Bytes> {
        self(body)
    }
}

/// Replaces the values of named headers, matched case-insensitively
#[derive(Debug, Clone)]
pub struct RedactHeaders {
    names: Vec<String>,
    replacement: String,
}

impl RedactHeaders {
    /// Redact every header in `names` with `replacement`
    pub fn new<I, S>(names: I, replacement: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|name| name.as_ref().to_ascii_lowercase())
                .collect(),
            replacement: replacement.into(),
        }
    }
}

impl HeaderFilter for RedactHeaders {
    fn filter(&self, name: &str, value: &str) -> String {
        if self.names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            self.replacement.clone()
        } else {
            value.to_string()
        }
    }
}

/// Replaces literal secrets and regex matches inside text bodies
///
/// Binary bodies pass through untouched.
#[derive(Debug, Clone)]
pub struct RedactSecrets {
    secrets: Vec<String>,
    patterns: Vec<Regex>,
    replacement: String,
}

impl RedactSecrets {
    /// Compile the redaction patterns
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if a pattern is not a valid regex
    pub fn new(
        secrets: Vec<String>,
        patterns: &[String],
        replacement: impl Into<String>,
    ) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    ShantyError::Configuration(format!("Invalid redaction pattern '{p}': {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            secrets: secrets.into_iter().filter(|s| !s.is_empty()).collect(),
            patterns,
            replacement: replacement.into(),
        })
    }

    fn is_noop(&self) -> bool {
        self.secrets.is_empty() && self.patterns.is_empty()
    }
}

impl BodyFilter for RedactSecrets {
    fn filter(&self, body: Option<Bytes>) -> Option<Bytes> {
        let body = body?;
        if self.is_noop() {
            return Some(body);
        }
        let Ok(text) = std::str::from_utf8(&body) else {
            return Some(body);
        };

        let mut text = text.to_string();
        for secret in &self.secrets {
            text = text.replace(secret.as_str(), &self.replacement);
        }
        for pattern in &self.patterns {
            text = pattern
                .replace_all(&text, regex::NoExpand(self.replacement.as_str()))
                .into_owned();
        }
        Some(Bytes::from(text))
    }
}

/// Stored form of a body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SerializedBody {
    /// Body text; hex for bodies that are not UTF-8
    #[serde(alias = ":string", default, deserialize_with = "nullable_string")]
    pub string: String,
    /// Encoding marker, empty when the body was absent
    #[serde(alias = ":encoding", default, deserialize_with = "nullable_string")]
    pub encoding: String,
}

impl SerializedBody {
    /// Encode a body, distinguishing absent from empty
    pub fn from_body(body: Option<&[u8]>) -> Self {
        match body {
            None => Self {
                string: String::new(),
                encoding: String::new(),
            },
            Some(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => Self {
                    string: text.to_string(),
                    encoding: ENCODING_UTF8.to_string(),
                },
                Err(_) => Self {
                    string: hex::encode(bytes),
                    encoding: ENCODING_HEX.to_string(),
                },
            },
        }
    }

    /// Decode back into a body
    ///
    /// An empty marker means no body and [`ENCODING_HEX`] means the string is
    /// hex. Any other marker, `ASCII-8BIT` included, names the charset of a
    /// string that is the body itself.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFixture` if a hex body is not valid hex
    pub fn into_body(self) -> Result<Option<Bytes>> {
        match self.encoding.as_str() {
            "" => Ok(None),
            ENCODING_HEX => hex::decode(&self.string)
                .map(|bytes| Some(Bytes::from(bytes)))
                .map_err(|e| ShantyError::InvalidFixture(format!("Invalid hex body: {e}"))),
            _ => Ok(Some(Bytes::from(self.string))),
        }
    }
}

/// Stored projection of a request, used for comparison and debugging only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SerializedRequest {
    /// Method as given
    #[serde(alias = ":method")]
    pub method: String,
    /// Absolute URL
    #[serde(alias = ":url")]
    pub url: String,
    /// Filtered headers
    #[serde(alias = ":headers", default, with = "header_map")]
    pub headers: Headers,
    /// Filtered body
    #[serde(alias = ":body")]
    pub body: SerializedBody,
}

/// Stored status line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SerializedStatus {
    /// Status code; numeric strings are accepted on decode
    #[serde(alias = ":code", deserialize_with = "status_code")]
    pub code: u16,
    /// Status line text
    #[serde(alias = ":message", default, deserialize_with = "nullable_string")]
    pub message: String,
}

/// Stored form of a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SerializedResponse {
    /// Status line
    #[serde(alias = ":status")]
    pub status: SerializedStatus,
    /// Response headers
    #[serde(alias = ":headers", default, with = "header_map")]
    pub headers: Headers,
    /// Response body
    #[serde(alias = ":body")]
    pub body: SerializedBody,
}

impl From<&Response> for SerializedResponse {
    fn from(response: &Response) -> Self {
        Self {
            status: SerializedStatus {
                code: response.status(),
                message: response.message().to_string(),
            },
            headers: response.headers().to_vec(),
            body: SerializedBody::from_body(response.body().map(|b| b.as_ref())),
        }
    }
}

impl Response {
    /// Decode a stored response; the result is marked as replayed
    ///
    /// # Errors
    ///
    /// Returns `InvalidFixture` if the body cannot be decoded
    pub fn from_serialized(serialized: SerializedResponse) -> Result<Self> {
        let body = serialized.body.into_body()?;
        Ok(Response::new(
            serialized.status.code,
            serialized.status.message,
            serialized.headers,
            body,
        )
        .replayed())
    }
}

/// Produces filtered structural forms, digests and fixture paths
#[derive(Clone)]
pub struct RequestSerializer {
    headers_filter: Arc<dyn HeaderFilter>,
    body_filter: Arc<dyn BodyFilter>,
}

impl RequestSerializer {
    /// Create a serializer with the given filters
    pub fn new(
        headers_filter: impl HeaderFilter + 'static,
        body_filter: impl BodyFilter + 'static,
    ) -> Self {
        Self {
            headers_filter: Arc::new(headers_filter),
            body_filter: Arc::new(body_filter),
        }
    }

    /// Replace the header filter
    #[must_use]
    pub fn with_headers_filter(mut self, filter: impl HeaderFilter + 'static) -> Self {
        self.headers_filter = Arc::new(filter);
        self
    }

    /// Replace the body filter
    #[must_use]
    pub fn with_body_filter(mut self, filter: impl BodyFilter + 'static) -> Self {
        self.body_filter = Arc::new(filter);
        self
    }

    /// Request body after the body filter
    pub fn filtered_body(&self, request: &Request) -> Option<Bytes> {
        self.body_filter.filter(request.body().cloned())
    }

    /// Structural form of a request with every header and the body filtered
    pub fn serialize_request(&self, request: &Request) -> SerializedRequest {
        let headers = request
            .headers()
            .iter()
            .map(|(name, value)| (name.clone(), self.headers_filter.filter(name, value)))
            .collect();

        SerializedRequest {
            method: request.method().to_string(),
            url: request.raw_url().to_string(),
            headers,
            body: SerializedBody::from_body(self.filtered_body(request).as_deref()),
        }
    }

    /// Structural form of a response
    pub fn serialize_response(&self, response: &Response) -> SerializedResponse {
        SerializedResponse::from(response)
    }

    /// Fingerprint of a request over its filtered body
    pub fn digest(&self, request: &Request) -> String {
        let body = self.filtered_body(request);
        fingerprint::digest(request.method(), request.raw_url(), body.as_deref())
    }

    /// Fixture file name for a request
    pub fn file_name(&self, request: &Request) -> String {
        fingerprint::file_name(&self.digest(request))
    }

    /// Fixture path relative to the storage root
    pub fn relative_path(&self, request: &Request) -> PathBuf {
        fingerprint::relative_path(request, &self.digest(request))
    }
}

impl Default for RequestSerializer {
    fn default() -> Self {
        Self::new(
            |_name: &str, value: &str| value.to_string(),
            |body: Option<Bytes>| body,
        )
    }
}

impl fmt::Debug for RequestSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSerializer").finish_non_exhaustive()
    }
}

fn nullable_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredStatusCode {
    Number(u64),
    Text(String),
}

fn status_code<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match StoredStatusCode::deserialize(deserializer)? {
        StoredStatusCode::Number(code) => u16::try_from(code)
            .map_err(|_| D::Error::custom(format!("status code {code} out of range"))),
        StoredStatusCode::Text(text) => parse_status(&text).map_err(D::Error::custom),
    }
}

/// Serializes ordered header pairs as a mapping, keeping order on decode
mod header_map {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::{Deserializer, Serializer};

    use crate::request::Headers;

    pub fn serialize<S>(headers: &Headers, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(headers.iter().map(|(name, value)| (name, value)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Headers, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct HeaderVisitor;

        impl<'de> Visitor<'de> for HeaderVisitor {
            type Value = Headers;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of header names to values")
            }

            fn visit_unit<E>(self) -> Result<Headers, E>
            where
                E: serde::de::Error,
            {
                Ok(Vec::new())
            }

            fn visit_map<A>(self, mut map: A) -> Result<Headers, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut headers = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, value)) = map.next_entry::<String, String>()? {
                    headers.push((name, value));
                }
                Ok(headers)
            }
        }

        deserializer.deserialize_any(HeaderVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_request() -> Request {
        Request::new(
            "get",
            "https://example.com/hello",
            vec![
                ("Authorization".to_string(), "auth-header".to_string()),
                ("Accept".to_string(), "application/json".to_string()),
            ],
            Some(Bytes::from_static(b"body - value:32890")),
        )
        .unwrap()
    }

    #[test]
    fn test_serialize_request_unfiltered() {
        let serialized = RequestSerializer::default().serialize_request(&test_request());
        assert_eq!(serialized.method, "get");
        assert_eq!(serialized.url, "https://example.com/hello");
        assert_eq!(serialized.headers, test_request().headers().to_vec());
        assert_eq!(
            serialized.body,
            SerializedBody {
                string: "body - value:32890".to_string(),
                encoding: ENCODING_UTF8.to_string(),
            }
        );
    }

    #[test]
    fn test_header_filter_sees_every_header() {
        let serializer = RequestSerializer::default()
            .with_headers_filter(|_name: &str, _value: &str| "replaced".to_string());
        let serialized = serializer.serialize_request(&test_request());

        assert_eq!(serialized.headers.len(), 2);
        assert!(serialized.headers.iter().all(|(_, v)| v == "replaced"));
    }

    #[test]
    fn test_header_filter_leaves_other_headers() {
        let serializer = RequestSerializer::default().with_headers_filter(
            |name: &str, value: &str| {
                if name == "Authorization" {
                    "<auth token>".to_string()
                } else {
                    value.to_string()
                }
            },
        );
        let serialized = serializer.serialize_request(&test_request());

        assert_eq!(serialized.headers[0].1, "<auth token>");
        assert_eq!(serialized.headers[1].1, "application/json");
    }

    #[test]
    fn test_body_filter_applies_to_stored_body_and_digest() {
        let serializer = RequestSerializer::default()
            .with_body_filter(|_body: Option<Bytes>| Some(Bytes::from_static(b"altered body")));
        let request = test_request();

        assert_eq!(
            serializer.serialize_request(&request).body.string,
            "altered body"
        );
        assert_eq!(
            serializer.digest(&request),
            fingerprint::digest("get", "https://example.com/hello", Some(b"altered body"))
        );
    }

    #[test]
    fn test_equivalent_filters_share_digest() {
        let request = test_request();
        let a = RequestSerializer::default()
            .with_body_filter(|_b: Option<Bytes>| Some(Bytes::from_static(b"same")));
        let b = RequestSerializer::default().with_body_filter(|b: Option<Bytes>| {
            b.map(|_| Bytes::from(String::from("sa") + "me"))
        });
        let c = RequestSerializer::default()
            .with_body_filter(|_b: Option<Bytes>| Some(Bytes::from_static(b"different")));

        assert_eq!(a.digest(&request), b.digest(&request));
        assert_ne!(a.digest(&request), c.digest(&request));
    }

    #[test]
    fn test_relative_path_uses_filtered_digest() {
        let serializer = RequestSerializer::default()
            .with_body_filter(|_b: Option<Bytes>| Some(Bytes::from_static(b"altered body")));
        let request = test_request();
        let expected = PathBuf::from("example.com")
            .join("hello")
            .join("get")
            .join(serializer.file_name(&request));

        assert_eq!(serializer.relative_path(&request), expected);
    }

    #[test]
    fn test_digest_uses_url_as_written() {
        let serializer = RequestSerializer::default();
        let written = Request::new("GET", "https://Example.COM", vec![], None).unwrap();
        let canonical = Request::new("GET", "https://example.com/", vec![], None).unwrap();

        assert_eq!(
            serializer.digest(&written),
            fingerprint::digest("GET", "https://Example.COM", None)
        );
        assert_ne!(serializer.digest(&written), serializer.digest(&canonical));
        assert_eq!(serializer.serialize_request(&written).url, "https://Example.COM");
        assert_eq!(
            serializer.relative_path(&written).parent(),
            serializer.relative_path(&canonical).parent()
        );
    }

    #[test]
    fn test_absent_and_empty_bodies_distinguished() {
        let absent = SerializedBody::from_body(None);
        let empty = SerializedBody::from_body(Some(b""));

        assert_eq!(absent.encoding, "");
        assert_eq!(empty.encoding, ENCODING_UTF8);
        assert_eq!(absent.into_body().unwrap(), None);
        assert_eq!(empty.into_body().unwrap(), Some(Bytes::new()));
    }

    #[test]
    fn test_binary_body_stored_as_hex() {
        let bytes = [0xff_u8, 0x00, 0xfe];
        let serialized = SerializedBody::from_body(Some(&bytes));

        assert_eq!(serialized.encoding, ENCODING_HEX);
        assert_eq!(serialized.string, "ff00fe");
        assert_eq!(serialized.into_body().unwrap().unwrap().as_ref(), &bytes);
    }

    #[test]
    fn test_charset_markers_keep_string_as_body() {
        for encoding in ["ASCII-8BIT", "ISO-8859-1", "US-ASCII"] {
            let body = SerializedBody {
                string: "hello".to_string(),
                encoding: encoding.to_string(),
            };
            assert_eq!(
                body.into_body().unwrap(),
                Some(Bytes::from_static(b"hello")),
                "{encoding}"
            );
        }

        let empty = SerializedBody {
            string: String::new(),
            encoding: "ASCII-8BIT".to_string(),
        };
        assert_eq!(empty.into_body().unwrap(), Some(Bytes::new()));
    }

    #[test]
    fn test_invalid_hex_body_rejected() {
        let body = SerializedBody {
            string: "abc".to_string(),
            encoding: ENCODING_HEX.to_string(),
        };
        assert!(matches!(
            body.into_body(),
            Err(ShantyError::InvalidFixture(_))
        ));
    }

    #[test]
    fn test_response_round_trip() {
        let responses = [
            Response::new(200, "OK", vec![], None),
            Response::new(
                201,
                "Created",
                vec![("Content-Type".to_string(), "text/plain".to_string())],
                Some(Bytes::from_static(b"created")),
            ),
            Response::with_status_text("204", "No Content", vec![], Some(Bytes::new())).unwrap(),
        ];

        for response in responses {
            let serialized = RequestSerializer::default().serialize_response(&response);
            let decoded = Response::from_serialized(serialized).unwrap();
            assert_eq!(decoded, response);
            assert!(decoded.was_replayed());
        }
    }

    #[test]
    fn test_status_code_accepts_numeric_string() {
        let yaml = "code: '200'\nmessage: OK\n";
        let status: SerializedStatus = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(status.code, 200);

        let yaml = "code: 404\nmessage: ~\n";
        let status: SerializedStatus = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(status.code, 404);
        assert_eq!(status.message, "");
    }

    #[test]
    fn test_redact_headers_case_insensitive() {
        let filter = RedactHeaders::new(["authorization"], DEFAULT_REPLACEMENT);
        assert_eq!(filter.filter("Authorization", "secret"), DEFAULT_REPLACEMENT);
        assert_eq!(filter.filter("Accept", "*/*"), "*/*");
    }

    #[test]
    fn test_redact_secrets() {
        let filter = RedactSecrets::new(
            vec!["hunter2".to_string()],
            &[r"token=\w+".to_string()],
            "X",
        )
        .unwrap();
        let body = filter.filter(Some(Bytes::from_static(b"pw=hunter2&token=abc123")));
        assert_eq!(body.unwrap().as_ref(), b"pw=X&X");
        assert_eq!(filter.filter(None), None);
    }

    #[test]
    fn test_redact_secrets_invalid_pattern() {
        let result = RedactSecrets::new(vec![], &["(unclosed".to_string()], "X");
        assert!(matches!(result, Err(ShantyError::Configuration(_))));
    }
}
