//! Request fingerprinting and fixture path derivation

use std::path::PathBuf;

use sha1::{Digest, Sha1};

use crate::request::Request;

/// File extension of stored fixtures
pub const FIXTURE_EXTENSION: &str = "yml";

/// Compute the SHA-1 fingerprint of a request
///
/// The fingerprint covers, in order:
/// 1. Method, as given
/// 2. Absolute URL string
/// 3. Body (already filtered by the caller), empty when absent
///
/// Headers never participate. Output is 40 lowercase hex characters.
#[must_use]
pub fn digest(method: &str, url: &str, body: Option<&[u8]>) -> String {
    let mut hasher = Sha1::new();
    hasher.update(method.as_bytes());
    hasher.update(url.as_bytes());
    if let Some(body) = body {
        hasher.update(body);
    }
    hex::encode(hasher.finalize())
}

/// File name for a digest
#[must_use]
pub fn file_name(digest: &str) -> String {
    format!("{digest}.{FIXTURE_EXTENSION}")
}

/// Path of a fixture relative to the storage root
///
/// Layout is `<host>/<url path segments>/<method>/<digest>.yml`, joined with
/// the platform separator.
#[must_use]
pub fn relative_path(request: &Request, digest: &str) -> PathBuf {
    let mut path = PathBuf::from(request.host());

    // `Url` has already resolved dot segments; empty ones would produce `//`
    for segment in request.url().path().split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }

    path.push(request.method());
    path.push(file_name(digest));
    path
}
