//! On-disk fixture documents
//!
//! One YAML file holds one fixture:
//!
//! ```yaml
//! request:
//!   method: get
//!   url: https://example.com/hello
//!   headers: {}
//!   body: {string: '', encoding: ''}
//! response:
//!   status: {code: 200, message: OK}
//!   headers: {}
//!   body: {string: hello, encoding: UTF-8}
//! stored_at: 2024-01-01T00:00:00+00:00
//! ```
//!
//! Decoding goes through typed serde structs with unknown fields denied, so a
//! document of the wrong shape is rejected instead of half-loaded.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::response::Response;
use crate::serializer::{SerializedRequest, SerializedResponse};
use crate::{Result, ShantyError};

/// A stored (request projection, response) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureRecord {
    /// Filtered request projection
    #[serde(alias = ":request")]
    pub request: SerializedRequest,
    /// Stored response
    #[serde(alias = ":response")]
    pub response: SerializedResponse,
    /// When the fixture was written
    #[serde(alias = ":stored_at")]
    pub stored_at: DateTime<FixedOffset>,
}

impl FixtureRecord {
    /// Build a record stamped with the current time
    pub fn new(request: SerializedRequest, response: SerializedResponse) -> Self {
        Self {
            request,
            response,
            stored_at: Utc::now().into(),
        }
    }

    /// Encode as YAML
    ///
    /// # Errors
    ///
    /// Returns `InvalidFixture` if encoding fails
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| ShantyError::InvalidFixture(format!("Failed to encode fixture: {e}")))
    }

    /// Decode from YAML
    ///
    /// # Errors
    ///
    /// Returns `InvalidFixture` if the document does not match the schema
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| ShantyError::InvalidFixture(format!("Failed to decode fixture: {e}")))
    }

    /// Read and decode a fixture file
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, `InvalidFixture` if it cannot
    /// be decoded
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| match e {
            ShantyError::InvalidFixture(reason) => {
                ShantyError::InvalidFixture(format!("{}: {reason}", path.display()))
            }
            other => other,
        })
    }

    /// Write the fixture, replacing any previous file at `path`
    ///
    /// Parent directories are created as needed. The document is written to a
    /// sibling temporary file and renamed into place, so readers see either the
    /// old file or the complete new one.
    ///
    /// # Errors
    ///
    /// Returns `Io` if directories or the file cannot be written
    pub fn write(&self, path: &Path) -> Result<()> {
        let yaml = self.to_yaml()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = temporary_sibling(path);
        let written = fs::File::create(&tmp_path).and_then(|mut file| {
            file.write_all(yaml.as_bytes())?;
            file.sync_all()
        });

        if let Err(e) = written.and_then(|()| fs::rename(&tmp_path, path)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        Ok(())
    }

    /// Decode the stored response
    ///
    /// # Errors
    ///
    /// Returns `InvalidFixture` if the response body cannot be decoded
    pub fn into_response(self) -> Result<Response> {
        Response::from_serialized(self.response)
    }
}

fn temporary_sibling(path: &Path) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.{seq}.tmp", std::process::id()));
    path.with_file_name(name)
}
