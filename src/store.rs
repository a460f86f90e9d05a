//! Lookup, execute and persist orchestration

use std::future::Future;
use std::path::{Path, PathBuf};

use static_assertions::assert_impl_all;
use tracing::{debug, info, warn};

use crate::config::Policy;
use crate::fixture::FixtureRecord;
use crate::request::Request;
use crate::response::Response;
use crate::serializer::RequestSerializer;
use crate::{Result, ShantyError};

/// What `fetch` will do for a request under the current policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Execute live; storage is neither read nor written
    Live,
    /// Serve the fixture at this path
    Replay(PathBuf),
    /// Execute live and persist the result at this path
    Record(PathBuf),
}

/// Fixture store: replays stored responses or records live ones
#[derive(Debug)]
pub struct Store {
    policy: Policy,
}

assert_impl_all!(Store: Send, Sync);

impl Store {
    /// Create a store over a policy snapshot
    #[must_use]
    pub fn new(policy: Policy) -> Self {
        Self { policy }
    }

    /// Policy this store enforces
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    fn serializer(&self) -> &RequestSerializer {
        &self.policy.serializer
    }

    /// Absolute path of the fixture serving `request`
    ///
    /// Generic overrides are consulted first, in registration order; otherwise
    /// the digest-derived path is used.
    pub fn fixture_path(&self, request: &Request) -> PathBuf {
        let url = request.raw_url();
        let relative = if let Some(path) = self.policy.overrides.resolve(url) {
            debug!("Generic override for {}: {}", url, path.display());
            path.to_path_buf()
        } else {
            self.serializer().relative_path(request)
        };
        self.policy.storage_dir.join(relative)
    }

    /// Decide how a request is served
    ///
    /// # Errors
    ///
    /// Returns `Configuration` when bypass and readonly are both set, and
    /// `UnknownRequest` for a readonly miss
    pub fn plan(&self, request: &Request) -> Result<Decision> {
        if self.policy.bypass && self.policy.readonly {
            return Err(ShantyError::Configuration(
                "bypass and readonly are mutually exclusive".to_string(),
            ));
        }

        if self.policy.bypass {
            return Ok(Decision::Live);
        }

        let path = self.fixture_path(request);
        if path.is_file() {
            Ok(Decision::Replay(path))
        } else if self.policy.readonly {
            warn!(
                "Readonly miss: {} {} ({})",
                request.method().to_uppercase(),
                request.url(),
                path.display()
            );
            Err(unknown(request))
        } else {
            Ok(Decision::Record(path))
        }
    }

    /// Replay the stored response for `request`, or run `compute` and record it
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for bypass plus readonly, `UnknownRequest` for
    /// a readonly miss, I/O and decode errors from storage, and whatever
    /// `compute` returns
    pub fn fetch<F>(&self, request: &Request, compute: F) -> Result<Response>
    where
        F: FnOnce() -> Result<Response>,
    {
        match self.plan(request)? {
            Decision::Live => {
                debug!("Bypass: {} {}", request.method(), request.url());
                compute()
            }
            Decision::Replay(path) => self.replay(request, &path),
            Decision::Record(path) => {
                let response = compute()?;
                self.persist(request, &response, &path)?;
                Ok(response)
            }
        }
    }

    /// Async form of [`fetch`](Self::fetch) for transports that return futures
    ///
    /// File I/O stays blocking.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch)
    pub async fn fetch_async<F, Fut>(&self, request: &Request, compute: F) -> Result<Response>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Response>>,
    {
        match self.plan(request)? {
            Decision::Live => {
                debug!("Bypass: {} {}", request.method(), request.url());
                compute().await
            }
            Decision::Replay(path) => self.replay(request, &path),
            Decision::Record(path) => {
                let response = compute().await?;
                self.persist(request, &response, &path)?;
                Ok(response)
            }
        }
    }

    /// True if a fixture exists for `request`
    pub fn has_response_for(&self, request: &Request) -> bool {
        self.fixture_path(request).is_file()
    }

    /// Load the stored response for `request`
    ///
    /// # Errors
    ///
    /// Returns `UnknownRequest` if no fixture exists, or the read/decode error
    pub fn load_response(&self, request: &Request) -> Result<Response> {
        let path = self.fixture_path(request);
        if !path.is_file() {
            return Err(unknown(request));
        }
        self.replay(request, &path)
    }

    /// Persist `response` as the fixture for `request`, replacing any previous one
    ///
    /// # Errors
    ///
    /// Returns I/O errors from writing the fixture
    pub fn store(&self, request: &Request, response: &Response) -> Result<PathBuf> {
        let path = self.fixture_path(request);
        self.persist(request, response, &path)?;
        Ok(path)
    }

    fn replay(&self, request: &Request, path: &Path) -> Result<Response> {
        let response = FixtureRecord::read(path)?.into_response()?;
        debug!(
            "Replayed {} {} -> {} ({})",
            request.method(),
            request.url(),
            response.status(),
            path.display()
        );
        Ok(response)
    }

    fn persist(&self, request: &Request, response: &Response, path: &Path) -> Result<()> {
        let serializer = self.serializer();
        let record = FixtureRecord::new(
            serializer.serialize_request(request),
            serializer.serialize_response(response),
        );
        record.write(path)?;
        info!(
            "Recorded {} {} -> {} ({})",
            request.method(),
            request.url(),
            response.status(),
            path.display()
        );
        Ok(())
    }
}

fn unknown(request: &Request) -> ShantyError {
    ShantyError::unknown_request(request.method(), request.raw_url())
}
