//! Shanty - record/replay fixture store for outbound HTTP calls
//!
//! A request is reduced to a SHA-1 fingerprint, the fingerprint maps to a YAML
//! fixture under a storage root, and the [`store::Store`] either replays that
//! fixture or executes the call and records it.

#![deny(unsafe_code)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::multiple_crate_versions
)]

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod fixture;
pub mod logging;
pub mod network;
pub mod overrides;
pub mod request;
pub mod response;
pub mod serializer;
pub mod store;

pub use config::{Config, Policy};
pub use error::{Result, ShantyError};
pub use request::Request;
pub use response::Response;
pub use store::Store;
