//! Configuration types for Shanty

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::overrides::{self, GenericOverrides};
use crate::serializer::{RedactHeaders, RedactSecrets, RequestSerializer, DEFAULT_REPLACEMENT};
use crate::{Result, ShantyError};

/// Environment variable forcing bypass mode on
pub const ENV_BYPASS: &str = "SHANTY_BYPASS";

/// Environment variable forcing readonly mode on
pub const ENV_READONLY: &str = "SHANTY_READONLY";

const TRUTHY: [&str; 4] = ["1", "yes", "y", "true"];

/// Main configuration, as read from a TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Always execute live, never touch fixtures
    #[serde(default)]
    pub bypass: bool,
    /// Only replay; a missing fixture is an error
    #[serde(default)]
    pub readonly: bool,
    /// Root directory for fixtures
    pub storage_dir: PathBuf,
    /// Generic overrides, in precedence order
    #[serde(default)]
    pub generic_responses: Vec<GenericResponseConfig>,
    /// Redaction configuration
    #[serde(default)]
    pub redaction: RedactionConfig,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

/// A pattern to fixture path binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericResponseConfig {
    /// Regex matched against the absolute request URL
    pub pattern: String,
    /// Fixture path relative to the storage directory
    pub path: PathBuf,
}

/// Redaction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionConfig {
    /// Request headers whose values are redacted (case-insensitive)
    #[serde(default)]
    pub headers: Vec<String>,
    /// Literal secrets to redact from request bodies
    #[serde(default)]
    pub secrets: Vec<String>,
    /// Regex patterns to redact from request bodies
    #[serde(default)]
    pub regex_patterns: Vec<String>,
    /// Replacement text
    #[serde(default = "default_replacement")]
    pub replacement: String,
}

fn default_replacement() -> String {
    DEFAULT_REPLACEMENT.to_string()
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            headers: Vec::new(),
            secrets: Vec::new(),
            regex_patterns: Vec::new(),
            replacement: default_replacement(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default)]
    pub level: Option<String>,
    /// Append log lines to this file instead of stderr
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Config {
    /// Configuration with defaults for everything but the storage directory
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            bypass: false,
            readonly: false,
            storage_dir: storage_dir.into(),
            generic_responses: Vec::new(),
            redaction: RedactionConfig::default(),
            log: LogConfig::default(),
        }
    }

    /// Load configuration from TOML file, applying environment overrides
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, parsed or validated
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ShantyError::Configuration(format!("Failed to read config file: {e}"))
        })?;

        let mut config: Self = toml::from_str(&content)
            .map_err(|e| ShantyError::Configuration(format!("Failed to parse config: {e}")))?;

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Force bypass/readonly on from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Force bypass/readonly on from an arbitrary variable lookup
    ///
    /// A truthy value (`1`, `yes`, `y`, `true`, any case) forces the toggle
    /// on; anything else leaves the configured value untouched.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if lookup(ENV_BYPASS).is_some_and(|v| is_truthy(&v)) {
            self.bypass = true;
        }
        if lookup(ENV_READONLY).is_some_and(|v| is_truthy(&v)) {
            self.readonly = true;
        }
    }

    /// Validate configuration
    ///
    /// Bypass together with readonly is accepted here and rejected per call,
    /// so an environment override never prevents loading.
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<()> {
        if self.storage_dir.as_os_str().is_empty() {
            return Err(ShantyError::Configuration(
                "storage_dir cannot be empty".to_string(),
            ));
        }

        if self.storage_dir.exists() && !self.storage_dir.is_dir() {
            return Err(ShantyError::Configuration(format!(
                "storage_dir is not a directory: {}",
                self.storage_dir.display()
            )));
        }

        for generic in &self.generic_responses {
            overrides::bound_path(&generic.path)?;
        }

        if self.bypass && self.readonly {
            warn!("bypass and readonly are both set; every fetch will fail");
        }

        Ok(())
    }

    /// Compile patterns and filters into a runtime policy
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if a generic response or redaction pattern is
    /// not a valid regex
    pub fn to_policy(&self) -> Result<Policy> {
        let mut overrides = GenericOverrides::new();
        for generic in &self.generic_responses {
            overrides.push_pattern(&generic.pattern, &generic.path)?;
        }

        let redaction = &self.redaction;
        let serializer = RequestSerializer::new(
            RedactHeaders::new(&redaction.headers, redaction.replacement.clone()),
            RedactSecrets::new(
                redaction.secrets.clone(),
                &redaction.regex_patterns,
                redaction.replacement.clone(),
            )?,
        );

        Ok(Policy {
            bypass: self.bypass,
            readonly: self.readonly,
            storage_dir: self.storage_dir.clone(),
            overrides,
            serializer,
        })
    }
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    TRUTHY.iter().any(|t| t.eq_ignore_ascii_case(value))
}

/// Read-only snapshot the store consults on every call
#[derive(Debug)]
pub struct Policy {
    /// Always execute live, never touch fixtures
    pub bypass: bool,
    /// Only replay; a missing fixture is an error
    pub readonly: bool,
    /// Root directory for fixtures
    pub storage_dir: PathBuf,
    /// Generic overrides, scanned in order
    pub overrides: GenericOverrides,
    /// Filters used for stored projections, digests and paths
    pub serializer: RequestSerializer,
}

impl Policy {
    /// Normal mode, no overrides, no redaction
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            bypass: false,
            readonly: false,
            storage_dir: storage_dir.into(),
            overrides: GenericOverrides::new(),
            serializer: RequestSerializer::default(),
        }
    }

    /// Set bypass mode
    #[must_use]
    pub fn with_bypass(mut self, bypass: bool) -> Self {
        self.bypass = bypass;
        self
    }

    /// Set readonly mode
    #[must_use]
    pub fn with_readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    /// Replace the generic overrides
    #[must_use]
    pub fn with_overrides(mut self, overrides: GenericOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Replace the request serializer
    #[must_use]
    pub fn with_serializer(mut self, serializer: RequestSerializer) -> Self {
        self.serializer = serializer;
        self
    }
}
