//! Generic (pattern based) fixture overrides
//!
//! An override binds a URL matcher to a fixture path. Lookup scans overrides
//! in insertion order and the first match wins, so catch-all matchers belong
//! at the end.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use regex::Regex;

use crate::{Result, ShantyError};

/// Decides whether an absolute URL string is served by an override
pub trait UrlMatcher: Send + Sync {
    /// True if `url` matches
    fn matches(&self, url: &str) -> bool;
}

impl UrlMatcher for Regex {
    fn matches(&self, url: &str) -> bool {
        self.is_match(url)
    }
}

impl<F> UrlMatcher for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn matches(&self, url: &str) -> bool {
        self(url)
    }
}

struct Override {
    matcher: Box<dyn UrlMatcher>,
    path: PathBuf,
}

/// Ordered list of (matcher, relative fixture path) pairs
#[derive(Default)]
pub struct GenericOverrides {
    entries: Vec<Override>,
}

impl GenericOverrides {
    /// Create an empty override table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an override; earlier entries take precedence
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if `path` is not a fixture path under the
    /// storage root (see [`bound_path`])
    pub fn push(
        &mut self,
        matcher: impl UrlMatcher + 'static,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let path = bound_path(path.as_ref())?;
        self.entries.push(Override {
            matcher: Box::new(matcher),
            path,
        });
        Ok(())
    }

    /// Builder form of [`push`](Self::push)
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if `path` is rejected by [`push`](Self::push)
    pub fn with(
        mut self,
        matcher: impl UrlMatcher + 'static,
        path: impl AsRef<Path>,
    ) -> Result<Self> {
        self.push(matcher, path)?;
        Ok(self)
    }

    /// Append a regex override
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if `pattern` is not a valid regex or `path` is
    /// rejected by [`push`](Self::push)
    pub fn push_pattern(&mut self, pattern: &str, path: impl AsRef<Path>) -> Result<()> {
        let regex = Regex::new(pattern).map_err(|e| {
            ShantyError::Configuration(format!("Invalid generic response pattern '{pattern}': {e}"))
        })?;
        self.push(regex, path)
    }

    /// Path bound to the first matcher that accepts `url`
    pub fn resolve(&self, url: &str) -> Option<&Path> {
        self.entries
            .iter()
            .find(|entry| entry.matcher.matches(url))
            .map(|entry| entry.path.as_path())
    }

    /// Number of overrides
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no overrides are registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for GenericOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| &entry.path))
            .finish()
    }
}

/// Normalize an override path relative to the storage root
///
/// Root and prefix components are dropped and `.` components skipped. A path
/// that climbs with `..` or names nothing once stripped is rejected.
///
/// # Errors
///
/// Returns `Configuration` if the path escapes the root or is empty
pub fn bound_path(path: &Path) -> Result<PathBuf> {
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
            Component::ParentDir => {
                return Err(ShantyError::Configuration(format!(
                    "Generic response path must stay inside storage_dir: {}",
                    path.display()
                )));
            }
            Component::Normal(part) => relative.push(part),
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(ShantyError::Configuration(format!(
            "Generic response path names no file: '{}'",
            path.display()
        )));
    }

    Ok(relative)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_wins() {
        let overrides = GenericOverrides::new()
            .with(Regex::new("/generic/").unwrap(), "first.yml")
            .unwrap()
            .with(Regex::new(".*").unwrap(), "catch_all.yml")
            .unwrap();

        assert_eq!(
            overrides.resolve("https://example.com/generic/1"),
            Some(Path::new("first.yml"))
        );
        assert_eq!(
            overrides.resolve("https://example.com/other"),
            Some(Path::new("catch_all.yml"))
        );
    }

    #[test]
    fn test_no_match() {
        let overrides = GenericOverrides::new()
            .with(Regex::new("/generic/").unwrap(), "generic.yml")
            .unwrap();
        assert_eq!(overrides.resolve("https://example.com/not_generic/1"), None);
    }

    #[test]
    fn test_leading_separator_stripped() {
        let overrides = GenericOverrides::new().with(
            |url: &str| url.contains("example"),
            "/example.com/hello/get/abc.yml",
        )
        .unwrap();
        assert_eq!(
            overrides.resolve("https://example.com/"),
            Some(Path::new("example.com/hello/get/abc.yml"))
        );
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let mut overrides = GenericOverrides::new();
        let result = overrides.push_pattern("(", "x.yml");
        assert!(matches!(result, Err(ShantyError::Configuration(_))));
        assert!(overrides.is_empty());
    }

    #[test]
    fn test_push_pattern() {
        let mut overrides = GenericOverrides::new();
        overrides.push_pattern(r"/users/\d+$", "users/any.yml").unwrap();
        assert_eq!(overrides.len(), 1);
        assert_eq!(
            overrides.resolve("https://example.com/users/42"),
            Some(Path::new("users/any.yml"))
        );
    }

    #[test]
    fn test_parent_components_rejected() {
        let mut overrides = GenericOverrides::new();
        for path in ["../../outside.yml", "shared/../../outside.yml", "/../x.yml"] {
            let result = overrides.push(|_: &str| true, path);
            assert!(
                matches!(result, Err(ShantyError::Configuration(_))),
                "{path} was accepted"
            );
        }
        assert!(overrides.is_empty());
    }

    #[test]
    fn test_empty_after_stripping_rejected() {
        let mut overrides = GenericOverrides::new();
        for path in ["/", "", ".", "/./"] {
            assert!(
                matches!(
                    overrides.push_pattern(".*", path),
                    Err(ShantyError::Configuration(_))
                ),
                "{path:?} was accepted"
            );
        }
        assert!(overrides.is_empty());
    }

    #[test]
    fn test_current_dir_components_skipped() {
        assert_eq!(
            bound_path(Path::new("./shared/./user.yml")).unwrap(),
            PathBuf::from("shared/user.yml")
        );
    }
}
