//! Root scoping: where in the document decoded output begins.

use std::fmt;
use std::str::FromStr;

use crate::error::CodecError;

/// A path prefix below which decoded output is materialized.
///
/// Elements at or above the scope are still tokenized and counted, they just
/// never become tree nodes. The default scope is the whole document.
///
/// ```
/// use cmkit_codec::xml::RootScope;
///
/// let scope: RootScope = "/soap:Envelope/soap:Body".parse().unwrap();
/// assert_eq!(scope.depth(), 2);
/// assert!(RootScope::document().is_document());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootScope {
    segments: Vec<String>,
}

impl RootScope {
    /// Scope covering the whole document.
    pub fn document() -> Self {
        Self::default()
    }

    /// Parses a `/`-separated path. Empty and `/` select the whole document.
    pub fn parse(scope: &str) -> Result<Self, CodecError> {
        if scope.is_empty() || scope == "/" {
            return Ok(Self::document());
        }

        let invalid = |reason: &str| CodecError::InvalidScope {
            scope: scope.to_string(),
            reason: reason.to_string(),
        };

        let rest = scope
            .strip_prefix('/')
            .ok_or_else(|| invalid("must start with '/'"))?;

        let segments: Vec<String> = rest.split('/').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(invalid("empty path segment"));
        }

        Ok(Self { segments })
    }

    /// Number of path segments the scope spans.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_document(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns true if the element path lies at or below the scope.
    pub fn contains<S: AsRef<str>>(&self, path: &[S]) -> bool {
        path.len() >= self.segments.len()
            && self
                .segments
                .iter()
                .zip(path)
                .all(|(scope, name)| scope == name.as_ref())
    }
}

impl FromStr for RootScope {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RootScope::parse(s)
    }
}

impl fmt::Display for RootScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}
