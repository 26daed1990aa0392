//! Path pattern compilation and matching.
//!
//! Patterns are written as `/posts/:postId/comments/:commentId`. Segments that
//! start with `:` capture exactly one non-empty path segment; every other
//! segment must match byte-for-byte. A request path matches only when it has
//! the same number of segments as the pattern.

use regex::Regex;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::params::Params;

/// Reasons a route pattern cannot be compiled.
///
/// These surface from route registration, before any request is dispatched.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("route pattern is empty")]
    Empty,
    #[error("route pattern `{0}` must start with `/`")]
    MissingLeadingSlash(String),
    #[error("route pattern `{pattern}` contains an empty segment at position {position}")]
    EmptySegment { pattern: String, position: usize },
    #[error("route pattern `{pattern}` has a parameter without a name at position {position}")]
    UnnamedParam { pattern: String, position: usize },
    #[error("route pattern `{pattern}` failed to compile: {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Strip trailing slashes, keeping the root path `/` intact.
#[must_use]
pub fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

#[derive(Clone)]
enum Matcher {
    /// Zero-parameter patterns compare the normalized strings directly.
    Literal,
    /// Anchored regex with one capture group per parameter, in pattern order.
    Captures(Regex),
}

/// A compiled route pattern.
#[derive(Clone)]
pub struct PathPattern {
    source: String,
    normalized: String,
    param_names: Vec<Arc<str>>,
    matcher: Matcher,
}

impl PathPattern {
    /// Compile a pattern such as `/users/:id`.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] when the pattern is empty, lacks a leading
    /// slash, has an empty interior segment (`/a//b`) or a bare `:` segment.
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        if !pattern.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash(pattern.to_string()));
        }

        let normalized = normalize(pattern);
        if normalized == "/" {
            return Ok(Self {
                source: pattern.to_string(),
                normalized: normalized.to_string(),
                param_names: Vec::new(),
                matcher: Matcher::Literal,
            });
        }

        let mut regex_src = String::with_capacity(normalized.len() + 8);
        regex_src.push('^');
        let mut param_names = Vec::new();

        // The leading slash yields an empty first element; skip it.
        for (position, segment) in normalized.split('/').enumerate().skip(1) {
            if segment.is_empty() {
                return Err(PatternError::EmptySegment {
                    pattern: pattern.to_string(),
                    position,
                });
            }
            regex_src.push('/');
            if let Some(name) = segment.strip_prefix(':') {
                if name.is_empty() {
                    return Err(PatternError::UnnamedParam {
                        pattern: pattern.to_string(),
                        position,
                    });
                }
                regex_src.push_str("([^/]+)");
                param_names.push(Arc::from(name));
            } else {
                regex_src.push_str(&regex::escape(segment));
            }
        }
        regex_src.push('$');

        let matcher = if param_names.is_empty() {
            Matcher::Literal
        } else {
            let regex = Regex::new(&regex_src).map_err(|source| PatternError::Regex {
                pattern: pattern.to_string(),
                source,
            })?;
            Matcher::Captures(regex)
        };

        Ok(Self {
            source: pattern.to_string(),
            normalized: normalized.to_string(),
            param_names,
            matcher,
        })
    }

    /// The pattern as it was registered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Parameter names in left-to-right order. Duplicates are kept.
    #[must_use]
    pub fn param_names(&self) -> &[Arc<str>] {
        &self.param_names
    }

    /// Test `path` against this pattern and extract parameter values in
    /// pattern order. Values are returned as raw strings, never coerced.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<Params> {
        let path = normalize(path);
        match &self.matcher {
            Matcher::Literal => (path == self.normalized).then(Params::new),
            Matcher::Captures(regex) => {
                let caps = regex.captures(path)?;
                let mut params = Params::new();
                for (idx, name) in self.param_names.iter().enumerate() {
                    let value = caps.get(idx + 1)?.as_str();
                    params.push(Arc::clone(name), value.to_string());
                }
                Some(params)
            }
        }
    }
}

impl fmt::Debug for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathPattern")
            .field("source", &self.source)
            .field("param_names", &self.param_names)
            .finish()
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
