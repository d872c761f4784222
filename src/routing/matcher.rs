//! Path matching logic.
//!
//! # Responsibilities
//! - Match a request path against a fixed prefix
//! - Hand back the remainder below the prefix
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Prefixes match whole segments only (`/checklist` never matches `/checklists`)
//! - No regex to guarantee O(n) matching

/// Trait for matching request paths.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// The part of `path` below this matcher, or `None` when it does not match.
    fn strip<'p>(&self, path: &'p str) -> Option<&'p str>;
}

/// Matches `<prefix>/<rest>` with a non-empty rest, e.g. `/@vite/client`.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// `prefix` is given without the trailing slash (`/@vite`).
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        Self { prefix }
    }
}

impl Matcher for PathPrefixMatcher {
    fn strip<'p>(&self, path: &'p str) -> Option<&'p str> {
        path.strip_prefix(self.prefix.as_str())
            .filter(|rest| !rest.is_empty())
    }
}

/// Matches a mount point itself as well as everything below it:
/// `/checklist`, `/checklist/` and `/checklist/<rest>`.
#[derive(Debug, Clone)]
pub struct MountMatcher {
    mount: String,
}

impl MountMatcher {
    pub fn new(mount: impl Into<String>) -> Self {
        Self {
            mount: mount.into().trim_end_matches('/').to_owned(),
        }
    }
}

impl Matcher for MountMatcher {
    fn strip<'p>(&self, path: &'p str) -> Option<&'p str> {
        let rest = path.strip_prefix(self.mount.as_str())?;
        if rest.is_empty() {
            Some(rest)
        } else {
            rest.strip_prefix('/')
        }
    }
}

/// Matches one exact path, e.g. `/@react-refresh`.
#[derive(Debug, Clone)]
pub struct ExactMatcher {
    path: String,
}

impl ExactMatcher {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Matcher for ExactMatcher {
    fn strip<'p>(&self, path: &'p str) -> Option<&'p str> {
        (path == self.path).then_some("")
    }
}
