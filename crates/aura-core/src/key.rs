//! Storage key layout.
//!
//! Every stored object lives at `<namespace>/<id>/<relative-path>`. The
//! relative path is built from validated segments only, which keeps the
//! mapping between a local tree and its keys one-to-one and guarantees that
//! a key can never be turned back into a path outside the local root.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::DeploymentId;

/// Top-level key segment separating categories of stored artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Raw source tree as cloned, before the build.
    #[serde(rename = "output")]
    Source,
    /// Build output served by the static host.
    Dist,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Source => "output",
            Namespace::Dist => "dist",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "output" => Ok(Namespace::Source),
            "dist" => Ok(Namespace::Dist),
            other => Err(ValidationError::Namespace(other.to_string())),
        }
    }
}

/// A `/`-separated path made only of safe, non-empty segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelativePath(String);

impl RelativePath {
    /// Parse the part of a storage key that follows its prefix.
    ///
    /// Empty segments are rejected rather than collapsed: collapsing would
    /// let `a//b` and `a/b` land on the same local file.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if s.is_empty() {
            return Err(unsafe_segment(s, ""));
        }
        for segment in s.split('/') {
            check_segment(s, segment)?;
        }
        Ok(Self(s.to_string()))
    }

    /// Map a file below `root` to its relative path.
    ///
    /// Only normal components are accepted, so `file` must already be a
    /// plain descendant of `root` (as produced by walking `root`).
    pub fn from_local(root: &Path, file: &Path) -> Result<Self, ValidationError> {
        let rel = file.strip_prefix(root).map_err(|_| ValidationError::OutsideRoot {
            path: file.display().to_string(),
            root: root.display().to_string(),
        })?;

        let mut segments = Vec::new();
        for component in rel.components() {
            match component {
                Component::Normal(name) => {
                    let name = name
                        .to_str()
                        .ok_or_else(|| ValidationError::NonUtf8Path(rel.display().to_string()))?;
                    check_segment(&rel.display().to_string(), name)?;
                    segments.push(name);
                }
                other => {
                    let display = rel.display().to_string();
                    let segment = other.as_os_str().to_string_lossy().into_owned();
                    return Err(ValidationError::UnsafePath {
                        path: display,
                        segment,
                    });
                }
            }
        }
        if segments.is_empty() {
            return Err(unsafe_segment(&rel.display().to_string(), ""));
        }
        Ok(Self(segments.join("/")))
    }

    /// Join this path onto a local root directory.
    pub fn to_local(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        path.extend(self.0.split('/'));
        path
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validate a single path segment.
///
/// Backslashes are refused on every platform since Windows treats them as
/// separators.
pub fn check_segment(path: &str, segment: &str) -> Result<(), ValidationError> {
    let bad = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0']);
    if bad {
        return Err(unsafe_segment(path, segment));
    }
    Ok(())
}

fn unsafe_segment(path: &str, segment: &str) -> ValidationError {
    ValidationError::UnsafePath {
        path: path.to_string(),
        segment: segment.to_string(),
    }
}

/// The `<namespace>/<id>/` prefix shared by all keys of one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPrefix {
    pub namespace: Namespace,
    pub id: DeploymentId,
}

impl KeyPrefix {
    pub fn new(namespace: Namespace, id: DeploymentId) -> Self {
        Self { namespace, id }
    }

    /// Key of a file below this prefix.
    pub fn key(&self, path: &RelativePath) -> StorageKey {
        StorageKey(format!("{}{}", self, path))
    }

    /// Relative path of `key`, if the key belongs to this prefix.
    pub fn strip<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.namespace.as_str())?
            .strip_prefix('/')?
            .strip_prefix(self.id.as_str())?
            .strip_prefix('/')
    }
}

impl fmt::Display for KeyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/", self.namespace, self.id)
    }
}

/// Full object key: `<namespace>/<id>/<relative-path>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn new(namespace: Namespace, id: &DeploymentId, path: &RelativePath) -> Self {
        Self(format!("{namespace}/{id}/{path}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
