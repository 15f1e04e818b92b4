//! Repository URL validation.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::ValidationError;

static REPO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://([A-Za-z0-9.\-]+)/([\w\-.]+)/([\w\-.]+)/?$").expect("repo url regex")
});

/// A repository URL of the form `https://<host>/<owner>/<repo>[/]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoUrl {
    url: String,
    host: String,
    owner: String,
    repo: String,
}

impl RepoUrl {
    /// Validate `url` against the repository URL shape and the host allow-list.
    ///
    /// Hosts are compared case-insensitively.
    pub fn parse(url: &str, allowed_hosts: &[String]) -> Result<Self, ValidationError> {
        let caps = REPO_RE
            .captures(url)
            .ok_or_else(|| ValidationError::RepoUrl(url.to_string()))?;

        let host = caps[1].to_ascii_lowercase();
        if !allowed_hosts.iter().any(|h| h.eq_ignore_ascii_case(&host)) {
            return Err(ValidationError::RepoHost(host));
        }

        let owner = caps[2].to_string();
        let repo = caps[3].to_string();
        if [&owner, &repo].iter().any(|s| s.as_str() == "." || s.as_str() == "..") {
            return Err(ValidationError::RepoUrl(url.to_string()));
        }

        Ok(Self {
            url: url.to_string(),
            host,
            owner,
            repo,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// URL suitable for `git clone` (no trailing slash).
    pub fn clone_url(&self) -> String {
        format!("https://{}/{}/{}", self.host, self.owner, self.repo)
    }
}

impl fmt::Display for RepoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}
