//! Deployment identifiers.
//!
//! An id doubles as the storage-key prefix and as the DNS label of the
//! deployed site, so it is restricted to lowercase ASCII alphanumerics.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Length of freshly minted ids.
pub const DEFAULT_ID_LEN: usize = 10;

/// Longest id that still fits in a single DNS label.
pub const MAX_ID_LEN: usize = 63;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Largest multiple of the alphabet size below 256. Bytes at or above it are
/// discarded so every character is equally likely.
const REJECT_ABOVE: u8 = (256 / ALPHABET.len() * ALPHABET.len()) as u8;

/// Unique identifier of a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeploymentId(String);

impl DeploymentId {
    /// Mint a new random id of `len` characters (clamped to `1..=63`).
    pub fn mint(len: usize) -> Result<Self, getrandom::Error> {
        let len = len.clamp(1, MAX_ID_LEN);
        let mut id = String::with_capacity(len);
        let mut buf = [0u8; 32];
        while id.len() < len {
            getrandom::getrandom(&mut buf)?;
            for &b in &buf {
                if b >= REJECT_ABOVE {
                    continue;
                }
                id.push(ALPHABET[b as usize % ALPHABET.len()] as char);
                if id.len() == len {
                    break;
                }
            }
        }
        Ok(Self(id))
    }

    /// Validate an untrusted id (request parameter, host label, CLI arg).
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let valid = !s.is_empty()
            && s.len() <= MAX_ID_LEN
            && s.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
        if !valid {
            return Err(ValidationError::DeploymentId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DeploymentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DeploymentId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DeploymentId> for String {
    fn from(id: DeploymentId) -> Self {
        id.0
    }
}
