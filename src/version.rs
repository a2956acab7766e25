//! Dotted numeric versions (`major.minor.patch`).
//!
//! Versions compare numerically segment by segment, so `2.0.100` sorts after
//! `2.0.96`. Missing trailing segments are treated as zero (`2.4` == `2.4.0`).

use crate::error::{MigrateError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A totally ordered `major.minor.patch` version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    /// Build a version from its numeric segments.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version string such as `"2.0.107"` or `"v2.4"`.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::InvalidVersion`] for empty input, more than
    /// three segments, or any segment that is not a decimal number.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: String| MigrateError::InvalidVersion {
            input: input.to_owned(),
            reason,
        };

        let trimmed = input.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(invalid("empty version".to_owned()));
        }

        let mut parts = [0u64; 3];
        for (idx, segment) in trimmed.split('.').enumerate() {
            if idx >= parts.len() {
                return Err(invalid("more than three segments".to_owned()));
            }
            if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid(format!("segment '{segment}' is not a number")));
            }
            parts[idx] = segment
                .parse()
                .map_err(|e| invalid(format!("segment '{segment}': {e}")))?;
        }

        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
