//! Version types for schema compatibility.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ArtisanError, ArtisanResult};

/// Schema version using semantic versioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Major version (breaking changes)
    pub major: u16,
    /// Minor version (backwards-compatible additions)
    pub minor: u16,
    /// Patch version (bug fixes)
    pub patch: u16,
}

impl SchemaVersion {
    /// Creates a new schema version.
    #[must_use]
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Current recipe file version.
    pub const RECIPE_FILE: Self = Self::new(1, 0, 0);

    /// Current engine configuration version.
    pub const ENGINE_CONFIG: Self = Self::new(1, 0, 0);

    /// Checks if this version can read data from another version.
    #[must_use]
    pub const fn can_read(&self, data_version: &Self) -> bool {
        self.major == data_version.major
    }

    /// Like [`Self::can_read`], but reports the mismatch as an error.
    pub fn ensure_readable(&self, data_version: &Self) -> ArtisanResult<()> {
        if self.can_read(data_version) {
            Ok(())
        } else {
            Err(ArtisanError::VersionMismatch {
                expected: self.to_string(),
                actual: data_version.to_string(),
            })
        }
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SchemaVersion {
    type Err = ArtisanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ArtisanError::InvalidVersion(s.to_string());
        let mut parts = s.trim().splitn(3, '.');
        let mut next = || -> ArtisanResult<u16> {
            match parts.next() {
                Some(part) => part.parse().map_err(|_| invalid()),
                None => Ok(0),
            }
        };
        let major = next()?;
        let minor = next()?;
        let patch = next()?;
        Ok(Self::new(major, minor, patch))
    }
}
