//! ID types for materials and recipe owners.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::ArtisanError;

/// Identifier of a material (item or block type) and its data variant.
///
/// Serialized as `"id"` or `"id:data"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MaterialId {
    id: u32,
    data: u16,
}

impl MaterialId {
    /// Creates a base material (data variant 0).
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self { id, data: 0 }
    }

    /// Creates a data variant of a material.
    #[must_use]
    pub const fn with_data(id: u32, data: u16) -> Self {
        Self { id, data }
    }

    /// Returns the raw material ID.
    #[must_use]
    pub const fn id(self) -> u32 {
        self.id
    }

    /// Returns the data variant (0 for a base material).
    #[must_use]
    pub const fn data(self) -> u16 {
        self.data
    }
}

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.data == 0 {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{}:{}", self.id, self.data)
        }
    }
}

impl FromStr for MaterialId {
    type Err = ArtisanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ArtisanError::InvalidMaterial(s.to_string());
        let (id, data) = match s.trim().split_once(':') {
            Some((id, data)) => (id, Some(data)),
            None => (s.trim(), None),
        };
        let id = id.parse().map_err(|_| invalid())?;
        let data = match data {
            Some(data) => data.parse().map_err(|_| invalid())?,
            None => 0,
        };
        Ok(Self { id, data })
    }
}

impl TryFrom<String> for MaterialId {
    type Error = ArtisanError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MaterialId> for String {
    fn from(value: MaterialId) -> Self {
        value.to_string()
    }
}

/// Identity of a recipe owner (plugin or mod).
///
/// Cheap to clone; compares and hashes by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(Arc<str>);

impl OwnerId {
    /// Creates an owner ID from a name.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Returns the owner name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
