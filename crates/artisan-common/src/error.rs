//! Error types shared across Artisan crates.

use thiserror::Error;

/// Top-level error type for common Artisan operations.
#[derive(Debug, Error)]
pub enum ArtisanError {
    /// A material string could not be parsed
    #[error("Invalid material: {0:?} (expected \"id\" or \"id:data\")")]
    InvalidMaterial(String),

    /// A schema version string could not be parsed
    #[error("Invalid schema version: {0:?}")]
    InvalidVersion(String),

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Expected version
        expected: String,
        /// Actual version found
        actual: String,
    },
}

/// Result type alias for common Artisan operations.
pub type ArtisanResult<T> = Result<T, ArtisanError>;
