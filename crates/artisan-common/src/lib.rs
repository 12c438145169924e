//! # Artisan Common
//!
//! Common types and shared abstractions for the Artisan recipe engine.
//!
//! This crate provides foundational types used across all Artisan crates:
//! - ID types (MaterialId, OwnerId)
//! - The `Material` trait the recipe core matches against
//! - Version information for schemas
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;
pub mod material;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::material::*;
    pub use crate::version::*;
}

pub use prelude::*;
