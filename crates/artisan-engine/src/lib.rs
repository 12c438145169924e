//! # Artisan Engine
//!
//! Runtime around the recipe registry.
//!
//! This crate ties the registry to the outside world:
//! - Engine configuration (TOML)
//! - Recipe file loading, validation and hot reload
//! - Craft queries for the `artisan` command-line tool

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod query;
pub mod recipe_loader;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::query::*;
    pub use crate::recipe_loader::*;
}

pub use prelude::*;
