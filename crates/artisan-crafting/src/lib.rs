//! # Artisan Crafting
//!
//! Recipe registration and resolution.
//!
//! This crate provides the in-memory recipe index:
//! - Recipe data types (shaped and shapeless) and their builders
//! - Trimmed crafting patterns
//! - Per-count recipe trees and shapeless buckets
//! - The concurrent [`RecipeRegistry`] with owner-scoped matching
//!
//! Nothing here performs I/O; recipe files are loaded by the engine.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod bucket;
pub mod pattern;
pub mod recipe;
pub mod recipe_tree;
pub mod registry;
pub mod shapeless;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::bucket::{Buckets, RecipeIndex, RecipeSet};
    pub use crate::pattern::*;
    pub use crate::recipe::{
        Recipe, RecipeError, RecipeResult, ShapedRecipe, ShapedRecipeBuilder, ShapelessRecipe,
        ShapelessRecipeBuilder,
    };
    pub use crate::recipe_tree::RecipeTree;
    pub use crate::registry::*;
    pub use crate::shapeless::ShapelessBucket;
}

pub use prelude::*;
