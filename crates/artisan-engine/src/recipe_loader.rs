//! Recipe asset loading.
//!
//! This module provides:
//! - Loading recipes from assets/recipes/*.toml
//! - Recipe validation on load
//! - Owner scoping per file
//! - Hot-reload support for development

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use artisan_common::{ArtisanError, MaterialId, OwnerId, SchemaVersion};
use artisan_crafting::{Recipe, RecipeError, RecipeRegistry, ShapedRecipe, ShapelessRecipe};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;

/// Default asset path for recipes.
pub const DEFAULT_RECIPE_PATH: &str = "assets/recipes";

/// Pattern characters that stand for an empty cell.
const EMPTY_CELLS: [char; 2] = [' ', '.'];

/// Registry type used by the engine.
pub type Registry = RecipeRegistry<MaterialId, CraftOutput>;

/// Errors that can occur during recipe loading.
#[derive(Debug, Error)]
pub enum RecipeLoadError {
    /// Failed to read file.
    #[error("Failed to read recipe file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse recipe TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Unreadable or incompatible file version.
    #[error("Unsupported recipe file: {0}")]
    VersionError(#[from] ArtisanError),

    /// File declares no owner while ownerless files are disabled.
    #[error("Recipe file has no owner and ownerless recipes are disabled")]
    MissingOwner,

    /// Invalid recipe pattern or ingredient list.
    #[error("Invalid recipe: {0}")]
    RecipeError(#[from] RecipeError),

    /// Validation error.
    #[error("Recipe validation error: {0}")]
    ValidationError(String),
}

/// Result type for recipe loading operations.
pub type RecipeLoadResult<T> = Result<T, RecipeLoadError>;

/// What a recipe produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CraftOutput {
    /// Display name of the recipe.
    pub name: String,
    /// Material produced.
    pub material: MaterialId,
    /// Quantity produced.
    pub quantity: u32,
}

impl fmt::Display for CraftOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {} ({})", self.quantity, self.material, self.name)
    }
}

/// Recipe output definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDefinition {
    /// Material produced, as `"id"` or `"id:data"`.
    pub material: MaterialId,
    /// Quantity produced.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// A shaped recipe definition loaded from file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapedDefinition {
    /// Display name.
    pub name: String,
    /// Rows of pattern characters; `' '` and `'.'` are empty cells.
    pub pattern: Vec<String>,
    /// Material for each pattern character.
    #[serde(default)]
    pub key: BTreeMap<String, MaterialId>,
    /// Output material and quantity.
    pub result: OutputDefinition,
}

/// A shapeless recipe definition loaded from file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapelessDefinition {
    /// Display name.
    pub name: String,
    /// Ingredients, duplicates included.
    pub ingredients: Vec<MaterialId>,
    /// Require exact data variants.
    #[serde(default)]
    pub include_data: bool,
    /// Output material and quantity.
    pub result: OutputDefinition,
}

fn validate_output(name: &str, result: &OutputDefinition) -> RecipeLoadResult<CraftOutput> {
    if name.trim().is_empty() {
        return Err(RecipeLoadError::ValidationError(
            "Recipe has empty name".to_string(),
        ));
    }
    if result.quantity == 0 {
        return Err(RecipeLoadError::ValidationError(format!(
            "Recipe {name:?} has zero output quantity"
        )));
    }
    Ok(CraftOutput {
        name: name.to_string(),
        material: result.material,
        quantity: result.quantity,
    })
}

impl ShapedDefinition {
    /// Validates the definition and builds the recipe.
    pub fn to_recipe(&self, owner: Option<&OwnerId>) -> RecipeLoadResult<Recipe<MaterialId, CraftOutput>> {
        let output = validate_output(&self.name, &self.result)?;

        let mut key = HashMap::with_capacity(self.key.len());
        for (symbol, material) in &self.key {
            let mut chars = symbol.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if !EMPTY_CELLS.contains(&c) => {
                    key.insert(c, *material);
                },
                _ => {
                    return Err(RecipeLoadError::ValidationError(format!(
                        "Recipe {:?} has invalid key {symbol:?}",
                        self.name
                    )))
                },
            }
        }

        let mut builder = ShapedRecipe::builder(output);
        if let Some(owner) = owner {
            builder = builder.owner(owner.clone());
        }
        for row in &self.pattern {
            let cells = row
                .chars()
                .map(|c| {
                    if EMPTY_CELLS.contains(&c) {
                        Ok(None)
                    } else {
                        key.get(&c).copied().map(Some).ok_or_else(|| {
                            RecipeLoadError::ValidationError(format!(
                                "Recipe {:?} uses {c:?} which is missing from its key",
                                self.name
                            ))
                        })
                    }
                })
                .collect::<RecipeLoadResult<Vec<_>>>()?;
            builder = builder.row(cells);
        }

        Ok(builder.build()?.into())
    }
}

impl ShapelessDefinition {
    /// Validates the definition and builds the recipe.
    pub fn to_recipe(&self, owner: Option<&OwnerId>) -> RecipeLoadResult<Recipe<MaterialId, CraftOutput>> {
        let output = validate_output(&self.name, &self.result)?;

        let mut builder = ShapelessRecipe::builder(output)
            .ingredients(self.ingredients.iter().copied())
            .include_data(self.include_data);
        if let Some(owner) = owner {
            builder = builder.owner(owner.clone());
        }

        Ok(builder.build()?.into())
    }
}

/// A collection of recipes from a single file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeFile {
    /// File format version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Owner the recipes are registered under (None = global only).
    #[serde(default)]
    pub owner: Option<String>,
    /// Shaped recipes in this file.
    #[serde(default)]
    pub shaped: Vec<ShapedDefinition>,
    /// Shapeless recipes in this file.
    #[serde(default)]
    pub shapeless: Vec<ShapelessDefinition>,
}

fn default_version() -> String {
    SchemaVersion::RECIPE_FILE.to_string()
}

impl RecipeFile {
    /// Checks the file version against the supported format.
    pub fn check_version(&self) -> RecipeLoadResult<()> {
        let version: SchemaVersion = self.version.parse()?;
        SchemaVersion::RECIPE_FILE.ensure_readable(&version)?;
        Ok(())
    }

    /// Owner declared by the file.
    #[must_use]
    pub fn owner_id(&self) -> Option<OwnerId> {
        self.owner
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(OwnerId::new)
    }
}

/// Statistics for the recipe loader.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecipeLoaderStats {
    /// Number of files loaded.
    pub files_loaded: u32,
    /// Number of files skipped as unreadable or unsupported.
    pub files_skipped: u32,
    /// Number of recipes registered.
    pub recipes_loaded: u32,
    /// Number of recipes rejected as duplicates.
    pub duplicates: u32,
    /// Number of validation errors.
    pub validation_errors: u32,
    /// Number of hot-reloads performed.
    pub hot_reloads: u32,
}

/// Recipe asset loader with hot-reload support.
#[derive(Debug)]
pub struct RecipeLoader {
    /// Base path for recipe files.
    base_path: PathBuf,
    /// Modification times for hot-reload detection.
    mod_times: HashMap<PathBuf, SystemTime>,
    /// Whether hot-reload is enabled.
    hot_reload_enabled: bool,
    /// Whether files without an owner are accepted.
    allow_ownerless: bool,
    /// Statistics.
    stats: RecipeLoaderStats,
}

impl RecipeLoader {
    /// Creates a new recipe loader.
    #[must_use]
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        let base_path = base_path.into();
        info!("Initializing recipe loader at: {:?}", base_path);

        Self {
            base_path,
            mod_times: HashMap::new(),
            hot_reload_enabled: cfg!(debug_assertions),
            allow_ownerless: true,
            stats: RecipeLoaderStats::default(),
        }
    }

    /// Creates a loader from engine configuration.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.recipe_dir)
            .with_hot_reload(config.hot_reload)
            .with_ownerless(config.allow_ownerless)
    }

    /// Enables or disables hot-reload.
    #[must_use]
    pub fn with_hot_reload(mut self, enabled: bool) -> Self {
        self.hot_reload_enabled = enabled;
        self
    }

    /// Accepts or rejects files that declare no owner.
    #[must_use]
    pub fn with_ownerless(mut self, allowed: bool) -> Self {
        self.allow_ownerless = allowed;
        self
    }

    /// Returns loader statistics.
    #[must_use]
    pub fn stats(&self) -> &RecipeLoaderStats {
        &self.stats
    }

    /// Loads all recipes from the base path into `registry`.
    ///
    /// Files are loaded in path order, so registration order (and with it
    /// which of two same-pattern recipes wins a match) is stable.
    pub fn load_all(&mut self, registry: &Registry) -> RecipeLoadResult<()> {
        if !self.base_path.exists() {
            info!(
                "Recipe directory does not exist, creating: {:?}",
                self.base_path
            );
            fs::create_dir_all(&self.base_path)?;
            return Ok(());
        }

        for path in self.recipe_files()? {
            if let Err(e) = self.load_file(registry, &path) {
                warn!("Failed to load recipe file {:?}: {}", path, e);
                self.stats.files_skipped += 1;
            }
        }

        info!(
            "Loaded {} recipes from {} files ({} duplicates, {} invalid)",
            self.stats.recipes_loaded,
            self.stats.files_loaded,
            self.stats.duplicates,
            self.stats.validation_errors
        );

        Ok(())
    }

    /// Loads recipes from a single file. Returns the number registered.
    pub fn load_file(&mut self, registry: &Registry, path: &Path) -> RecipeLoadResult<u32> {
        debug!("Loading recipe file: {:?}", path);

        // Track modification time for hot-reload, even if the file is rejected
        if let Ok(modified) = fs::metadata(path).and_then(|metadata| metadata.modified()) {
            self.mod_times.insert(path.to_path_buf(), modified);
        }

        let content = fs::read_to_string(path)?;

        let recipe_file: RecipeFile = toml::from_str(&content)?;
        recipe_file.check_version()?;

        let owner = recipe_file.owner_id();
        if owner.is_none() && !self.allow_ownerless {
            return Err(RecipeLoadError::MissingOwner);
        }

        let definitions = recipe_file
            .shaped
            .iter()
            .map(|def| (def.name.as_str(), def.to_recipe(owner.as_ref())))
            .chain(
                recipe_file
                    .shapeless
                    .iter()
                    .map(|def| (def.name.as_str(), def.to_recipe(owner.as_ref()))),
            );

        let mut loaded_count = 0;
        for (name, recipe) in definitions {
            let recipe = match recipe {
                Ok(recipe) => recipe,
                Err(e) => {
                    warn!("Invalid recipe in {:?}: {}", path, e);
                    self.stats.validation_errors += 1;
                    continue;
                },
            };

            if registry.register(recipe) {
                loaded_count += 1;
            } else {
                warn!("Duplicate recipe {:?} in {:?}", name, path);
                self.stats.duplicates += 1;
            }
        }

        self.stats.files_loaded += 1;
        self.stats.recipes_loaded += loaded_count;
        debug!("Loaded {} recipes from {:?}", loaded_count, path);

        Ok(loaded_count)
    }

    /// Checks for added, changed or deleted files and reloads everything.
    ///
    /// Reloading clears `registry` first, so it must not race with other
    /// registrations. Returns true if a reload happened.
    pub fn check_hot_reload(&mut self, registry: &Registry) -> bool {
        if !self.hot_reload_enabled {
            return false;
        }

        let current = match self.recipe_files() {
            Ok(paths) => paths,
            Err(e) => {
                warn!("Failed to scan recipe directory {:?}: {}", self.base_path, e);
                return false;
            },
        };

        let changed = current.len() != self.mod_times.len()
            || current.iter().any(|path| {
                let modified = fs::metadata(path).and_then(|metadata| metadata.modified());
                match (modified, self.mod_times.get(path)) {
                    (Ok(modified), Some(previous)) => modified > *previous,
                    (_, None) => true,
                    (Err(_), Some(_)) => false,
                }
            });
        if !changed {
            return false;
        }

        info!("Hot-reloading recipes from {:?}", self.base_path);
        registry.clear();
        self.mod_times.clear();
        let hot_reloads = self.stats.hot_reloads;
        self.stats = RecipeLoaderStats::default();
        match self.load_all(registry) {
            Ok(()) => {
                self.stats.hot_reloads = hot_reloads + 1;
                true
            },
            Err(e) => {
                warn!("Hot-reload failed: {e}");
                self.stats.hot_reloads = hot_reloads;
                false
            },
        }
    }

    /// Recipe files in the base path, sorted.
    fn recipe_files(&self) -> RecipeLoadResult<Vec<PathBuf>> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.base_path)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();
        Ok(paths)
    }
}
