//! The recipe registry.
//!
//! Recipes are indexed three ways:
//! - the master index, keyed by ingredient count
//! - the global shaped trees and shapeless buckets, keyed by the number of
//!   distinct materials
//! - per-owner mirrors of the global shaped and shapeless indexes
//!
//! Mutations lock the buckets they touch in a fixed order (owner, global,
//! master) and check all of them before changing any, so a registration
//! either lands in every index or in none.

use std::fmt;
use std::sync::Arc;

use ahash::{AHashSet, RandomState};
use artisan_common::{Material, OwnerId};
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::bucket::{Buckets, RecipeIndex, RecipeSet};
use crate::recipe::{Recipe, ShapedRecipe, ShapelessRecipe};
use crate::recipe_tree::{RecipeTree, ShapedQuery};
use crate::shapeless::{ShapelessBucket, ShapelessQuery};

/// Indexes scoped to one owner.
#[derive(Debug)]
struct OwnerBuckets<M, R> {
    shaped: Buckets<RecipeTree<M, R>>,
    shapeless: Buckets<ShapelessBucket<M, R>>,
}

impl<M, R> Default for OwnerBuckets<M, R> {
    fn default() -> Self {
        Self {
            shaped: Buckets::default(),
            shapeless: Buckets::default(),
        }
    }
}

/// Per-index outcome of a removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Removal {
    /// Removed from the owner-scoped index
    pub owner: bool,
    /// Removed from the global shaped/shapeless index
    pub global: bool,
    /// Removed from the master index
    pub master: bool,
    /// Whether the recipe has an owner, i.e. whether `owner` applies
    pub scoped: bool,
}

impl Removal {
    /// Returns true if the recipe left at least one index.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.owner || self.global || self.master
    }

    /// Returns true if the recipe left every index it belongs to.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.global && self.master && (self.owner || !self.scoped)
    }
}

/// Registry size summary. Bucket counts only include non-empty buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Recipes in the master index
    pub recipes: usize,
    /// Shaped recipes in the global trees
    pub shaped: usize,
    /// Shapeless recipes in the global buckets
    pub shapeless: usize,
    /// Live master index buckets
    pub master_buckets: usize,
    /// Live global shaped trees
    pub shaped_buckets: usize,
    /// Live global shapeless buckets
    pub shapeless_buckets: usize,
    /// Owners with at least one live bucket
    pub owners: usize,
    /// Live owner-scoped buckets, shaped and shapeless, across all owners
    pub owner_buckets: usize,
}

/// Concurrent registry of shaped and shapeless recipes.
///
/// The registry is shared by reference (usually behind an `Arc`); every
/// operation takes `&self`.
pub struct RecipeRegistry<M, R> {
    all_recipes: Buckets<RecipeSet<M, R>>,
    all_shaped: Buckets<RecipeTree<M, R>>,
    all_shapeless: Buckets<ShapelessBucket<M, R>>,
    owners: DashMap<OwnerId, Arc<OwnerBuckets<M, R>>, RandomState>,
}

impl<M, R> Default for RecipeRegistry<M, R> {
    fn default() -> Self {
        Self {
            all_recipes: Buckets::default(),
            all_shaped: Buckets::default(),
            all_shapeless: Buckets::default(),
            owners: DashMap::with_hasher(RandomState::new()),
        }
    }
}

impl<M: Material, R: Send + Sync> fmt::Debug for RecipeRegistry<M, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecipeRegistry")
            .field("stats", &self.stats())
            .finish()
    }
}

impl<M: Material, R: Send + Sync> RecipeRegistry<M, R> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Registers a recipe in every index it belongs to.
    ///
    /// Returns false, without changing anything, if any target index already
    /// holds a recipe with the same identity.
    pub fn register(&self, recipe: Recipe<M, R>) -> bool {
        let master = self.all_recipes.get_or_create(recipe.ingredient_count());
        let registered = match &recipe {
            Recipe::Shaped(shaped) => {
                let key = shaped.distinct_count();
                let scoped = shaped
                    .owner()
                    .map(|owner| self.owner_buckets_or_create(owner).shaped.get_or_create(key));
                let global = self.all_shaped.get_or_create(key);
                commit(scoped.as_deref(), &global, &master, shaped, &recipe)
            },
            Recipe::Shapeless(shapeless) => {
                let key = shapeless.distinct_count();
                let scoped = shapeless.owner().map(|owner| {
                    self.owner_buckets_or_create(owner)
                        .shapeless
                        .get_or_create(key)
                });
                let global = self.all_shapeless.get_or_create(key);
                commit(scoped.as_deref(), &global, &master, shapeless, &recipe)
            },
        };

        if registered {
            debug!(
                "Registered {} recipe (owner: {:?}, distinct: {}, ingredients: {})",
                variant_name(&recipe),
                recipe.owner(),
                recipe.distinct_count(),
                recipe.ingredient_count()
            );
        } else {
            debug!(
                "Rejected duplicate {} recipe (owner: {:?})",
                variant_name(&recipe),
                recipe.owner()
            );
        }
        registered
    }

    /// Registers every recipe.
    ///
    /// Note the inverted convention: returns true if *any* registration
    /// failed, false if all succeeded.
    pub fn register_all(&self, recipes: impl IntoIterator<Item = Recipe<M, R>>) -> bool {
        let mut failed = false;
        for recipe in recipes {
            failed |= !self.register(recipe);
        }
        failed
    }

    // ------------------------------------------------------------------------
    // Removal
    // ------------------------------------------------------------------------

    /// Removes a recipe from every index holding it.
    ///
    /// Returns true if the recipe was found anywhere.
    pub fn remove(&self, recipe: &Recipe<M, R>) -> bool {
        self.take(recipe).0.any()
    }

    /// Removes a recipe and reports the outcome per index.
    ///
    /// Owner-scoped and global indexes are stripped independently: a
    /// recipe missing from one never blocks removal from the others.
    pub fn remove_detailed(&self, recipe: &Recipe<M, R>) -> Removal {
        self.take(recipe).0
    }

    /// Replaces `old` with `new`.
    ///
    /// Fails without registering `new` if `old` is not registered. If `new`
    /// is rejected, `old` is put back.
    pub fn replace_recipe(&self, old: &Recipe<M, R>, new: Recipe<M, R>) -> bool {
        let (removal, stored) = self.take(old);
        if !removal.any() {
            return false;
        }
        if self.register(new) {
            return true;
        }

        let restored = stored.unwrap_or_else(|| old.clone());
        if !self.register(restored) {
            warn!(
                "Failed to restore {} recipe after rejected replacement (owner: {:?})",
                variant_name(old),
                old.owner()
            );
        }
        false
    }

    /// Empties every index, global and per owner.
    ///
    /// Not linearizable with concurrent registration: call it while no
    /// other thread mutates the registry.
    pub fn clear(&self) {
        self.all_recipes.clear();
        self.all_shaped.clear();
        self.all_shapeless.clear();
        self.owners.clear();
        debug!("Cleared recipe registry");
    }

    /// Strips `recipe` and returns the stored copy from the master index.
    fn take(&self, recipe: &Recipe<M, R>) -> (Removal, Option<Recipe<M, R>>) {
        let master = self.all_recipes.get(recipe.ingredient_count());
        let (removal, stored) = match recipe {
            Recipe::Shaped(shaped) => {
                let key = shaped.distinct_count();
                let scoped = shaped
                    .owner()
                    .and_then(|owner| self.owner_buckets(owner))
                    .and_then(|buckets| buckets.shaped.get(key));
                let global = self.all_shaped.get(key);
                strip(
                    scoped.as_deref(),
                    global.as_deref(),
                    master.as_deref(),
                    shaped,
                    recipe,
                )
            },
            Recipe::Shapeless(shapeless) => {
                let key = shapeless.distinct_count();
                let scoped = shapeless
                    .owner()
                    .and_then(|owner| self.owner_buckets(owner))
                    .and_then(|buckets| buckets.shapeless.get(key));
                let global = self.all_shapeless.get(key);
                strip(
                    scoped.as_deref(),
                    global.as_deref(),
                    master.as_deref(),
                    shapeless,
                    recipe,
                )
            },
        };

        if removal.any() && !removal.is_complete() {
            warn!(
                "Partially removed {} recipe (owner: {:?}): {:?}",
                variant_name(recipe),
                recipe.owner(),
                removal
            );
        } else if removal.any() {
            debug!(
                "Removed {} recipe (owner: {:?})",
                variant_name(recipe),
                recipe.owner()
            );
        }
        (removal, stored)
    }

    // ------------------------------------------------------------------------
    // Matching
    // ------------------------------------------------------------------------

    /// Resolves a grid against every registered shaped recipe.
    ///
    /// The exact pattern is tried first, then the pattern with every
    /// material replaced by its parent. Empty or ragged grids never match.
    #[must_use]
    pub fn match_shaped_recipe<Row: AsRef<[Option<M>]>>(
        &self,
        grid: &[Row],
    ) -> Option<Arc<ShapedRecipe<M, R>>> {
        ShapedQuery::new(grid)?.resolve(&self.all_shaped)
    }

    /// Resolves a grid, preferring recipes registered by `owner`.
    #[must_use]
    pub fn match_shaped_recipe_for<Row: AsRef<[Option<M>]>>(
        &self,
        owner: &OwnerId,
        grid: &[Row],
    ) -> Option<Arc<ShapedRecipe<M, R>>> {
        let query = ShapedQuery::new(grid)?;
        self.owner_buckets(owner)
            .and_then(|buckets| query.resolve(&buckets.shaped))
            .or_else(|| query.resolve(&self.all_shaped))
    }

    /// Resolves an unordered collection against every shapeless recipe.
    ///
    /// Duplicates count: the input must equal a recipe's ingredients as a
    /// multiset. An empty collection never matches.
    #[must_use]
    pub fn match_shapeless_recipe(&self, materials: &[M]) -> Option<Arc<ShapelessRecipe<M, R>>> {
        ShapelessQuery::new(materials)?.resolve(&self.all_shapeless)
    }

    /// Resolves a collection, preferring recipes registered by `owner`.
    #[must_use]
    pub fn match_shapeless_recipe_for(
        &self,
        owner: &OwnerId,
        materials: &[M],
    ) -> Option<Arc<ShapelessRecipe<M, R>>> {
        let query = ShapelessQuery::new(materials)?;
        self.owner_buckets(owner)
            .and_then(|buckets| query.resolve(&buckets.shapeless))
            .or_else(|| query.resolve(&self.all_shapeless))
    }

    // ------------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------------

    /// Every registered recipe.
    #[must_use]
    pub fn get_all_recipes(&self) -> AHashSet<Recipe<M, R>> {
        let mut recipes = AHashSet::new();
        for (_, bucket) in self.all_recipes.snapshot() {
            recipes.extend(bucket.read().iter().cloned());
        }
        recipes
    }

    /// Shaped recipes registered by `owner`; empty for an unknown owner.
    #[must_use]
    pub fn get_shaped_recipes(&self, owner: &OwnerId) -> AHashSet<Arc<ShapedRecipe<M, R>>> {
        let mut recipes = AHashSet::new();
        if let Some(buckets) = self.owner_buckets(owner) {
            for (_, tree) in buckets.shaped.snapshot() {
                recipes.extend(tree.read().recipes());
            }
        }
        recipes
    }

    /// Shapeless recipes registered by `owner`; empty for an unknown owner.
    #[must_use]
    pub fn get_shapeless_recipes(
        &self,
        owner: &OwnerId,
    ) -> AHashSet<Arc<ShapelessRecipe<M, R>>> {
        let mut recipes = AHashSet::new();
        if let Some(buckets) = self.owner_buckets(owner) {
            for (_, bucket) in buckets.shapeless.snapshot() {
                recipes.extend(bucket.read().recipes().cloned());
            }
        }
        recipes
    }

    /// Number of registered recipes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.all_recipes.entry_count()
    }

    /// Returns true if no recipe is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Owners with at least one registered recipe, sorted by name.
    #[must_use]
    pub fn owners(&self) -> Vec<OwnerId> {
        let mut owners: Vec<OwnerId> = self
            .owner_snapshot()
            .into_iter()
            .filter(|(_, buckets)| {
                buckets.shaped.live_count() + buckets.shapeless.live_count() > 0
            })
            .map(|(owner, _)| owner)
            .collect();
        owners.sort_unstable_by(|a, b| a.name().cmp(b.name()));
        owners
    }

    /// Summarizes the registry.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats {
            recipes: self.all_recipes.entry_count(),
            shaped: self.all_shaped.entry_count(),
            shapeless: self.all_shapeless.entry_count(),
            master_buckets: self.all_recipes.live_count(),
            shaped_buckets: self.all_shaped.live_count(),
            shapeless_buckets: self.all_shapeless.live_count(),
            ..RegistryStats::default()
        };
        for (_, buckets) in self.owner_snapshot() {
            let live = buckets.shaped.live_count() + buckets.shapeless.live_count();
            if live > 0 {
                stats.owners += 1;
                stats.owner_buckets += live;
            }
        }
        stats
    }

    // ------------------------------------------------------------------------
    // Owners
    // ------------------------------------------------------------------------

    fn owner_buckets(&self, owner: &OwnerId) -> Option<Arc<OwnerBuckets<M, R>>> {
        self.owners.get(owner).map(|buckets| Arc::clone(buckets.value()))
    }

    fn owner_buckets_or_create(&self, owner: &OwnerId) -> Arc<OwnerBuckets<M, R>> {
        Arc::clone(self.owners.entry(owner.clone()).or_default().value())
    }

    fn owner_snapshot(&self) -> Vec<(OwnerId, Arc<OwnerBuckets<M, R>>)> {
        self.owners
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }
}

/// Inserts into every target bucket, or into none if any holds a duplicate.
fn commit<M, R, T>(
    scoped: Option<&RwLock<T>>,
    global: &RwLock<T>,
    master: &RwLock<RecipeSet<M, R>>,
    entry: &T::Entry,
    recipe: &Recipe<M, R>,
) -> bool
where
    M: Material,
    R: Send + Sync,
    T: RecipeIndex,
{
    let mut scoped = scoped.map(|lock| lock.write());
    let mut global = global.write();
    let mut master = master.write();

    let duplicate = scoped.as_ref().is_some_and(|bucket| bucket.contains(entry))
        || global.contains(entry)
        || master.contains(recipe);
    if duplicate {
        return false;
    }

    if let Some(bucket) = scoped.as_mut() {
        bucket.insert(entry.clone());
    }
    global.insert(entry.clone());
    master.insert(recipe.clone());
    true
}

/// Removes from every bucket that holds the recipe, independently.
fn strip<M, R, T>(
    scoped: Option<&RwLock<T>>,
    global: Option<&RwLock<T>>,
    master: Option<&RwLock<RecipeSet<M, R>>>,
    entry: &T::Entry,
    recipe: &Recipe<M, R>,
) -> (Removal, Option<Recipe<M, R>>)
where
    M: Material,
    R: Send + Sync,
    T: RecipeIndex,
{
    let mut scoped = scoped.map(|lock| lock.write());
    let mut global = global.map(|lock| lock.write());
    let mut master = master.map(|lock| lock.write());

    let stored = master.as_mut().and_then(|bucket| bucket.remove(recipe));
    let removal = Removal {
        owner: scoped
            .as_mut()
            .is_some_and(|bucket| bucket.remove(entry).is_some()),
        global: global
            .as_mut()
            .is_some_and(|bucket| bucket.remove(entry).is_some()),
        master: stored.is_some(),
        scoped: recipe.owner().is_some(),
    };
    (removal, stored)
}

fn variant_name<M, R>(recipe: &Recipe<M, R>) -> &'static str {
    match recipe {
        Recipe::Shaped(_) => "shaped",
        Recipe::Shapeless(_) => "shapeless",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artisan_common::MaterialId;
    use proptest::prelude::*;

    type Registry = RecipeRegistry<MaterialId, &'static str>;

    const PLANK: MaterialId = MaterialId::new(5);
    const STICK: MaterialId = MaterialId::new(280);
    const COAL: MaterialId = MaterialId::new(263);
    const IRON: MaterialId = MaterialId::new(265);
    const WOOL: MaterialId = MaterialId::new(35);
    const RED_WOOL: MaterialId = MaterialId::with_data(35, 14);
    const BLUE_WOOL: MaterialId = MaterialId::with_data(35, 11);
    const DYE: MaterialId = MaterialId::new(351);
    const RED_DYE: MaterialId = MaterialId::with_data(351, 1);
    const YELLOW_DYE: MaterialId = MaterialId::with_data(351, 11);

    fn shaped(
        owner: Option<&str>,
        rows: &[&[Option<MaterialId>]],
        result: &'static str,
    ) -> Recipe<MaterialId, &'static str> {
        let mut builder = ShapedRecipe::builder(result);
        if let Some(owner) = owner {
            builder = builder.owner(OwnerId::new(owner));
        }
        for row in rows {
            builder = builder.row(row.iter().copied());
        }
        builder.build().expect("valid pattern").into()
    }

    fn shapeless(
        owner: Option<&str>,
        ingredients: &[MaterialId],
        include_data: bool,
        result: &'static str,
    ) -> Recipe<MaterialId, &'static str> {
        let mut builder = ShapelessRecipe::builder(result)
            .ingredients(ingredients.iter().copied())
            .include_data(include_data);
        if let Some(owner) = owner {
            builder = builder.owner(OwnerId::new(owner));
        }
        builder.build().expect("has ingredients").into()
    }

    fn torch(owner: Option<&str>, result: &'static str) -> Recipe<MaterialId, &'static str> {
        shaped(owner, &[&[Some(COAL)], &[Some(STICK)]], result)
    }

    /// Everything observable about the registry contents.
    fn observe(
        registry: &Registry,
        owner: &OwnerId,
    ) -> (
        AHashSet<Recipe<MaterialId, &'static str>>,
        AHashSet<Arc<ShapedRecipe<MaterialId, &'static str>>>,
        AHashSet<Arc<ShapelessRecipe<MaterialId, &'static str>>>,
        RegistryStats,
    ) {
        (
            registry.get_all_recipes(),
            registry.get_shaped_recipes(owner),
            registry.get_shapeless_recipes(owner),
            registry.stats(),
        )
    }

    #[test]
    fn test_register_and_match_shaped() {
        let registry = Registry::new();
        assert!(registry.register(torch(None, "torch")));

        let grid = [
            [None, None, None],
            [None, Some(COAL), None],
            [None, Some(STICK), None],
        ];
        let found = registry.match_shaped_recipe(&grid).expect("torch matches");
        assert_eq!(*found.result(), "torch");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_indexes_by_both_counts() {
        let registry = Registry::new();
        // 2x2 of planks and sticks: 4 cells, 2 distinct materials
        assert!(registry.register(shaped(
            None,
            &[&[Some(PLANK), Some(PLANK)], &[Some(STICK), Some(STICK)]],
            "fence",
        )));

        assert_eq!(registry.all_recipes.live_keys(), vec![4]);
        assert_eq!(registry.all_shaped.live_keys(), vec![2]);

        // Same 4 cells but 3 distinct materials never reaches the tree
        let three = [[Some(PLANK), Some(COAL)], [Some(STICK), Some(STICK)]];
        assert!(registry.match_shaped_recipe(&three).is_none());

        let exact = [[Some(PLANK), Some(PLANK)], [Some(STICK), Some(STICK)]];
        assert!(registry.match_shaped_recipe(&exact).is_some());
    }

    #[test]
    fn test_duplicate_shaped_rejected() {
        let registry = Registry::new();
        assert!(registry.register(torch(None, "first")));
        assert!(!registry.register(torch(None, "second")));

        let stats = registry.stats();
        assert_eq!(stats.recipes, 1);
        assert_eq!(stats.shaped, 1);

        let grid = [[Some(COAL)], [Some(STICK)]];
        let found = registry.match_shaped_recipe(&grid).expect("one copy");
        assert_eq!(*found.result(), "first");

        assert!(registry.remove(&torch(None, "first")));
        assert!(registry.match_shaped_recipe(&grid).is_none());
    }

    #[test]
    fn test_duplicate_registration_is_atomic() {
        let registry = Registry::new();
        // Ownerless copy occupies the global tree and master index
        assert!(registry.register(torch(None, "global")));
        assert!(registry.register(torch(Some("extras"), "owned")));
        // A second owned copy collides in the owner tree only
        assert!(!registry.register(torch(Some("extras"), "again")));

        let stats = registry.stats();
        assert_eq!(stats.recipes, 2);
        assert_eq!(stats.shaped, 2);
        assert_eq!(registry.get_shaped_recipes(&OwnerId::new("extras")).len(), 1);
    }

    #[test]
    fn test_owner_precedence() {
        let registry = Registry::new();
        let owner = OwnerId::new("extras");
        assert!(registry.register(torch(None, "global torch")));
        assert!(registry.register(torch(Some("extras"), "owner torch")));

        let grid = [[Some(COAL)], [Some(STICK)]];
        let scoped = registry
            .match_shaped_recipe_for(&owner, &grid)
            .expect("owner recipe");
        assert_eq!(*scoped.result(), "owner torch");

        let global = registry.match_shaped_recipe(&grid).expect("global recipe");
        assert_eq!(*global.result(), "global torch");

        // Unknown owners fall back to the global view
        let other = registry
            .match_shaped_recipe_for(&OwnerId::new("nobody"), &grid)
            .expect("global fallback");
        assert_eq!(*other.result(), "global torch");
    }

    #[test]
    fn test_shaped_parent_fallback() {
        let registry = Registry::new();
        assert!(registry.register(shaped(None, &[&[Some(WOOL)], &[Some(STICK)]], "banner")));

        let grid = [[Some(RED_WOOL)], [Some(STICK)]];
        let found = registry.match_shaped_recipe(&grid).expect("generalized match");
        assert_eq!(*found.result(), "banner");
    }

    #[test]
    fn test_shaped_fallback_keeps_raw_bucket_key() {
        let registry = Registry::new();
        assert!(registry.register(shaped(
            None,
            &[&[Some(WOOL), Some(WOOL)], &[Some(PLANK), Some(PLANK)]],
            "bed",
        )));

        // Mixed colours: 3 distinct raw materials, so the key-2 tree is never searched
        let grid = [[Some(RED_WOOL), Some(BLUE_WOOL)], [Some(PLANK), Some(PLANK)]];
        assert!(registry.match_shaped_recipe(&grid).is_none());
        assert!(registry
            .match_shaped_recipe_for(&OwnerId::new("nobody"), &grid)
            .is_none());

        let uniform = [[Some(RED_WOOL), Some(RED_WOOL)], [Some(PLANK), Some(PLANK)]];
        let found = registry.match_shaped_recipe(&uniform).expect("same key");
        assert_eq!(*found.result(), "bed");
    }

    #[test]
    fn test_owner_generalized_beats_global_exact() {
        let registry = Registry::new();
        let owner = OwnerId::new("looms");
        assert!(registry.register(shaped(
            None,
            &[&[Some(RED_WOOL)], &[Some(STICK)]],
            "global red banner",
        )));
        assert!(registry.register(shaped(
            Some("looms"),
            &[&[Some(WOOL)], &[Some(STICK)]],
            "owner banner",
        )));

        let grid = [[Some(RED_WOOL)], [Some(STICK)]];
        let scoped = registry
            .match_shaped_recipe_for(&owner, &grid)
            .expect("owner generalized match");
        assert_eq!(*scoped.result(), "owner banner");

        let global = registry.match_shaped_recipe(&grid).expect("global exact match");
        assert_eq!(*global.result(), "global red banner");
    }

    #[test]
    fn test_shaped_exact_variant_wins_over_parent() {
        let registry = Registry::new();
        assert!(registry.register(shaped(None, &[&[Some(WOOL), Some(WOOL)]], "carpet")));
        assert!(registry.register(shaped(
            None,
            &[&[Some(RED_WOOL), Some(RED_WOOL)]],
            "red carpet",
        )));

        let red = [[Some(RED_WOOL), Some(RED_WOOL)]];
        let found = registry.match_shaped_recipe(&red).expect("exact match");
        assert_eq!(*found.result(), "red carpet");

        let blue = [[Some(BLUE_WOOL), Some(BLUE_WOOL)]];
        let found = registry.match_shaped_recipe(&blue).expect("parent match");
        assert_eq!(*found.result(), "carpet");
    }

    #[test]
    fn test_shapeless_parent_generalization() {
        let registry = Registry::new();
        assert!(registry.register(shapeless(None, &[DYE, WOOL], false, "dyed wool")));

        let found = registry
            .match_shapeless_recipe(&[RED_WOOL, YELLOW_DYE])
            .expect("parents match");
        assert_eq!(*found.result(), "dyed wool");
    }

    #[test]
    fn test_shapeless_exact_data_isolation() {
        let registry = Registry::new();
        assert!(registry.register(shapeless(None, &[DYE, WOOL], true, "exact")));

        assert!(registry.match_shapeless_recipe(&[RED_DYE, RED_WOOL]).is_none());
        assert!(registry.match_shapeless_recipe(&[WOOL, DYE]).is_some());
    }

    #[test]
    fn test_shapeless_exact_variant_recipe() {
        let registry = Registry::new();
        assert!(registry.register(shapeless(None, &[RED_DYE, YELLOW_DYE], true, "orange")));

        let found = registry
            .match_shapeless_recipe(&[YELLOW_DYE, RED_DYE])
            .expect("exact variants");
        assert_eq!(*found.result(), "orange");
        assert!(registry.match_shapeless_recipe(&[RED_DYE, RED_DYE]).is_none());
    }

    #[test]
    fn test_shapeless_multiplicity_matters() {
        let registry = Registry::new();
        assert!(registry.register(shapeless(None, &[IRON, IRON, STICK], false, "shears")));

        assert!(registry.match_shapeless_recipe(&[IRON, STICK]).is_none());
        assert!(registry.match_shapeless_recipe(&[IRON, STICK, STICK]).is_none());
        assert!(registry.match_shapeless_recipe(&[STICK, IRON, IRON]).is_some());
    }

    #[test]
    fn test_shapeless_owner_precedence() {
        let registry = Registry::new();
        let owner = OwnerId::new("alchemy");
        assert!(registry.register(shapeless(None, &[COAL, STICK], false, "global")));
        assert!(registry.register(shapeless(Some("alchemy"), &[COAL, STICK], false, "owned")));

        let found = registry
            .match_shapeless_recipe_for(&owner, &[STICK, COAL])
            .expect("owner recipe");
        assert_eq!(*found.result(), "owned");
        let found = registry
            .match_shapeless_recipe(&[STICK, COAL])
            .expect("global recipe");
        assert_eq!(*found.result(), "global");
    }

    #[test]
    fn test_no_match_on_empty_input() {
        let registry = Registry::new();
        registry.register(torch(None, "torch"));
        registry.register(shapeless(None, &[COAL], false, "dust"));

        let empty_rows: [[Option<MaterialId>; 3]; 0] = [];
        assert!(registry.match_shaped_recipe(&empty_rows).is_none());
        assert!(registry.match_shaped_recipe(&[[None, None], [None, None]]).is_none());
        assert!(registry
            .match_shaped_recipe_for(&OwnerId::new("x"), &[[None::<MaterialId>]])
            .is_none());
        assert!(registry.match_shapeless_recipe(&[]).is_none());
        assert!(registry
            .match_shapeless_recipe_for(&OwnerId::new("x"), &[])
            .is_none());

        let ragged = vec![vec![Some(COAL)], vec![Some(STICK), None]];
        assert!(registry.match_shaped_recipe(&ragged).is_none());
    }

    #[test]
    fn test_round_trip_restores_state() {
        let registry = Registry::new();
        let owner = OwnerId::new("extras");
        registry.register(torch(Some("extras"), "torch"));
        registry.register(shapeless(None, &[COAL, PLANK], false, "kindling"));
        let before = observe(&registry, &owner);

        for recipe in [
            shaped(Some("extras"), &[&[Some(IRON), None], &[None, Some(IRON)]], "shears"),
            shapeless(Some("extras"), &[RED_DYE, WOOL], true, "red wool"),
            shaped(None, &[&[Some(PLANK)], &[Some(PLANK)]], "sticks"),
        ] {
            assert!(registry.register(recipe.clone()));
            assert_ne!(observe(&registry, &owner), before);
            let removal = registry.remove_detailed(&recipe);
            assert!(removal.is_complete());
            assert_eq!(observe(&registry, &owner), before);
        }
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let registry = Registry::new();
        registry.register(torch(None, "torch"));
        let before = registry.stats();

        assert!(!registry.remove(&torch(Some("extras"), "torch")));
        assert_eq!(registry.remove_detailed(&torch(Some("extras"), "x")), Removal {
            scoped: true,
            ..Removal::default()
        });
        assert_eq!(registry.stats(), before);
    }

    #[test]
    fn test_remove_does_not_touch_other_scopes() {
        let registry = Registry::new();
        let owner = OwnerId::new("extras");
        registry.register(torch(None, "global"));
        registry.register(torch(Some("extras"), "owned"));

        assert!(registry.remove(&torch(Some("extras"), "owned")));
        assert!(registry.get_shaped_recipes(&owner).is_empty());

        let grid = [[Some(COAL)], [Some(STICK)]];
        let found = registry
            .match_shaped_recipe_for(&owner, &grid)
            .expect("global copy survives");
        assert_eq!(*found.result(), "global");
        assert!(registry.owners().is_empty());
    }

    #[test]
    fn test_register_all_inverted_result() {
        let registry = Registry::new();
        let failed = registry.register_all([torch(None, "a"), shapeless(None, &[COAL], false, "b")]);
        assert!(!failed);

        let failed = registry.register_all([torch(None, "again"), shapeless(None, &[IRON], false, "c")]);
        assert!(failed);
        // The non-duplicate still landed
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_replace_recipe() {
        let registry = Registry::new();
        let old = torch(None, "torch");
        let new = shaped(None, &[&[Some(COAL)], &[Some(STICK)], &[Some(STICK)]], "tall torch");
        registry.register(old.clone());

        assert!(registry.replace_recipe(&old, new.clone()));
        assert!(registry.match_shaped_recipe(&[[Some(COAL)], [Some(STICK)]]).is_none());
        assert!(registry
            .match_shaped_recipe(&[[Some(COAL)], [Some(STICK)], [Some(STICK)]])
            .is_some());

        // Nothing to remove: nothing registered
        let other = shapeless(None, &[PLANK], false, "buttons");
        assert!(!registry.replace_recipe(&old, other.clone()));
        assert!(!registry.get_all_recipes().contains(&other));
    }

    #[test]
    fn test_replace_recipe_restores_old_on_rejection() {
        let registry = Registry::new();
        let old = torch(None, "torch");
        let taken = shapeless(None, &[COAL], false, "dust");
        registry.register(old.clone());
        registry.register(taken.clone());
        let before = registry.get_all_recipes();

        assert!(!registry.replace_recipe(&old, taken));
        assert_eq!(registry.get_all_recipes(), before);
        let found = registry
            .match_shaped_recipe(&[[Some(COAL)], [Some(STICK)]])
            .expect("old recipe restored");
        assert_eq!(*found.result(), "torch");
    }

    #[test]
    fn test_clear_wipes_everything() {
        let registry = Registry::new();
        let owner = OwnerId::new("extras");
        registry.register(torch(Some("extras"), "torch"));
        registry.register(shapeless(Some("extras"), &[COAL], false, "dust"));

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.stats(), RegistryStats::default());
        assert!(registry.get_shaped_recipes(&owner).is_empty());
        assert!(registry.get_shapeless_recipes(&owner).is_empty());
        assert!(registry.match_shaped_recipe_for(&owner, &[[Some(COAL)], [Some(STICK)]]).is_none());

        // Usable again afterwards
        assert!(registry.register(torch(Some("extras"), "torch")));
        assert_eq!(registry.owners(), vec![owner]);
    }

    #[test]
    fn test_concurrent_registration_creates_every_bucket() {
        const OWNERS: usize = 8;
        let registry = Registry::new();

        std::thread::scope(|scope| {
            for n in 0..OWNERS {
                let registry = &registry;
                scope.spawn(move || {
                    let owner = OwnerId::new(format!("owner-{n}"));
                    // n + 1 distinct materials in one row: a fresh key per owner
                    let mut builder = ShapelessRecipe::builder("mix").owner(owner);
                    for id in 0..=n {
                        builder = builder.ingredient(MaterialId::new(1000 + id as u32));
                    }
                    let recipe = builder.build().expect("has ingredients");
                    assert!(registry.register(recipe.into()));
                });
            }
        });

        let stats = registry.stats();
        assert_eq!(stats.recipes, OWNERS);
        assert_eq!(stats.shapeless_buckets, OWNERS);
        assert_eq!(stats.master_buckets, OWNERS);
        assert_eq!(stats.owners, OWNERS);
        assert_eq!(registry.all_shapeless.live_keys(), (1..=OWNERS).collect::<Vec<_>>());
    }

    #[test]
    fn test_concurrent_same_key_registration_loses_nothing() {
        const THREADS: u32 = 8;
        let registry = Registry::new();

        std::thread::scope(|scope| {
            for n in 0..THREADS {
                let registry = &registry;
                scope.spawn(move || {
                    let recipe = ShapelessRecipe::builder("pair")
                        .ingredients([MaterialId::new(2000 + n), MaterialId::new(3000 + n)])
                        .build()
                        .expect("has ingredients");
                    assert!(registry.register(recipe.into()));
                    assert!(registry
                        .match_shapeless_recipe(&[MaterialId::new(3000 + n), MaterialId::new(2000 + n)])
                        .is_some());
                });
            }
        });

        assert_eq!(registry.stats().shapeless, THREADS as usize);
        assert_eq!(registry.all_shapeless.live_keys(), vec![2]);
    }

    fn material() -> impl Strategy<Value = MaterialId> {
        (1u32..6, 0u16..3).prop_map(|(id, data)| MaterialId::with_data(id, data))
    }

    fn grid() -> impl Strategy<Value = Vec<Vec<Option<MaterialId>>>> {
        (1usize..4, 1usize..4).prop_flat_map(|(width, height)| {
            prop::collection::vec(
                prop::collection::vec(prop::option::weighted(0.7, material()), width),
                height,
            )
        })
    }

    proptest! {
        #[test]
        fn prop_shaped_round_trip(rows in grid(), owned in any::<bool>()) {
            let registry = Registry::new();
            let owner = OwnerId::new("prop");
            registry.register(torch(Some("prop"), "torch"));
            let before = observe(&registry, &owner);

            let mut builder = ShapedRecipe::builder("prop");
            if owned {
                builder = builder.owner(owner.clone());
            }
            for row in &rows {
                builder = builder.row(row.iter().copied());
            }
            // Grids without a material are rejected at build time
            if let Ok(recipe) = builder.build() {
                let recipe = Recipe::from(recipe);
                prop_assert!(registry.register(recipe.clone()));
                prop_assert!(registry.match_shaped_recipe(&rows).is_some());
                prop_assert!(registry.remove(&recipe));
                prop_assert_eq!(observe(&registry, &owner), before);
            }
        }

        #[test]
        fn prop_shapeless_round_trip(
            ingredients in prop::collection::vec(material(), 1..6),
            include_data in any::<bool>(),
        ) {
            let registry = Registry::new();
            let owner = OwnerId::new("prop");
            let before = observe(&registry, &owner);

            let recipe = shapeless(Some("prop"), &ingredients, include_data, "prop");
            prop_assert!(registry.register(recipe.clone()));

            let mut shuffled = ingredients.clone();
            shuffled.reverse();
            prop_assert!(registry.match_shapeless_recipe_for(&owner, &shuffled).is_some());

            prop_assert!(registry.remove(&recipe));
            prop_assert_eq!(observe(&registry, &owner), before);
        }

        #[test]
        fn prop_shaped_match_ignores_offset(
            rows in grid(),
            pad_top in 0usize..3,
            pad_left in 0usize..3,
        ) {
            let registry = Registry::new();
            let mut builder = ShapedRecipe::builder("prop");
            for row in &rows {
                builder = builder.row(row.iter().copied());
            }
            if let Ok(recipe) = builder.build() {
                registry.register(recipe.into());

                let width = rows[0].len() + pad_left;
                let mut padded = vec![vec![None; width]; pad_top];
                for row in &rows {
                    let mut padded_row = vec![None; pad_left];
                    padded_row.extend(row.iter().copied());
                    padded.push(padded_row);
                }
                prop_assert!(registry.match_shaped_recipe(&padded).is_some());
            }
        }
    }
}
