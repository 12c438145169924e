//! Shapeless recipe buckets and multiset lookup.

use std::sync::Arc;

use artisan_common::Material;

use crate::bucket::{Buckets, RecipeIndex};
use crate::recipe::{distinct_sorted, ShapelessRecipe};

/// Shapeless recipes sharing one distinct parent-material count, in
/// registration order.
#[derive(Debug)]
pub struct ShapelessBucket<M, R> {
    recipes: Vec<Arc<ShapelessRecipe<M, R>>>,
}

impl<M, R> Default for ShapelessBucket<M, R> {
    fn default() -> Self {
        Self {
            recipes: Vec::new(),
        }
    }
}

impl<M: Material, R> ShapelessBucket<M, R> {
    /// First recipe whose multiset equals the sorted input.
    #[must_use]
    pub fn find(&self, raw: &[M], generalized: &[M]) -> Option<Arc<ShapelessRecipe<M, R>>> {
        self.recipes
            .iter()
            .find(|recipe| recipe.matches_sorted(raw, generalized))
            .cloned()
    }

    /// Stored recipes in registration order.
    pub fn recipes(&self) -> impl Iterator<Item = &Arc<ShapelessRecipe<M, R>>> {
        self.recipes.iter()
    }
}

impl<M: Material, R: Send + Sync> RecipeIndex for ShapelessBucket<M, R> {
    type Entry = Arc<ShapelessRecipe<M, R>>;

    fn contains(&self, entry: &Self::Entry) -> bool {
        self.recipes.contains(entry)
    }

    fn insert(&mut self, entry: Self::Entry) -> bool {
        if self.contains(&entry) {
            return false;
        }
        self.recipes.push(entry);
        true
    }

    fn remove(&mut self, entry: &Self::Entry) -> Option<Self::Entry> {
        let index = self.recipes.iter().position(|stored| stored == entry)?;
        Some(self.recipes.remove(index))
    }

    fn len(&self) -> usize {
        self.recipes.len()
    }
}

/// A shapeless lookup, prepared once and resolved against any scope.
#[derive(Debug)]
pub(crate) struct ShapelessQuery<M> {
    raw: Vec<M>,
    generalized: Vec<M>,
    key: usize,
}

impl<M: Material> ShapelessQuery<M> {
    /// Prepares a query; an empty collection yields `None`.
    pub(crate) fn new(materials: &[M]) -> Option<Self> {
        if materials.is_empty() {
            return None;
        }
        let mut raw = materials.to_vec();
        raw.sort_unstable();
        let mut generalized: Vec<M> = materials.iter().map(Material::parent).collect();
        generalized.sort_unstable();
        let key = distinct_sorted(&generalized);
        Some(Self {
            raw,
            generalized,
            key,
        })
    }

    pub(crate) fn resolve<R: Send + Sync>(
        &self,
        buckets: &Buckets<ShapelessBucket<M, R>>,
    ) -> Option<Arc<ShapelessRecipe<M, R>>> {
        buckets
            .get(self.key)
            .and_then(|bucket| bucket.read().find(&self.raw, &self.generalized))
    }
}
