//! Concurrent bucket maps shared by every registry index.

use std::sync::Arc;

use ahash::{AHashSet, RandomState};
use artisan_common::Material;
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::recipe::Recipe;

/// A collection of recipes living under one bucket key.
pub trait RecipeIndex: Default + Send + Sync {
    /// Stored element type.
    type Entry: Clone;

    /// Returns true if an entry with the same identity is stored.
    fn contains(&self, entry: &Self::Entry) -> bool;

    /// Inserts an entry, returning false for a duplicate.
    fn insert(&mut self, entry: Self::Entry) -> bool;

    /// Removes the entry with the same identity, returning the stored one.
    fn remove(&mut self, entry: &Self::Entry) -> Option<Self::Entry>;

    /// Number of stored entries.
    fn len(&self) -> usize;

    /// Returns true if nothing is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Buckets of one index dimension, keyed by a recipe count.
///
/// Buckets are created on first use and never pruned, so a writer that
/// cloned a bucket out of the map always writes into the live bucket.
#[derive(Debug)]
pub struct Buckets<T> {
    map: DashMap<usize, Arc<RwLock<T>>, RandomState>,
}

impl<T> Default for Buckets<T> {
    fn default() -> Self {
        Self {
            map: DashMap::with_hasher(RandomState::new()),
        }
    }
}

impl<T: RecipeIndex> Buckets<T> {
    /// Returns the bucket for `key`, if one was ever created.
    #[must_use]
    pub fn get(&self, key: usize) -> Option<Arc<RwLock<T>>> {
        self.map.get(&key).map(|bucket| Arc::clone(bucket.value()))
    }

    /// Returns the bucket for `key`, creating it if needed.
    ///
    /// Concurrent callers for one key always receive the same bucket.
    pub fn get_or_create(&self, key: usize) -> Arc<RwLock<T>> {
        Arc::clone(self.map.entry(key).or_default().value())
    }

    /// Clones out every bucket. The map is not locked afterwards.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(usize, Arc<RwLock<T>>)> {
        self.map
            .iter()
            .map(|bucket| (*bucket.key(), Arc::clone(bucket.value())))
            .collect()
    }

    /// Keys of buckets that currently hold at least one entry, sorted.
    #[must_use]
    pub fn live_keys(&self) -> Vec<usize> {
        let mut keys: Vec<usize> = self
            .snapshot()
            .into_iter()
            .filter(|(_, bucket)| !bucket.read().is_empty())
            .map(|(key, _)| key)
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Number of buckets holding at least one entry.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live_keys().len()
    }

    /// Total entries across all buckets.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.snapshot()
            .iter()
            .map(|(_, bucket)| bucket.read().len())
            .sum()
    }

    /// Drops every bucket.
    pub fn clear(&self) {
        self.map.clear();
    }
}

/// Master index bucket: recipes sharing an ingredient count.
#[derive(Debug)]
pub struct RecipeSet<M, R> {
    recipes: AHashSet<Recipe<M, R>>,
}

impl<M, R> Default for RecipeSet<M, R> {
    fn default() -> Self {
        Self {
            recipes: AHashSet::new(),
        }
    }
}

impl<M: Material, R> RecipeSet<M, R> {
    /// Iterates over the stored recipes.
    pub fn iter(&self) -> impl Iterator<Item = &Recipe<M, R>> {
        self.recipes.iter()
    }
}

impl<M: Material, R: Send + Sync> RecipeIndex for RecipeSet<M, R> {
    type Entry = Recipe<M, R>;

    fn contains(&self, entry: &Self::Entry) -> bool {
        self.recipes.contains(entry)
    }

    fn insert(&mut self, entry: Self::Entry) -> bool {
        self.recipes.insert(entry)
    }

    fn remove(&mut self, entry: &Self::Entry) -> Option<Self::Entry> {
        self.recipes.take(entry)
    }

    fn len(&self) -> usize {
        self.recipes.len()
    }
}
