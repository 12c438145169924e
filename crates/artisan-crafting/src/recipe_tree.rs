//! Trie index of shaped recipes.
//!
//! A pattern is walked row by row; every cell is one step and every row is
//! closed by a row-end marker, so two patterns share a leaf only
//! when they agree on dimensions and on every cell.

use std::sync::Arc;

use ahash::AHashMap;
use artisan_common::Material;

use crate::bucket::{Buckets, RecipeIndex};
use crate::pattern::Pattern;
use crate::recipe::ShapedRecipe;

/// One edge of the trie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Step<M> {
    Cell(Option<M>),
    RowEnd,
}

fn steps<M: Material>(pattern: &Pattern<M>) -> impl Iterator<Item = Step<M>> + '_ {
    pattern
        .rows()
        .flat_map(|row| row.iter().copied().map(Step::Cell).chain([Step::RowEnd]))
}

#[derive(Debug)]
struct Node<M, R> {
    children: AHashMap<Step<M>, Node<M, R>>,
    /// Recipes ending here, in registration order.
    recipes: Vec<Arc<ShapedRecipe<M, R>>>,
}

impl<M, R> Default for Node<M, R> {
    fn default() -> Self {
        Self {
            children: AHashMap::new(),
            recipes: Vec::new(),
        }
    }
}

impl<M: Material, R> Node<M, R> {
    fn is_empty(&self) -> bool {
        self.recipes.is_empty() && self.children.is_empty()
    }

    fn descend(&self, path: impl Iterator<Item = Step<M>>) -> Option<&Self> {
        let mut node = self;
        for step in path {
            node = node.children.get(&step)?;
        }
        Some(node)
    }

    fn remove(
        &mut self,
        path: &[Step<M>],
        recipe: &ShapedRecipe<M, R>,
    ) -> Option<Arc<ShapedRecipe<M, R>>> {
        let Some((step, rest)) = path.split_first() else {
            let index = self
                .recipes
                .iter()
                .position(|stored| stored.as_ref() == recipe)?;
            return Some(self.recipes.remove(index));
        };

        let child = self.children.get_mut(step)?;
        let removed = child.remove(rest, recipe);
        if removed.is_some() && child.is_empty() {
            self.children.remove(step);
        }
        removed
    }

    fn collect(&self, out: &mut Vec<Arc<ShapedRecipe<M, R>>>) {
        out.extend(self.recipes.iter().cloned());
        for child in self.children.values() {
            child.collect(out);
        }
    }
}

/// Shaped recipes sharing one distinct-material count.
#[derive(Debug)]
pub struct RecipeTree<M, R> {
    root: Node<M, R>,
    len: usize,
}

impl<M, R> Default for RecipeTree<M, R> {
    fn default() -> Self {
        Self {
            root: Node::default(),
            len: 0,
        }
    }
}

impl<M: Material, R> RecipeTree<M, R> {
    /// First recipe, in registration order, whose pattern equals `pattern`.
    #[must_use]
    pub fn find(&self, pattern: &Pattern<M>) -> Option<Arc<ShapedRecipe<M, R>>> {
        self.root
            .descend(steps(pattern))
            .and_then(|leaf| leaf.recipes.first())
            .cloned()
    }

    /// All stored recipes. Order across patterns is unspecified.
    #[must_use]
    pub fn recipes(&self) -> Vec<Arc<ShapedRecipe<M, R>>> {
        let mut out = Vec::with_capacity(self.len);
        self.root.collect(&mut out);
        out
    }
}

impl<M: Material, R: Send + Sync> RecipeIndex for RecipeTree<M, R> {
    type Entry = Arc<ShapedRecipe<M, R>>;

    fn contains(&self, entry: &Self::Entry) -> bool {
        self.root
            .descend(steps(entry.pattern()))
            .is_some_and(|leaf| leaf.recipes.iter().any(|stored| stored == entry))
    }

    fn insert(&mut self, entry: Self::Entry) -> bool {
        let mut node = &mut self.root;
        for step in steps(entry.pattern()) {
            node = node.children.entry(step).or_default();
        }
        if node.recipes.iter().any(|stored| *stored == entry) {
            return false;
        }
        node.recipes.push(entry);
        self.len += 1;
        true
    }

    fn remove(&mut self, entry: &Self::Entry) -> Option<Self::Entry> {
        let path: Vec<Step<M>> = steps(entry.pattern()).collect();
        let removed = self.root.remove(&path, entry)?;
        self.len -= 1;
        Some(removed)
    }

    fn len(&self) -> usize {
        self.len
    }
}

/// A shaped lookup, prepared once and resolved against any scope.
#[derive(Debug)]
pub(crate) struct ShapedQuery<M> {
    raw: Pattern<M>,
    raw_key: usize,
    /// Parent-generalized pattern, unless equal to the raw one.
    generalized: Option<Pattern<M>>,
}

impl<M: Material> ShapedQuery<M> {
    /// Prepares a query; malformed grids yield `None`.
    pub(crate) fn new<Row: AsRef<[Option<M>]>>(grid: &[Row]) -> Option<Self> {
        let raw = Pattern::from_rows(grid).ok()?;
        let raw_key = raw.distinct_count();
        let general = raw.generalized();
        let generalized = (general != raw).then_some(general);
        Some(Self {
            raw,
            raw_key,
            generalized,
        })
    }

    /// Exact attempt first, then the generalized fallback. Both attempts
    /// search the tree keyed by the raw grid's distinct count.
    pub(crate) fn resolve<R: Send + Sync>(
        &self,
        trees: &Buckets<RecipeTree<M, R>>,
    ) -> Option<Arc<ShapedRecipe<M, R>>> {
        let tree = trees.get(self.raw_key)?;
        let tree = tree.read();
        tree.find(&self.raw).or_else(|| {
            let pattern = self.generalized.as_ref()?;
            tree.find(pattern)
        })
    }
}
