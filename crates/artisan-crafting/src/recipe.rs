//! Recipe data types.
//!
//! Recipes are immutable once built. Two recipes are considered the same
//! recipe when they share owner, variant and shape; the result payload is
//! not part of a recipe's identity.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use artisan_common::{Material, OwnerId};
use thiserror::Error;

use crate::pattern::Pattern;

/// Recipe construction error types.
#[derive(Debug, Error)]
pub enum RecipeError {
    /// Pattern holds no material
    #[error("Pattern has no ingredients")]
    EmptyPattern,
    /// Pattern rows differ in length
    #[error("Ragged pattern: row {row} has {actual} cells, expected {expected}")]
    RaggedPattern {
        /// Index of the offending row
        row: usize,
        /// Length of the first row
        expected: usize,
        /// Length of the offending row
        actual: usize,
    },
    /// Shapeless recipe without ingredients
    #[error("Shapeless recipe has no ingredients")]
    NoIngredients,
}

/// Result type for recipe construction.
pub type RecipeResult<T> = Result<T, RecipeError>;

// ============================================================================
// Shaped recipes
// ============================================================================

/// A recipe whose ingredients must appear in fixed relative positions.
#[derive(Debug)]
pub struct ShapedRecipe<M, R> {
    owner: Option<OwnerId>,
    pattern: Pattern<M>,
    result: R,
}

impl<M: Material, R> ShapedRecipe<M, R> {
    /// Creates a shaped recipe from an already validated pattern.
    #[must_use]
    pub fn new(owner: Option<OwnerId>, pattern: Pattern<M>, result: R) -> Self {
        Self {
            owner,
            pattern,
            result,
        }
    }

    /// Creates a new shaped recipe builder.
    #[must_use]
    pub fn builder(result: R) -> ShapedRecipeBuilder<M, R> {
        ShapedRecipeBuilder::new(result)
    }

    /// Owner of the recipe, if any.
    #[must_use]
    pub fn owner(&self) -> Option<&OwnerId> {
        self.owner.as_ref()
    }

    /// The trimmed ingredient pattern.
    #[must_use]
    pub fn pattern(&self) -> &Pattern<M> {
        &self.pattern
    }

    /// Result payload.
    #[must_use]
    pub fn result(&self) -> &R {
        &self.result
    }

    /// Ingredient cells in row-major order, empty cells included.
    #[must_use]
    pub fn ingredients(&self) -> &[Option<M>] {
        self.pattern.cells()
    }

    /// Number of distinct materials, the key of the recipe's tree bucket.
    #[must_use]
    pub fn distinct_count(&self) -> usize {
        self.pattern.distinct_count()
    }
}

impl<M: Material, R> PartialEq for ShapedRecipe<M, R> {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.pattern == other.pattern
    }
}

impl<M: Material, R> Eq for ShapedRecipe<M, R> {}

impl<M: Material, R> Hash for ShapedRecipe<M, R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.owner.hash(state);
        self.pattern.hash(state);
    }
}

/// Builder for shaped recipes.
#[derive(Debug)]
pub struct ShapedRecipeBuilder<M, R> {
    owner: Option<OwnerId>,
    rows: Vec<Vec<Option<M>>>,
    result: R,
}

impl<M: Material, R> ShapedRecipeBuilder<M, R> {
    fn new(result: R) -> Self {
        Self {
            owner: None,
            rows: Vec::new(),
            result,
        }
    }

    /// Scopes the recipe to an owner.
    #[must_use]
    pub fn owner(mut self, owner: OwnerId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Appends a row of cells (`None` = empty cell).
    #[must_use]
    pub fn row(mut self, cells: impl IntoIterator<Item = Option<M>>) -> Self {
        self.rows.push(cells.into_iter().collect());
        self
    }

    /// Builds the recipe, validating the pattern.
    pub fn build(self) -> RecipeResult<ShapedRecipe<M, R>> {
        let pattern = Pattern::from_rows(&self.rows)?;
        Ok(ShapedRecipe::new(self.owner, pattern, self.result))
    }
}

// ============================================================================
// Shapeless recipes
// ============================================================================

/// A recipe matched by its ingredient multiset, regardless of position.
#[derive(Debug)]
pub struct ShapelessRecipe<M, R> {
    owner: Option<OwnerId>,
    ingredients: Vec<M>,
    include_data: bool,
    result: R,
    /// Sorted multiset compared against input: raw when `include_data`,
    /// generalized otherwise.
    signature: Vec<M>,
    bucket_key: usize,
}

impl<M: Material, R> ShapelessRecipe<M, R> {
    /// Creates a shapeless recipe.
    pub fn new(
        owner: Option<OwnerId>,
        ingredients: Vec<M>,
        include_data: bool,
        result: R,
    ) -> RecipeResult<Self> {
        if ingredients.is_empty() {
            return Err(RecipeError::NoIngredients);
        }

        let mut generalized: Vec<M> = ingredients.iter().map(Material::parent).collect();
        generalized.sort_unstable();
        let bucket_key = distinct_sorted(&generalized);

        let signature = if include_data {
            let mut raw = ingredients.clone();
            raw.sort_unstable();
            raw
        } else {
            generalized
        };

        Ok(Self {
            owner,
            ingredients,
            include_data,
            result,
            signature,
            bucket_key,
        })
    }

    /// Creates a new shapeless recipe builder.
    #[must_use]
    pub fn builder(result: R) -> ShapelessRecipeBuilder<M, R> {
        ShapelessRecipeBuilder::new(result)
    }

    /// Owner of the recipe, if any.
    #[must_use]
    pub fn owner(&self) -> Option<&OwnerId> {
        self.owner.as_ref()
    }

    /// Ingredients in registration order.
    #[must_use]
    pub fn ingredients(&self) -> &[M] {
        &self.ingredients
    }

    /// Whether matching requires exact data variants.
    #[must_use]
    pub const fn include_data(&self) -> bool {
        self.include_data
    }

    /// Result payload.
    #[must_use]
    pub fn result(&self) -> &R {
        &self.result
    }

    /// Number of distinct parent materials, the key of the recipe's bucket.
    #[must_use]
    pub const fn distinct_count(&self) -> usize {
        self.bucket_key
    }

    /// Checks the recipe against sorted raw and generalized input.
    ///
    /// Equal sorted sequences mean each multiset contains the other,
    /// duplicates included.
    #[must_use]
    pub fn matches_sorted(&self, raw: &[M], generalized: &[M]) -> bool {
        if self.include_data {
            self.signature == raw
        } else {
            self.signature == generalized
        }
    }
}

impl<M: Material, R> PartialEq for ShapelessRecipe<M, R> {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner
            && self.include_data == other.include_data
            && self.signature == other.signature
    }
}

impl<M: Material, R> Eq for ShapelessRecipe<M, R> {}

impl<M: Material, R> Hash for ShapelessRecipe<M, R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.owner.hash(state);
        self.include_data.hash(state);
        self.signature.hash(state);
    }
}

/// Builder for shapeless recipes.
#[derive(Debug)]
pub struct ShapelessRecipeBuilder<M, R> {
    owner: Option<OwnerId>,
    ingredients: Vec<M>,
    include_data: bool,
    result: R,
}

impl<M: Material, R> ShapelessRecipeBuilder<M, R> {
    fn new(result: R) -> Self {
        Self {
            owner: None,
            ingredients: Vec::new(),
            include_data: false,
            result,
        }
    }

    /// Scopes the recipe to an owner.
    #[must_use]
    pub fn owner(mut self, owner: OwnerId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Adds one ingredient.
    #[must_use]
    pub fn ingredient(mut self, material: M) -> Self {
        self.ingredients.push(material);
        self
    }

    /// Adds several ingredients.
    #[must_use]
    pub fn ingredients(mut self, materials: impl IntoIterator<Item = M>) -> Self {
        self.ingredients.extend(materials);
        self
    }

    /// Requires exact data variants when matching.
    #[must_use]
    pub fn include_data(mut self, include_data: bool) -> Self {
        self.include_data = include_data;
        self
    }

    /// Builds the recipe.
    pub fn build(self) -> RecipeResult<ShapelessRecipe<M, R>> {
        ShapelessRecipe::new(self.owner, self.ingredients, self.include_data, self.result)
    }
}

// ============================================================================
// Recipe
// ============================================================================

/// A registered recipe of either variant.
#[derive(Debug)]
pub enum Recipe<M, R> {
    /// Positional recipe
    Shaped(Arc<ShapedRecipe<M, R>>),
    /// Multiset recipe
    Shapeless(Arc<ShapelessRecipe<M, R>>),
}

impl<M, R> Clone for Recipe<M, R> {
    fn clone(&self) -> Self {
        match self {
            Self::Shaped(recipe) => Self::Shaped(Arc::clone(recipe)),
            Self::Shapeless(recipe) => Self::Shapeless(Arc::clone(recipe)),
        }
    }
}

impl<M: Material, R> Recipe<M, R> {
    /// Owner of the recipe, if any.
    #[must_use]
    pub fn owner(&self) -> Option<&OwnerId> {
        match self {
            Self::Shaped(recipe) => recipe.owner(),
            Self::Shapeless(recipe) => recipe.owner(),
        }
    }

    /// Result payload.
    #[must_use]
    pub fn result(&self) -> &R {
        match self {
            Self::Shaped(recipe) => recipe.result(),
            Self::Shapeless(recipe) => recipe.result(),
        }
    }

    /// Length of the ingredient list, the key of the master index.
    ///
    /// For shaped recipes this counts every pattern cell, empty ones too.
    #[must_use]
    pub fn ingredient_count(&self) -> usize {
        match self {
            Self::Shaped(recipe) => recipe.ingredients().len(),
            Self::Shapeless(recipe) => recipe.ingredients().len(),
        }
    }

    /// Number of distinct materials, the key of the tree/bucket indexes.
    #[must_use]
    pub fn distinct_count(&self) -> usize {
        match self {
            Self::Shaped(recipe) => recipe.distinct_count(),
            Self::Shapeless(recipe) => recipe.distinct_count(),
        }
    }
}

impl<M: Material, R> PartialEq for Recipe<M, R> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Shaped(a), Self::Shaped(b)) => a == b,
            (Self::Shapeless(a), Self::Shapeless(b)) => a == b,
            _ => false,
        }
    }
}

impl<M: Material, R> Eq for Recipe<M, R> {}

impl<M: Material, R> Hash for Recipe<M, R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Shaped(recipe) => recipe.hash(state),
            Self::Shapeless(recipe) => recipe.hash(state),
        }
    }
}

impl<M: Material, R> From<ShapedRecipe<M, R>> for Recipe<M, R> {
    fn from(recipe: ShapedRecipe<M, R>) -> Self {
        Self::Shaped(Arc::new(recipe))
    }
}

impl<M: Material, R> From<ShapelessRecipe<M, R>> for Recipe<M, R> {
    fn from(recipe: ShapelessRecipe<M, R>) -> Self {
        Self::Shapeless(Arc::new(recipe))
    }
}

/// Counts distinct values of a sorted slice.
pub(crate) fn distinct_sorted<M: PartialEq>(sorted: &[M]) -> usize {
    if sorted.is_empty() {
        0
    } else {
        1 + sorted.windows(2).filter(|pair| pair[0] != pair[1]).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artisan_common::MaterialId;

    const WOOL: MaterialId = MaterialId::new(35);
    const RED_WOOL: MaterialId = MaterialId::with_data(35, 14);
    const BLUE_WOOL: MaterialId = MaterialId::with_data(35, 11);
    const STRING: MaterialId = MaterialId::new(287);

    #[test]
    fn test_shaped_builder() {
        let recipe = ShapedRecipe::builder("bed")
            .row([Some(WOOL), Some(WOOL), Some(WOOL)])
            .row([Some(STRING), None, Some(STRING)])
            .build()
            .expect("valid pattern");
        assert_eq!(recipe.ingredients().len(), 6);
        assert_eq!(recipe.distinct_count(), 2);
        assert_eq!(*recipe.result(), "bed");
        assert!(recipe.owner().is_none());
    }

    #[test]
    fn test_shaped_builder_rejects_empty() {
        let result = ShapedRecipe::<MaterialId, _>::builder(())
            .row([None, None])
            .build();
        assert!(matches!(result, Err(RecipeError::EmptyPattern)));
    }

    #[test]
    fn test_shapeless_requires_ingredients() {
        let result = ShapelessRecipe::<MaterialId, _>::builder(()).build();
        assert!(matches!(result, Err(RecipeError::NoIngredients)));
    }

    #[test]
    fn test_shapeless_bucket_key_uses_parents() {
        let recipe = ShapelessRecipe::builder(())
            .ingredients([RED_WOOL, BLUE_WOOL])
            .include_data(true)
            .build()
            .expect("has ingredients");
        assert_eq!(recipe.distinct_count(), 1);
    }

    #[test]
    fn test_shapeless_matches_multiset_not_set() {
        let recipe = ShapelessRecipe::builder(())
            .ingredients([STRING, STRING, WOOL])
            .build()
            .expect("has ingredients");

        let exact = [STRING, STRING, WOOL];
        let missing_duplicate = [STRING, WOOL];
        assert!(recipe.matches_sorted(&[], &sorted(&exact)));
        assert!(!recipe.matches_sorted(&[], &sorted(&missing_duplicate)));
    }

    #[test]
    fn test_recipe_identity_ignores_result() {
        let a: Recipe<_, _> = ShapelessRecipe::builder("a")
            .ingredients([STRING, WOOL])
            .build()
            .expect("has ingredients")
            .into();
        let b: Recipe<_, _> = ShapelessRecipe::builder("b")
            .ingredients([WOOL, STRING])
            .build()
            .expect("has ingredients")
            .into();
        assert_eq!(a, b);

        let owned: Recipe<_, _> = ShapelessRecipe::builder("a")
            .owner(OwnerId::new("extras"))
            .ingredients([STRING, WOOL])
            .build()
            .expect("has ingredients")
            .into();
        assert_ne!(a, owned);
    }

    #[test]
    fn test_include_data_is_part_of_identity() {
        let generic = ShapelessRecipe::builder(())
            .ingredients([RED_WOOL])
            .build()
            .expect("has ingredients");
        let other_variant = ShapelessRecipe::builder(())
            .ingredients([BLUE_WOOL])
            .build()
            .expect("has ingredients");
        let exact = ShapelessRecipe::builder(())
            .ingredients([RED_WOOL])
            .include_data(true)
            .build()
            .expect("has ingredients");

        // Without data both generalize to plain wool
        assert_eq!(generic, other_variant);
        assert_ne!(generic, exact);
    }

    #[test]
    fn test_distinct_sorted() {
        assert_eq!(distinct_sorted::<u8>(&[]), 0);
        assert_eq!(distinct_sorted(&[1, 1, 2, 3, 3]), 3);
    }

    fn sorted(materials: &[MaterialId]) -> Vec<MaterialId> {
        let mut materials = materials.to_vec();
        materials.sort_unstable();
        materials
    }
}
