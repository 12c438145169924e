//! Command-line craft queries.
//!
//! Grid syntax: rows separated by `/`, cells by `,`, `_` marks an empty
//! cell. `"5,5/_,280"` is a 2x2 grid with planks on top and a stick in the
//! bottom right corner. Shapeless queries use the same syntax and ignore
//! row breaks.

use std::str::FromStr;

use artisan_common::{ArtisanError, MaterialId, OwnerId};
use thiserror::Error;

use crate::recipe_loader::{CraftOutput, Registry};

/// Cell marker for an empty grid slot.
const EMPTY_CELL: &str = "_";

/// Errors produced while parsing a query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Query kind is neither shaped nor shapeless.
    #[error("Unknown query kind: {0:?} (expected \"shaped\" or \"shapeless\")")]
    UnknownKind(String),

    /// No grid given after the kind.
    #[error("Missing grid argument")]
    MissingGrid,

    /// Extra positional argument.
    #[error("Unexpected argument: {0:?}")]
    UnexpectedArgument(String),

    /// A cell could not be parsed as a material.
    #[error("Invalid cell: {0}")]
    InvalidCell(#[from] ArtisanError),

    /// Shapeless queries have no empty cells.
    #[error("Empty cells are not allowed in shapeless queries")]
    EmptyCell,
}

/// Result type for query parsing.
pub type QueryResult<T> = Result<T, QueryError>;

/// What to match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    /// Positional match over a grid.
    Shaped(Vec<Vec<Option<MaterialId>>>),
    /// Multiset match over a collection.
    Shapeless(Vec<MaterialId>),
}

/// A parsed craft query, optionally scoped to an owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CraftQuery {
    /// Owner whose recipes take precedence.
    pub owner: Option<OwnerId>,
    /// Grid or collection to resolve.
    pub kind: QueryKind,
}

impl CraftQuery {
    /// Parses `<shaped|shapeless> <grid> [owner=<name>]`.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> QueryResult<Self> {
        let mut owner = None;
        let mut positional = Vec::new();
        for arg in args {
            let arg = arg.as_ref();
            match arg.strip_prefix("owner=") {
                Some(name) => owner = Some(OwnerId::new(name)),
                None => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let kind = positional.next().unwrap_or_default();
        let grid = positional.next().ok_or(QueryError::MissingGrid)?;
        if let Some(extra) = positional.next() {
            return Err(QueryError::UnexpectedArgument(extra.to_string()));
        }

        let kind = match kind {
            "shaped" => QueryKind::Shaped(parse_grid(grid)?),
            "shapeless" => QueryKind::Shapeless(parse_materials(grid)?),
            other => return Err(QueryError::UnknownKind(other.to_string())),
        };
        Ok(Self { owner, kind })
    }

    /// Resolves the query against `registry`.
    #[must_use]
    pub fn resolve(&self, registry: &Registry) -> Option<CraftOutput> {
        match (&self.kind, &self.owner) {
            (QueryKind::Shaped(grid), Some(owner)) => registry
                .match_shaped_recipe_for(owner, grid)
                .map(|recipe| recipe.result().clone()),
            (QueryKind::Shaped(grid), None) => registry
                .match_shaped_recipe(grid)
                .map(|recipe| recipe.result().clone()),
            (QueryKind::Shapeless(materials), Some(owner)) => registry
                .match_shapeless_recipe_for(owner, materials)
                .map(|recipe| recipe.result().clone()),
            (QueryKind::Shapeless(materials), None) => registry
                .match_shapeless_recipe(materials)
                .map(|recipe| recipe.result().clone()),
        }
    }
}

/// Parses a grid; rows of different lengths are kept as given.
pub fn parse_grid(grid: &str) -> QueryResult<Vec<Vec<Option<MaterialId>>>> {
    grid.split('/')
        .map(|row| {
            row.split(',')
                .map(|cell| -> QueryResult<Option<MaterialId>> {
                    match cell.trim() {
                        EMPTY_CELL => Ok(None),
                        cell => Ok(Some(MaterialId::from_str(cell)?)),
                    }
                })
                .collect::<QueryResult<Vec<_>>>()
        })
        .collect()
}

/// Parses a material collection; `/` and `,` both separate materials.
pub fn parse_materials(materials: &str) -> QueryResult<Vec<MaterialId>> {
    materials
        .split(['/', ','])
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(|cell| -> QueryResult<MaterialId> {
            if cell == EMPTY_CELL {
                Err(QueryError::EmptyCell)
            } else {
                Ok(MaterialId::from_str(cell)?)
            }
        })
        .collect()
}
