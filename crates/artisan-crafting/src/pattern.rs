//! Rectangular material patterns for shaped crafting.

use ahash::AHashSet;
use artisan_common::Material;

use crate::recipe::{RecipeError, RecipeResult};

/// A trimmed, rectangular grid of material cells (row-major).
///
/// A pattern is always cropped to the bounding box of its non-empty cells,
/// so two grids holding the same arrangement at different offsets produce
/// equal patterns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern<M> {
    width: usize,
    height: usize,
    cells: Vec<Option<M>>,
}

impl<M: Material> Pattern<M> {
    /// Builds a pattern from rows of cells.
    ///
    /// Fails if rows differ in length or no cell holds a material.
    pub fn from_rows<Row: AsRef<[Option<M>]>>(rows: &[Row]) -> RecipeResult<Self> {
        let row_len = rows.first().map_or(0, |row| row.as_ref().len());
        if let Some(row) = rows.iter().position(|row| row.as_ref().len() != row_len) {
            return Err(RecipeError::RaggedPattern {
                row,
                expected: row_len,
                actual: rows[row].as_ref().len(),
            });
        }

        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        for (y, row) in rows.iter().enumerate() {
            for (x, cell) in row.as_ref().iter().enumerate() {
                if cell.is_none() {
                    continue;
                }
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((min_x, min_y, max_x, max_y)) => {
                        (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
                    },
                });
            }
        }
        let (min_x, min_y, max_x, max_y) = bounds.ok_or(RecipeError::EmptyPattern)?;

        let cells = rows[min_y..=max_y]
            .iter()
            .flat_map(|row| row.as_ref()[min_x..=max_x].iter().copied())
            .collect();

        Ok(Self {
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
            cells,
        })
    }

    /// Pattern width in cells.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Pattern height in cells.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// All cells in row-major order, empty cells included.
    #[must_use]
    pub fn cells(&self) -> &[Option<M>] {
        &self.cells
    }

    /// Cell at column `x`, row `y`; `None` when empty or out of bounds.
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Option<M> {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            None
        }
    }

    /// Iterates over the rows of the pattern.
    pub fn rows(&self) -> impl Iterator<Item = &[Option<M>]> + '_ {
        self.cells.chunks(self.width)
    }

    /// Iterates over the non-empty cells.
    pub fn materials(&self) -> impl Iterator<Item = M> + '_ {
        self.cells.iter().flatten().copied()
    }

    /// Number of distinct materials in the pattern.
    #[must_use]
    pub fn distinct_count(&self) -> usize {
        self.materials().collect::<AHashSet<_>>().len()
    }

    /// The same pattern with every material replaced by its parent.
    #[must_use]
    pub fn generalized(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            cells: self
                .cells
                .iter()
                .map(|cell| cell.map(|material| material.parent()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artisan_common::MaterialId;

    const PLANK: MaterialId = MaterialId::new(5);
    const STICK: MaterialId = MaterialId::new(280);

    #[test]
    fn test_pattern_is_trimmed() {
        let grid = [
            [None, None, None],
            [None, Some(PLANK), None],
            [None, Some(STICK), None],
        ];
        let pattern = Pattern::from_rows(&grid).expect("valid grid");
        assert_eq!(pattern.width(), 1);
        assert_eq!(pattern.height(), 2);
        assert_eq!(pattern.cells(), &[Some(PLANK), Some(STICK)]);
    }

    #[test]
    fn test_pattern_offset_invariance() {
        let top_left = [
            [Some(PLANK), Some(PLANK), None],
            [None, Some(STICK), None],
            [None, None, None],
        ];
        let bottom_right = [
            [None, None, None],
            [None, Some(PLANK), Some(PLANK)],
            [None, None, Some(STICK)],
        ];
        let a = Pattern::from_rows(&top_left).expect("valid grid");
        let b = Pattern::from_rows(&bottom_right).expect("valid grid");
        assert_eq!(a, b);
        assert_eq!(a.get(1, 1), Some(STICK));
        assert_eq!(a.get(0, 1), None);
        assert_eq!(a.get(5, 5), None);
    }

    #[test]
    fn test_pattern_rejects_ragged_rows() {
        let rows = vec![vec![Some(PLANK), None], vec![Some(STICK)]];
        assert!(matches!(
            Pattern::from_rows(&rows),
            Err(RecipeError::RaggedPattern {
                row: 1,
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_pattern_rejects_empty_grid() {
        let empty: [[Option<MaterialId>; 2]; 2] = [[None, None], [None, None]];
        assert!(matches!(
            Pattern::from_rows(&empty),
            Err(RecipeError::EmptyPattern)
        ));
        let no_rows: [[Option<MaterialId>; 0]; 0] = [];
        assert!(matches!(
            Pattern::from_rows(&no_rows),
            Err(RecipeError::EmptyPattern)
        ));
    }

    #[test]
    fn test_distinct_count_ignores_empty_and_repeats() {
        let grid = [[Some(PLANK), Some(PLANK)], [Some(STICK), None]];
        let pattern = Pattern::from_rows(&grid).expect("valid grid");
        assert_eq!(pattern.cells().len(), 4);
        assert_eq!(pattern.distinct_count(), 2);
    }

    #[test]
    fn test_generalized_pattern() {
        let red = MaterialId::with_data(35, 14);
        let blue = MaterialId::with_data(35, 11);
        let pattern = Pattern::from_rows(&[[Some(red), Some(blue)]]).expect("valid grid");
        assert_eq!(pattern.distinct_count(), 2);

        let generalized = pattern.generalized();
        assert_eq!(generalized.cells(), &[Some(MaterialId::new(35)); 2]);
        assert_eq!(generalized.distinct_count(), 1);
    }
}
