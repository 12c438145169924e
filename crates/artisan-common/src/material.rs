//! Material boundary trait.
//!
//! The recipe core never interprets materials itself; it only needs to
//! compare them and ask for their parent. Any catalog providing these
//! queries can be plugged in.

use std::fmt::Debug;
use std::hash::Hash;

use crate::ids::MaterialId;

/// An opaque material identifier with variant generalization.
pub trait Material: Copy + Eq + Hash + Ord + Debug + Send + Sync + 'static {
    /// Whether this material is a data variant of another material.
    fn is_sub_material(&self) -> bool;

    /// The material this one is a variant of. A material that is not a
    /// sub-material is its own parent.
    #[must_use]
    fn parent(&self) -> Self;
}

impl Material for MaterialId {
    fn is_sub_material(&self) -> bool {
        self.data() != 0
    }

    fn parent(&self) -> Self {
        Self::new(self.id())
    }
}
