use derive_more::{BitAnd, BitOr, From, Into};
use nalgebra::{DMatrix, DVector};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A bitmask that selects which scalar components of a feature participate in a task.
///
/// Bit `i` selects the component `i` of the feature value. Bits past the dimension of a feature
/// are ignored, so [`Selection::ALL`] can be used with any feature.
///
/// ```
/// use vs_core::Selection;
///
/// let xy = Selection::only(0) | Selection::only(1);
/// assert_eq!(xy.count(2), 2);
/// assert_eq!(Selection::only(1).count(2), 1);
/// assert_eq!(Selection::ALL.count(6), 6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BitAnd, BitOr, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Selection(pub u32);

impl Selection {
    /// Selects every component.
    pub const ALL: Self = Self(u32::MAX);
    /// Selects nothing.
    pub const NONE: Self = Self(0);

    /// Selects only the component at `index`.
    ///
    /// Indices past 31 cannot be represented and select nothing.
    pub const fn only(index: usize) -> Self {
        if index < 32 {
            Self(1 << index)
        } else {
            Self::NONE
        }
    }

    /// Checks if the component at `index` is selected.
    pub fn contains(self, index: usize) -> bool {
        index < 32 && (self.0 >> index) & 1 == 1
    }

    /// Counts the selected components of a feature whose value has `full_dimension` components.
    pub fn count(self, full_dimension: usize) -> usize {
        self.indices(full_dimension).count()
    }

    /// Iterates over the selected component indices in increasing order.
    pub fn indices(self, full_dimension: usize) -> impl Iterator<Item = usize> + Clone {
        (0..full_dimension).filter(move |&ix| self.contains(ix))
    }

    /// Keeps the rows of `matrix` that are selected, in order.
    pub fn select_rows(self, matrix: &DMatrix<f64>) -> DMatrix<f64> {
        let rows: Vec<usize> = self.indices(matrix.nrows()).collect();
        matrix.select_rows(rows.iter())
    }

    /// Keeps the components of `vector` that are selected, in order.
    pub fn select_components(self, vector: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            self.count(vector.len()),
            self.indices(vector.len()).map(|ix| vector[ix]),
        )
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::ALL
    }
}
