use crate::Selection;
use core::fmt::Debug;
use nalgebra::{DMatrix, DVector};
use thiserror::Error;

/// Errors that a feature can report while computing its contribution to a task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureError {
    #[error("{feature} feature of dimension {expected} cannot be compared to a desired feature of dimension {actual}")]
    DimensionMismatch {
        feature: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// The capabilities a visual feature must expose so that a servoing task can stack it.
///
/// A feature has a value `s` of [`VisualFeature::full_dimension`] components. A [`Selection`]
/// picks which of those components take part in a task, and every operation that depends on
/// the task (dimension, interaction matrix, error) takes the selection as input.
///
/// Implementors only have to provide the full interaction matrix through
/// [`VisualFeature::interaction`] and select its rows, which is typically done with
/// [`Selection::select_rows`].
pub trait VisualFeature: Debug {
    /// A short name used in reports and errors.
    fn name(&self) -> &'static str;

    /// The number of components of the feature value.
    fn full_dimension(&self) -> usize;

    /// The number of components that participate in a task under `selection`.
    fn dimension(&self, selection: Selection) -> usize {
        selection.count(self.full_dimension())
    }

    /// The current value `s` of the feature (all components, regardless of any selection).
    fn value(&self) -> DVector<f64>;

    /// The interaction matrix `L` of the selected components.
    ///
    /// It has [`VisualFeature::dimension`] rows and 6 columns, relating the velocity of the
    /// selected components to the velocity screw `(v, w)` of the camera frame.
    fn interaction(&self, selection: Selection) -> DMatrix<f64>;

    /// The error `s - s*` of the selected components towards `desired`.
    ///
    /// The default implementation is a plain subtraction. Features with a non-euclidean value
    /// (angles for instance) should override it.
    fn error(
        &self,
        desired: &dyn VisualFeature,
        selection: Selection,
    ) -> Result<DVector<f64>, FeatureError> {
        value_difference(self.name(), &self.value(), &desired.value(), selection)
    }

    /// Creates a deep copy of the feature.
    fn duplicate(&self) -> Box<dyn VisualFeature>;

    /// Brings the feature back to its neutral value.
    fn reset(&mut self);
}

/// Computes the selected components of `current - desired`.
///
/// Fails if both values don't have the same number of components.
pub fn value_difference(
    feature: &'static str,
    current: &DVector<f64>,
    desired: &DVector<f64>,
    selection: Selection,
) -> Result<DVector<f64>, FeatureError> {
    if current.len() != desired.len() {
        return Err(FeatureError::DimensionMismatch {
            feature,
            expected: current.len(),
            actual: desired.len(),
        });
    }
    Ok(selection.select_components(&(current - desired)))
}
