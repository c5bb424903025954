use vs_core::nalgebra::{DMatrix, DVector};
use vs_core::{FeatureError, Selection, VisualFeature};

/// A feature whose value and interaction matrix are provided by the user.
///
/// This is useful for features that are not part of this crate, or for scalar tasks such as
/// joint limits or visibility constraints written directly as an error and its Jacobian.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureGeneric {
    value: DVector<f64>,
    interaction: DMatrix<f64>,
}

impl FeatureGeneric {
    /// Creates a feature of `dimension` components, with a zero value and a zero interaction matrix.
    pub fn new(dimension: usize) -> Self {
        Self {
            value: DVector::zeros(dimension),
            interaction: DMatrix::zeros(dimension, 6),
        }
    }

    /// Sets the feature value.
    ///
    /// Fails if `value` does not have the dimension of the feature.
    pub fn set_value(&mut self, value: DVector<f64>) -> Result<(), FeatureError> {
        if value.len() != self.value.len() {
            return Err(FeatureError::DimensionMismatch {
                feature: self.name(),
                expected: self.value.len(),
                actual: value.len(),
            });
        }
        self.value = value;
        Ok(())
    }

    /// Sets the full interaction matrix.
    ///
    /// Fails if `interaction` does not have one row per component.
    pub fn set_interaction(&mut self, interaction: DMatrix<f64>) -> Result<(), FeatureError> {
        if interaction.nrows() != self.value.len() {
            return Err(FeatureError::DimensionMismatch {
                feature: self.name(),
                expected: self.value.len(),
                actual: interaction.nrows(),
            });
        }
        self.interaction = interaction;
        Ok(())
    }
}

impl VisualFeature for FeatureGeneric {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn full_dimension(&self) -> usize {
        self.value.len()
    }

    fn value(&self) -> DVector<f64> {
        self.value.clone()
    }

    fn interaction(&self, selection: Selection) -> DMatrix<f64> {
        selection.select_rows(&self.interaction)
    }

    fn duplicate(&self) -> Box<dyn VisualFeature> {
        Box::new(self.clone())
    }

    fn reset(&mut self) {
        self.value.fill(0.0);
    }
}
