use vs_core::nalgebra::{DMatrix, DVector, IsometryMatrix3, Matrix3, Vector3};
use vs_core::{Selection, VisualFeature};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The translation `t` of the current camera frame expressed in the desired camera frame,
/// taken from the pose `cdMc`.
///
/// The desired value is zero, which is where [`VisualFeature::reset`] brings the feature.
///
/// ```text
///   L = | cdRc  0 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct FeatureTranslation {
    pub translation: Vector3<f64>,
    pub rotation: Matrix3<f64>,
}

impl FeatureTranslation {
    pub const TX: Selection = Selection::only(0);
    pub const TY: Selection = Selection::only(1);
    pub const TZ: Selection = Selection::only(2);

    /// Builds the feature from the pose `cdMc`.
    pub fn from_isometry(cd_m_c: &IsometryMatrix3<f64>) -> Self {
        Self {
            translation: cd_m_c.translation.vector,
            rotation: *cd_m_c.rotation.matrix(),
        }
    }
}

impl Default for FeatureTranslation {
    fn default() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: Matrix3::identity(),
        }
    }
}

impl VisualFeature for FeatureTranslation {
    fn name(&self) -> &'static str {
        "translation"
    }

    fn full_dimension(&self) -> usize {
        3
    }

    fn value(&self) -> DVector<f64> {
        DVector::from_column_slice(self.translation.as_slice())
    }

    fn interaction(&self, selection: Selection) -> DMatrix<f64> {
        let mut full = DMatrix::zeros(3, 6);
        full.fixed_slice_mut::<3, 3>(0, 0).copy_from(&self.rotation);
        selection.select_rows(&full)
    }

    fn duplicate(&self) -> Box<dyn VisualFeature> {
        Box::new(*self)
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}
