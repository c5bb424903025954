use vs_core::nalgebra::{DMatrix, DVector, Matrix3, Rotation3, Vector3};
use vs_core::{Selection, VisualFeature};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The rotation `cdRc` between the desired and current camera frames, represented as the
/// axis-angle vector `theta u`.
///
/// ```text
///   L = | 0  Lw |
///
///   Lw = I + theta/2 [u]x + (1 - sinc(theta) / sinc^2(theta/2)) [u]x^2
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct FeatureThetaU(pub Vector3<f64>);

impl FeatureThetaU {
    pub const TUX: Selection = Selection::only(0);
    pub const TUY: Selection = Selection::only(1);
    pub const TUZ: Selection = Selection::only(2);

    /// Builds the feature from the rotation `cdRc`.
    pub fn from_rotation(cd_r_c: &Rotation3<f64>) -> Self {
        Self(cd_r_c.scaled_axis())
    }

    /// The rotation angle `theta`.
    pub fn angle(&self) -> f64 {
        self.0.norm()
    }

    /// The rotational block `Lw` of the interaction matrix.
    pub fn lw(&self) -> Matrix3<f64> {
        let theta = self.angle();
        if theta <= f64::EPSILON {
            return Matrix3::identity();
        }
        let u = (self.0 / theta).cross_matrix();
        let correction = 1.0 - sinc(theta) / sinc(theta / 2.0).powi(2);
        Matrix3::identity() + u * (theta / 2.0) + u * u * correction
    }
}

fn sinc(x: f64) -> f64 {
    if x.abs() <= f64::EPSILON {
        1.0
    } else {
        x.sin() / x
    }
}

impl VisualFeature for FeatureThetaU {
    fn name(&self) -> &'static str {
        "theta-u"
    }

    fn full_dimension(&self) -> usize {
        3
    }

    fn value(&self) -> DVector<f64> {
        DVector::from_column_slice(self.0.as_slice())
    }

    fn interaction(&self, selection: Selection) -> DMatrix<f64> {
        let mut full = DMatrix::zeros(3, 6);
        full.fixed_slice_mut::<3, 3>(0, 3).copy_from(&self.lw());
        selection.select_rows(&full)
    }

    fn duplicate(&self) -> Box<dyn VisualFeature> {
        Box::new(*self)
    }

    fn reset(&mut self) {
        self.0 = Vector3::zeros();
    }
}
