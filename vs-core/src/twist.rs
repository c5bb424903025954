use core::ops::Mul;
use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use nalgebra::{DMatrix, IsometryMatrix3, Matrix3, Matrix6, Rotation3, Vector3, Vector6};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A velocity twist transform `aVb`, which maps a velocity screw `(v, w)` expressed in frame `b`
/// into the same motion expressed in frame `a`.
///
/// Given the pose `aMb` of frame `b` in frame `a` (rotation `R` and translation `t`), the
/// transform is:
///
/// ```text
///         | R   [t]x R |
///   aVb = |            |
///         | 0      R   |
/// ```
///
/// Twists compose by multiplication: `aVc = aVb * bVc`.
#[derive(Debug, Clone, Copy, PartialEq, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct VelocityTwist(pub Matrix6<f64>);

impl VelocityTwist {
    /// The twist between two frames that coincide.
    pub fn identity() -> Self {
        Self(Matrix6::identity())
    }

    /// Creates the twist from the translation and rotation of `aMb`.
    pub fn from_parts(translation: Vector3<f64>, rotation: Rotation3<f64>) -> Self {
        let r = rotation.matrix();
        let mut twist = Matrix6::zeros();
        twist.fixed_slice_mut::<3, 3>(0, 0).copy_from(r);
        twist
            .fixed_slice_mut::<3, 3>(0, 3)
            .copy_from(&(translation.cross_matrix() * r));
        twist.fixed_slice_mut::<3, 3>(3, 3).copy_from(r);
        Self(twist)
    }

    /// Creates the twist from the pose `aMb`.
    pub fn from_isometry(pose: &IsometryMatrix3<f64>) -> Self {
        Self::from_parts(pose.translation.vector, pose.rotation)
    }

    /// Retrieves the rotation block `R`.
    pub fn rotation(&self) -> Matrix3<f64> {
        self.0.fixed_slice::<3, 3>(0, 0).into_owned()
    }

    /// Retrieves the translation `t` from the `[t]x R` block.
    pub fn translation(&self) -> Vector3<f64> {
        let skew = self.0.fixed_slice::<3, 3>(0, 3) * self.rotation().transpose();
        Vector3::new(skew.m32, skew.m13, skew.m21)
    }

    /// The twist `bVa` of the opposite direction.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let rotation_t = self.rotation().transpose();
        let translation = -(rotation_t * self.translation());
        Self::from_parts(translation, Rotation3::from_matrix_unchecked(rotation_t))
    }

    /// Expresses the velocity screw `screw` of frame `b` in frame `a`.
    pub fn transform(&self, screw: &Vector6<f64>) -> Vector6<f64> {
        self.0 * screw
    }

    /// Copies the twist into a dynamically sized matrix for use in a kinematic chain.
    pub fn to_dmatrix(&self) -> DMatrix<f64> {
        DMatrix::from_column_slice(6, 6, self.0.as_slice())
    }
}

impl Default for VelocityTwist {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul for VelocityTwist {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self(self.0 * rhs.0)
    }
}
