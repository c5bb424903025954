use vs_core::nalgebra::{DMatrix, DVector, Point2, Point3};
use vs_core::{Selection, VisualFeature};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A 2d point feature in normalized image coordinates `(x, y)`.
///
/// The interaction matrix of an image point depends on the depth `Z` of the corresponding 3d
/// point in the camera frame. The depth is not part of the feature value, but it must be kept
/// up to date (or approximated by the desired depth) for the interaction matrix to be valid.
///
/// ```text
///       | -1/Z    0    x/Z    xy    -(1+x^2)   y |
///   L = |                                         |
///       |   0   -1/Z   y/Z  1+y^2     -xy     -x |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct FeaturePoint {
    pub x: f64,
    pub y: f64,
    pub depth: f64,
}

impl FeaturePoint {
    /// Selects the `x` component.
    pub const X: Selection = Selection::only(0);
    /// Selects the `y` component.
    pub const Y: Selection = Selection::only(1);

    pub fn new(x: f64, y: f64, depth: f64) -> Self {
        Self { x, y, depth }
    }

    /// Projects a point expressed in the camera frame.
    ///
    /// Returns `None` if the point is not in front of the camera.
    pub fn from_camera_point(point: Point3<f64>) -> Option<Self> {
        if point.z <= 0.0 {
            return None;
        }
        Some(Self::new(point.x / point.z, point.y / point.z, point.z))
    }

    /// Updates the feature from a new measurement.
    pub fn set(&mut self, x: f64, y: f64, depth: f64) {
        *self = Self::new(x, y, depth);
    }

    /// Retrieves the image point.
    pub fn image_point(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }
}

impl Default for FeaturePoint {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }
}

impl VisualFeature for FeaturePoint {
    fn name(&self) -> &'static str {
        "point"
    }

    fn full_dimension(&self) -> usize {
        2
    }

    fn value(&self) -> DVector<f64> {
        DVector::from_vec(vec![self.x, self.y])
    }

    #[rustfmt::skip]
    fn interaction(&self, selection: Selection) -> DMatrix<f64> {
        let Self { x, y, depth } = *self;
        let inv_z = 1.0 / depth;
        let full = DMatrix::from_row_slice(2, 6, &[
            -inv_z,  0.0,    x * inv_z, x * y,       -(1.0 + x * x), y,
             0.0,   -inv_z,  y * inv_z, 1.0 + y * y, -x * y,         -x,
        ]);
        selection.select_rows(&full)
    }

    fn duplicate(&self) -> Box<dyn VisualFeature> {
        Box::new(*self)
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}
