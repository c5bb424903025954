use core::f64::consts::PI;
use vs_core::nalgebra::{DMatrix, DVector};
use vs_core::{value_difference, FeatureError, Selection, VisualFeature};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A 2d line feature `x cos(theta) + y sin(theta) - rho = 0` in normalized image coordinates.
///
/// The interaction matrix depends on the 3d plane `A X + B Y + C Z + D = 0` (expressed in the
/// camera frame) which contains the 3d line and does not contain the optical center, so `D`
/// must not be zero.
///
/// The error on `theta` is wrapped into `(-pi, pi]`, so that two lines that only differ by a
/// full turn have no error.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct FeatureLine {
    pub rho: f64,
    pub theta: f64,
    /// Plane parameters `[A, B, C, D]`.
    pub plane: [f64; 4],
}

impl FeatureLine {
    /// Selects the `rho` component.
    pub const RHO: Selection = Selection::only(0);
    /// Selects the `theta` component.
    pub const THETA: Selection = Selection::only(1);

    pub fn new(rho: f64, theta: f64, plane: [f64; 4]) -> Self {
        Self { rho, theta, plane }
    }

    /// Updates the line parameters, keeping the plane.
    pub fn set(&mut self, rho: f64, theta: f64) {
        self.rho = rho;
        self.theta = theta;
    }
}

impl Default for FeatureLine {
    fn default() -> Self {
        Self::new(0.0, 0.0, [0.0, 0.0, 0.0, 1.0])
    }
}

/// Wraps an angle into `(-pi, pi]`.
///
/// Non-finite angles give NaN.
fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}

impl VisualFeature for FeatureLine {
    fn name(&self) -> &'static str {
        "line"
    }

    fn full_dimension(&self) -> usize {
        2
    }

    fn value(&self) -> DVector<f64> {
        DVector::from_vec(vec![self.rho, self.theta])
    }

    #[rustfmt::skip]
    fn interaction(&self, selection: Selection) -> DMatrix<f64> {
        let Self { rho, theta, plane: [a, b, c, d] } = *self;
        let (si, co) = theta.sin_cos();
        let lambda_theta = (a * si - b * co) / d;
        let lambda_rho = (c + rho * a * co + rho * b * si) / d;
        let rho2 = 1.0 + rho * rho;
        let full = DMatrix::from_row_slice(2, 6, &[
            lambda_rho * co,   lambda_rho * si,   -lambda_rho * rho,   si * rho2, -co * rho2,  0.0,
            lambda_theta * co, lambda_theta * si, -lambda_theta * rho, -rho * co, -rho * si,  -1.0,
        ]);
        selection.select_rows(&full)
    }

    fn error(
        &self,
        desired: &dyn VisualFeature,
        selection: Selection,
    ) -> Result<DVector<f64>, FeatureError> {
        let mut difference =
            value_difference(self.name(), &self.value(), &desired.value(), Selection::ALL)?;
        difference[1] = wrap_angle(difference[1]);
        Ok(selection.select_components(&difference))
    }

    fn duplicate(&self) -> Box<dyn VisualFeature> {
        Box::new(*self)
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn theta_error_wraps() {
        let current = FeatureLine::new(0.5, PI - 0.1, [0.0, 0.0, 1.0, -1.0]);
        let desired = FeatureLine::new(0.25, -PI + 0.1, [0.0, 0.0, 1.0, -1.0]);
        let error = current.error(&desired, Selection::ALL).unwrap();
        assert_relative_eq!(error[0], 0.25);
        assert_relative_eq!(error[1], -0.2, epsilon = 1e-12);
    }

    #[test]
    fn selected_theta_error() {
        let current = FeatureLine::new(0.5, 2.0 * PI + 0.5, [0.0, 0.0, 1.0, -1.0]);
        let desired = FeatureLine::new(0.0, 0.0, [0.0, 0.0, 1.0, -1.0]);
        let error = current.error(&desired, FeatureLine::THETA).unwrap();
        assert_eq!(error.len(), 1);
        assert_relative_eq!(error[0], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn wrapping_bounds() {
        assert_relative_eq!(wrap_angle(-PI), PI);
        assert_relative_eq!(wrap_angle(PI), PI);
        assert_relative_eq!(wrap_angle(-3.0 * PI + 0.5), -PI + 0.5, epsilon = 1e-12);
    }

    #[test]
    fn huge_theta_error() {
        let current = FeatureLine::new(0.0, 1e17, [0.0, 0.0, 1.0, -1.0]);
        let desired = FeatureLine::new(0.0, 0.0, [0.0, 0.0, 1.0, -1.0]);
        let error = current.error(&desired, Selection::ALL).unwrap();
        assert!(error[1].is_finite());
        assert!(error[1] > -PI && error[1] <= PI);
    }

    #[test]
    fn infinite_theta_error() {
        let current = FeatureLine::new(0.0, f64::INFINITY, [0.0, 0.0, 1.0, -1.0]);
        let desired = FeatureLine::new(0.0, 0.0, [0.0, 0.0, 1.0, -1.0]);
        let error = current.error(&desired, FeatureLine::THETA).unwrap();
        assert!(error[0].is_nan());
    }

    #[test]
    fn line_in_fronto_parallel_plane() {
        // The plane Z = 2 gives D = -2.
        let line = FeatureLine::new(0.0, 0.0, [0.0, 0.0, 1.0, -2.0]);
        let l = line.interaction(Selection::ALL);
        assert_relative_eq!(l[(0, 0)], -0.5);
        assert_relative_eq!(l[(0, 4)], -1.0);
        assert_relative_eq!(l[(1, 5)], -1.0);
    }
}
