//! Gain schedules `lambda(e)` applied to the primary and secondary tasks.

use vs_core::nalgebra::DVector;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A scalar gain computed from a task vector.
pub trait Gain {
    fn gain(&self, error: &DVector<f64>) -> f64;
}

impl<F> Gain for F
where
    F: Fn(&DVector<f64>) -> f64,
{
    fn gain(&self, error: &DVector<f64>) -> f64 {
        self(error)
    }
}

/// The same gain whatever the error.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ConstantGain(pub f64);

impl Default for ConstantGain {
    fn default() -> Self {
        Self(1.0)
    }
}

impl Gain for ConstantGain {
    fn gain(&self, _: &DVector<f64>) -> f64 {
        self.0
    }
}

/// A gain that grows as the error shrinks, to speed up the end of the convergence:
///
/// ```text
/// lambda(x) = (lambda_0 - lambda_inf) * exp(-lambda'_0 * x / (lambda_0 - lambda_inf)) + lambda_inf
/// ```
///
/// where `x` is the infinity norm of the error.
///
/// ```
/// use vs_task::{AdaptiveGain, Gain};
/// use vs_task::nalgebra::DVector;
///
/// let gain = AdaptiveGain::new(4.0, 0.4, 30.0);
/// assert_eq!(gain.value(0.0), 4.0);
/// assert!((gain.gain(&DVector::from_element(2, 1e3)) - 0.4).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct AdaptiveGain {
    /// Gain at zero error.
    pub lambda_zero: f64,
    /// Gain at infinite error.
    pub lambda_infinity: f64,
    /// Slope of the gain at zero error.
    pub lambda_slope: f64,
}

impl Default for AdaptiveGain {
    fn default() -> Self {
        Self::constant(1.0)
    }
}

impl AdaptiveGain {
    pub fn new(lambda_zero: f64, lambda_infinity: f64, lambda_slope: f64) -> Self {
        Self {
            lambda_zero,
            lambda_infinity,
            lambda_slope,
        }
    }

    pub fn constant(lambda: f64) -> Self {
        Self::new(lambda, lambda, 0.0)
    }

    pub fn is_constant(&self) -> bool {
        self.lambda_zero == self.lambda_infinity
    }

    /// The gain for an error of infinity norm `norm`.
    pub fn value(&self, norm: f64) -> f64 {
        if self.is_constant() {
            return self.lambda_infinity;
        }
        let span = self.lambda_zero - self.lambda_infinity;
        span * (-self.lambda_slope * norm / span).exp() + self.lambda_infinity
    }
}

impl Gain for AdaptiveGain {
    fn gain(&self, error: &DVector<f64>) -> f64 {
        self.value(error.amax())
    }
}
