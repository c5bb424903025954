use crate::{AdaptiveGain, InteractionMatrixMode, InversionMode, SvdParameters};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The settings of a servoing task.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ServoSettings {
    /// Which features the interaction matrix is computed from
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_interaction_matrix_mode")
    )]
    pub interaction_matrix_mode: InteractionMatrixMode,
    /// How the task Jacobian is inverted
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_inversion_mode"))]
    pub inversion_mode: InversionMode,
    /// Singular values at or below this fraction of the largest one are discarded
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_singular_value_threshold")
    )]
    pub singular_value_threshold: f64,
    /// The convergence epsilon of the singular value decomposition
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_svd_epsilon"))]
    pub svd_epsilon: f64,
    /// The maximum number of iterations of the singular value decomposition (0 for no limit)
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_svd_max_iterations")
    )]
    pub svd_max_iterations: usize,
    /// The gain schedule of the primary task
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_gain"))]
    pub gain: AdaptiveGain,
}

impl ServoSettings {
    pub fn svd(&self) -> SvdParameters {
        SvdParameters {
            threshold: self.singular_value_threshold,
            epsilon: self.svd_epsilon,
            max_iterations: self.svd_max_iterations,
        }
    }
}

impl Default for ServoSettings {
    fn default() -> Self {
        Self {
            interaction_matrix_mode: default_interaction_matrix_mode(),
            inversion_mode: default_inversion_mode(),
            singular_value_threshold: default_singular_value_threshold(),
            svd_epsilon: default_svd_epsilon(),
            svd_max_iterations: default_svd_max_iterations(),
            gain: default_gain(),
        }
    }
}

fn default_interaction_matrix_mode() -> InteractionMatrixMode {
    InteractionMatrixMode::Desired
}

fn default_inversion_mode() -> InversionMode {
    InversionMode::PseudoInverse
}

fn default_singular_value_threshold() -> f64 {
    1e-6
}

fn default_svd_epsilon() -> f64 {
    1e-12
}

fn default_svd_max_iterations() -> usize {
    1000
}

fn default_gain() -> AdaptiveGain {
    AdaptiveGain::constant(1.0)
}
