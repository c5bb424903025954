use crate::{KinematicInput, ServoConfiguration};
use thiserror::Error;
use vs_core::FeatureError;

/// Errors reported by a servoing task.
///
/// Every error aborts the operation that returned it. The task keeps the artifacts of its last
/// successful control law, so the caller can decide to stop the robot or to retry on the next cycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServoError {
    #[error("no servo configuration has been chosen yet")]
    ConfigurationUndefined,
    #[error("the kinematic chain of the {configuration:?} configuration is not initialized, missing {missing:?}")]
    NotInitialized {
        configuration: ServoConfiguration,
        missing: Vec<KinematicInput>,
    },
    #[error("the feature list is empty")]
    EmptyFeatureSet,
    #[error("no degree of freedom is free for a secondary task (rank {rank} of {dof})")]
    NoFreeDegreeOfFreedom { rank: usize, dof: usize },
    #[error("{quantity} has dimension {actual} instead of {expected}")]
    DimensionMismatch {
        quantity: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("the {input} Jacobian must have 6 rows, got a {rows}x{cols} matrix")]
    JacobianShape {
        input: KinematicInput,
        rows: usize,
        cols: usize,
    },
    #[error("the control law must be computed before a secondary task")]
    ControlLawNotComputed,
    #[error("the singular value decomposition of the task Jacobian did not converge")]
    SvdNotConverged,
    #[error(transparent)]
    Feature(#[from] FeatureError),
}
