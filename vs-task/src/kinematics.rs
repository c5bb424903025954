//! The kinematic chain between the sensor frame and the actuator.
//!
//! The task Jacobian is `J1 = sign * L * cVa * aJe`, where `cVa` moves velocities from the
//! frame `a` in which the actuator Jacobian `aJe` is expressed into the camera frame. Which
//! matrices make up `cVa` and `aJe` depends on the [`ServoConfiguration`]:
//!
//! | configuration              | `cVa`       | `aJe` | sign |
//! |----------------------------|-------------|-------|------|
//! | `EyeInHandCamera`          | `I`         | `I`   | +1   |
//! | `EyeInHandJoint`           | `cVe`       | `eJe` | +1   |
//! | `EyeToHandEffector`        | `cVe`       | `eJe` | -1   |
//! | `EyeToHandFixedEffector`   | `cVf * fVe` | `eJe` | -1   |
//! | `EyeToHandFixedJacobian`   | `cVf`       | `fJe` | -1   |

use crate::ServoError;
use core::fmt;
use log::*;
use vs_core::nalgebra::DMatrix;
use vs_core::{VelocityTwist, TWIST_DIM};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The kinematic inputs a caller can supply to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KinematicInput {
    /// `cVe`, the twist from the end-effector frame to the camera frame.
    CameraToEffector,
    /// `cVf`, the twist from the fixed frame to the camera frame.
    CameraToFixed,
    /// `fVe`, the twist from the end-effector frame to the fixed frame.
    FixedToEffector,
    /// `eJe`, the robot Jacobian expressed in the end-effector frame.
    EffectorJacobian,
    /// `fJe`, the robot Jacobian expressed in the fixed frame.
    FixedJacobian,
}

impl fmt::Display for KinematicInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CameraToEffector => "cVe",
            Self::CameraToFixed => "cVf",
            Self::FixedToEffector => "fVe",
            Self::EffectorJacobian => "eJe",
            Self::FixedJacobian => "fJe",
        })
    }
}

/// Where the camera is and in which frame the control is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum ServoConfiguration {
    /// Not chosen yet. A control law cannot be computed.
    Undefined,
    /// Camera mounted on the effector, control computed in the camera frame.
    EyeInHandCamera,
    /// Camera mounted on the effector, control computed in the joint space: `L cVe eJe`.
    EyeInHandJoint,
    /// Fixed camera observing the effector: `-L cVe eJe`.
    EyeToHandEffector,
    /// Fixed camera observing the effector: `-L cVf fVe eJe`.
    EyeToHandFixedEffector,
    /// Fixed camera observing the effector: `-L cVf fJe`.
    EyeToHandFixedJacobian,
}

impl Default for ServoConfiguration {
    fn default() -> Self {
        Self::Undefined
    }
}

/// What a configuration needs from the kinematic inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chain {
    /// Sign of the interaction matrix in the task Jacobian.
    pub sign: f64,
    /// Inputs that must have been supplied before the first cycle.
    pub initialization: &'static [KinematicInput],
    /// Inputs that must be supplied again before every cycle.
    pub update: &'static [KinematicInput],
    /// Inputs that become stale once a cycle used them.
    pub consumed: &'static [KinematicInput],
}

impl ServoConfiguration {
    /// The kinematic chain of the configuration, or `None` if it is undefined.
    ///
    /// This is the only place where the configurations are mapped to their inputs.
    pub fn chain(self) -> Option<Chain> {
        use KinematicInput::*;
        let chain = match self {
            Self::Undefined => return None,
            Self::EyeInHandCamera => Chain {
                sign: 1.0,
                initialization: &[],
                update: &[],
                consumed: &[CameraToEffector, EffectorJacobian],
            },
            Self::EyeInHandJoint => Chain {
                sign: 1.0,
                initialization: &[CameraToEffector, EffectorJacobian],
                update: &[EffectorJacobian],
                consumed: &[CameraToEffector, EffectorJacobian],
            },
            Self::EyeToHandEffector => Chain {
                sign: -1.0,
                initialization: &[CameraToEffector, EffectorJacobian],
                update: &[CameraToEffector, EffectorJacobian],
                consumed: &[CameraToEffector, EffectorJacobian],
            },
            Self::EyeToHandFixedEffector => Chain {
                sign: -1.0,
                initialization: &[CameraToFixed, FixedToEffector, EffectorJacobian],
                update: &[FixedToEffector, EffectorJacobian],
                consumed: &[FixedToEffector, EffectorJacobian],
            },
            Self::EyeToHandFixedJacobian => Chain {
                sign: -1.0,
                initialization: &[CameraToFixed, FixedJacobian],
                update: &[FixedJacobian],
                consumed: &[FixedJacobian],
            },
        };
        Some(chain)
    }

    /// A human readable description, used in task reports.
    pub fn description(self) -> &'static str {
        match self {
            Self::Undefined => "type of task has not been chosen yet",
            Self::EyeInHandCamera => "eye-in-hand configuration, control in the camera frame",
            Self::EyeInHandJoint => "eye-in-hand configuration, control in the articular frame",
            Self::EyeToHandEffector => "eye-to-hand configuration, s_dot = -L cVe eJe q_dot",
            Self::EyeToHandFixedEffector => {
                "eye-to-hand configuration, s_dot = -L cVf fVe eJe q_dot"
            }
            Self::EyeToHandFixedJacobian => "eye-to-hand configuration, s_dot = -L cVf fJe q_dot",
        }
    }
}

#[derive(Debug, Clone)]
struct Tracked<T> {
    value: T,
    supplied: bool,
    fresh: bool,
}

impl<T> Tracked<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            supplied: false,
            fresh: false,
        }
    }

    fn supply(&mut self, value: T) {
        self.value = value;
        self.supplied = true;
        self.fresh = true;
    }
}

/// The twists and Jacobians supplied by the caller, each with the state of its last update.
///
/// An input is *supplied* once it has been set at least once, and *fresh* from the moment it is
/// set until a control law consumes it.
#[derive(Debug, Clone)]
pub struct KinematicInputs {
    c_v_e: Tracked<VelocityTwist>,
    c_v_f: Tracked<VelocityTwist>,
    f_v_e: Tracked<VelocityTwist>,
    e_j_e: Tracked<DMatrix<f64>>,
    f_j_e: Tracked<DMatrix<f64>>,
}

impl Default for KinematicInputs {
    fn default() -> Self {
        Self {
            c_v_e: Tracked::new(VelocityTwist::identity()),
            c_v_f: Tracked::new(VelocityTwist::identity()),
            f_v_e: Tracked::new(VelocityTwist::identity()),
            e_j_e: Tracked::new(DMatrix::identity(TWIST_DIM, TWIST_DIM)),
            f_j_e: Tracked::new(DMatrix::identity(TWIST_DIM, TWIST_DIM)),
        }
    }
}

fn check_jacobian(input: KinematicInput, jacobian: &DMatrix<f64>) -> Result<(), ServoError> {
    if jacobian.nrows() != TWIST_DIM {
        return Err(ServoError::JacobianShape {
            input,
            rows: jacobian.nrows(),
            cols: jacobian.ncols(),
        });
    }
    Ok(())
}

impl KinematicInputs {
    pub fn new() -> Self {
        Default::default()
    }

    /// Supplies the identity twist `cVe` and the 6x6 identity Jacobian `eJe`, which make the
    /// actuator frame coincide with the camera frame.
    pub fn supply_camera_frame(&mut self) {
        self.c_v_e.supply(VelocityTwist::identity());
        self.e_j_e.supply(DMatrix::identity(TWIST_DIM, TWIST_DIM));
    }

    pub fn set_camera_to_effector(&mut self, c_v_e: VelocityTwist) {
        self.c_v_e.supply(c_v_e);
    }

    pub fn set_camera_to_fixed(&mut self, c_v_f: VelocityTwist) {
        self.c_v_f.supply(c_v_f);
    }

    pub fn set_fixed_to_effector(&mut self, f_v_e: VelocityTwist) {
        self.f_v_e.supply(f_v_e);
    }

    /// Supplies `eJe`, which must have 6 rows and one column per actuator.
    pub fn set_effector_jacobian(&mut self, e_j_e: DMatrix<f64>) -> Result<(), ServoError> {
        check_jacobian(KinematicInput::EffectorJacobian, &e_j_e)?;
        self.e_j_e.supply(e_j_e);
        Ok(())
    }

    /// Supplies `fJe`, which must have 6 rows and one column per actuator.
    pub fn set_fixed_jacobian(&mut self, f_j_e: DMatrix<f64>) -> Result<(), ServoError> {
        check_jacobian(KinematicInput::FixedJacobian, &f_j_e)?;
        self.f_j_e.supply(f_j_e);
        Ok(())
    }

    fn flags(&self, input: KinematicInput) -> (bool, bool) {
        match input {
            KinematicInput::CameraToEffector => (self.c_v_e.supplied, self.c_v_e.fresh),
            KinematicInput::CameraToFixed => (self.c_v_f.supplied, self.c_v_f.fresh),
            KinematicInput::FixedToEffector => (self.f_v_e.supplied, self.f_v_e.fresh),
            KinematicInput::EffectorJacobian => (self.e_j_e.supplied, self.e_j_e.fresh),
            KinematicInput::FixedJacobian => (self.f_j_e.supplied, self.f_j_e.fresh),
        }
    }

    pub fn is_supplied(&self, input: KinematicInput) -> bool {
        self.flags(input).0
    }

    pub fn is_fresh(&self, input: KinematicInput) -> bool {
        self.flags(input).1
    }

    fn consume(&mut self, input: KinematicInput) {
        match input {
            KinematicInput::CameraToEffector => self.c_v_e.fresh = false,
            KinematicInput::CameraToFixed => self.c_v_f.fresh = false,
            KinematicInput::FixedToEffector => self.f_v_e.fresh = false,
            KinematicInput::EffectorJacobian => self.e_j_e.fresh = false,
            KinematicInput::FixedJacobian => self.f_j_e.fresh = false,
        }
    }

    fn chain(configuration: ServoConfiguration) -> Result<Chain, ServoError> {
        configuration.chain().ok_or_else(|| {
            error!("no control law has been defined yet");
            ServoError::ConfigurationUndefined
        })
    }

    /// The inputs required by `configuration` that were never supplied.
    pub fn missing(
        &self,
        configuration: ServoConfiguration,
    ) -> Result<Vec<KinematicInput>, ServoError> {
        let chain = Self::chain(configuration)?;
        Ok(chain
            .initialization
            .iter()
            .copied()
            .filter(|&input| !self.is_supplied(input))
            .collect())
    }

    /// The inputs required by `configuration` that were not supplied again since the last cycle.
    pub fn stale(
        &self,
        configuration: ServoConfiguration,
    ) -> Result<Vec<KinematicInput>, ServoError> {
        let chain = Self::chain(configuration)?;
        Ok(chain
            .update
            .iter()
            .copied()
            .filter(|&input| !self.is_fresh(input))
            .collect())
    }

    /// Checks that every input needed by `configuration` has been supplied at least once.
    pub fn test_initialization(
        &self,
        configuration: ServoConfiguration,
    ) -> Result<bool, ServoError> {
        let missing = self.missing(configuration)?;
        for input in &missing {
            error!("{} not initialized", input);
        }
        Ok(missing.is_empty())
    }

    /// Checks that every input `configuration` needs on each cycle has been supplied again.
    ///
    /// Stale inputs are only reported, the last known values are still usable.
    pub fn test_updated(&self, configuration: ServoConfiguration) -> Result<bool, ServoError> {
        let stale = self.stale(configuration)?;
        for input in &stale {
            warn!("{} not updated", input);
        }
        Ok(stale.is_empty())
    }

    /// Resolves `(cVa, aJe)` for `configuration` and marks the consumed inputs as stale.
    pub fn resolve(
        &mut self,
        configuration: ServoConfiguration,
    ) -> Result<(DMatrix<f64>, DMatrix<f64>), ServoError> {
        let chain = Self::chain(configuration)?;
        let resolved = match configuration {
            ServoConfiguration::EyeToHandFixedEffector => (
                (self.c_v_f.value * self.f_v_e.value).to_dmatrix(),
                self.e_j_e.value.clone(),
            ),
            ServoConfiguration::EyeToHandFixedJacobian => {
                (self.c_v_f.value.to_dmatrix(), self.f_j_e.value.clone())
            }
            // The remaining configurations with a chain all go through cVe and eJe.
            _ => (self.c_v_e.value.to_dmatrix(), self.e_j_e.value.clone()),
        };
        for &input in chain.consumed {
            self.consume(input);
        }
        Ok(resolved)
    }
}
