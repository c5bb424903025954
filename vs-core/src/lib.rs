//! # Visual Servoing Core
//!
//! This library provides the common abstractions shared by every crate of the visual servoing
//! workspace. A visual servoing task drives a robot (or a camera) so that a set of measured
//! visual features `s` converges towards a set of desired features `s*`. To do that, the
//! controller only needs a handful of capabilities from each feature, which are gathered in the
//! [`VisualFeature`] trait:
//!
//! * the number of scalar components that participate in the task under a [`Selection`]
//! * the interaction matrix `L`, relating the feature velocity to the camera velocity
//! * the current value `s`
//! * the error `s - s*` (which may not be a plain subtraction, such as for angles)
//!
//! The crate also contains [`VelocityTwist`], the 6x6 transform that moves a velocity screw
//! from one frame to another. Those are the transforms that appear in the kinematic chain
//! between the sensor frame and the actuator.
//!
//! ## Frames
//!
//! Velocities are always expressed as `(v, w)`, with the three translational components
//! first and the three rotational components after. This is the same ordering as the
//! interaction matrix columns.
//!
//! ```text
//!   s_dot = L v_c          (feature velocity from camera velocity)
//!   v_c   = cVe v_e        (camera velocity from end-effector velocity)
//!   v_e   = eJe q_dot      (end-effector velocity from joint velocity)
//! ```

mod feature;
mod selection;
mod twist;

pub use feature::*;
pub use nalgebra;
pub use selection::*;
pub use twist::*;

/// Number of degrees of freedom of a velocity screw.
pub const TWIST_DIM: usize = 6;
