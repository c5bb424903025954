//! # Task-Priority Visual Servoing
//!
//! This crate computes the velocity that drives a robot, or a camera, so that a set of visual
//! features `s` converges to desired values `s*`. A [`Servo`] task:
//!
//! 1. stacks the interaction matrices `L` and the errors `s - s*` of its features;
//! 2. combines `L` with the kinematic chain of the robot into the task Jacobian `J1`;
//! 3. inverts `J1` and computes the velocity `e = -lambda J1+ (s - s*)`;
//! 4. optionally projects secondary objectives onto the null space of `J1`.
//!
//! Features are shared with the caller through `Rc<RefCell<_>>` handles so that the caller can
//! update them between cycles.
//!
//! ```
//! use std::{cell::RefCell, rc::Rc};
//! use vs_core::Selection;
//! use vs_feature::FeaturePoint;
//! use vs_task::{Servo, ServoConfiguration};
//!
//! let current = Rc::new(RefCell::new(FeaturePoint::new(0.1, 0.2, 1.0)));
//! let desired = Rc::new(RefCell::new(FeaturePoint::new(0.0, 0.0, 1.0)));
//!
//! let mut servo = Servo::new(ServoConfiguration::EyeInHandCamera);
//! servo.add_feature(current.clone(), desired, Selection::ALL);
//!
//! let velocity = servo.compute_control_law().unwrap();
//! assert_eq!(velocity.len(), 6);
//! assert_eq!(servo.rank(), Some(2));
//! ```

mod display;
mod error;
mod gain;
mod kinematics;
mod linalg;
mod registry;
mod servo;
mod settings;
mod stack;

pub use display::*;
pub use error::*;
pub use gain::*;
pub use kinematics::*;
pub use linalg::*;
pub use registry::*;
pub use servo::*;
pub use settings::*;
pub use stack::*;
pub use vs_core::nalgebra;
