//! This crate plugs into `vs-core` and provides the usual visual features of image-based and
//! position-based visual servoing. Every feature implements [`vs_core::VisualFeature`], so any mix
//! of them can be stacked into a single task.
//!
//! * [`FeaturePoint`] - a point in normalized image coordinates, with its depth
//! * [`FeatureLine`] - a line in the image, in polar coordinates `(rho, theta)`
//! * [`FeatureTranslation`] - the translation of the camera relative to its desired pose
//! * [`FeatureThetaU`] - the rotation of the camera relative to its desired pose, as `theta u`
//! * [`FeatureGeneric`] - a feature whose value and interaction matrix are given by the user
//!
//! All features have a neutral value of zero, which is the value they take after
//! [`vs_core::VisualFeature::reset`].

mod generic;
mod line;
mod point;
mod theta_u;
mod translation;

pub use generic::*;
pub use line::*;
pub use point::*;
pub use theta_u::*;
pub use translation::*;
