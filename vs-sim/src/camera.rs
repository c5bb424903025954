use rand::Rng;
use vs_core::nalgebra::{DVector, IsometryMatrix3, Point3, Rotation3, Translation3, Vector3};
use vs_feature::FeaturePoint;

/// A free-flying camera observing points fixed in the world frame.
#[derive(Debug, Clone)]
pub struct SimulatedCamera {
    /// The pose `wMc` of the camera in the world frame.
    pub pose: IsometryMatrix3<f64>,
    pub points: Vec<Point3<f64>>,
}

impl SimulatedCamera {
    pub fn new(pose: IsometryMatrix3<f64>, points: Vec<Point3<f64>>) -> Self {
        Self { pose, points }
    }

    /// Applies the camera velocity `(v, w)`, expressed in the camera frame, for `dt` seconds.
    pub fn apply_velocity(&mut self, velocity: &DVector<f64>, dt: f64) {
        let v = Vector3::new(velocity[0], velocity[1], velocity[2]);
        let w = Vector3::new(velocity[3], velocity[4], velocity[5]);
        let motion =
            IsometryMatrix3::from_parts(Translation3::from(v * dt), Rotation3::new(w * dt));
        self.pose *= motion;
    }

    /// Projects every point, adding uniform noise of amplitude `noise` to the image coordinates.
    ///
    /// Returns `None` if a point is behind the camera.
    pub fn observe(&self, noise: f64, rng: &mut impl Rng) -> Option<Vec<FeaturePoint>> {
        let c_m_w = self.pose.inverse();
        self.points
            .iter()
            .map(|&point| {
                let mut feature = FeaturePoint::from_camera_point(c_m_w * point)?;
                if noise > 0.0 {
                    feature.x += rng.gen_range(-noise..noise);
                    feature.y += rng.gen_range(-noise..noise);
                }
                Some(feature)
            })
            .collect()
    }
}

/// A square of points of side `size` in the plane `z = 0` of the world frame.
pub fn square(size: f64) -> Vec<Point3<f64>> {
    let half = size / 2.0;
    vec![
        Point3::new(-half, -half, 0.0),
        Point3::new(half, -half, 0.0),
        Point3::new(half, half, 0.0),
        Point3::new(-half, half, 0.0),
    ]
}
