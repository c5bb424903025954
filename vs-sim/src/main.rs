mod camera;

use camera::SimulatedCamera;
use log::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::{cell::RefCell, rc::Rc};
use structopt::StructOpt;
use vs_core::nalgebra::{IsometryMatrix3, Rotation3, Translation3};
use vs_core::Selection;
use vs_feature::FeaturePoint;
use vs_task::{PrintLevel, Servo, ServoConfiguration, ServoSettings};

#[derive(StructOpt, Clone)]
#[structopt(name = "vs-sim", about = "A tool for testing visual servoing control laws")]
struct Opt {
    /// The file where settings are specified.
    ///
    /// This is in the format of `vs_task::ServoSettings`.
    #[structopt(short, long, default_value = "servo-settings.json")]
    settings: PathBuf,
    /// The maximum number of control cycles
    #[structopt(short, long, default_value = "500")]
    iterations: usize,
    /// The duration of a control cycle in seconds
    #[structopt(long, default_value = "0.04")]
    period: f64,
    /// The error norm below which the task is considered done
    #[structopt(long, default_value = "0.0001")]
    tolerance: f64,
    /// The side of the square of points observed by the camera
    #[structopt(long, default_value = "0.2")]
    size: f64,
    /// The distance between the camera and the points at the desired pose
    #[structopt(long, default_value = "1.0")]
    distance: f64,
    /// The initial x offset of the camera from the desired pose
    #[structopt(long, default_value = "0.05", allow_hyphen_values = true)]
    x: f64,
    /// The initial y offset of the camera from the desired pose
    #[structopt(long, default_value = "-0.05", allow_hyphen_values = true)]
    y: f64,
    /// The initial z offset of the camera from the desired pose
    #[structopt(long, default_value = "-0.3", allow_hyphen_values = true)]
    z: f64,
    /// The initial rotation of the camera about its optical axis, in radians
    #[structopt(long, default_value = "0.3", allow_hyphen_values = true)]
    roll: f64,
    /// The amplitude of the uniform noise added to the image coordinates
    #[structopt(long, default_value = "0.0")]
    noise: f64,
    /// The seed of the measurement noise
    #[structopt(long, default_value = "0")]
    seed: u64,
    /// Print the full task report at the end instead of only the error
    #[structopt(short, long)]
    verbose: bool,
}

fn main() {
    pretty_env_logger::init_timed();
    let opt = Opt::from_args();

    let settings = std::fs::File::open(&opt.settings)
        .ok()
        .and_then(|file| serde_json::from_reader(file).ok());
    if settings.is_some() {
        info!("loaded existing settings");
    } else {
        info!("used default settings");
    }
    let settings: ServoSettings = settings.unwrap_or_default();

    let mut rng = StdRng::seed_from_u64(opt.seed);
    let points = camera::square(opt.size);
    let desired_pose = IsometryMatrix3::from_parts(
        Translation3::new(0.0, 0.0, -opt.distance),
        Rotation3::identity(),
    );
    let offset = IsometryMatrix3::from_parts(
        Translation3::new(opt.x, opt.y, opt.z),
        Rotation3::from_euler_angles(0.0, 0.0, opt.roll),
    );
    let mut camera = SimulatedCamera::new(desired_pose * offset, points.clone());

    let desired = SimulatedCamera::new(desired_pose, points)
        .observe(0.0, &mut rng)
        .expect("the points must be in front of the camera at the desired pose");
    let current = camera
        .observe(opt.noise, &mut rng)
        .expect("the points must be in front of the camera at the initial pose");

    let mut servo = Servo::with_settings(ServoConfiguration::EyeInHandCamera, &settings);
    let features: Vec<Rc<RefCell<FeaturePoint>>> = current
        .into_iter()
        .zip(desired)
        .map(|(current, desired)| {
            let current = Rc::new(RefCell::new(current));
            servo.add_feature(
                current.clone(),
                Rc::new(RefCell::new(desired)),
                Selection::ALL,
            );
            current
        })
        .collect();

    for iteration in 0..opt.iterations {
        let velocity = match servo.compute_control_law() {
            Ok(velocity) => velocity,
            Err(e) => {
                error!("control law failed at iteration {}: {}", iteration, e);
                break;
            }
        };
        let norm = servo.error().map(|error| error.norm()).unwrap_or_default();
        info!(
            "iteration {}: error norm {:.6}, velocity {:.4}",
            iteration,
            norm,
            velocity.transpose()
        );
        if norm < opt.tolerance {
            info!("converged after {} iterations", iteration);
            break;
        }

        camera.apply_velocity(&velocity, opt.period);
        let observed = match camera.observe(opt.noise, &mut rng) {
            Some(observed) => observed,
            None => {
                error!("a point went behind the camera at iteration {}", iteration);
                break;
            }
        };
        for (feature, observation) in features.iter().zip(observed) {
            *feature.borrow_mut() = observation;
        }
    }

    let level = if opt.verbose {
        PrintLevel::All
    } else {
        PrintLevel::Minimum
    };
    println!("{}", servo.display(level));
    println!("final camera pose: {}", camera.pose.translation.vector.transpose());
}
