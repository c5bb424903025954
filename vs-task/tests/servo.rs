use approx::assert_relative_eq;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::{cell::RefCell, rc::Rc};
use vs_core::nalgebra::{DMatrix, DVector, IsometryMatrix3, Rotation3, Vector3};
use vs_core::{FeatureError, Selection, VelocityTwist};
use vs_feature::{FeatureGeneric, FeaturePoint, FeatureThetaU, FeatureTranslation};
use vs_task::{
    InteractionMatrixMode, InversionMode, KinematicInput, Ownership, Servo, ServoConfiguration,
    ServoError,
};

fn scalar(value: f64) -> Rc<RefCell<FeatureGeneric>> {
    let mut feature = FeatureGeneric::new(1);
    feature.set_value(DVector::from_element(1, value)).unwrap();
    feature
        .set_interaction(DMatrix::from_row_slice(1, 6, &[1.0, 0.0, 0.0, 0.0, 0.0, 0.0]))
        .unwrap();
    Rc::new(RefCell::new(feature))
}

fn point(x: f64, y: f64, depth: f64) -> Rc<RefCell<FeaturePoint>> {
    Rc::new(RefCell::new(FeaturePoint::new(x, y, depth)))
}

/// A translation and a rotation feature, which constrain every degree of freedom.
fn full_rank_task(servo: &mut Servo) {
    let translation = FeatureTranslation::from_isometry(&IsometryMatrix3::from_parts(
        Vector3::new(0.1, -0.2, 0.3).into(),
        Rotation3::identity(),
    ));
    servo.add_feature_to_neutral(Rc::new(RefCell::new(translation)), Selection::ALL);
    let rotation = FeatureThetaU::from_rotation(&Rotation3::identity());
    servo.add_feature_to_neutral(Rc::new(RefCell::new(rotation)), Selection::ALL);
}

#[test]
fn scalar_task_with_transpose() {
    let mut servo = Servo::new(ServoConfiguration::EyeInHandCamera);
    servo.set_inversion_mode(InversionMode::Transpose);
    servo.add_feature(scalar(1.0), scalar(0.0), Selection::ALL);
    let output = servo.compute_control_law().unwrap();
    assert_eq!(
        output,
        DVector::from_vec(vec![-1.0, 0.0, 0.0, 0.0, 0.0, 0.0])
    );
    assert_eq!(servo.rank(), Some(6));
    assert_eq!(servo.iteration(), 1);
}

#[test]
fn scalar_task_with_pseudo_inverse() {
    let mut servo = Servo::new(ServoConfiguration::EyeInHandCamera);
    servo.add_feature(scalar(1.0), scalar(0.0), Selection::ALL);
    let output = servo.compute_control_law().unwrap();
    assert_relative_eq!(
        output,
        DVector::from_vec(vec![-1.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
        epsilon = 1e-12
    );
    assert_eq!(servo.rank(), Some(1));
}

#[test]
fn empty_feature_set() {
    let mut servo = Servo::new(ServoConfiguration::EyeInHandCamera);
    assert_eq!(servo.compute_control_law(), Err(ServoError::EmptyFeatureSet));
    assert_eq!(servo.compute_error(), Err(ServoError::EmptyFeatureSet));
    assert_eq!(servo.task_dimension(), 0);
    assert_eq!(servo.iteration(), 0);
    assert!(servo.control_law().is_none());
}

#[test]
fn camera_frame_needs_no_kinematics() {
    let servo = Servo::new(ServoConfiguration::EyeInHandCamera);
    assert_eq!(servo.test_initialization(), Ok(true));
    assert_eq!(servo.test_updated(), Ok(true));
}

#[test]
fn camera_frame_after_construction() {
    let mut servo = Servo::default();
    servo.add_feature_to_neutral(point(0.1, 0.2, 1.0), Selection::ALL);
    assert_eq!(
        servo.compute_control_law(),
        Err(ServoError::ConfigurationUndefined)
    );
    assert_eq!(
        servo.test_initialization(),
        Err(ServoError::ConfigurationUndefined)
    );
    servo.set_servo(ServoConfiguration::EyeInHandCamera);
    assert!(servo.compute_control_law().is_ok());
}

#[test]
fn missing_kinematics_on_first_cycle() {
    let mut servo = Servo::new(ServoConfiguration::EyeToHandFixedJacobian);
    servo.add_feature_to_neutral(point(0.1, 0.2, 1.0), Selection::ALL);
    servo.set_camera_to_fixed(VelocityTwist::identity());
    assert_eq!(
        servo.compute_control_law(),
        Err(ServoError::NotInitialized {
            configuration: ServoConfiguration::EyeToHandFixedJacobian,
            missing: vec![KinematicInput::FixedJacobian],
        })
    );
    assert_eq!(servo.iteration(), 0);

    servo
        .set_fixed_jacobian(DMatrix::identity(6, 6))
        .unwrap();
    servo.compute_control_law().unwrap();
    assert_eq!(servo.iteration(), 1);
}

#[test]
fn stale_kinematics_keep_running() {
    let _ = pretty_env_logger::try_init_timed();
    let mut servo = Servo::new(ServoConfiguration::EyeInHandJoint);
    servo.add_feature_to_neutral(point(0.1, 0.2, 1.0), Selection::ALL);
    servo.set_camera_to_effector(VelocityTwist::identity());
    servo
        .set_effector_jacobian(DMatrix::identity(6, 6))
        .unwrap();
    let first = servo.compute_control_law().unwrap();
    assert!(!servo.is_fresh(KinematicInput::EffectorJacobian));
    assert_eq!(servo.test_updated(), Ok(false));

    // The last Jacobian is used again.
    let second = servo.compute_control_law().unwrap();
    assert_eq!(first, second);
    assert_eq!(servo.iteration(), 2);
}

#[test]
fn eye_to_hand_flips_the_sign() {
    let mut eye_in_hand = Servo::new(ServoConfiguration::EyeInHandJoint);
    let mut eye_to_hand = Servo::new(ServoConfiguration::EyeToHandEffector);
    let c_v_e = VelocityTwist::from_parts(
        Vector3::new(0.1, 0.0, 0.5),
        Rotation3::from_euler_angles(0.1, 0.2, 0.3),
    );
    for servo in [&mut eye_in_hand, &mut eye_to_hand] {
        servo.add_feature_to_neutral(point(0.1, -0.2, 1.5), Selection::ALL);
        servo.set_camera_to_effector(c_v_e);
        servo
            .set_effector_jacobian(DMatrix::identity(6, 6))
            .unwrap();
    }
    let a = eye_in_hand.compute_control_law().unwrap();
    let b = eye_to_hand.compute_control_law().unwrap();
    assert_relative_eq!(a, -b, epsilon = 1e-12);
    assert_relative_eq!(
        eye_in_hand.task_jacobian().unwrap().clone(),
        -eye_to_hand.task_jacobian().unwrap(),
        epsilon = 1e-12
    );
}

#[test]
fn mean_interaction_is_the_average() {
    let mut servo = Servo::new(ServoConfiguration::EyeInHandCamera);
    servo.add_feature(point(0.1, 0.2, 1.0), point(-0.1, 0.05, 2.0), Selection::ALL);
    servo.add_feature(point(-0.3, 0.1, 1.2), point(0.2, 0.2, 0.8), FeaturePoint::Y);

    servo.set_interaction_matrix_mode(InteractionMatrixMode::Current);
    let current = servo.compute_interaction_matrix().unwrap().clone();
    servo.set_interaction_matrix_mode(InteractionMatrixMode::Desired);
    let desired = servo.compute_interaction_matrix().unwrap().clone();
    servo.set_interaction_matrix_mode(InteractionMatrixMode::Mean);
    let mean = servo.compute_interaction_matrix().unwrap().clone();

    assert_eq!(mean.shape(), (3, 6));
    assert_relative_eq!(mean, (current + desired) / 2.0, epsilon = 1e-12);
    assert_eq!(servo.task_dimension(), 3);
}

#[test]
fn mean_interaction_with_mismatched_shapes() {
    let mut servo = Servo::new(ServoConfiguration::EyeInHandCamera);
    servo.set_interaction_matrix_mode(InteractionMatrixMode::Mean);
    let current = Rc::new(RefCell::new(FeatureGeneric::new(2)));
    let desired = Rc::new(RefCell::new(FeatureGeneric::new(1)));
    servo.add_feature(current, desired, Selection::ALL);
    assert_eq!(
        servo.compute_interaction_matrix(),
        Err(ServoError::DimensionMismatch {
            quantity: "desired interaction matrix rows",
            expected: 2,
            actual: 1
        })
    );
    assert!(servo.interaction_matrix().is_none());
    assert_eq!(servo.task_dimension(), 0);
}

#[test]
fn dimensions_agree_after_error() {
    let mut servo = Servo::new(ServoConfiguration::EyeInHandCamera);
    servo.add_feature(point(0.1, 0.2, 1.0), point(0.0, 0.0, 1.0), FeaturePoint::X);
    servo.add_feature_to_neutral(point(0.3, 0.1, 1.0), Selection::ALL);
    full_rank_task(&mut servo);
    let error = servo.compute_error().unwrap().clone();
    let interaction = servo.compute_interaction_matrix().unwrap().clone();
    assert_eq!(error.len(), 9);
    assert_eq!(interaction.nrows(), 9);
    assert_eq!(servo.task_dimension(), 9);
    assert_eq!(servo.dimension(), 9);
    assert_eq!(servo.value().unwrap().len(), 9);
    assert_eq!(servo.desired_value().unwrap().len(), 9);
    assert_relative_eq!(error[0], 0.1);
}

#[test]
fn neutral_desired_feature() {
    let mut servo = Servo::new(ServoConfiguration::EyeInHandCamera);
    let current = point(0.3, 0.4, 2.0);
    servo.add_feature_to_neutral(current.clone(), Selection::ALL);
    let entry = &servo.features().entries()[0];
    assert_eq!(entry.ownership(), Ownership::Task);
    assert_eq!(entry.with_desired(|desired| desired.value()), DVector::zeros(2));
    assert_eq!(current.borrow().x, 0.3);
}

#[test]
fn release_twice() {
    let mut servo = Servo::new(ServoConfiguration::EyeInHandCamera);
    servo.add_feature_to_neutral(point(0.3, 0.4, 2.0), Selection::ALL);
    servo.add_feature(point(0.1, 0.1, 1.0), point(0.0, 0.0, 1.0), Selection::ALL);
    assert_eq!(servo.release(), 1);
    assert_eq!(servo.release(), 0);
    assert!(servo.features().is_empty());
}

#[test]
fn full_rank_has_no_free_dof() {
    let mut servo = Servo::new(ServoConfiguration::EyeInHandCamera);
    full_rank_task(&mut servo);
    servo.compute_control_law().unwrap();
    assert_eq!(servo.rank(), Some(6));
    let no_free_dof = Err(ServoError::NoFreeDegreeOfFreedom { rank: 6, dof: 6 });
    assert_eq!(servo.secondary_task(&DVector::zeros(6)), no_free_dof);
    assert_eq!(
        servo.secondary_task_tracking(&DVector::zeros(6), &DVector::zeros(6)),
        no_free_dof
    );
    assert!(servo.null_projector().is_none());
}

#[test]
fn transpose_has_no_free_dof() {
    let mut servo = Servo::new(ServoConfiguration::EyeInHandCamera);
    servo.set_inversion_mode(InversionMode::Transpose);
    servo.add_feature_to_neutral(point(0.3, 0.4, 2.0), Selection::ALL);
    servo.compute_control_law().unwrap();
    assert_eq!(
        servo.secondary_task(&DVector::zeros(6)),
        Err(ServoError::NoFreeDegreeOfFreedom { rank: 6, dof: 6 })
    );
}

#[test]
fn secondary_tasks_do_not_disturb_the_primary_task() {
    let mut rng = SmallRng::seed_from_u64(0);
    let mut servo = Servo::new(ServoConfiguration::EyeInHandCamera);
    servo.set_gain(|e: &DVector<f64>| 0.5 + e.norm());
    servo.add_feature(point(0.1, 0.2, 1.0), point(0.0, 0.0, 1.0), Selection::ALL);
    servo.add_feature(point(-0.2, 0.1, 1.5), point(-0.1, 0.1, 1.0), Selection::ALL);

    for _ in 0..10 {
        servo.compute_control_law().unwrap();
        let jacobian = servo.task_jacobian().unwrap().clone();
        assert_eq!(servo.rank(), Some(4));

        let de2dt = DVector::from_fn(6, |_, _| rng.gen_range(-1.0..1.0));
        let e2 = DVector::from_fn(6, |_, _| rng.gen_range(-1.0..1.0));
        let velocity = servo.secondary_task(&de2dt).unwrap();
        assert_relative_eq!(&jacobian * velocity, DVector::zeros(4), epsilon = 1e-9);
        let tracking = servo.secondary_task_tracking(&e2, &de2dt).unwrap();
        assert_relative_eq!(&jacobian * tracking, DVector::zeros(4), epsilon = 1e-9);

        let projector = servo.null_projector().unwrap();
        assert_relative_eq!(projector * projector, projector.clone(), epsilon = 1e-9);
    }
}

fn seven_joints() -> DMatrix<f64> {
    let mut e_j_e = DMatrix::zeros(6, 7);
    e_j_e.columns_mut(0, 6).fill_with_identity();
    e_j_e[(2, 6)] = 1.0;
    e_j_e
}

#[test]
fn full_rank_task_on_seven_joints() {
    let mut servo = Servo::new(ServoConfiguration::EyeInHandJoint);
    full_rank_task(&mut servo);
    servo.set_camera_to_effector(VelocityTwist::identity());
    servo.set_effector_jacobian(seven_joints()).unwrap();
    let output = servo.compute_control_law().unwrap();
    assert_eq!(output.len(), 7);
    assert_eq!(servo.rank(), Some(6));
    assert!(!servo.control_law().unwrap().is_redundant());

    // A rank of 6 leaves nothing to a secondary task, even with a seventh joint.
    let no_free_dof = Err(ServoError::NoFreeDegreeOfFreedom { rank: 6, dof: 6 });
    assert_eq!(
        servo.secondary_task(&DVector::from_element(7, 1.0)),
        no_free_dof
    );
    assert_eq!(
        servo.secondary_task_tracking(&DVector::zeros(7), &DVector::from_element(7, 1.0)),
        no_free_dof
    );
}

#[test]
fn partial_task_on_seven_joints() {
    let mut servo = Servo::new(ServoConfiguration::EyeInHandJoint);
    servo.add_feature(point(0.1, 0.2, 1.0), point(0.0, 0.0, 1.0), Selection::ALL);
    servo.add_feature(point(-0.2, 0.1, 1.5), point(-0.1, 0.1, 1.0), Selection::ALL);
    servo.set_camera_to_effector(VelocityTwist::identity());
    servo.set_effector_jacobian(seven_joints()).unwrap();
    servo.compute_control_law().unwrap();
    assert_eq!(servo.rank(), Some(4));

    let jacobian = servo.task_jacobian().unwrap().clone();
    let secondary = servo
        .secondary_task(&DVector::from_element(7, 1.0))
        .unwrap();
    assert_eq!(secondary.len(), 7);
    assert_relative_eq!(&jacobian * secondary, DVector::zeros(4), epsilon = 1e-9);
    assert_eq!(
        servo.secondary_task(&DVector::zeros(6)),
        Err(ServoError::DimensionMismatch {
            quantity: "secondary task velocity",
            expected: 7,
            actual: 6
        })
    );
}

#[test]
fn jacobian_shape_is_checked() {
    let mut servo = Servo::new(ServoConfiguration::EyeInHandJoint);
    assert_eq!(
        servo.set_effector_jacobian(DMatrix::zeros(5, 6)),
        Err(ServoError::JacobianShape {
            input: KinematicInput::EffectorJacobian,
            rows: 5,
            cols: 6
        })
    );
}

#[test]
fn feature_errors_propagate() {
    let mut servo = Servo::new(ServoConfiguration::EyeInHandCamera);
    let current = Rc::new(RefCell::new(FeatureGeneric::new(2)));
    let desired = Rc::new(RefCell::new(FeatureGeneric::new(3)));
    servo.add_feature(current, desired, Selection::ALL);
    assert_eq!(
        servo.compute_error(),
        Err(ServoError::Feature(FeatureError::DimensionMismatch {
            feature: "generic",
            expected: 2,
            actual: 3
        }))
    );
    assert!(servo.error().is_none());
}

#[test]
fn interaction_width_is_checked() {
    let mut servo = Servo::new(ServoConfiguration::EyeInHandCamera);
    let mut feature = FeatureGeneric::new(1);
    feature.set_interaction(DMatrix::zeros(1, 4)).unwrap();
    let feature = Rc::new(RefCell::new(feature));
    servo.add_feature(feature.clone(), feature, Selection::ALL);
    assert_eq!(
        servo.compute_interaction_matrix(),
        Err(ServoError::DimensionMismatch {
            quantity: "stacked block width",
            expected: 6,
            actual: 4
        })
    );
}

#[test]
fn fixed_effector_consumes_its_inputs() {
    let mut servo = Servo::new(ServoConfiguration::EyeToHandFixedEffector);
    servo.add_feature_to_neutral(point(0.1, 0.2, 1.0), Selection::ALL);
    servo.set_camera_to_fixed(VelocityTwist::from_parts(
        Vector3::new(0.0, 0.0, 1.0),
        Rotation3::identity(),
    ));
    servo.set_fixed_to_effector(VelocityTwist::identity());
    servo
        .set_effector_jacobian(DMatrix::identity(6, 6))
        .unwrap();
    servo.compute_control_law().unwrap();
    assert!(servo.is_fresh(KinematicInput::CameraToFixed));
    assert!(!servo.is_fresh(KinematicInput::FixedToEffector));
    assert!(!servo.is_fresh(KinematicInput::EffectorJacobian));
}
