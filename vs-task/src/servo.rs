use crate::{
    pseudo_inverse, ConstantGain, FeatureRegistry, Gain, KinematicInput, KinematicInputs,
    PrintLevel, ServoConfiguration, ServoDisplay, ServoError, ServoSettings, SharedFeature,
    StackBuffer, SvdParameters,
};
use core::fmt;
use log::*;
use vs_core::nalgebra::{DMatrix, DVector};
use vs_core::{Selection, VelocityTwist, TWIST_DIM};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Which features the interaction matrix is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum InteractionMatrixMode {
    /// `L(s)`, recomputed every cycle from the current features.
    Current,
    /// `L(s*)`, from the desired features.
    Desired,
    /// `(L(s) + L(s*)) / 2`.
    Mean,
}

impl Default for InteractionMatrixMode {
    fn default() -> Self {
        Self::Desired
    }
}

/// How the task Jacobian is inverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum InversionMode {
    /// Moore-Penrose pseudo-inverse through a singular value decomposition.
    PseudoInverse,
    /// Plain transpose of the Jacobian. The task is then considered full rank.
    Transpose,
}

impl Default for InversionMode {
    fn default() -> Self {
        Self::PseudoInverse
    }
}

/// Everything computed by a successful control law.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlLaw {
    /// `J1 = sign * L * cVa * aJe`, a `k x n` matrix for `k` task components and `n` actuators.
    pub jacobian: DMatrix<f64>,
    /// `J1+`, or `J1^T` with [`InversionMode::Transpose`].
    pub inverse: DMatrix<f64>,
    pub rank: usize,
    /// `W+W`, the projector onto the image of `J1^T`.
    pub range_projector: DMatrix<f64>,
    /// `e1`, the primary task before the gain.
    pub primary: DVector<f64>,
    /// The gain computed from `e1`.
    pub gain: f64,
    /// `e = -gain * e1`, the actuator velocity command.
    pub output: DVector<f64>,
}

impl ControlLaw {
    /// The number of actuated degrees of freedom `n`.
    pub fn dof(&self) -> usize {
        self.jacobian.ncols()
    }

    /// Checks if the primary task leaves degrees of freedom for a secondary task.
    ///
    /// The rank is compared with the 6 columns of the interaction matrix, whatever the number
    /// of actuators.
    pub fn is_redundant(&self) -> bool {
        self.rank < TWIST_DIM
    }
}

#[derive(Clone, Copy)]
enum Side {
    Current,
    Desired,
}

fn stack_interaction<'a>(
    buffer: &'a mut StackBuffer<DMatrix<f64>>,
    features: &FeatureRegistry,
    side: Side,
) -> Result<&'a DMatrix<f64>, ServoError> {
    buffer.assemble(features.entries().iter().map(|entry| {
        let selection = entry.selection();
        Ok(match side {
            Side::Current => entry.with_current(|feature| feature.interaction(selection)),
            Side::Desired => entry.with_desired(|feature| feature.interaction(selection)),
        })
    }))
}

fn stack_value<'a>(
    buffer: &'a mut StackBuffer<DVector<f64>>,
    features: &FeatureRegistry,
    side: Side,
) -> Result<&'a DVector<f64>, ServoError> {
    buffer.assemble(features.entries().iter().map(|entry| {
        let selection = entry.selection();
        Ok(match side {
            Side::Current => {
                entry.with_current(|feature| selection.select_components(&feature.value()))
            }
            Side::Desired => {
                entry.with_desired(|feature| selection.select_components(&feature.value()))
            }
        })
    }))
}

/// A task-priority visual servoing task.
///
/// A task drives a set of current visual features towards their desired values. Every cycle the
/// caller updates its features and kinematic inputs, then calls
/// [`Servo::compute_control_law`] to get the actuator velocity:
///
/// ```text
///   J1 = sign * L * cVa * aJe
///   e1 = J1+ (s - s*)
///   e  = -lambda(e1) * e1
/// ```
///
/// If the primary task does not constrain every degree of freedom, secondary objectives can be
/// added with [`Servo::secondary_task`] and [`Servo::secondary_task_tracking`], which project
/// them onto the null space of `J1`.
///
/// Features registered with [`Servo::add_feature_to_neutral`] are owned by the task and released
/// when it is dropped, or earlier with [`Servo::release`].
pub struct Servo {
    configuration: ServoConfiguration,
    features: FeatureRegistry,
    kinematics: KinematicInputs,
    interaction_matrix_mode: InteractionMatrixMode,
    inversion_mode: InversionMode,
    svd: SvdParameters,
    gain: Box<dyn Gain>,
    iteration: u64,
    dimension: usize,
    interaction_buffer: StackBuffer<DMatrix<f64>>,
    desired_interaction_buffer: StackBuffer<DMatrix<f64>>,
    value_buffer: StackBuffer<DVector<f64>>,
    desired_value_buffer: StackBuffer<DVector<f64>>,
    error_buffer: StackBuffer<DVector<f64>>,
    interaction: Option<DMatrix<f64>>,
    value: Option<DVector<f64>>,
    desired_value: Option<DVector<f64>>,
    error: Option<DVector<f64>>,
    control_law: Option<ControlLaw>,
    null_projector: Option<DMatrix<f64>>,
}

impl Default for Servo {
    fn default() -> Self {
        Self::new(ServoConfiguration::Undefined)
    }
}

impl fmt::Debug for Servo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Servo")
            .field("configuration", &self.configuration)
            .field("features", &self.features)
            .field("interaction_matrix_mode", &self.interaction_matrix_mode)
            .field("inversion_mode", &self.inversion_mode)
            .field("svd", &self.svd)
            .field("iteration", &self.iteration)
            .field("dimension", &self.dimension)
            .field("control_law", &self.control_law)
            .finish_non_exhaustive()
    }
}

impl Servo {
    pub fn new(configuration: ServoConfiguration) -> Self {
        let mut servo = Self {
            configuration: ServoConfiguration::Undefined,
            features: FeatureRegistry::new(),
            kinematics: KinematicInputs::new(),
            interaction_matrix_mode: InteractionMatrixMode::default(),
            inversion_mode: InversionMode::default(),
            svd: SvdParameters::default(),
            gain: Box::new(ConstantGain::default()),
            iteration: 0,
            dimension: 0,
            interaction_buffer: StackBuffer::new(TWIST_DIM),
            desired_interaction_buffer: StackBuffer::new(TWIST_DIM),
            value_buffer: StackBuffer::new(1),
            desired_value_buffer: StackBuffer::new(1),
            error_buffer: StackBuffer::new(1),
            interaction: None,
            value: None,
            desired_value: None,
            error: None,
            control_law: None,
            null_projector: None,
        };
        servo.set_servo(configuration);
        servo
    }

    /// Creates a task and applies `settings` to it.
    pub fn with_settings(configuration: ServoConfiguration, settings: &ServoSettings) -> Self {
        let mut servo = Self::new(configuration);
        servo.apply_settings(settings);
        servo
    }

    /// Chooses the configuration of the task.
    ///
    /// The camera frame configuration does not need any kinematic input: the twist `cVe` and the
    /// Jacobian `eJe` are set to the identity.
    pub fn set_servo(&mut self, configuration: ServoConfiguration) {
        debug!("servo configuration: {}", configuration.description());
        self.configuration = configuration;
        if configuration == ServoConfiguration::EyeInHandCamera {
            self.kinematics.supply_camera_frame();
        }
    }

    /// Adds a feature that should converge to `desired`.
    ///
    /// Both features stay owned by the caller, who updates them between cycles.
    pub fn add_feature(
        &mut self,
        current: SharedFeature,
        desired: SharedFeature,
        selection: Selection,
    ) {
        self.features.add(current, desired, selection);
    }

    /// Adds a feature that should converge to its neutral value, such as a zero translation.
    pub fn add_feature_to_neutral(&mut self, current: SharedFeature, selection: Selection) {
        self.features.add_to_neutral(current, selection);
    }

    pub fn set_camera_to_effector(&mut self, c_v_e: VelocityTwist) {
        self.kinematics.set_camera_to_effector(c_v_e);
    }

    pub fn set_camera_to_fixed(&mut self, c_v_f: VelocityTwist) {
        self.kinematics.set_camera_to_fixed(c_v_f);
    }

    pub fn set_fixed_to_effector(&mut self, f_v_e: VelocityTwist) {
        self.kinematics.set_fixed_to_effector(f_v_e);
    }

    pub fn set_effector_jacobian(&mut self, e_j_e: DMatrix<f64>) -> Result<(), ServoError> {
        self.kinematics.set_effector_jacobian(e_j_e)
    }

    pub fn set_fixed_jacobian(&mut self, f_j_e: DMatrix<f64>) -> Result<(), ServoError> {
        self.kinematics.set_fixed_jacobian(f_j_e)
    }

    pub fn set_interaction_matrix_mode(&mut self, mode: InteractionMatrixMode) {
        self.interaction_matrix_mode = mode;
    }

    pub fn set_inversion_mode(&mut self, mode: InversionMode) {
        self.inversion_mode = mode;
    }

    pub fn set_svd_parameters(&mut self, svd: SvdParameters) {
        self.svd = svd;
    }

    /// Sets the gain applied to the primary task and to the tracking secondary task.
    pub fn set_gain(&mut self, gain: impl Gain + 'static) {
        self.gain = Box::new(gain);
    }

    pub fn apply_settings(&mut self, settings: &ServoSettings) {
        self.interaction_matrix_mode = settings.interaction_matrix_mode;
        self.inversion_mode = settings.inversion_mode;
        self.svd = settings.svd();
        self.gain = Box::new(settings.gain);
    }

    /// Recomputes the task dimension from the registered features and caches it.
    pub fn dimension(&mut self) -> usize {
        self.dimension = self.features.dimension();
        self.dimension
    }

    /// The task dimension as of the last assembly or call to [`Servo::dimension`].
    pub fn task_dimension(&self) -> usize {
        self.dimension
    }

    /// Stacks the interaction matrices of the features according to the interaction matrix mode.
    pub fn compute_interaction_matrix(&mut self) -> Result<&DMatrix<f64>, ServoError> {
        let interaction = match self.interaction_matrix_mode {
            InteractionMatrixMode::Current => {
                stack_interaction(&mut self.interaction_buffer, &self.features, Side::Current)?
                    .clone()
            }
            InteractionMatrixMode::Desired => {
                stack_interaction(&mut self.interaction_buffer, &self.features, Side::Desired)?
                    .clone()
            }
            InteractionMatrixMode::Mean => {
                let current =
                    stack_interaction(&mut self.interaction_buffer, &self.features, Side::Current)?;
                let desired = stack_interaction(
                    &mut self.desired_interaction_buffer,
                    &self.features,
                    Side::Desired,
                )?;
                if current.shape() != desired.shape() {
                    return Err(ServoError::DimensionMismatch {
                        quantity: "desired interaction matrix rows",
                        expected: current.nrows(),
                        actual: desired.nrows(),
                    });
                }
                (current + desired) * 0.5
            }
        };
        self.dimension = interaction.nrows();
        Ok(&*self.interaction.insert(interaction))
    }

    /// Stacks the current values, the desired values and the errors of the features.
    pub fn compute_error(&mut self) -> Result<&DVector<f64>, ServoError> {
        let value = stack_value(&mut self.value_buffer, &self.features, Side::Current)?.clone();
        let desired_value =
            stack_value(&mut self.desired_value_buffer, &self.features, Side::Desired)?.clone();
        let error = self
            .error_buffer
            .assemble(self.features.entries().iter().map(|entry| {
                let selection = entry.selection();
                entry
                    .with_pair(|current, desired| current.error(desired, selection))
                    .map_err(ServoError::from)
            }))?
            .clone();
        self.value = Some(value);
        self.desired_value = Some(desired_value);
        self.dimension = error.len();
        Ok(&*self.error.insert(error))
    }

    /// Checks that the kinematic inputs the configuration needs have been supplied once.
    pub fn test_initialization(&self) -> Result<bool, ServoError> {
        self.kinematics.test_initialization(self.configuration)
    }

    /// Checks that the kinematic inputs the configuration needs every cycle have been updated.
    pub fn test_updated(&self) -> Result<bool, ServoError> {
        self.kinematics.test_updated(self.configuration)
    }

    /// Runs one cycle of the control law and returns the actuator velocity `e`.
    ///
    /// On the first cycle every kinematic input of the configuration must have been supplied.
    /// Inputs that were not updated since the previous cycle are only reported through the log,
    /// and their last value is used. A failed cycle keeps the previous control law.
    pub fn compute_control_law(&mut self) -> Result<DVector<f64>, ServoError> {
        let configuration = self.configuration;
        let chain = configuration.chain().ok_or_else(|| {
            error!("no control law has been defined yet");
            ServoError::ConfigurationUndefined
        })?;

        if self.iteration == 0 && !self.test_initialization()? {
            return Err(ServoError::NotInitialized {
                configuration,
                missing: self.kinematics.missing(configuration)?,
            });
        }
        self.test_updated()?;

        let interaction = self.compute_interaction_matrix()?.clone();
        let error = self.compute_error()?.clone();
        if error.len() != interaction.nrows() {
            return Err(ServoError::DimensionMismatch {
                quantity: "error vector",
                expected: interaction.nrows(),
                actual: error.len(),
            });
        }

        let (c_v_a, a_j_e) = self.kinematics.resolve(configuration)?;
        let jacobian = interaction * c_v_a * a_j_e * chain.sign;
        let dof = jacobian.ncols();

        let (inverse, rank, range_projector) = match self.inversion_mode {
            InversionMode::PseudoInverse => {
                let decomposition = pseudo_inverse(&jacobian, &self.svd)?;
                let range_projector = decomposition.range_projector();
                (decomposition.inverse, decomposition.rank, range_projector)
            }
            InversionMode::Transpose => (
                jacobian.transpose(),
                TWIST_DIM,
                DMatrix::identity(dof, dof),
            ),
        };

        let primary = if rank == TWIST_DIM {
            &inverse * &error
        } else {
            &range_projector * (&inverse * &error)
        };
        let gain = self.gain.gain(&primary);
        let output = &primary * -gain;

        self.iteration += 1;
        debug!(
            "cycle {}: task dimension {}, rank {} of {}, gain {}",
            self.iteration, self.dimension, rank, dof, gain
        );
        self.null_projector = None;
        self.control_law = Some(ControlLaw {
            jacobian,
            inverse,
            rank,
            range_projector,
            primary,
            gain,
            output: output.clone(),
        });
        Ok(output)
    }

    fn compute_null_projector(
        &mut self,
        vectors: &[(&'static str, usize)],
    ) -> Result<DMatrix<f64>, ServoError> {
        let law = self
            .control_law
            .as_ref()
            .ok_or(ServoError::ControlLawNotComputed)?;
        let dof = law.dof();
        if !law.is_redundant() {
            return Err(ServoError::NoFreeDegreeOfFreedom {
                rank: law.rank,
                dof: TWIST_DIM,
            });
        }
        for &(quantity, actual) in vectors {
            if actual != dof {
                return Err(ServoError::DimensionMismatch {
                    quantity,
                    expected: dof,
                    actual,
                });
            }
        }
        let projector = DMatrix::identity(dof, dof) - &law.range_projector;
        self.null_projector = Some(projector.clone());
        Ok(projector)
    }

    /// Projects the secondary task velocity `de2dt` onto the null space of the primary task:
    /// `(I - W+W) de2dt`.
    pub fn secondary_task(&mut self, de2dt: &DVector<f64>) -> Result<DVector<f64>, ServoError> {
        let projector = self.compute_null_projector(&[("secondary task velocity", de2dt.len())])?;
        Ok(projector * de2dt)
    }

    /// Regulates a secondary task error `e2` in the null space of the primary task:
    /// `-lambda(e2) (I - W+W) e2 + (I - W+W) de2dt`.
    pub fn secondary_task_tracking(
        &mut self,
        e2: &DVector<f64>,
        de2dt: &DVector<f64>,
    ) -> Result<DVector<f64>, ServoError> {
        let projector = self.compute_null_projector(&[
            ("secondary task error", e2.len()),
            ("secondary task velocity", de2dt.len()),
        ])?;
        let gain = self.gain.gain(e2);
        Ok(&projector * e2 * -gain + &projector * de2dt)
    }

    /// Releases the features owned by the task and forgets every feature.
    ///
    /// This also happens when the task is dropped. Returns the number of owned features released.
    pub fn release(&mut self) -> usize {
        self.features.release()
    }

    /// A printable report of the task.
    pub fn display(&self, level: PrintLevel) -> ServoDisplay<'_> {
        ServoDisplay::new(self, level)
    }

    pub fn configuration(&self) -> ServoConfiguration {
        self.configuration
    }

    pub fn interaction_matrix_mode(&self) -> InteractionMatrixMode {
        self.interaction_matrix_mode
    }

    pub fn inversion_mode(&self) -> InversionMode {
        self.inversion_mode
    }

    pub fn svd_parameters(&self) -> SvdParameters {
        self.svd
    }

    /// The number of successful control law cycles.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn features(&self) -> &FeatureRegistry {
        &self.features
    }

    pub fn kinematics(&self) -> &KinematicInputs {
        &self.kinematics
    }

    /// Checks if a kinematic input was updated since the last cycle.
    pub fn is_fresh(&self, input: KinematicInput) -> bool {
        self.kinematics.is_fresh(input)
    }

    /// The reallocations done by the last assembly of the interaction matrix and of the error.
    pub fn reallocations(&self) -> (usize, usize) {
        (
            self.interaction_buffer.reallocations(),
            self.error_buffer.reallocations(),
        )
    }

    /// `L`, as of the last successful assembly.
    pub fn interaction_matrix(&self) -> Option<&DMatrix<f64>> {
        self.interaction.as_ref()
    }

    /// `s`, the selected components of the current features.
    pub fn value(&self) -> Option<&DVector<f64>> {
        self.value.as_ref()
    }

    /// `s*`, the selected components of the desired features.
    pub fn desired_value(&self) -> Option<&DVector<f64>> {
        self.desired_value.as_ref()
    }

    /// `s - s*`, as computed by the features.
    pub fn error(&self) -> Option<&DVector<f64>> {
        self.error.as_ref()
    }

    pub fn control_law(&self) -> Option<&ControlLaw> {
        self.control_law.as_ref()
    }

    pub fn task_jacobian(&self) -> Option<&DMatrix<f64>> {
        self.control_law.as_ref().map(|law| &law.jacobian)
    }

    pub fn task_jacobian_inverse(&self) -> Option<&DMatrix<f64>> {
        self.control_law.as_ref().map(|law| &law.inverse)
    }

    pub fn rank(&self) -> Option<usize> {
        self.control_law.as_ref().map(|law| law.rank)
    }

    /// `W+W` of the last control law.
    pub fn range_projector(&self) -> Option<&DMatrix<f64>> {
        self.control_law.as_ref().map(|law| &law.range_projector)
    }

    /// `I - W+W`, as used by the last secondary task of the current cycle.
    pub fn null_projector(&self) -> Option<&DMatrix<f64>> {
        self.null_projector.as_ref()
    }

    /// `e`, the last actuator velocity.
    pub fn output(&self) -> Option<&DVector<f64>> {
        self.control_law.as_ref().map(|law| &law.output)
    }
}

impl Drop for Servo {
    fn drop(&mut self) {
        if self.features.owns_features() {
            debug!("dropping a servo task that still owns features");
        }
        self.features.release();
    }
}
