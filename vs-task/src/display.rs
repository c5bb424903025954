use crate::Servo;
use core::fmt;
use vs_core::nalgebra::{DMatrix, DVector};

/// How much of a task a [`ServoDisplay`] prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrintLevel {
    /// Configuration, features, interaction matrix, error and gain.
    All,
    /// Only the error.
    Minimum,
}

/// A report of a [`Servo`], created with [`Servo::display`].
#[derive(Debug)]
pub struct ServoDisplay<'a> {
    servo: &'a Servo,
    level: PrintLevel,
}

impl<'a> ServoDisplay<'a> {
    pub(crate) fn new(servo: &'a Servo, level: PrintLevel) -> Self {
        Self { servo, level }
    }
}

const MISSING: &str = "not yet computed";

fn write_matrix(f: &mut fmt::Formatter<'_>, matrix: Option<&DMatrix<f64>>) -> fmt::Result {
    match matrix {
        Some(matrix) => write!(f, "{}", matrix),
        None => writeln!(f, "{}", MISSING),
    }
}

fn write_vector(f: &mut fmt::Formatter<'_>, vector: Option<&DVector<f64>>) -> fmt::Result {
    match vector {
        Some(vector) => write!(f, "{}", vector.transpose()),
        None => writeln!(f, "{}", MISSING),
    }
}

impl fmt::Display for ServoDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let servo = self.servo;
        writeln!(f, "Visual servoing task:")?;
        if self.level == PrintLevel::All {
            writeln!(f, "Type of control law: {}", servo.configuration().description())?;
            writeln!(f, "List of visual features: s")?;
            for entry in servo.features().entries() {
                entry.with_current(|feature| {
                    writeln!(f, "  {}: {}", feature.name(), feature.value().transpose())
                })?;
            }
            writeln!(f, "List of desired visual features: s*")?;
            for entry in servo.features().entries() {
                entry.with_desired(|feature| {
                    writeln!(f, "  {}: {}", feature.name(), feature.value().transpose())
                })?;
            }
            writeln!(f, "Interaction matrix:")?;
            write_matrix(f, servo.interaction_matrix())?;
        }
        writeln!(f, "Error vector (s-s*):")?;
        write_vector(f, servo.error())?;
        if self.level == PrintLevel::All {
            match servo.control_law() {
                Some(law) => writeln!(f, "Gain: {}", law.gain)?,
                None => writeln!(f, "Gain: {}", MISSING)?,
            }
        }
        Ok(())
    }
}
