use crate::ServoError;
use vs_core::nalgebra::{DMatrix, DVector};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Parameters of the singular value decomposition used to invert the task Jacobian.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct SvdParameters {
    /// Singular values at or below `threshold * max(singular value)` are treated as zero.
    pub threshold: f64,
    /// Convergence epsilon of the SVD iterations.
    pub epsilon: f64,
    /// Maximum number of SVD iterations, `0` for no limit.
    pub max_iterations: usize,
}

impl Default for SvdParameters {
    fn default() -> Self {
        Self {
            threshold: 1e-6,
            epsilon: 1e-12,
            max_iterations: 1000,
        }
    }
}

/// The Moore-Penrose pseudo-inverse of an `m x n` matrix `A` together with the subspaces
/// exposed by its decomposition.
#[derive(Debug, Clone, PartialEq)]
pub struct PseudoInverse {
    /// `A+`, an `n x m` matrix.
    pub inverse: DMatrix<f64>,
    /// Number of singular values above the threshold.
    pub rank: usize,
    /// Every singular value, including discarded ones.
    pub singular_values: DVector<f64>,
    /// Orthonormal basis of the image of `A`, an `m x rank` matrix.
    pub image: DMatrix<f64>,
    /// Orthonormal basis of the image of `A^T`, an `n x rank` matrix.
    pub image_transpose: DMatrix<f64>,
}

impl PseudoInverse {
    fn zero(rows: usize, cols: usize, singular_values: DVector<f64>) -> Self {
        Self {
            inverse: DMatrix::zeros(cols, rows),
            rank: 0,
            singular_values,
            image: DMatrix::zeros(rows, 0),
            image_transpose: DMatrix::zeros(cols, 0),
        }
    }

    /// The orthogonal projector `W+W = Vr Vr^T` onto the image of `A^T`.
    pub fn range_projector(&self) -> DMatrix<f64> {
        &self.image_transpose * self.image_transpose.transpose()
    }
}

/// Computes the pseudo-inverse, rank and subspace images of `matrix` in one SVD pass.
pub fn pseudo_inverse(
    matrix: &DMatrix<f64>,
    parameters: &SvdParameters,
) -> Result<PseudoInverse, ServoError> {
    let (rows, cols) = matrix.shape();
    if rows == 0 || cols == 0 {
        return Ok(PseudoInverse::zero(rows, cols, DVector::zeros(0)));
    }

    let svd = matrix
        .clone()
        .try_svd(true, true, parameters.epsilon, parameters.max_iterations)
        .ok_or(ServoError::SvdNotConverged)?;
    let singular_values = svd.singular_values;
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return Err(ServoError::SvdNotConverged),
    };

    let largest = singular_values.amax();
    if largest <= 0.0 {
        return Ok(PseudoInverse::zero(rows, cols, singular_values));
    }
    let cutoff = parameters.threshold * largest;
    let kept: Vec<usize> = (0..singular_values.len())
        .filter(|&i| singular_values[i] > cutoff)
        .collect();

    let image = u.select_columns(&kept);
    let image_transpose = v_t.select_rows(&kept).transpose();
    let inverted = DVector::from_iterator(
        kept.len(),
        kept.iter().map(|&i| singular_values[i].recip()),
    );
    let inverse = &image_transpose * DMatrix::from_diagonal(&inverted) * image.transpose();

    Ok(PseudoInverse {
        inverse,
        rank: kept.len(),
        singular_values,
        image,
        image_transpose,
    })
}
