//! Amortized assembly of stacked task quantities.
//!
//! The size of the interaction matrix and of the error vector is only known once every feature
//! has contributed its rows. Instead of collecting the contributions first, a [`StackBuffer`]
//! assumes that the size did not change since the last cycle and doubles its capacity whenever a
//! contribution does not fit. On the first assembly this costs `log2(n) + 1` reallocations, and
//! none afterwards as long as the task keeps the same dimension. The buffer is trimmed to the
//! exact size at the end.

use crate::ServoError;
use log::*;
use vs_core::nalgebra::{DMatrix, DVector};

/// Something that can be stacked row by row in a [`StackBuffer`].
pub trait Stackable: Sized {
    /// Creates a zero-filled block.
    fn zeros(rows: usize, width: usize) -> Self;

    fn row_count(&self) -> usize;

    fn width(&self) -> usize;

    /// Changes the number of rows, preserving the content of the rows that are kept.
    fn resize_rows(&mut self, rows: usize, width: usize);

    /// Copies `block` at row `cursor`. The block must fit.
    fn copy_rows(&mut self, cursor: usize, block: &Self);
}

impl Stackable for DMatrix<f64> {
    fn zeros(rows: usize, width: usize) -> Self {
        DMatrix::zeros(rows, width)
    }

    fn row_count(&self) -> usize {
        self.nrows()
    }

    fn width(&self) -> usize {
        self.ncols()
    }

    fn resize_rows(&mut self, rows: usize, width: usize) {
        self.resize_mut(rows, width, 0.0);
    }

    fn copy_rows(&mut self, cursor: usize, block: &Self) {
        self.rows_mut(cursor, block.nrows()).copy_from(block);
    }
}

impl Stackable for DVector<f64> {
    fn zeros(rows: usize, _: usize) -> Self {
        DVector::zeros(rows)
    }

    fn row_count(&self) -> usize {
        self.len()
    }

    fn width(&self) -> usize {
        1
    }

    fn resize_rows(&mut self, rows: usize, _: usize) {
        self.resize_vertically_mut(rows, 0.0);
    }

    fn copy_rows(&mut self, cursor: usize, block: &Self) {
        self.rows_mut(cursor, block.len()).copy_from(block);
    }
}

/// A growable stack of rows of a fixed width, reused from one cycle to the next.
#[derive(Debug, Clone)]
pub struct StackBuffer<M> {
    data: M,
    width: usize,
    reallocations: usize,
}

impl<M: Stackable> StackBuffer<M> {
    /// Creates an empty buffer of rows of `width` columns.
    pub fn new(width: usize) -> Self {
        Self::with_capacity(width, 0)
    }

    /// Creates a buffer that assumes the first assembly will have `capacity` rows.
    pub fn with_capacity(width: usize, capacity: usize) -> Self {
        Self {
            data: M::zeros(capacity, width),
            width,
            reallocations: 0,
        }
    }

    /// The number of rows currently allocated.
    ///
    /// After an assembly this is exactly the number of rows assembled.
    pub fn capacity(&self) -> usize {
        self.data.row_count()
    }

    /// The number of reallocations done by the last assembly, excluding the final trim.
    pub fn reallocations(&self) -> usize {
        self.reallocations
    }

    /// The stacked rows of the last successful assembly.
    pub fn stacked(&self) -> &M {
        &self.data
    }

    /// Stacks every block in order and trims the buffer to the rows consumed.
    ///
    /// Fails with [`ServoError::EmptyFeatureSet`] if there are no blocks, and with
    /// [`ServoError::DimensionMismatch`] if a block does not have the width of the buffer.
    /// The first error returned by a block aborts the assembly.
    pub fn assemble<I>(&mut self, blocks: I) -> Result<&M, ServoError>
    where
        I: IntoIterator<Item = Result<M, ServoError>>,
    {
        let mut blocks = blocks.into_iter().peekable();
        if blocks.peek().is_none() {
            return Err(ServoError::EmptyFeatureSet);
        }

        // The first assumption is that the size has not changed since the last assembly.
        let mut capacity = self.data.row_count();
        if capacity == 0 {
            capacity = 1;
            self.data.resize_rows(capacity, self.width);
        }
        self.reallocations = 0;

        let mut cursor = 0;
        for block in blocks {
            let block = block?;
            if block.width() != self.width {
                return Err(ServoError::DimensionMismatch {
                    quantity: "stacked block width",
                    expected: self.width,
                    actual: block.width(),
                });
            }
            if cursor + block.row_count() > capacity {
                while cursor + block.row_count() > capacity {
                    capacity *= 2;
                }
                trace!("reallocating stack buffer to {} rows", capacity);
                self.data.resize_rows(capacity, self.width);
                self.reallocations += 1;
            }
            self.data.copy_rows(cursor, &block);
            cursor += block.row_count();
        }

        self.data.resize_rows(cursor, self.width);
        Ok(&self.data)
    }
}
