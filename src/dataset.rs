use std::num::NonZeroUsize;

use ndarray::{Array2, ArrayView2, Axis, s};
use rand::{Rng, seq::SliceRandom};

use crate::{MlErr, Result};

/// An in-memory supervised dataset.
///
/// Every row holds `x_size` input values followed by `y_size` target values.
#[derive(Debug, Clone)]
pub struct Dataset {
    x_size: usize,
    y_size: usize,
    data: Array2<f32>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `data` - The row-major samples.
    /// * `x_size` - The amount of input columns.
    /// * `y_size` - The amount of target columns.
    ///
    /// # Errors
    /// An `InvalidDataset` if a width is zero, the data is empty or it's length is not a multiple
    /// of the row width.
    pub fn new(data: Vec<f32>, x_size: usize, y_size: usize) -> Result<Self> {
        if x_size == 0 || y_size == 0 {
            return Err(MlErr::InvalidDataset(format!(
                "x_size ({x_size}) and y_size ({y_size}) must be greater than zero"
            )));
        }

        let width = x_size + y_size;
        if data.is_empty() || data.len() % width != 0 {
            return Err(MlErr::InvalidDataset(format!(
                "data length ({}) must be a non-zero multiple of the row width ({width})",
                data.len()
            )));
        }

        let data = Array2::from_shape_vec((data.len() / width, width), data)?;
        Ok(Self {
            x_size,
            y_size,
            data,
        })
    }

    /// Returns the amount of samples.
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn x_size(&self) -> usize {
        self.x_size
    }

    pub fn y_size(&self) -> usize {
        self.y_size
    }

    /// The input columns of every sample.
    pub fn x(&self) -> ArrayView2<'_, f32> {
        self.data.slice(s![.., ..self.x_size])
    }

    /// The target columns of every sample.
    pub fn y(&self) -> ArrayView2<'_, f32> {
        self.data.slice(s![.., self.x_size..])
    }

    /// Randomly permutes the samples.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);
        self.data = self.data.select(Axis(0), &order);
    }

    /// Splits the dataset in consecutive `(x, y)` batches, the last one possibly smaller.
    pub fn batches(
        &self,
        batch_size: NonZeroUsize,
    ) -> impl Iterator<Item = (ArrayView2<'_, f32>, ArrayView2<'_, f32>)> {
        self.data
            .axis_chunks_iter(Axis(0), batch_size.get())
            .map(|chunk| chunk.split_at(Axis(1), self.x_size))
    }
}
