use ndarray::{Array2, ArrayView2};

use crate::Result;

/// A type-erased training loop over a model and its data.
pub trait Trainer {
    /// Returns the amount of parameters of the trained model.
    fn size(&self) -> usize;

    /// Trains the model, updating `params` in place.
    ///
    /// # Returns
    /// The loss of every epoch that ran.
    fn train(&mut self, params: &mut [f32]) -> Result<Vec<f32>>;

    /// Computes the model's prediction for a batch of inputs.
    fn predict(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>>;
}
