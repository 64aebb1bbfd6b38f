use std::num::NonZeroUsize;

use log::{debug, info};
use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::Trainer;
use crate::{
    MlErr, Result,
    arch::{Model, loss::LossFn},
    dataset::Dataset,
    optimization::Optimizer,
};

/// A model `Trainer`. Contains the relevant components needed for training a model,
/// including the model itself.
pub struct ModelTrainer<M, O, L, R>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    model: M,
    optimizer: O,
    dataset: Dataset,
    loss_fn: L,

    epochs: usize,
    batch_size: NonZeroUsize,
    tolerance: Option<f32>,
    rng: R,
}

impl<M, O, L, R> ModelTrainer<M, O, L, R>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    /// Returns a new `ModelTrainer`.
    ///
    /// # Arguments
    /// * `model` - The model that will be trained.
    /// * `optimizer` - The optimizer that updates the parameters after every batch.
    /// * `dataset` - The dataset the model will be trained with.
    /// * `epochs` - The maximum amount of epochs to run per `train` call.
    /// * `batch_size` - The amount of samples per batch.
    /// * `loss_fn` - The loss function used to measure the difference between a model's output and the expected one.
    /// * `rng` - A random number generator, used for shuffling the dataset.
    pub fn new(
        model: M,
        optimizer: O,
        dataset: Dataset,
        epochs: usize,
        batch_size: NonZeroUsize,
        loss_fn: L,
        rng: R,
    ) -> Self {
        Self {
            model,
            optimizer,
            dataset,
            loss_fn,
            epochs,
            batch_size,
            tolerance: None,
            rng,
        }
    }

    /// Stops training as soon as an epoch's loss falls below `tolerance`.
    pub fn with_tolerance(mut self, tolerance: Option<f32>) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Performs up to `epochs` epochs of training its model, using its optimizer, dataset, loss
    /// function and batch size.
    ///
    /// # Errors
    /// If `params` doesn't fit the model, the dataset doesn't fit the model or the loss stops
    /// being finite.
    pub fn train(&mut self, params: &mut [f32]) -> Result<Vec<f32>> {
        let size = self.model.size();
        if params.len() != size {
            return Err(MlErr::SizeMismatch {
                what: "trainer parameters",
                got: params.len(),
                expected: size,
            });
        }

        let mut grad = vec![0.; size];
        let mut losses = Vec::with_capacity(self.epochs);

        for epoch in 0..self.epochs {
            self.dataset.shuffle(&mut self.rng);
            let batches = self.dataset.batches(self.batch_size);

            let loss = self.model.backprop(
                params,
                &mut grad,
                &mut self.optimizer,
                &self.loss_fn,
                batches,
            )?;

            if !loss.is_finite() {
                return Err(MlErr::Diverged { epoch });
            }

            debug!(epoch = epoch, loss = loss; "epoch finished");
            losses.push(loss);

            if self.tolerance.is_some_and(|tolerance| loss < tolerance) {
                info!(epoch = epoch, loss = loss; "loss under tolerance, stopping early");
                break;
            }
        }

        if let Some(&loss) = losses.last() {
            info!(epochs = losses.len(), loss = loss; "training finished");
        }

        Ok(losses)
    }
}

impl<M, O, L, R> Trainer for ModelTrainer<M, O, L, R>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    fn size(&self) -> usize {
        self.model.size()
    }

    fn train(&mut self, params: &mut [f32]) -> Result<Vec<f32>> {
        self.train(params)
    }

    fn predict(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.model.forward(params, x)
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        arch::{Sequential, layers::Layer, loss::Mse},
        optimization::GradientDescent,
    };

    fn line_trainer(epochs: usize) -> ModelTrainer<Sequential, GradientDescent, Mse, StdRng> {
        // y = 2x + 1
        let data = vec![0., 1., 1., 3., 2., 5., 3., 7.];
        let dataset = Dataset::new(data, 1, 1).unwrap();
        let model = Sequential::new([Layer::dense((1, 1), None).unwrap()]).unwrap();

        ModelTrainer::new(
            model,
            GradientDescent::new(0.05),
            dataset,
            epochs,
            NonZeroUsize::new(2).unwrap(),
            Mse,
            StdRng::seed_from_u64(0),
        )
    }

    #[test]
    fn learns_a_line() {
        let mut trainer = line_trainer(500);
        let mut params = vec![0.; 2];

        let losses = trainer.train(&mut params).unwrap();

        assert_eq!(losses.len(), 500);
        assert!((params[0] - 2.).abs() < 1e-2, "{params:?}");
        assert!((params[1] - 1.).abs() < 1e-2, "{params:?}");
    }

    #[test]
    fn stops_early_under_tolerance() {
        let mut trainer = line_trainer(10_000).with_tolerance(Some(1e-3));
        let mut params = vec![0.; 2];

        let losses = trainer.train(&mut params).unwrap();

        assert!(losses.len() < 10_000);
        assert!(*losses.last().unwrap() < 1e-3);
    }

    #[test]
    fn wrong_amount_of_params_fails() {
        let mut trainer = line_trainer(1);
        let mut params = vec![0.; 3];

        assert!(trainer.train(&mut params).is_err());
    }

    #[test]
    fn exploding_learning_rate_diverges() {
        let data = vec![10., 100., 20., 200.];
        let dataset = Dataset::new(data, 1, 1).unwrap();
        let model = Sequential::new([Layer::adaptive_power((1, 1), 3, None).unwrap()]).unwrap();
        let mut trainer = ModelTrainer::new(
            model,
            GradientDescent::new(10.),
            dataset,
            100,
            NonZeroUsize::new(2).unwrap(),
            Mse,
            StdRng::seed_from_u64(0),
        );
        let mut params = vec![0.1; 5];

        assert!(matches!(
            trainer.train(&mut params),
            Err(MlErr::Diverged { .. })
        ));
    }
}
