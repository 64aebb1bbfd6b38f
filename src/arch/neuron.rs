use log::debug;
use ndarray::{Array1, ArrayView1, ArrayView2};

use super::power;
use crate::{MlErr, Result};

const DEFAULT_LEARNING_RATE: f32 = 0.001;
const DEFAULT_INDEXING_RATE: f32 = 0.01;

/// A single adaptive power neuron trained sample by sample.
///
/// For an input `x` it computes `sum_i sum_p w[i][p] * (x_i + s)^p + b`, where `p` goes from `1`
/// to `max_power` and `s` is a learnable indexing term that shifts every input before the power
/// expansion. Weights are stored input-major: `w[i * max_power + (p - 1)]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptivePowerNeuron {
    input_dim: usize,
    max_power: usize,
    weights: Vec<f32>,
    bias: f32,
    shift: f32,
    learning_rate: f32,
    indexing_rate: f32,
}

impl AdaptivePowerNeuron {
    /// Creates a new neuron with every parameter set to zero.
    ///
    /// # Errors
    /// An `InvalidDimension` if `input_dim` or `max_power` are zero, a `SizeOverflow` if the
    /// amount of weights doesn't fit in a `usize`.
    pub fn new(input_dim: usize, max_power: usize) -> Result<Self> {
        if input_dim == 0 {
            return Err(MlErr::InvalidDimension { what: "input dim" });
        }
        if max_power == 0 {
            return Err(MlErr::InvalidDimension { what: "max power" });
        }

        let n_weights = input_dim
            .checked_mul(max_power)
            .ok_or(MlErr::SizeOverflow { what: "neuron" })?;

        Ok(Self {
            input_dim,
            max_power,
            weights: vec![0.; n_weights],
            bias: 0.,
            shift: 0.,
            learning_rate: DEFAULT_LEARNING_RATE,
            indexing_rate: DEFAULT_INDEXING_RATE,
        })
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_indexing_rate(mut self, indexing_rate: f32) -> Self {
        self.indexing_rate = indexing_rate;
        self
    }

    /// Replaces the neuron's parameters.
    pub fn with_params(mut self, weights: Vec<f32>, bias: f32, shift: f32) -> Result<Self> {
        if weights.len() != self.weights.len() {
            return Err(MlErr::SizeMismatch {
                what: "neuron weights",
                got: weights.len(),
                expected: self.weights.len(),
            });
        }

        self.weights = weights;
        self.bias = bias;
        self.shift = shift;
        Ok(self)
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn max_power(&self) -> usize {
        self.max_power
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn bias(&self) -> f32 {
        self.bias
    }

    pub fn shift(&self) -> f32 {
        self.shift
    }

    /// Expands `x` into `(x_i + s)^p` for every input and power, input-major.
    pub fn features(&self, x: ArrayView1<f32>) -> Result<Array1<f32>> {
        self.check_input(x)?;

        let mut out = Array1::zeros(self.weights.len());
        let out_raw = out
            .as_slice_mut()
            .ok_or(MlErr::InvalidDimension { what: "features" })?;

        for (&xi, chunk) in x.iter().zip(out_raw.chunks_exact_mut(self.max_power)) {
            power::expand(xi + self.shift, chunk);
        }

        Ok(out)
    }

    /// Computes the neuron's output for a single sample.
    pub fn forward(&self, x: ArrayView1<f32>) -> Result<f32> {
        self.check_input(x)?;

        let y = x
            .iter()
            .zip(self.weights.chunks_exact(self.max_power))
            .map(|(&xi, w_i)| power::eval(w_i, xi + self.shift))
            .sum::<f32>();

        Ok(y + self.bias)
    }

    /// Makes one gradient step over `0.5 * (y_pred - y)^2` for a single sample.
    ///
    /// The weights and the bias move with the learning rate, the shift with the indexing rate.
    pub fn backward(&mut self, x: ArrayView1<f32>, y: f32, y_pred: f32) -> Result<()> {
        self.check_input(x)?;

        let error = y_pred - y;
        let mut feats = vec![0.; self.max_power];
        let mut slope = 0.;

        for (&xi, w_i) in x.iter().zip(self.weights.chunks_exact_mut(self.max_power)) {
            let u = xi + self.shift;
            slope += power::slope(w_i, u);

            power::expand(u, &mut feats);
            for (w, f) in w_i.iter_mut().zip(&feats) {
                *w -= self.learning_rate * error * f;
            }
        }

        self.bias -= self.learning_rate * error;
        self.shift -= self.indexing_rate * error * slope;
        Ok(())
    }

    /// Trains the neuron over every row of `xs` for `epochs` epochs.
    ///
    /// # Returns
    /// The mean squared error of every epoch, measured while training.
    pub fn fit(
        &mut self,
        xs: ArrayView2<f32>,
        ys: ArrayView1<f32>,
        epochs: usize,
    ) -> Result<Vec<f32>> {
        if xs.nrows() != ys.len() {
            return Err(MlErr::SizeMismatch {
                what: "neuron targets",
                got: ys.len(),
                expected: xs.nrows(),
            });
        }
        if xs.nrows() == 0 {
            return Err(MlErr::InvalidDataset("there are no samples to fit".into()));
        }

        let mut losses = Vec::with_capacity(epochs);

        for epoch in 0..epochs {
            let mut total = 0.;

            for (x, &y) in xs.outer_iter().zip(ys) {
                let y_pred = self.forward(x)?;
                total += (y_pred - y).powi(2);
                self.backward(x, y, y_pred)?;
            }

            let loss = total / xs.nrows() as f32;
            if !loss.is_finite() {
                return Err(MlErr::Diverged { epoch });
            }

            debug!(epoch = epoch, loss = loss; "neuron epoch finished");
            losses.push(loss);
        }

        Ok(losses)
    }

    /// Computes the neuron's output for every row of `xs`.
    pub fn predict(&self, xs: ArrayView2<f32>) -> Result<Array1<f32>> {
        xs.outer_iter().map(|x| self.forward(x)).collect()
    }

    fn check_input(&self, x: ArrayView1<f32>) -> Result<()> {
        if x.len() != self.input_dim {
            return Err(MlErr::SizeMismatch {
                what: "neuron input",
                got: x.len(),
                expected: self.input_dim,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, array};

    #[test]
    fn invalid_dimensions_fail() {
        assert!(AdaptivePowerNeuron::new(0, 2).is_err());
        assert!(AdaptivePowerNeuron::new(2, 0).is_err());
        assert!(matches!(
            AdaptivePowerNeuron::new(usize::MAX, 2),
            Err(MlErr::SizeOverflow { .. })
        ));
    }

    #[test]
    fn features_are_shifted_powers() {
        let neuron = AdaptivePowerNeuron::new(2, 3)
            .unwrap()
            .with_params(vec![0.; 6], 0., 1.)
            .unwrap();

        let feats = neuron.features(array![1., 0.].view()).unwrap();
        assert_eq!(feats, array![2., 4., 8., 1., 1., 1.]);
    }

    #[test]
    fn forward_is_the_weighted_feature_sum_plus_bias() {
        let neuron = AdaptivePowerNeuron::new(2, 2)
            .unwrap()
            .with_params(vec![1., 2., 3., 4.], 0.5, 0.5)
            .unwrap();
        let x = array![0.5, 1.5];

        let feats = neuron.features(x.view()).unwrap();
        let expected = feats.dot(&array![1., 2., 3., 4.]) + 0.5;
        assert_eq!(neuron.forward(x.view()).unwrap(), expected);
    }

    #[test]
    fn wrong_input_size_fails() {
        let neuron = AdaptivePowerNeuron::new(2, 2).unwrap();
        assert!(neuron.forward(array![1.].view()).is_err());
        assert!(neuron.features(array![1., 2., 3.].view()).is_err());
    }

    #[test]
    fn wrong_weight_count_fails() {
        let res = AdaptivePowerNeuron::new(2, 2).unwrap().with_params(vec![1.], 0., 0.);
        assert!(res.is_err());
    }

    #[test]
    fn backward_moves_the_prediction_towards_the_target() {
        let mut neuron = AdaptivePowerNeuron::new(1, 2)
            .unwrap()
            .with_params(vec![0.5, 0.5], 0., 0.2)
            .unwrap()
            .with_learning_rate(0.05);
        let x = array![1.0];

        let before = neuron.forward(x.view()).unwrap();
        neuron.backward(x.view(), 3.0, before).unwrap();
        let after = neuron.forward(x.view()).unwrap();

        assert!((after - 3.0).abs() < (before - 3.0).abs());
        assert!(neuron.shift() > 0.2);
    }

    #[test]
    fn fits_a_quadratic() {
        let xs = Array::linspace(-1., 1., 21).insert_axis(ndarray::Axis(1));
        let ys = xs.column(0).mapv(|x| 2. * x * x - x + 0.5);

        let mut neuron = AdaptivePowerNeuron::new(1, 2)
            .unwrap()
            .with_learning_rate(0.05)
            .with_indexing_rate(0.005);
        let losses = neuron.fit(xs.view(), ys.view(), 300).unwrap();

        assert_eq!(losses.len(), 300);
        assert!(losses[299] < 1e-2, "final loss {}", losses[299]);
        assert!(losses[299] < losses[0]);

        let preds = neuron.predict(xs.view()).unwrap();
        assert_eq!(preds.len(), 21);
    }

    #[test]
    fn fit_checks_the_amount_of_targets() {
        let mut neuron = AdaptivePowerNeuron::new(1, 1).unwrap();
        let xs = array![[1.], [2.]];
        let ys = array![1.];

        assert!(neuron.fit(xs.view(), ys.view(), 1).is_err());
    }
}
