use ndarray::{Array2, ArrayView2};

use super::{adaptive_power, dense};
use crate::{Result, arch::activations::ActFn};

/// A layer of a `Sequential` model.
#[derive(Clone, Debug)]
pub enum Layer {
    Dense(dense::Dense),
    AdaptivePower(adaptive_power::AdaptivePower),
}

impl Layer {
    /// Creates a `Dense` layer.
    ///
    /// # Errors
    /// If a dimension is zero or the amount of parameters overflows.
    pub fn dense(dim: (usize, usize), act_fn: Option<ActFn>) -> Result<Self> {
        dense::Dense::new(dim, act_fn).map(Self::Dense)
    }

    /// Creates an `AdaptivePower` layer whose shifts train at the same rate as its weights.
    pub fn adaptive_power(
        dim: (usize, usize),
        max_power: usize,
        act_fn: Option<ActFn>,
    ) -> Result<Self> {
        Self::adaptive_power_with_shift_rate(dim, max_power, 1., act_fn)
    }

    /// Creates an `AdaptivePower` layer.
    ///
    /// # Errors
    /// If a dimension or `max_power` is zero, or the amount of parameters overflows.
    pub fn adaptive_power_with_shift_rate(
        dim: (usize, usize),
        max_power: usize,
        shift_rate: f32,
        act_fn: Option<ActFn>,
    ) -> Result<Self> {
        adaptive_power::AdaptivePower::new(dim, max_power, shift_rate, act_fn)
            .map(Self::AdaptivePower)
    }

    /// Returns the amount of parameters of the layer.
    pub fn size(&self) -> usize {
        match self {
            Self::Dense(l) => l.size(),
            Self::AdaptivePower(l) => l.size(),
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        match self {
            Self::Dense(l) => l.dim(),
            Self::AdaptivePower(l) => l.dim(),
        }
    }

    pub fn input_dim(&self) -> usize {
        self.dim().0
    }

    pub fn output_dim(&self) -> usize {
        self.dim().1
    }

    /// The amount of parameters that are `fan_in` for weight initialization purposes.
    pub fn fan_in(&self) -> usize {
        match self {
            Self::Dense(l) => l.dim().0,
            Self::AdaptivePower(l) => l.dim().0 * l.max_power(),
        }
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<ArrayView2<'_, f32>> {
        match self {
            Self::Dense(l) => l.forward(params, x),
            Self::AdaptivePower(l) => l.forward(params, x),
        }
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        match self {
            Self::Dense(l) => l.backward(params, grad, d),
            Self::AdaptivePower(l) => l.backward(params, grad, d),
        }
    }
}
