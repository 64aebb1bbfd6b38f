use ndarray::{linalg, prelude::*};

use super::{check_dim, check_len};
use crate::{MlErr, Result, arch::activations::ActFn};

/// A fully connected layer: `a = act(x·W + b)`.
///
/// Parameter layout: the weights as a row-major `(n_in, n_out)` matrix followed by `n_out` biases.
#[derive(Clone, Debug)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<ActFn>,
    size: usize,

    // Forward metadata
    x: Option<Array2<f32>>,
    z: Array2<f32>,
    a: Array2<f32>,
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `dim` - The input and output dimensions of the layer.
    /// * `act_fn` - An optional activation function applied to the output.
    ///
    /// # Errors
    /// If a dimension is zero or the amount of parameters overflows.
    pub fn new(dim: (usize, usize), act_fn: Option<ActFn>) -> Result<Self> {
        check_dim(dim)?;
        let size = dim
            .0
            .checked_add(1)
            .and_then(|n| n.checked_mul(dim.1))
            .ok_or(MlErr::SizeOverflow {
                what: "dense layer",
            })?;

        Ok(Self {
            dim,
            size,
            act_fn,
            x: None,
            z: Array2::zeros((0, dim.1)),
            a: Array2::zeros((0, dim.1)),
        })
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    /// Computes the output of the layer for a batch of inputs, one sample per row.
    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<ArrayView2<'_, f32>> {
        check_len("dense layer input", x.ncols(), self.dim.0)?;
        let (w, b) = self.view_params(params)?;

        let mut z = x.dot(&w);
        z += &b;
        self.x = Some(x.to_owned());

        let Some(act_fn) = self.act_fn else {
            self.z = z;
            return Ok(self.z.view());
        };

        self.a = z.mapv(|z| act_fn.f(z));
        self.z = z;
        Ok(self.a.view())
    }

    /// Writes this layer's gradient into `grad` and returns the delta of the previous layer.
    ///
    /// # Arguments
    /// * `params` - This layer's parameters.
    /// * `grad` - This layer's gradient buffer, overwritten.
    /// * `d` - The derivative of the loss with respect to this layer's output.
    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        mut d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        let x = self.x.take().ok_or(MlErr::BackwardBeforeForward)?;
        check_len("dense layer delta rows", d.nrows(), x.nrows())?;
        check_len("dense layer delta columns", d.ncols(), self.dim.1)?;

        if let Some(act_fn) = self.act_fn {
            d.zip_mut_with(&self.z, |d, &z| *d *= act_fn.df(z));
        }

        let (w, _) = self.view_params(params)?;
        let (mut dw, mut db) = self.view_grad(grad)?;
        linalg::general_mat_mul(1.0, &x.t(), &d, 0.0, &mut dw);
        db.assign(&d.sum_axis(Axis(0)));

        Ok(d.dot(&w.t()))
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    fn view_grad<'g>(
        &self,
        grad: &'g mut [f32],
    ) -> Result<(ArrayViewMut2<'g, f32>, ArrayViewMut1<'g, f32>)> {
        check_len("dense layer gradient", grad.len(), self.size)?;

        let w_size = self.size - self.dim.1;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw)?;
        let db = ArrayViewMut1::from_shape(self.dim.1, db_raw)?;
        Ok((dw, db))
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    fn view_params<'p>(
        &self,
        params: &'p [f32],
    ) -> Result<(ArrayView2<'p, f32>, ArrayView1<'p, f32>)> {
        check_len("dense layer parameters", params.len(), self.size)?;

        let w_size = self.size - self.dim.1;
        let weights = ArrayView2::from_shape(self.dim, &params[..w_size])?;
        let biases = ArrayView1::from_shape(self.dim.1, &params[w_size..])?;
        Ok((weights, biases))
    }
}
