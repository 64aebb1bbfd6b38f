use ndarray::prelude::*;

use super::{check_dim, check_len};
use crate::{
    MlErr, Result,
    arch::{activations::ActFn, power},
};

/// A layer of `n_out` adaptive power neurons that share the same `n_in` inputs.
///
/// Neuron `j` computes `z_j = sum_i sum_p w[j][i][p] * (x_i + s_j)^p + b_j` for `p` in
/// `1..=max_power`, followed by the optional activation function.
///
/// Parameter layout: the weights as a row-major `(n_out, n_in * max_power)` matrix (so every
/// neuron's weights are contiguous and ordered input-major), then `n_out` biases and finally
/// `n_out` shifts.
#[derive(Clone, Debug)]
pub struct AdaptivePower {
    dim: (usize, usize),
    max_power: usize,
    shift_rate: f32,
    act_fn: Option<ActFn>,
    size: usize,

    // Forward metadata
    x: Option<Array2<f32>>,
    z: Array2<f32>,
    a: Array2<f32>,
}

impl AdaptivePower {
    /// Creates a new `AdaptivePower` layer.
    ///
    /// # Arguments
    /// * `dim` - The input and output dimensions of the layer.
    /// * `max_power` - The highest power every input is raised to.
    /// * `shift_rate` - Scales the gradient of the shifts relative to the rest of the parameters.
    /// * `act_fn` - An optional activation function applied to the output.
    ///
    /// # Errors
    /// If a dimension or `max_power` is zero, or the amount of parameters overflows.
    pub fn new(
        dim: (usize, usize),
        max_power: usize,
        shift_rate: f32,
        act_fn: Option<ActFn>,
    ) -> Result<Self> {
        check_dim(dim)?;
        if max_power == 0 {
            return Err(MlErr::InvalidDimension { what: "max power" });
        }

        let size = dim
            .0
            .checked_mul(max_power)
            .and_then(|n| n.checked_add(2))
            .and_then(|n| n.checked_mul(dim.1))
            .ok_or(MlErr::SizeOverflow {
                what: "adaptive power layer",
            })?;

        Ok(Self {
            dim,
            max_power,
            shift_rate,
            act_fn,
            size,
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

    pub fn max_power(&self) -> usize {
        self.max_power
    }

    /// Computes the output of the layer for a batch of inputs, one sample per row.
    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<ArrayView2<'_, f32>> {
        check_len("adaptive power layer input", x.ncols(), self.dim.0)?;
        let (w, b, s) = self.split_params(params)?;
        let fan = self.dim.0 * self.max_power;

        let mut z = Array2::zeros((x.nrows(), self.dim.1));
        for (mut z_row, x_row) in z.outer_iter_mut().zip(x.outer_iter()) {
            for (j, zj) in z_row.iter_mut().enumerate() {
                let w_j = &w[j * fan..(j + 1) * fan];
                *zj = b[j]
                    + x_row
                        .iter()
                        .zip(w_j.chunks_exact(self.max_power))
                        .map(|(&xi, w_ji)| power::eval(w_ji, xi + s[j]))
                        .sum::<f32>();
            }
        }

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
        check_len("adaptive power layer delta rows", d.nrows(), x.nrows())?;
        check_len("adaptive power layer delta columns", d.ncols(), self.dim.1)?;
        check_len("adaptive power layer gradient", grad.len(), self.size)?;

        if let Some(act_fn) = self.act_fn {
            d.zip_mut_with(&self.z, |d, &z| *d *= act_fn.df(z));
        }

        let (w, _, s) = self.split_params(params)?;
        let (n_in, n_out) = self.dim;
        let p = self.max_power;
        let fan = n_in * p;

        grad.fill(0.);
        let (dw, rest) = grad.split_at_mut(n_out * fan);
        let (db, ds) = rest.split_at_mut(n_out);

        let mut d_prev = Array2::zeros((x.nrows(), n_in));
        let mut feats = vec![0.; p];

        for ((x_row, d_row), mut dp_row) in x
            .outer_iter()
            .zip(d.outer_iter())
            .zip(d_prev.outer_iter_mut())
        {
            for (j, &dj) in d_row.iter().enumerate() {
                let w_j = &w[j * fan..(j + 1) * fan];
                let dw_j = &mut dw[j * fan..(j + 1) * fan];
                let mut slope_sum = 0.;

                for (i, (w_ji, dw_ji)) in w_j
                    .chunks_exact(p)
                    .zip(dw_j.chunks_exact_mut(p))
                    .enumerate()
                {
                    let u = x_row[i] + s[j];
                    power::expand(u, &mut feats);
                    dw_ji
                        .iter_mut()
                        .zip(&feats)
                        .for_each(|(g, f)| *g += dj * f);

                    let slope = power::slope(w_ji, u);
                    slope_sum += slope;
                    dp_row[i] += dj * slope;
                }

                db[j] += dj;
                ds[j] += self.shift_rate * dj * slope_sum;
            }
        }

        Ok(d_prev)
    }

    /// Splits the raw parameter slice into weights, biases and shifts.
    fn split_params<'p>(&self, params: &'p [f32]) -> Result<(&'p [f32], &'p [f32], &'p [f32])> {
        check_len("adaptive power layer parameters", params.len(), self.size)?;

        let n_out = self.dim.1;
        let (w, rest) = params.split_at(self.size - 2 * n_out);
        let (b, s) = rest.split_at(n_out);
        Ok((w, b, s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn size_accounts_for_weights_biases_and_shifts() {
        let layer = AdaptivePower::new((3, 2), 4, 1., None).unwrap();
        assert_eq!(layer.size(), (3 * 4 + 2) * 2);
    }

    #[test]
    fn forward_evaluates_shifted_polynomials() {
        let mut layer = AdaptivePower::new((1, 1), 2, 1., None).unwrap();
        // y = 1 (x + 1) + 2 (x + 1)^2 + 0.5
        let params = [1., 2., 0.5, 1.];
        let x = array![[1.], [0.]];

        let y = layer.forward(&params, x.view()).unwrap();
        assert_eq!(y, array![[2. + 8. + 0.5], [1. + 2. + 0.5]]);
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let params = vec![0.3, -0.2, 0.1, 0.5, 0.4, -0.1, 0.2, 0.7, 0.05, -0.3];
        let x = array![[0.5, -1.0], [1.5, 0.25]];
        let mut layer = AdaptivePower::new((2, 1), 4, 1., Some(ActFn::Tanh)).unwrap();
        assert_eq!(layer.size(), params.len());

        // loss = sum(y)
        let loss = |layer: &mut AdaptivePower, params: &[f32]| -> f32 {
            layer.forward(params, x.view()).unwrap().sum()
        };

        loss(&mut layer, &params);
        let mut grad = vec![0.; params.len()];
        let d_prev = layer
            .backward(&params, &mut grad, Array2::ones((2, 1)))
            .unwrap();
        assert_eq!(d_prev.dim(), (2, 2));

        let h = 1e-2;
        for k in 0..params.len() {
            let mut plus = params.clone();
            let mut minus = params.clone();
            plus[k] += h;
            minus[k] -= h;

            let numeric = (loss(&mut layer, &plus) - loss(&mut layer, &minus)) / (2. * h);
            assert!(
                (grad[k] - numeric).abs() < 2e-2,
                "param {k}: analytic {} numeric {numeric}",
                grad[k]
            );
        }
    }

    #[test]
    fn every_neuron_and_input_delta_matches_finite_differences() {
        let shift_rate = 0.5;
        let mut layer = AdaptivePower::new((2, 3), 3, shift_rate, Some(ActFn::Tanh)).unwrap();
        let params: Vec<f32> = (0..layer.size())
            .map(|k| ((k * 7 % 11) as f32 - 5.) * 0.05)
            .collect();
        let x = array![[0.5, -1.0], [0.25, 0.75], [-0.5, 0.1]];
        let upstream = array![[1.0, -0.5, 2.0], [0.3, 1.5, -1.0], [-2.0, 0.7, 0.4]];

        // loss = sum(y * upstream)
        let loss = |layer: &mut AdaptivePower, params: &[f32], x: &Array2<f32>| -> f32 {
            (&layer.forward(params, x.view()).unwrap() * &upstream).sum()
        };

        loss(&mut layer, &params, &x);
        let mut grad = vec![0.; params.len()];
        let d_prev = layer
            .backward(&params, &mut grad, upstream.clone())
            .unwrap();
        assert_eq!(d_prev.dim(), (3, 2));

        let h = 1e-2;
        let first_shift = params.len() - 3;
        for k in 0..params.len() {
            let mut plus = params.clone();
            let mut minus = params.clone();
            plus[k] += h;
            minus[k] -= h;

            let mut numeric =
                (loss(&mut layer, &plus, &x) - loss(&mut layer, &minus, &x)) / (2. * h);
            if k >= first_shift {
                numeric *= shift_rate;
            }

            assert!(
                (grad[k] - numeric).abs() < 2e-2,
                "param {k}: analytic {} numeric {numeric}",
                grad[k]
            );
        }

        for ((row, col), &analytic) in d_prev.indexed_iter() {
            let mut plus = x.clone();
            let mut minus = x.clone();
            plus[[row, col]] += h;
            minus[[row, col]] -= h;

            let numeric =
                (loss(&mut layer, &params, &plus) - loss(&mut layer, &params, &minus)) / (2. * h);
            assert!(
                (analytic - numeric).abs() < 2e-2,
                "input ({row}, {col}): analytic {analytic} numeric {numeric}"
            );
        }
    }

    #[test]
    fn shift_rate_scales_only_the_shift_gradient() {
        let params = [0.5, 0.25, 0.1, 0.3];
        let x = array![[1.0]];

        let mut grads = [[0.; 4]; 2];
        for (rate, grad) in [1., 0.1].into_iter().zip(grads.iter_mut()) {
            let mut layer = AdaptivePower::new((1, 1), 2, rate, None).unwrap();
            layer.forward(&params, x.view()).unwrap();
            layer
                .backward(&params, grad, Array2::ones((1, 1)))
                .unwrap();
        }

        assert_eq!(grads[0][..3], grads[1][..3]);
        assert!((grads[0][3] * 0.1 - grads[1][3]).abs() < 1e-6);
    }

    #[test]
    fn backward_before_forward_fails() {
        let mut layer = AdaptivePower::new((1, 1), 1, 1., None).unwrap();
        let mut grad = [0.; 3];

        let res = layer.backward(&[0.; 3], &mut grad, Array2::ones((1, 1)));
        assert!(matches!(res, Err(MlErr::BackwardBeforeForward)));
    }
}
