use ndarray::{Array2, ArrayView2};

use super::{Model, layers::Layer, loss::LossFn};
use crate::{MlErr, Result, optimization::Optimizer};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
///
/// Layer `i` reads its parameters from the slice of `params` that follows the ones of layer
/// `i - 1`.
#[derive(Clone, Debug)]
pub struct Sequential {
    layers: Vec<Layer>,
    size: usize,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Errors
    /// If there are no layers, the input size of a layer doesn't match the output size of the
    /// previous one or the total amount of parameters overflows.
    pub fn new<I>(layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = Layer>,
    {
        let layers: Vec<Layer> = layers.into_iter().collect();

        if layers.is_empty() {
            return Err(MlErr::EmptyModel);
        }

        for (i, pair) in layers.windows(2).enumerate() {
            let previous_output = pair[0].output_dim();
            let input = pair[1].input_dim();

            if previous_output != input {
                return Err(MlErr::LayerMismatch {
                    layer: i + 1,
                    input,
                    previous_output,
                });
            }
        }

        let size = layers
            .iter()
            .try_fold(0usize, |acc, layer| acc.checked_add(layer.size()))
            .ok_or(MlErr::SizeOverflow { what: "model" })?;

        Ok(Self { layers, size })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn input_dim(&self) -> usize {
        self.layers[0].input_dim()
    }

    pub fn output_dim(&self) -> usize {
        self.layers[self.layers.len() - 1].output_dim()
    }

    fn check_buffer(&self, what: &'static str, len: usize) -> Result<()> {
        let expected = self.size();

        if len != expected {
            return Err(MlErr::SizeMismatch {
                what,
                got: len,
                expected,
            });
        }

        Ok(())
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.size
    }

    fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_buffer("model parameters", params.len())?;

        let mut x = x;
        let mut offset = 0;

        for layer in self.layers.iter_mut() {
            let size = layer.size();
            x = layer.forward(&params[offset..offset + size], x)?;
            offset += size;
        }

        Ok(x.to_owned())
    }

    // NOTE: the epoch loss is approximated by averaging the loss of every batch, each one computed
    // before that batch's update.
    fn backprop<'a, O, L, I>(
        &mut self,
        params: &mut [f32],
        grad: &mut [f32],
        optimizer: &mut O,
        loss_fn: &L,
        batches: I,
    ) -> Result<f32>
    where
        O: Optimizer + ?Sized,
        L: LossFn + ?Sized,
        I: Iterator<Item = (ArrayView2<'a, f32>, ArrayView2<'a, f32>)>,
    {
        self.check_buffer("model gradient", grad.len())?;
        let size = self.size();
        let mut total_loss = 0.0;
        let mut num_batches = 0;

        for (x, y) in batches {
            let y_pred = self.forward(params, x)?;

            if y_pred.dim() != y.dim() {
                return Err(MlErr::SizeMismatch {
                    what: "model output columns",
                    got: y_pred.ncols(),
                    expected: y.ncols(),
                });
            }

            total_loss += loss_fn.loss(y_pred.view(), y);
            num_batches += 1;

            let mut d = loss_fn.loss_prime(y_pred.view(), y);
            let mut end = size;

            for layer in self.layers.iter_mut().rev() {
                let start = end - layer.size();
                d = layer.backward(&params[start..end], &mut grad[start..end], d)?;
                end = start;
            }

            optimizer.update_params(grad, params)?;
        }

        if num_batches == 0 {
            return Err(MlErr::InvalidDataset("there are no batches to train on".into()));
        }

        Ok(total_loss / num_batches as f32)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::{
        arch::{activations::ActFn, loss::Mse},
        optimization::GradientDescent,
    };

    #[test]
    fn empty_model_fails() {
        assert!(matches!(Sequential::new(Vec::<Layer>::new()), Err(MlErr::EmptyModel)));
    }

    #[test]
    fn mismatched_layers_fail() {
        let res = Sequential::new([
            Layer::dense((2, 3), None).unwrap(),
            Layer::adaptive_power((2, 1), 2, None).unwrap(),
        ]);

        assert!(matches!(
            res,
            Err(MlErr::LayerMismatch {
                layer: 1,
                input: 2,
                previous_output: 3
            })
        ));
    }

    #[test]
    fn zero_power_fails() {
        let res = Layer::adaptive_power((2, 1), 0, None);
        assert!(matches!(res, Err(MlErr::InvalidDimension { .. })));
    }

    #[test]
    fn overflowing_total_size_fails() {
        let half = usize::MAX / 2;
        let res = Sequential::new([
            Layer::dense((1, half), None).unwrap(),
            Layer::dense((half, 1), None).unwrap(),
        ]);

        assert!(matches!(res, Err(MlErr::SizeOverflow { .. })));
    }

    #[test]
    fn size_is_the_sum_of_the_layers() {
        let model = Sequential::new([
            Layer::adaptive_power((2, 3), 2, Some(ActFn::Tanh)).unwrap(),
            Layer::dense((3, 1), None).unwrap(),
        ])
        .unwrap();

        assert_eq!(model.size(), (2 * 2 + 2) * 3 + (3 + 1));
        assert_eq!(model.input_dim(), 2);
        assert_eq!(model.output_dim(), 1);
    }

    #[test]
    fn forward_chains_the_layers() {
        let layers = [
            Layer::dense((1, 1), None).unwrap(),
            Layer::dense((1, 1), None).unwrap(),
        ];
        let mut model = Sequential::new(layers).unwrap();
        // y = 3 (2x + 1) - 1
        let params = [2., 1., 3., -1.];

        let y = model.forward(&params, array![[1.], [2.]].view()).unwrap();
        assert_eq!(y, array![[8.], [14.]]);
    }

    #[test]
    fn backprop_lowers_the_loss() {
        let mut model = Sequential::new([Layer::adaptive_power((1, 1), 2, None).unwrap()]).unwrap();
        let mut params = vec![0.1; model.size()];
        let mut grad = vec![0.; model.size()];
        let mut optimizer = GradientDescent::new(0.05);

        let x = array![[-1.], [0.], [1.], [2.]];
        let y = x.mapv(|x: f32| x * x + 1.);

        let first = model
            .backprop(
                &mut params,
                &mut grad,
                &mut optimizer,
                &Mse,
                std::iter::once((x.view(), y.view())),
            )
            .unwrap();

        let mut last = first;
        for _ in 0..200 {
            last = model
                .backprop(
                    &mut params,
                    &mut grad,
                    &mut optimizer,
                    &Mse,
                    std::iter::once((x.view(), y.view())),
                )
                .unwrap();
        }

        assert!(last < first / 5., "first {first} last {last}");
    }

    #[test]
    fn wrong_target_width_fails() {
        let mut model = Sequential::new([Layer::dense((1, 1), None).unwrap()]).unwrap();
        let mut params = vec![0.; model.size()];
        let mut grad = vec![0.; model.size()];
        let x = array![[1.]];
        let y = array![[1., 2.]];

        let res = model.backprop(
            &mut params,
            &mut grad,
            &mut GradientDescent::new(0.1),
            &Mse,
            std::iter::once((x.view(), y.view())),
        );
        assert!(res.is_err());
    }
}
