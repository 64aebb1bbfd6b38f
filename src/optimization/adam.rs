use super::{Optimizer, check_lengths};
use crate::Result;

/// Gradient descent scaled by bias corrected running estimates of the first and second moments
/// of the gradient.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    step: i32,
    m: Box<[f32]>,
    v: Box<[f32]>,
}

impl Adam {
    /// Creates a new `Adam` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1` - The decay of the first moment estimate.
    /// * `beta2` - The decay of the second moment estimate.
    /// * `epsilon` - Keeps the update finite when the second moment is zero.
    pub fn new(len: usize, learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            step: 0,
            m: vec![0.; len].into_boxed_slice(),
            v: vec![0.; len].into_boxed_slice(),
        }
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        check_lengths(grad, params)?;
        check_lengths(&self.m, params)?;

        self.step = self.step.saturating_add(1);

        let (lr, eps) = (self.learning_rate, self.epsilon);
        let (b1, b2) = (self.beta1, self.beta2);
        let m_correction = 1. / (1. - b1.powi(self.step));
        let v_correction = 1. / (1. - b2.powi(self.step));

        let moments = self.m.iter_mut().zip(self.v.iter_mut());
        for ((p, &g), (m, v)) in params.iter_mut().zip(grad).zip(moments) {
            *m = b1 * *m + (1. - b1) * g;
            *v = b2 * *v + (1. - b2) * g * g;

            let m_hat = *m * m_correction;
            let v_hat = *v * v_correction;
            *p -= lr * m_hat / (v_hat.sqrt() + eps);
        }

        Ok(())
    }
}
