use crate::Result;

pub trait Optimizer {
    /// Updates `params` in place following the optimizer's learning rule.
    ///
    /// # Errors
    /// A `SizeMismatch` if `grad` and `params` have different lengths.
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()>;
}
