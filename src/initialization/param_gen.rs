use crate::{MlErr, Result};

/// A bounded source of initial parameter values.
pub trait ParamGen {
    /// Samples up to `n` values. Returns fewer than `n` values if the generator's limit is
    /// reached and `None` once it is exhausted.
    fn sample(&mut self, n: usize) -> Option<Vec<f32>>;
}

/// Samples exactly `n` values from `param_gen`.
///
/// # Errors
/// A `ParamGenExhausted` if the generator can't provide `n` values.
pub fn take_exact<G: ParamGen + ?Sized>(param_gen: &mut G, n: usize) -> Result<Vec<f32>> {
    let mut values = Vec::with_capacity(n);

    while values.len() < n {
        let Some(sample) = param_gen.sample(n - values.len()) else {
            return Err(MlErr::ParamGenExhausted {
                got: values.len(),
                expected: n,
            });
        };

        values.extend(sample);
    }

    Ok(values)
}
