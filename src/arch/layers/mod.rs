mod adaptive_power;
mod dense;
mod layer;

pub use adaptive_power::AdaptivePower;
pub use dense::Dense;
pub use layer::Layer;

use crate::{MlErr, Result};

/// Fails with a `SizeMismatch` unless `got == expected`.
fn check_len(what: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(MlErr::SizeMismatch {
            what,
            got,
            expected,
        });
    }

    Ok(())
}

/// Fails with an `InvalidDimension` if either side of `dim` is zero.
fn check_dim(dim: (usize, usize)) -> Result<()> {
    if dim.0 == 0 {
        return Err(MlErr::InvalidDimension {
            what: "layer input size",
        });
    }
    if dim.1 == 0 {
        return Err(MlErr::InvalidDimension {
            what: "layer output size",
        });
    }

    Ok(())
}
