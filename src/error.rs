use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use ndarray::ShapeError;

/// The result type used in the entire crate.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The crate's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    InvalidDimension {
        what: &'static str,
    },
    SizeOverflow {
        what: &'static str,
    },
    LayerMismatch {
        layer: usize,
        input: usize,
        previous_output: usize,
    },
    EmptyModel,
    BackwardBeforeForward,
    InvalidDataset(String),
    InvalidDistribution(String),
    ParamGenExhausted {
        got: usize,
        expected: usize,
    },
    Diverged {
        epoch: usize,
    },
    Shape(ShapeError),
    Io(io::Error),
    Json(serde_json::Error),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "there's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            MlErr::InvalidDimension { what } => write!(f, "{what} must be greater than zero"),
            MlErr::SizeOverflow { what } => {
                write!(f, "the amount of parameters of the {what} doesn't fit in memory")
            }
            MlErr::LayerMismatch {
                layer,
                input,
                previous_output,
            } => write!(
                f,
                "layer {layer}: input size ({input}) does not match previous layer output size ({previous_output})"
            ),
            MlErr::EmptyModel => write!(f, "a model must have at least one layer"),
            MlErr::BackwardBeforeForward => {
                write!(f, "tried to run a backward pass without a previous forward pass")
            }
            MlErr::InvalidDataset(msg) => write!(f, "invalid dataset: {msg}"),
            MlErr::InvalidDistribution(msg) => write!(f, "invalid distribution: {msg}"),
            MlErr::ParamGenExhausted { got, expected } => write!(
                f,
                "the parameter generator ran out of values, got {got} of the expected {expected}"
            ),
            MlErr::Diverged { epoch } => {
                write!(f, "training diverged at epoch {epoch}, the loss is not finite")
            }
            MlErr::Shape(e) => write!(f, "shape error: {e}"),
            MlErr::Io(e) => write!(f, "io error: {e}"),
            MlErr::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Shape(e) => Some(e),
            MlErr::Io(e) => Some(e),
            MlErr::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeError> for MlErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}

impl From<io::Error> for MlErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for MlErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}
