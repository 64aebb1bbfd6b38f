use std::{fs, path::Path};

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::{
    MlErr, Result,
    arch::{Model, Sequential},
    specs::ModelSpec,
    training::TrainerBuilder,
};

/// A trained model: its architecture and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub model: ModelSpec,
    pub params: Vec<f32>,
}

impl Checkpoint {
    /// Creates a new `Checkpoint`.
    ///
    /// # Errors
    /// If the model spec is invalid or `params` doesn't have the model's size.
    pub fn new(model: ModelSpec, params: Vec<f32>) -> Result<Self> {
        let checkpoint = Self { model, params };
        checkpoint.build_model()?;
        Ok(checkpoint)
    }

    /// Writes the checkpoint as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)?;
        Ok(())
    }

    /// Reads and validates a checkpoint written by `save`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let checkpoint: Self = serde_json::from_str(&raw)?;
        checkpoint.build_model()?;
        Ok(checkpoint)
    }

    /// Builds the checkpoint's model, checking it matches the amount of parameters.
    pub fn build_model(&self) -> Result<Sequential> {
        let model = TrainerBuilder::new().build_model(&self.model)?;

        if model.size() != self.params.len() {
            return Err(MlErr::SizeMismatch {
                what: "checkpoint parameters",
                got: self.params.len(),
                expected: model.size(),
            });
        }

        Ok(model)
    }

    /// Computes the trained model's prediction for a batch of inputs.
    pub fn predict(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut model = self.build_model()?;
        model.forward(&self.params, x)
    }
}
