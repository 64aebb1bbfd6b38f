//! A neural network library using Adaptive Power Neurons.
//!
//! An adaptive power neuron expands every input into the powers `(x + s)^1..=(x + s)^P` of a
//! learnable shift `s` and combines them linearly. The crate offers the standalone
//! [`AdaptivePowerNeuron`](arch::AdaptivePowerNeuron) and an
//! [`AdaptivePower`](arch::layers::AdaptivePower) layer that composes with dense layers in a
//! [`Sequential`](arch::Sequential) model trained over flat parameter buffers.

pub mod arch;
pub mod checkpoint;
pub mod dataset;
pub mod error;
pub mod initialization;
pub mod optimization;
pub mod package;
pub mod specs;
pub mod training;

pub use error::{MlErr, Result};
