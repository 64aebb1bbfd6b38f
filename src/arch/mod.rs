pub mod activations;
pub mod layers;
pub mod loss;
mod model;
mod neuron;
pub mod power;
mod sequential;

pub use model::Model;
pub use neuron::AdaptivePowerNeuron;
pub use sequential::Sequential;
