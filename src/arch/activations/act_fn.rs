use super::Sigmoid;

/// The activation function applied element-wise to a layer's output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ActFn {
    Sigmoid(Sigmoid),
    Tanh,
    Relu,
    Identity,
}
use ActFn::*;

impl ActFn {
    pub fn sigmoid(amp: f32) -> Self {
        Sigmoid(Sigmoid::new(amp))
    }

    pub fn f(&self, x: f32) -> f32 {
        match self {
            Sigmoid(a) => a.f(x),
            Tanh => x.tanh(),
            Relu => x.max(0.),
            Identity => x,
        }
    }

    pub fn df(&self, x: f32) -> f32 {
        match self {
            Sigmoid(a) => a.df(x),
            Tanh => 1. - x.tanh().powi(2),
            Relu => {
                if x > 0. {
                    1.
                } else {
                    0.
                }
            }
            Identity => 1.,
        }
    }
}
