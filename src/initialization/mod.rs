mod constant;
mod param_gen;
mod random;

pub use constant::ConstParamGen;
pub use param_gen::{ParamGen, take_exact};
pub use random::RandParamGen;
