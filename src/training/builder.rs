use std::{cell::RefCell, num::NonZeroUsize, rc::Rc};

use log::info;
use rand::{SeedableRng, rngs::StdRng};

use super::{ModelTrainer, Trainer};
use crate::{
    MlErr, Result,
    arch::{
        Model, Sequential,
        activations::ActFn,
        layers::Layer,
        loss::{LossFn, Mae, Mse},
    },
    dataset::Dataset,
    initialization::{ConstParamGen, ParamGen, RandParamGen, take_exact},
    optimization::{Adam, GradientDescent, GradientDescentWithMomentum, Optimizer},
    specs::{ActFnSpec, LayerSpec, LossFnSpec, ModelSpec, OptimizerSpec, ParamGenSpec, TrainerSpec},
};

/// A trainer together with the parameters it trains.
pub struct TrainingSession {
    pub trainer: Box<dyn Trainer>,
    pub params: Vec<f32>,
}

impl TrainingSession {
    /// Trains the session's parameters.
    ///
    /// # Returns
    /// The loss of every epoch that ran.
    pub fn run(&mut self) -> Result<Vec<f32>> {
        self.trainer.train(&mut self.params)
    }
}

/// Builds `Trainer`s given a specification.
#[derive(Default)]
pub struct TrainerBuilder;

impl TrainerBuilder {
    /// Creates a new `TrainerBuilder`.
    pub fn new() -> Self {
        Self
    }

    /// Builds a new `TrainingSession` following a spec: the trainer and freshly initialized
    /// parameters.
    ///
    /// # Arguments
    /// * `spec` - The specification for the trainer.
    pub fn build(&self, spec: &TrainerSpec) -> Result<TrainingSession> {
        let rng = Rc::new(RefCell::new(self.generate_rng(spec.seed)));

        let model = self.build_model(&spec.model)?;
        let params = self.init_params(spec.init, &model, &rng)?;
        let trainer_rng = StdRng::from_rng(&mut *rng.borrow_mut());

        info!(
            layers = model.layers().len(), params = params.len();
            "built sequential model"
        );

        let trainer = self.resolve_optimizer(spec, model, trainer_rng)?;
        Ok(TrainingSession { trainer, params })
    }

    /// Builds the model described by `spec`.
    pub fn build_model(&self, spec: &ModelSpec) -> Result<Sequential> {
        match spec {
            ModelSpec::Sequential {
                layers: layer_specs,
            } => {
                let layers = layer_specs
                    .iter()
                    .map(|ls| self.resolve_layer(*ls))
                    .collect::<Result<Vec<_>>>()?;

                Sequential::new(layers)
            }
        }
    }

    fn resolve_layer(&self, spec: LayerSpec) -> Result<Layer> {
        match spec {
            LayerSpec::Dense { dim, act_fn } => {
                let factory = |act_fn| Layer::dense(dim, act_fn);
                self.resolve_act_fn(act_fn, factory)
            }
            LayerSpec::AdaptivePower {
                dim,
                max_power,
                shift_rate,
                act_fn,
            } => {
                let factory = |act_fn| {
                    Layer::adaptive_power_with_shift_rate(dim, max_power, shift_rate, act_fn)
                };
                self.resolve_act_fn(act_fn, factory)
            }
        }
    }

    fn resolve_act_fn<F>(&self, spec: Option<ActFnSpec>, layer_factory: F) -> Result<Layer>
    where
        F: FnOnce(Option<ActFn>) -> Result<Layer>,
    {
        let Some(act_fn) = spec else {
            return layer_factory(None);
        };

        let act_fn = match act_fn {
            ActFnSpec::Sigmoid { amp } => ActFn::sigmoid(amp),
            ActFnSpec::Tanh => ActFn::Tanh,
            ActFnSpec::Relu => ActFn::Relu,
            ActFnSpec::Identity => ActFn::Identity,
        };

        layer_factory(Some(act_fn))
    }

    /// Generates the initial parameters of every layer: weights are sampled from the configured
    /// generator while biases and shifts start at zero.
    fn init_params(
        &self,
        spec: ParamGenSpec,
        model: &Sequential,
        rng: &Rc<RefCell<StdRng>>,
    ) -> Result<Vec<f32>> {
        let mut params = Vec::with_capacity(model.size());

        for layer in model.layers() {
            let fan_in = layer.fan_in();
            let fan_out = layer.output_dim();
            let n_weights = fan_in * fan_out;

            let mut param_gen = self.resolve_param_gen(spec, rng, n_weights, fan_in, fan_out)?;
            params.extend(take_exact(param_gen.as_mut(), n_weights)?);
            params.resize(params.len() + layer.size() - n_weights, 0.);
        }

        Ok(params)
    }

    fn resolve_param_gen(
        &self,
        spec: ParamGenSpec,
        rng: &Rc<RefCell<StdRng>>,
        limit: usize,
        fan_in: usize,
        fan_out: usize,
    ) -> Result<Box<dyn ParamGen>> {
        let rng = Rc::clone(rng);

        let param_gen: Box<dyn ParamGen> = match spec {
            ParamGenSpec::Const { value } => Box::new(ConstParamGen::new(value, limit)),
            ParamGenSpec::Uniform { low, high } => {
                Box::new(RandParamGen::uniform(rng, limit, low, high)?)
            }
            ParamGenSpec::Normal { mean, std_dev } => {
                Box::new(RandParamGen::normal(rng, limit, mean, std_dev)?)
            }
            ParamGenSpec::XavierUniform => {
                Box::new(RandParamGen::xavier_uniform(rng, limit, fan_in, fan_out)?)
            }
            ParamGenSpec::Kaiming => Box::new(RandParamGen::kaiming(rng, limit, fan_in)?),
            ParamGenSpec::Lecun => Box::new(RandParamGen::lecun(rng, limit, fan_in)?),
        };

        Ok(param_gen)
    }

    fn resolve_optimizer<M>(
        &self,
        spec: &TrainerSpec,
        model: M,
        rng: StdRng,
    ) -> Result<Box<dyn Trainer>>
    where
        M: Model + 'static,
    {
        let len = model.size();

        match spec.optimizer {
            OptimizerSpec::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => {
                let optimizer = Adam::new(len, learning_rate, beta1, beta2, epsilon);
                self.resolve_loss(spec, model, optimizer, rng)
            }
            OptimizerSpec::GradientDescent { learning_rate } => {
                let optimizer = GradientDescent::new(learning_rate);
                self.resolve_loss(spec, model, optimizer, rng)
            }
            OptimizerSpec::GradientDescentWithMomentum {
                learning_rate,
                momentum,
            } => {
                let optimizer = GradientDescentWithMomentum::new(len, learning_rate, momentum);
                self.resolve_loss(spec, model, optimizer, rng)
            }
        }
    }

    fn resolve_loss<M, O>(
        &self,
        spec: &TrainerSpec,
        model: M,
        optimizer: O,
        rng: StdRng,
    ) -> Result<Box<dyn Trainer>>
    where
        M: Model + 'static,
        O: Optimizer + 'static,
    {
        match spec.loss {
            LossFnSpec::Mse => self.terminate_build(spec, model, optimizer, Mse::new(), rng),
            LossFnSpec::Mae => self.terminate_build(spec, model, optimizer, Mae::new(), rng),
        }
    }

    fn terminate_build<M, O, L>(
        &self,
        spec: &TrainerSpec,
        model: M,
        optimizer: O,
        loss: L,
        rng: StdRng,
    ) -> Result<Box<dyn Trainer>>
    where
        M: Model + 'static,
        O: Optimizer + 'static,
        L: LossFn + 'static,
    {
        let batch_size = NonZeroUsize::new(spec.batch_size)
            .ok_or(MlErr::InvalidDimension { what: "batch size" })?;

        let dataset_spec = &spec.dataset;
        let dataset = Dataset::new(
            dataset_spec.data.clone(),
            dataset_spec.x_size,
            dataset_spec.y_size,
        )?;

        let trainer = ModelTrainer::new(
            model,
            optimizer,
            dataset,
            spec.epochs,
            batch_size,
            loss,
            rng,
        )
        .with_tolerance(spec.tolerance);

        Ok(Box::new(trainer))
    }

    fn generate_rng(&self, seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}
