use std::{fs, path::PathBuf};

use adaptive_power_neurons::{
    checkpoint::Checkpoint, package, specs::TrainerSpec, training::TrainerBuilder,
};
use anyhow::{Context, Result, bail};
use clap::{Arg, ArgMatches, Command, ValueHint};
use log::info;
use ndarray::Array2;

const DEFAULT_CHECKPOINT: &str = "checkpoint.json";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = Command::new("apn")
        .version(clap::crate_version!())
        .about(clap::crate_description!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("train")
                .about("Train a model described by a JSON configuration file")
                .arg(
                    Arg::new("config")
                        .help("Path to the training configuration file")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("File path the trained checkpoint will be written to")
                        .default_value(DEFAULT_CHECKPOINT)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("predict")
                .about("Run a trained checkpoint over a JSON array of input rows")
                .arg(
                    Arg::new("checkpoint")
                        .help("Path to a checkpoint written by `train`")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("inputs")
                        .help("Path to a JSON file holding an array of input rows")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(Command::new("info").about("Print the package descriptor"))
        .get_matches();

    match matches.subcommand() {
        Some(("train", sub)) => train(sub),
        Some(("predict", sub)) => predict(sub),
        Some(("info", _)) => {
            println!("{}", serde_json::to_string_pretty(&package::info())?);
            Ok(())
        }
        _ => unreachable!("clap requires a subcommand"),
    }
}

fn train(matches: &ArgMatches) -> Result<()> {
    let config = matches
        .get_one::<PathBuf>("config")
        .context("missing config path")?;
    let output = matches
        .get_one::<PathBuf>("output")
        .context("missing output path")?;

    let spec = TrainerSpec::from_path(config)
        .with_context(|| format!("failed to read config {}", config.display()))?;
    info!("loaded configuration from {}", config.display());

    let mut session = TrainerBuilder::new().build(&spec)?;
    let losses = session.run()?;

    let checkpoint = Checkpoint::new(spec.model, session.params)?;
    checkpoint
        .save(output)
        .with_context(|| format!("failed to write checkpoint {}", output.display()))?;

    match losses.last() {
        Some(&loss) => info!(
            epochs = losses.len(), loss = loss;
            "checkpoint written to {}", output.display()
        ),
        None => info!(epochs = 0; "checkpoint written to {}", output.display()),
    }

    Ok(())
}

fn predict(matches: &ArgMatches) -> Result<()> {
    let checkpoint_path = matches
        .get_one::<PathBuf>("checkpoint")
        .context("missing checkpoint path")?;
    let inputs_path = matches
        .get_one::<PathBuf>("inputs")
        .context("missing inputs path")?;

    let checkpoint = Checkpoint::load(checkpoint_path)
        .with_context(|| format!("failed to load checkpoint {}", checkpoint_path.display()))?;

    let raw = fs::read_to_string(inputs_path)
        .with_context(|| format!("failed to read inputs {}", inputs_path.display()))?;
    let rows: Vec<Vec<f32>> = serde_json::from_str(&raw)?;
    let x = to_matrix(rows)?;

    let y = checkpoint.predict(x.view())?;
    let out: Vec<Vec<f32>> = y.outer_iter().map(|row| row.to_vec()).collect();
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

fn to_matrix(rows: Vec<Vec<f32>>) -> Result<Array2<f32>> {
    let nrows = rows.len();
    let ncols = rows.first().map(Vec::len).unwrap_or_default();

    if nrows == 0 || ncols == 0 {
        bail!("inputs must hold at least one non-empty row");
    }
    if let Some(i) = rows.iter().position(|row| row.len() != ncols) {
        bail!("row {i} has {} values, expected {ncols}", rows[i].len());
    }

    let data = rows.into_iter().flatten().collect();
    Ok(Array2::from_shape_vec((nrows, ncols), data)?)
}
