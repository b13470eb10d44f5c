//! Command-line interface: `train`, `summary` and `predict`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::config::RunConfig;
use crate::data::kind::DatasetKind;
use crate::data::preprocess::Preprocessing;
use crate::error::{Error, Result};
use crate::network::spec::ModelSpec;
use crate::optim::OptimizerConfig;
use crate::pipeline;

#[derive(Parser, Debug)]
#[command(name = "ferrite-cnn", version, about = "Train and run small convolutional image classifiers")]
pub struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG overrides this.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train, evaluate and save a model
    Train(TrainCommand),
    /// Print the model summary without training
    Summary(SummaryCommand),
    /// Predict test images with a saved model
    Predict(PredictCommand),
}

impl Commands {
    pub fn run(self) -> Result<()> {
        match self {
            Commands::Train(cmd) => cmd.run(),
            Commands::Summary(cmd) => cmd.run(),
            Commands::Predict(cmd) => cmd.run(),
        }
    }
}

/// Options shared by every subcommand that reads a run configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Run configuration file (JSON)
    #[arg(long, short = 'c', env = "FERRITE_CNN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Dataset to train on
    #[arg(long, value_enum)]
    pub dataset: Option<DatasetKind>,

    /// Directory holding the dataset files
    #[arg(long, env = "FERRITE_CNN_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Model architecture file (JSON ModelSpec)
    #[arg(long)]
    pub model_spec: Option<PathBuf>,
}

impl ConfigArgs {
    /// Defaults, then the config file, then these flags.
    pub fn resolve(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load_json(path)?,
            None => RunConfig::default(),
        };
        if let Some(kind) = self.dataset {
            config.dataset.kind = kind;
        }
        if let Some(dir) = &self.data_dir {
            config.dataset.data_dir = dir.clone();
        }
        if let Some(path) = &self.model_spec {
            config.model = Some(ModelSpec::load_json(path)?);
        }
        Ok(config)
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct TrainCommand {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[arg(long, value_enum)]
    pub preprocessing: Option<Preprocessing>,

    #[arg(long, short = 'e')]
    pub epochs: Option<usize>,

    #[arg(long, short = 'b')]
    pub batch_size: Option<usize>,

    /// Fraction of the training data held out for validation
    #[arg(long)]
    pub validation_split: Option<f64>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// adam, sgd or rmsprop
    #[arg(long)]
    pub optimizer: Option<String>,

    #[arg(long)]
    pub learning_rate: Option<f64>,

    /// Use only the first N training images
    #[arg(long)]
    pub limit_train: Option<usize>,

    #[arg(long)]
    pub limit_test: Option<usize>,

    #[arg(long)]
    pub model_path: Option<PathBuf>,

    #[arg(long)]
    pub plot_path: Option<PathBuf>,

    #[arg(long)]
    pub history_path: Option<PathBuf>,

    /// Number of sample predictions to print
    #[arg(long)]
    pub samples: Option<usize>,

    /// Skip the test-set evaluation
    #[arg(long)]
    pub no_eval: bool,

    #[arg(long)]
    pub no_save_model: bool,

    #[arg(long)]
    pub no_plot: bool,
}

impl TrainCommand {
    pub fn resolve(&self) -> Result<RunConfig> {
        let mut c = self.config.resolve()?;
        if let Some(p) = self.preprocessing {
            c.dataset.preprocessing = p;
        }
        if let Some(n) = self.limit_train {
            c.dataset.limit_train = Some(n);
        }
        if let Some(n) = self.limit_test {
            c.dataset.limit_test = Some(n);
        }
        if let Some(e) = self.epochs {
            c.training.epochs = e;
        }
        if let Some(b) = self.batch_size {
            c.training.batch_size = b;
        }
        if let Some(v) = self.validation_split {
            c.training.validation_split = v;
        }
        if let Some(s) = self.seed {
            c.training.seed = s;
        }
        match (&self.optimizer, self.learning_rate) {
            (Some(name), lr) => {
                let lr = lr.unwrap_or_else(|| c.optimizer.learning_rate());
                c.optimizer = OptimizerConfig::from_name(name, lr)
                    .ok_or_else(|| Error::Config(format!("unknown optimizer '{}'", name)))?;
            }
            (None, Some(lr)) => c.optimizer = c.optimizer.with_learning_rate(lr),
            (None, None) => {}
        }
        if let Some(p) = &self.model_path {
            c.output.model_path = p.clone();
        }
        if let Some(p) = &self.plot_path {
            c.output.plot_path = p.clone();
        }
        if let Some(p) = &self.history_path {
            c.output.history_path = p.clone();
        }
        if let Some(n) = self.samples {
            c.output.sample_predictions = n;
        }
        if self.no_eval {
            c.output.evaluate_on_test_set = false;
        }
        if self.no_save_model {
            c.output.save_model = false;
        }
        if self.no_plot {
            c.output.save_plot = false;
        }
        Ok(c)
    }

    pub fn run(self) -> Result<()> {
        let config = self.resolve()?;
        info!(
            dataset = config.dataset.kind.name(),
            optimizer = config.optimizer.name(),
            learning_rate = config.optimizer.learning_rate(),
            epochs = config.training.epochs,
            "starting training run"
        );
        pipeline::run(&config)?;
        Ok(())
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct SummaryCommand {
    #[command(flatten)]
    pub config: ConfigArgs,
}

impl SummaryCommand {
    pub fn run(self) -> Result<()> {
        let config = self.config.resolve()?;
        let stdout = std::io::stdout();
        pipeline::summarize(&config, &mut stdout.lock())?;
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct PredictCommand {
    /// Saved model (JSON)
    #[arg(long, short = 'm', default_value = "my_model.json")]
    pub model: PathBuf,

    /// Dataset to read test images from; defaults to the model's own
    #[arg(long, value_enum)]
    pub dataset: Option<DatasetKind>,

    #[arg(long, env = "FERRITE_CNN_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Number of test images to predict
    #[arg(long, short = 'n', default_value_t = 5)]
    pub samples: usize,
}

impl PredictCommand {
    pub fn run(self) -> Result<()> {
        let stdout = std::io::stdout();
        pipeline::predict_saved(&self.model, &self.data_dir, self.dataset, self.samples, &mut stdout.lock())?;
        Ok(())
    }
}
