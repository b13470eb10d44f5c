use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

use crate::data::kind::DatasetKind;
use crate::data::preprocess::Preprocessing;
use crate::error::{Error, Result};
use crate::network::spec::ModelSpec;
use crate::optim::OptimizerConfig;

/// Everything a training run needs. Every field has a default, so a JSON
/// config file only has to name what it changes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub dataset: DatasetConfig,
    /// Architecture; `None` uses the standard small CNN sized for the dataset.
    pub model: Option<ModelSpec>,
    pub optimizer: OptimizerConfig,
    pub training: TrainingConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub kind: DatasetKind,
    pub data_dir: PathBuf,
    pub preprocessing: Preprocessing,
    /// Use only the first N training samples.
    pub limit_train: Option<usize>,
    pub limit_test: Option<usize>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        DatasetConfig {
            kind: DatasetKind::Mnist,
            data_dir: PathBuf::from("data"),
            preprocessing: Preprocessing::Normalize,
            limit_train: None,
            limit_test: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    /// Fraction of the training set held out, from its end, for validation.
    pub validation_split: f64,
    pub seed: u64,
    /// Log running batch metrics every N batches; 0 disables.
    pub progress_every: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            epochs: 10,
            batch_size: 32,
            validation_split: 0.2,
            seed: 42,
            progress_every: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub model_path: PathBuf,
    pub plot_path: PathBuf,
    pub history_path: PathBuf,
    pub evaluate_on_test_set: bool,
    pub save_model: bool,
    pub save_plot: bool,
    pub save_history: bool,
    /// How many test images to show predictions for.
    pub sample_predictions: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            model_path: PathBuf::from("my_model.json"),
            plot_path: PathBuf::from("training_history.png"),
            history_path: PathBuf::from("training_history.json"),
            evaluate_on_test_set: true,
            save_model: true,
            save_plot: true,
            save_history: true,
            sample_predictions: 5,
        }
    }
}

impl RunConfig {
    pub fn load_json(path: impl AsRef<Path>) -> Result<RunConfig> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| Error::Config(format!("cannot open config '{}': {}", path.display(), e)))?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        Ok(())
    }

    /// The configured architecture, or the standard CNN for the dataset.
    pub fn model_spec(&self) -> ModelSpec {
        match &self.model {
            Some(spec) => spec.clone(),
            None => ModelSpec::small_cnn(self.dataset.kind.input_shape(), self.dataset.kind.num_classes()),
        }
    }

    /// Checks hyperparameters and that the model fits the dataset.
    pub fn validate(&self) -> Result<()> {
        let t = &self.training;
        if t.epochs == 0 {
            return Err(Error::Config("epochs must be at least 1".into()));
        }
        if t.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".into()));
        }
        if !(0.0..1.0).contains(&t.validation_split) {
            return Err(Error::Config(format!(
                "validation_split must be in [0, 1), got {}", t.validation_split
            )));
        }
        let lr = self.optimizer.learning_rate();
        if !(lr > 0.0 && lr.is_finite()) {
            return Err(Error::Config(format!("learning_rate must be positive, got {}", lr)));
        }

        let spec = self.model_spec();
        let kind = self.dataset.kind;
        if spec.input_shape != kind.input_shape() {
            return Err(Error::Config(format!(
                "model input shape {:?} does not match {} images {:?}",
                spec.input_shape, kind.name(), kind.input_shape()
            )));
        }
        let outputs = spec.output_size()?;
        if outputs != kind.num_classes() {
            return Err(Error::Config(format!(
                "model has {} outputs but {} has {} classes", outputs, kind.name(), kind.num_classes()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::tensor::Shape;

    #[test]
    fn defaults_match_reference_run() {
        let c = RunConfig::default();
        assert_eq!(c.training.epochs, 10);
        assert_eq!(c.training.batch_size, 32);
        assert_eq!(c.training.validation_split, 0.2);
        assert_eq!(c.output.sample_predictions, 5);
        assert_eq!(c.output.model_path, PathBuf::from("my_model.json"));
        assert_eq!(c.optimizer.name(), "adam");
        assert_eq!(c.optimizer.learning_rate(), 0.001);
        assert_eq!(c.model_spec(), ModelSpec::mnist_cnn());
        c.validate().unwrap();
    }

    #[test]
    fn partial_json_fills_defaults() {
        let c: RunConfig = serde_json::from_str(
            r#"{"dataset": {"kind": "cifar10"}, "training": {"epochs": 3}, "optimizer": {"name": "sgd", "learning_rate": 0.01}}"#,
        ).unwrap();
        assert_eq!(c.dataset.kind, DatasetKind::Cifar10);
        assert_eq!(c.training.epochs, 3);
        assert_eq!(c.training.batch_size, 32);
        assert_eq!(c.optimizer.name(), "sgd");
        assert_eq!(c.model_spec().input_shape, Shape::new(32, 32, 3));
        c.validate().unwrap();
    }

    #[test]
    fn mismatched_model_is_rejected() {
        let c = RunConfig {
            dataset: DatasetConfig { kind: DatasetKind::Cifar10, ..Default::default() },
            model: Some(ModelSpec::mnist_cnn()),
            ..Default::default()
        };
        assert!(matches!(c.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn bad_hyperparameters_are_rejected() {
        let mut c = RunConfig::default();
        c.training.validation_split = 1.0;
        assert!(c.validate().is_err());
        let mut c = RunConfig::default();
        c.training.batch_size = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let mut c = RunConfig::default();
        c.output.sample_predictions = 2;
        c.save_json(&path).unwrap();
        assert_eq!(RunConfig::load_json(&path).unwrap(), c);
    }
}
