//! The end-to-end run: load and scale the data, build the model, train it
//! with a validation split, evaluate on the test set, then write the plot,
//! history and model and show a few predictions.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::config::RunConfig;
use crate::data::dataset::Dataset;
use crate::data::kind::DatasetKind;
use crate::data::preprocess::Preprocessing;
use crate::error::Result;
use crate::network::metadata::{InputType, ModelMetadata};
use crate::network::network::Network;
use crate::plot::save_history_png;
use crate::train::{argmax, evaluate, fit, Evaluation, History, TrainConfig, TrainEvent};

const RULE_WIDTH: usize = 50;

/// One row of the "Sample Predictions" block.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePrediction {
    /// 0-based index into the test set.
    pub index: usize,
    pub predicted: usize,
    pub actual: usize,
    /// Output value of the predicted class.
    pub confidence: f64,
    pub predicted_label: String,
    pub actual_label: String,
}

/// What a run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub history: History,
    pub test: Option<Evaluation>,
    pub model_path: Option<PathBuf>,
    pub plot_path: Option<PathBuf>,
    pub history_path: Option<PathBuf>,
    pub samples: Vec<SamplePrediction>,
}

/// Runs the whole pipeline, printing the report to stdout.
pub fn run(config: &RunConfig) -> Result<RunReport> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_with_output(config, &mut out)
}

/// Same as [`run`], writing the console report to `out`.
pub fn run_with_output<W: Write>(config: &RunConfig, out: &mut W) -> Result<RunReport> {
    config.validate()?;
    let kind = config.dataset.kind;

    let (mut train, mut test) = kind.load(&config.dataset.data_dir)?;
    if let Some(n) = config.dataset.limit_train {
        train = train.take(n);
    }
    if let Some(n) = config.dataset.limit_test {
        test = test.take(n);
    }
    let scaling = config.dataset.preprocessing.apply(&mut train, &mut test)?;
    let (train, val) = train.split_validation(config.training.validation_split)?;
    info!(train = train.len(), validation = val.len(), test = test.len(), ?scaling, "data prepared");

    let spec = config.model_spec();
    let mut network = Network::build(&spec, &mut StdRng::seed_from_u64(config.training.seed))?;
    network.metadata = Some(ModelMetadata {
        description: Some(format!("CNN classifier trained on {}", kind.name())),
        input_type: Some(InputType::for_shape(spec.input_shape)),
        output_labels: Some(kind.class_names()),
        dataset: Some(kind),
        scaling: Some(scaling),
    });
    write_summary(out, &network)?;

    let history = train_with_report(out, &mut network, &train, &val, config)?;

    let test_eval = if config.output.evaluate_on_test_set && !test.is_empty() {
        writeln!(out, "\nEvaluating model on test set...")?;
        let eval = evaluate(&mut network, &test)?;
        writeln!(out, "\nTest Accuracy: {:.4} ({:.2}%)", eval.accuracy, eval.accuracy * 100.0)?;
        writeln!(out, "Test Loss: {:.4}", eval.loss)?;
        info!(accuracy = eval.accuracy, loss = eval.loss, "test set evaluated");
        Some(eval)
    } else {
        None
    };

    let plot_path = if config.output.save_plot {
        let path = &config.output.plot_path;
        save_history_png(&history, path)?;
        writeln!(out, "\nTraining history plot saved as {}", path.display())?;
        Some(path.clone())
    } else {
        None
    };
    let history_path = if config.output.save_history {
        let path = &config.output.history_path;
        history.save_json(path)?;
        writeln!(out, "Training history saved as {}", path.display())?;
        Some(path.clone())
    } else {
        None
    };
    let model_path = if config.output.save_model {
        let path = &config.output.model_path;
        network.save_json(path)?;
        writeln!(out, "\nModel saved as {}", path.display())?;
        info!(path = %path.display(), params = network.param_count(), "model saved");
        Some(path.clone())
    } else {
        None
    };

    let samples = sample_predictions(&mut network, &test, config.output.sample_predictions)?;
    write_samples(out, &samples)?;

    writeln!(out, "\n✓ Model training and evaluation complete!")?;
    Ok(RunReport { history, test: test_eval, model_path, plot_path, history_path, samples })
}

/// Builds the configured model without training and prints its summary.
pub fn summarize<W: Write>(config: &RunConfig, out: &mut W) -> Result<Network> {
    config.validate()?;
    let network = Network::build(&config.model_spec(), &mut StdRng::seed_from_u64(config.training.seed))?;
    write_summary(out, &network)?;
    Ok(network)
}

/// Reloads a saved model and prints predictions for the first `count`
/// test images of `dir`. The dataset defaults to the one recorded in the
/// model, and pixels are scaled the way they were during training.
pub fn predict_saved<W: Write>(
    model_path: &Path,
    dir: &Path,
    dataset: Option<DatasetKind>,
    count: usize,
    out: &mut W,
) -> Result<Vec<SamplePrediction>> {
    let mut network = Network::load_json(model_path)?;
    let meta = network.metadata.clone().unwrap_or_default();
    let kind = dataset.or(meta.dataset).unwrap_or_default();
    let mut test = kind.load_test(dir)?.take(count);
    let scaling = match meta.scaling {
        Some(s) => s,
        None => Preprocessing::Normalize.fit(&test)?,
    };
    scaling.apply(&mut test);
    if let Some(labels) = meta.output_labels {
        test = test.with_class_names(labels);
    }
    info!(model = %model_path.display(), dataset = kind.name(), samples = test.len(), "predicting");

    let samples = sample_predictions(&mut network, &test, count)?;
    write_samples(out, &samples)?;
    Ok(samples)
}

/// Predictions for the first `count` samples of `data`.
pub fn sample_predictions(network: &mut Network, data: &Dataset, count: usize) -> Result<Vec<SamplePrediction>> {
    let n = count.min(data.len());
    let mut samples = Vec::with_capacity(n);
    for index in 0..n {
        let probs = network.predict(&data.images[index])?;
        let predicted = argmax(&probs);
        let actual = data.labels[index];
        samples.push(SamplePrediction {
            index,
            predicted,
            actual,
            confidence: probs[predicted],
            predicted_label: data.class_name(predicted),
            actual_label: data.class_name(actual),
        });
    }
    Ok(samples)
}

fn write_summary<W: Write>(out: &mut W, network: &Network) -> Result<()> {
    let rule = "=".repeat(RULE_WIDTH);
    writeln!(out, "\n{}", rule)?;
    writeln!(out, "MODEL SUMMARY")?;
    writeln!(out, "{}", rule)?;
    writeln!(out, "{}", network.summary())?;
    writeln!(out, "{}\n", rule)?;
    Ok(())
}

fn write_samples<W: Write>(out: &mut W, samples: &[SamplePrediction]) -> Result<()> {
    if samples.is_empty() {
        return Ok(());
    }
    let rule = "=".repeat(RULE_WIDTH);
    writeln!(out, "\nSample Predictions:")?;
    writeln!(out, "{}", rule)?;
    for s in samples {
        writeln!(out, "Sample {}:", s.index + 1)?;
        writeln!(out, "  Predicted: {}, Actual: {}", s.predicted_label, s.actual_label)?;
        writeln!(out, "  Confidence: {:.4}", s.confidence)?;
    }
    writeln!(out, "{}", rule)?;
    Ok(())
}

/// Runs `fit` on a worker thread and prints Keras-style progress from its
/// event stream. Returning early drops the receiver, which stops training.
fn train_with_report<W: Write>(
    out: &mut W,
    network: &mut Network,
    train: &Dataset,
    val: &Dataset,
    config: &RunConfig,
) -> Result<History> {
    let t = &config.training;
    let mut optimizer = config.optimizer.build();
    let (tx, rx) = mpsc::channel();
    let train_config = TrainConfig::new(t.epochs, t.batch_size, t.seed).with_progress(tx, t.progress_every);
    let val = if val.is_empty() { None } else { Some(val) };
    let started = Instant::now();

    let history = thread::scope(|s| -> Result<History> {
        let optimizer = optimizer.as_mut();
        let worker = s.spawn(move || fit(network, train, val, optimizer, &train_config));
        for event in rx {
            write_event(out, &event)?;
        }
        worker.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic))
    })?;

    info!(epochs = history.len(), elapsed_s = started.elapsed().as_secs_f64(), "training finished");
    Ok(history)
}

fn write_event<W: Write>(out: &mut W, event: &TrainEvent) -> Result<()> {
    match event {
        TrainEvent::Batch { epoch, batch, total_batches, loss, accuracy } => {
            write!(
                out,
                "\rEpoch {} - {}/{} - loss: {:.4} - accuracy: {:.4}",
                epoch, batch, total_batches, loss, accuracy
            )?;
            out.flush()?;
        }
        TrainEvent::Epoch(stats) => {
            write!(
                out,
                "\rEpoch {}/{} - {:.1}s - loss: {:.4} - accuracy: {:.4}",
                stats.epoch,
                stats.total_epochs,
                stats.elapsed_ms as f64 / 1000.0,
                stats.loss,
                stats.accuracy
            )?;
            if let (Some(vl), Some(va)) = (stats.val_loss, stats.val_accuracy) {
                write!(out, " - val_loss: {:.4} - val_accuracy: {:.4}", vl, va)?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::train::EpochStats;

    #[test]
    fn epoch_line_includes_validation_metrics() {
        let mut out = Vec::new();
        let stats = EpochStats {
            epoch: 2,
            total_epochs: 10,
            loss: 0.25,
            accuracy: 0.9,
            val_loss: Some(0.125),
            val_accuracy: Some(0.95),
            elapsed_ms: 1500,
        };
        write_event(&mut out, &TrainEvent::Epoch(stats)).unwrap();
        let line = String::from_utf8(out).unwrap();
        assert_eq!(
            line,
            "\rEpoch 2/10 - 1.5s - loss: 0.2500 - accuracy: 0.9000 - val_loss: 0.1250 - val_accuracy: 0.9500\n"
        );
    }

    #[test]
    fn sample_block_formats_four_decimals() {
        let mut out = Vec::new();
        let samples = vec![SamplePrediction {
            index: 0,
            predicted: 7,
            actual: 7,
            confidence: 0.987654,
            predicted_label: "7".into(),
            actual_label: "7".into(),
        }];
        write_samples(&mut out, &samples).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Sample 1:\n  Predicted: 7, Actual: 7\n  Confidence: 0.9877\n"));
        assert!(text.starts_with(&format!("\nSample Predictions:\n{}\n", "=".repeat(50))));
    }

    #[test]
    fn summary_banner_wraps_table() {
        let mut out = Vec::new();
        summarize(&RunConfig::default(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with(&format!("\n{}\nMODEL SUMMARY\n", "=".repeat(50))));
        assert!(text.contains("Total params: 421,642"));
    }
}
