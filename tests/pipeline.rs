use std::path::Path;

use ferrite_cnn::activation::ActivationFunction;
use ferrite_cnn::config::RunConfig;
use ferrite_cnn::data::idx::encode_idx_pair;
use ferrite_cnn::layers::Padding;
use ferrite_cnn::network::{LayerSpec, ModelSpec, Network};
use ferrite_cnn::train::History;
use ferrite_cnn::{pipeline, DatasetKind, Error, LossType, Shape};

const SIDE: usize = 28;

/// Images whose bright 4×4 patch sits in a column picked by the label.
fn synthetic(n: usize, offset: usize) -> (Vec<u8>, Vec<u8>) {
    let mut pixels = vec![0u8; n * SIDE * SIDE];
    let mut labels = Vec::with_capacity(n);
    for i in 0..n {
        let label = (i + offset) % 10;
        labels.push(label as u8);
        let x0 = 2 + label * 2;
        for y in 10..14 {
            for x in x0..x0 + 4 {
                pixels[i * SIDE * SIDE + y * SIDE + x] = 255;
            }
        }
    }
    encode_idx_pair(SIDE, SIDE, &pixels, &labels)
}

fn write_mnist(dir: &Path) {
    let (img, lbl) = synthetic(40, 0);
    std::fs::write(dir.join("train-images-idx3-ubyte"), img).unwrap();
    std::fs::write(dir.join("train-labels-idx1-ubyte"), lbl).unwrap();
    let (img, lbl) = synthetic(10, 3);
    std::fs::write(dir.join("t10k-images-idx3-ubyte"), img).unwrap();
    std::fs::write(dir.join("t10k-labels-idx1-ubyte"), lbl).unwrap();
}

fn tiny_model() -> ModelSpec {
    ModelSpec {
        input_shape: Shape::new(SIDE, SIDE, 1),
        layers: vec![
            LayerSpec::Conv2D {
                filters: 2,
                kernel_size: 3,
                strides: 2,
                padding: Padding::Valid,
                activation: ActivationFunction::ReLU,
            },
            LayerSpec::MaxPooling2D { pool_size: 2, strides: None },
            LayerSpec::Flatten,
            LayerSpec::Dropout { rate: 0.2 },
            LayerSpec::Dense { units: 10, activation: ActivationFunction::Softmax },
        ],
        loss: LossType::CategoricalCrossentropy,
    }
}

fn config(root: &Path) -> RunConfig {
    let mut c = RunConfig::default();
    c.dataset.data_dir = root.to_path_buf();
    c.model = Some(tiny_model());
    c.training.epochs = 2;
    c.training.batch_size = 8;
    c.training.validation_split = 0.25;
    c.training.progress_every = 2;
    c.output.model_path = root.join("out").join("my_model.json");
    c.output.plot_path = root.join("out").join("training_history.png");
    c.output.history_path = root.join("out").join("training_history.json");
    c.output.sample_predictions = 3;
    c
}

#[test]
fn full_run_writes_reloadable_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    write_mnist(dir.path());
    std::fs::create_dir_all(dir.path().join("out")).unwrap();
    let cfg = config(dir.path());

    let mut out = Vec::new();
    let report = pipeline::run_with_output(&cfg, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert_eq!(report.history.len(), 2);
    assert_eq!(report.history.val_accuracy.len(), 2);
    assert!(report.test.is_some());
    assert_eq!(report.samples.len(), 3);
    for needle in [
        "MODEL SUMMARY",
        "Epoch 2/2",
        "val_accuracy",
        "Evaluating model on test set...",
        "Test Accuracy: ",
        "Test Loss: ",
        "Training history plot saved as ",
        "Model saved as ",
        "Sample Predictions:",
        "Sample 3:",
        "✓ Model training and evaluation complete!",
    ] {
        assert!(text.contains(needle), "missing {:?} in report:\n{}", needle, text);
    }

    let mut model = Network::load_json(report.model_path.as_ref().unwrap()).unwrap();
    let meta = model.metadata.clone().unwrap();
    assert_eq!(meta.dataset, Some(DatasetKind::Mnist));
    assert!(meta.scaling.is_some());
    let probs = model.predict(&ferrite_cnn::Tensor::zeros(Shape::new(SIDE, SIDE, 1))).unwrap();
    assert_eq!(probs.len(), 10);
    assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);

    let png = image::open(report.plot_path.as_ref().unwrap()).unwrap();
    assert_eq!((png.width(), png.height()), (1200, 400));

    let history = History::load_json(report.history_path.as_ref().unwrap()).unwrap();
    assert_eq!(history.len(), report.history.len());
    for (a, b) in history.loss.iter().zip(&report.history.loss) {
        assert!((a - b).abs() < 1e-12);
    }

    // The saved model reproduces the run's own sample predictions.
    let mut sink = Vec::new();
    let samples = pipeline::predict_saved(
        report.model_path.as_ref().unwrap(),
        dir.path(),
        None,
        3,
        &mut sink,
    ).unwrap();
    assert_eq!(samples.len(), report.samples.len());
    for (a, b) in samples.iter().zip(&report.samples) {
        assert_eq!((a.predicted, a.actual), (b.predicted, b.actual));
        assert!((a.confidence - b.confidence).abs() < 1e-9);
    }
}

#[test]
fn same_seed_reproduces_history() {
    let dir = tempfile::tempdir().unwrap();
    write_mnist(dir.path());
    let mut cfg = config(dir.path());
    cfg.output.save_model = false;
    cfg.output.save_plot = false;
    cfg.output.save_history = false;
    cfg.output.evaluate_on_test_set = false;
    cfg.output.sample_predictions = 0;

    let first = pipeline::run_with_output(&cfg, &mut Vec::new()).unwrap();
    let second = pipeline::run_with_output(&cfg, &mut Vec::new()).unwrap();
    assert_eq!(first.history, second.history);
    assert!(first.test.is_none());
    assert!(first.model_path.is_none());
    assert!(!dir.path().join("out").exists());
}

#[test]
fn missing_dataset_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let err = pipeline::run_with_output(&cfg, &mut Vec::new()).unwrap_err();
    assert!(matches!(err, Error::Dataset(_)), "{:?}", err);
}
