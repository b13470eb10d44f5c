use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::train::epoch_stats::EpochStats;

/// Per-epoch metric curves, one entry per completed epoch. The validation
/// series are empty when training ran without a validation set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub loss: Vec<f64>,
    pub accuracy: Vec<f64>,
    #[serde(default)]
    pub val_loss: Vec<f64>,
    #[serde(default)]
    pub val_accuracy: Vec<f64>,
}

impl History {
    pub fn push(&mut self, stats: &EpochStats) {
        self.loss.push(stats.loss);
        self.accuracy.push(stats.accuracy);
        if let Some(v) = stats.val_loss {
            self.val_loss.push(v);
        }
        if let Some(v) = stats.val_accuracy {
            self.val_accuracy.push(v);
        }
    }

    pub fn from_stats<'a>(stats: impl IntoIterator<Item = &'a EpochStats>) -> History {
        let mut history = History::default();
        for s in stats {
            history.push(s);
        }
        history
    }

    /// Number of completed epochs.
    pub fn len(&self) -> usize {
        self.loss.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loss.is_empty()
    }

    pub fn has_validation(&self) -> bool {
        !self.val_loss.is_empty()
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<History> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(epoch: usize, val: bool) -> EpochStats {
        EpochStats {
            epoch,
            total_epochs: 2,
            loss: 1.0 / epoch as f64,
            accuracy: 0.5,
            val_loss: val.then_some(0.9),
            val_accuracy: val.then_some(0.6),
            elapsed_ms: 3,
        }
    }

    #[test]
    fn collects_one_entry_per_epoch() {
        let h = History::from_stats(&[stats(1, true), stats(2, true)]);
        assert_eq!(h.len(), 2);
        assert_eq!(h.loss, vec![1.0, 0.5]);
        assert_eq!(h.val_accuracy, vec![0.6, 0.6]);
        assert!(h.has_validation());
    }

    #[test]
    fn validation_series_empty_without_val_set() {
        let h = History::from_stats(&[stats(1, false)]);
        assert!(!h.has_validation());
        assert!(h.val_loss.is_empty());
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let h = History::from_stats(&[stats(1, true)]);
        h.save_json(&path).unwrap();
        assert_eq!(History::load_json(&path).unwrap(), h);
    }
}
