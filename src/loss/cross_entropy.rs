/// Categorical cross-entropy loss for use with a Softmax output layer.
pub struct CrossEntropyLoss;

/// Probabilities are clipped to [EPS, 1 - EPS] before the log.
const EPS: f64 = 1e-7;

impl CrossEntropyLoss {
    /// Computes the scalar cross-entropy loss:
    ///   L = -sum(expected[i] * log(clip(predicted[i])))
    ///
    /// `predicted` — softmax probabilities, shape [n_classes]
    /// `expected`  — one-hot (or soft) target distribution, shape [n_classes]
    pub fn loss(predicted: &[f64], expected: &[f64]) -> f64 {
        predicted.iter().zip(expected.iter())
            .map(|(p, e)| -e * p.clamp(EPS, 1.0 - EPS).ln())
            .sum()
    }

    /// Gradient of the combined Softmax + cross-entropy w.r.t. the pre-softmax
    /// logits:
    ///   ∂L/∂z_i = predicted[i] - expected[i]
    ///
    /// The Softmax layer's own derivative step is identity so the combined
    /// gradient is not double-applied.
    pub fn derivative(predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        predicted.iter().zip(expected.iter())
            .map(|(p, e)| p - e)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confident_correct_prediction_has_low_loss() {
        let good = CrossEntropyLoss::loss(&[0.98, 0.01, 0.01], &[1.0, 0.0, 0.0]);
        let bad = CrossEntropyLoss::loss(&[0.01, 0.98, 0.01], &[1.0, 0.0, 0.0]);
        assert!((good - (-(0.98f64).ln())).abs() < 1e-12);
        assert!(bad > good);
    }

    #[test]
    fn zero_probability_is_clipped() {
        let l = CrossEntropyLoss::loss(&[0.0, 1.0], &[1.0, 0.0]);
        assert!(l.is_finite());
        assert!((l - (-(1e-7f64).ln())).abs() < 1e-9);
    }

    #[test]
    fn derivative_is_difference() {
        assert_eq!(CrossEntropyLoss::derivative(&[0.25, 0.75], &[0.0, 1.0]), vec![0.25, -0.25]);
    }
}
