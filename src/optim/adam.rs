//! Adam optimizer.
//!
//! Keeps exponential moving averages of the gradients (first moment) and of
//! the squared gradients (second moment), one pair per parameter buffer.

use crate::optim::Optimizer;

/// Adam with bias correction.
///
/// ```text
/// m = beta1 * m + (1 - beta1) * g
/// v = beta2 * v + (1 - beta2) * g^2
/// m_hat = m / (1 - beta1^t)
/// v_hat = v / (1 - beta2^t)
/// w = w - learning_rate * m_hat / (sqrt(v_hat) + epsilon)
/// ```
#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    m: Vec<Vec<f64>>,
    v: Vec<Vec<f64>>,
    t: u64,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Adam {
        Adam::with_params(learning_rate, 0.9, 0.999, 1e-7)
    }

    pub fn with_params(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Adam {
        Adam { learning_rate, beta1, beta2, epsilon, m: Vec::new(), v: Vec::new(), t: 0 }
    }

    pub fn timestep(&self) -> u64 {
        self.t
    }
}

impl Optimizer for Adam {
    fn begin_step(&mut self) {
        self.t += 1;
    }

    fn update(&mut self, slot: usize, values: &mut [f64], grads: &[f64]) {
        if self.m.len() <= slot {
            self.m.resize_with(slot + 1, Vec::new);
            self.v.resize_with(slot + 1, Vec::new);
        }
        if self.m[slot].len() != values.len() {
            self.m[slot] = vec![0.0; values.len()];
            self.v[slot] = vec![0.0; values.len()];
        }

        let t = self.t.max(1) as i32;
        let bias_correction1 = 1.0 - self.beta1.powi(t);
        let bias_correction2 = 1.0 - self.beta2.powi(t);
        let m = &mut self.m[slot];
        let v = &mut self.v[slot];

        for i in 0..values.len() {
            let g = grads[i];
            m[i] = self.beta1 * m[i] + (1.0 - self.beta1) * g;
            v[i] = self.beta2 * v[i] + (1.0 - self.beta2) * g * g;
            let m_hat = m[i] / bias_correction1;
            let v_hat = v[i] / bias_correction2;
            values[i] -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_moves_by_learning_rate() {
        // With bias correction, m_hat = g and v_hat = g² on step one, so each
        // weight moves by ~lr in the direction opposite to its gradient.
        let mut adam = Adam::new(0.001);
        let mut w = vec![1.0, 1.0];
        adam.begin_step();
        adam.update(0, &mut w, &[0.5, -3.0]);
        assert!((w[0] - 0.999).abs() < 1e-6);
        assert!((w[1] - 1.001).abs() < 1e-6);
        assert_eq!(adam.timestep(), 1);
    }

    #[test]
    fn minimizes_a_quadratic() {
        let mut adam = Adam::new(0.1);
        let mut w = vec![5.0];
        for _ in 0..1_000 {
            let g = [2.0 * w[0]];
            adam.begin_step();
            adam.update(0, &mut w, &g);
        }
        assert!(w[0].abs() < 0.1, "w = {}", w[0]);
    }

    #[test]
    fn slots_keep_separate_moments() {
        let mut adam = Adam::new(0.01);
        let mut a = vec![0.0; 3];
        let mut b = vec![0.0; 5];
        adam.begin_step();
        adam.update(0, &mut a, &[1.0; 3]);
        adam.update(1, &mut b, &[1.0; 5]);
        assert_eq!(adam.m[0].len(), 3);
        assert_eq!(adam.m[1].len(), 5);
    }
}
