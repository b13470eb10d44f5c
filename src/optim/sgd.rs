use crate::optim::Optimizer;

/// Mini-batch SGD with optional classical momentum.
pub struct Sgd {
    pub learning_rate: f64,
    pub momentum: f64,
    velocity: Vec<Vec<f64>>,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd::with_momentum(learning_rate, 0.0)
    }

    pub fn with_momentum(learning_rate: f64, momentum: f64) -> Sgd {
        Sgd { learning_rate, momentum, velocity: Vec::new() }
    }
}

impl Optimizer for Sgd {
    fn update(&mut self, slot: usize, values: &mut [f64], grads: &[f64]) {
        if self.momentum == 0.0 {
            for (w, g) in values.iter_mut().zip(grads) {
                *w -= self.learning_rate * g;
            }
            return;
        }
        if self.velocity.len() <= slot {
            self.velocity.resize_with(slot + 1, Vec::new);
        }
        let v = &mut self.velocity[slot];
        if v.len() != values.len() {
            *v = vec![0.0; values.len()];
        }
        for ((w, g), vi) in values.iter_mut().zip(grads).zip(v.iter_mut()) {
            *vi = self.momentum * *vi - self.learning_rate * g;
            *w += *vi;
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
    fn plain_step() {
        let mut sgd = Sgd::new(0.1);
        let mut w = vec![1.0, -1.0];
        sgd.update(0, &mut w, &[1.0, -2.0]);
        assert!((w[0] - 0.9).abs() < 1e-12);
        assert!((w[1] + 0.8).abs() < 1e-12);
    }

    #[test]
    fn momentum_accelerates() {
        let mut sgd = Sgd::with_momentum(0.1, 0.9);
        let mut w = vec![0.0];
        sgd.update(0, &mut w, &[1.0]);
        sgd.update(0, &mut w, &[1.0]);
        // -0.1, then -0.09 - 0.1
        assert!((w[0] + 0.29).abs() < 1e-12);
    }
}
