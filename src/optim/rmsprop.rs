use crate::optim::Optimizer;

/// RMSprop: divides each step by a running RMS of recent gradients.
pub struct RmsProp {
    pub learning_rate: f64,
    pub rho: f64,
    pub epsilon: f64,
    mean_square: Vec<Vec<f64>>,
}

impl RmsProp {
    pub fn new(learning_rate: f64) -> RmsProp {
        RmsProp { learning_rate, rho: 0.9, epsilon: 1e-7, mean_square: Vec::new() }
    }
}

impl Optimizer for RmsProp {
    fn update(&mut self, slot: usize, values: &mut [f64], grads: &[f64]) {
        if self.mean_square.len() <= slot {
            self.mean_square.resize_with(slot + 1, Vec::new);
        }
        let ms = &mut self.mean_square[slot];
        if ms.len() != values.len() {
            *ms = vec![0.0; values.len()];
        }
        for ((w, g), s) in values.iter_mut().zip(grads).zip(ms.iter_mut()) {
            *s = self.rho * *s + (1.0 - self.rho) * g * g;
            *w -= self.learning_rate * g / (s.sqrt() + self.epsilon);
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
    fn first_step_is_scaled_by_rms() {
        let mut opt = RmsProp::new(0.01);
        let mut w = vec![0.0];
        opt.update(0, &mut w, &[2.0]);
        // s = 0.1 * 4 = 0.4; step = 0.01 * 2 / sqrt(0.4)
        let expected = -0.01 * 2.0 / (0.4f64.sqrt() + 1e-7);
        assert!((w[0] - expected).abs() < 1e-12);
    }
}
