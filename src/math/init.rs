use rand::Rng;
use std::f64::consts::PI;

/// Samples a single value from N(0, 1) using the Box-Muller transform.
pub fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // Both uniforms live in (0, 1] to avoid log(0).
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = 1.0 - rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Glorot (Xavier) uniform initialization: U(-limit, limit) with
/// `limit = sqrt(6 / (fan_in + fan_out))`.
///
/// This is the default kernel initializer for both dense and convolutional
/// layers. For a conv kernel, `fan_in = k·k·in_channels` and
/// `fan_out = k·k·filters`.
pub fn glorot_uniform<R: Rng + ?Sized>(fan_in: usize, fan_out: usize, n: usize, rng: &mut R) -> Vec<f64> {
    let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
    (0..n).map(|_| rng.gen_range(-limit..limit)).collect()
}

/// He initialization: N(0, sqrt(2 / fan_in)).
///
/// The variance 2/fan_in accounts for ReLU zeroing half of its inputs on
/// average.
pub fn he_normal<R: Rng + ?Sized>(fan_in: usize, n: usize, rng: &mut R) -> Vec<f64> {
    let std_dev = (2.0 / fan_in as f64).sqrt();
    (0..n).map(|_| sample_standard_normal(rng) * std_dev).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn glorot_respects_limit() {
        let mut rng = StdRng::seed_from_u64(7);
        let limit = (6.0f64 / (9.0 + 288.0)).sqrt();
        let w = glorot_uniform(9, 288, 2_000, &mut rng);
        assert_eq!(w.len(), 2_000);
        assert!(w.iter().all(|x| x.abs() <= limit));
    }

    #[test]
    fn he_normal_has_expected_spread() {
        let mut rng = StdRng::seed_from_u64(11);
        let w = he_normal(50, 20_000, &mut rng);
        let mean = w.iter().sum::<f64>() / w.len() as f64;
        let var = w.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / w.len() as f64;
        assert!(mean.abs() < 0.01);
        assert!((var - 2.0 / 50.0).abs() < 0.005, "variance {}", var);
    }

    #[test]
    fn same_seed_same_weights() {
        let a = glorot_uniform(4, 4, 16, &mut StdRng::seed_from_u64(3));
        let b = glorot_uniform(4, 4, 16, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }
}
