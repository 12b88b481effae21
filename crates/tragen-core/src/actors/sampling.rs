//! Random sampling helpers shared by the actors.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Golden-ratio increment used to spread actor streams over the seed space.
const STREAM_STEP: u64 = 0x9E37_79B9_7F4A_7C15;

/// Draw from N(mean, stddev) with the Box-Muller transform.
pub fn normal(rng: &mut StdRng, mean: f64, stddev: f64) -> f64 {
    if stddev <= 0.0 {
        return mean;
    }
    // 1 - u keeps u1 in (0, 1] so ln() stays finite.
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + stddev * z
}

/// Sleep interval drawn from N(mean, stddev_ms), clamped at zero.
pub fn jittered_period(rng: &mut StdRng, mean: Duration, stddev_ms: f64) -> Duration {
    let millis = normal(rng, mean.as_secs_f64() * 1000.0, stddev_ms);
    Duration::from_secs_f64(millis.max(0.0) / 1000.0)
}

/// Hands out one independent RNG per actor.
///
/// With a seed, the n-th RNG is always the same, so a seeded context
/// replays the same random choices actor by actor.
#[derive(Debug, Clone)]
pub struct RngSource {
    seed: Option<u64>,
    issued: u64,
}

impl RngSource {
    pub fn new(seed: Option<u64>) -> Self {
        Self { seed, issued: 0 }
    }

    pub fn next_rng(&mut self) -> StdRng {
        self.issued += 1;
        match self.seed {
            Some(seed) => {
                StdRng::seed_from_u64(seed.wrapping_add(self.issued.wrapping_mul(STREAM_STEP)))
            }
            None => StdRng::from_os_rng(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_samples_center_on_mean() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| normal(&mut rng, 50.0, 0.15)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        assert!((mean - 50.0).abs() < 0.01, "mean {mean}");
        assert!((var.sqrt() - 0.15).abs() < 0.01, "stddev {}", var.sqrt());
    }

    #[test]
    fn zero_deviation_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(normal(&mut rng, 3.5, 0.0), 3.5);
    }

    #[test]
    fn negative_periods_clamp_to_zero() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            // Mean 0 with a wide deviation goes negative about half the time.
            let period = jittered_period(&mut rng, Duration::ZERO, 1000.0);
            assert!(period >= Duration::ZERO);
        }
    }

    #[test]
    fn seeded_sources_replay() {
        let mut a = RngSource::new(Some(42));
        let mut b = RngSource::new(Some(42));
        let x: u64 = a.next_rng().random();
        let y: u64 = b.next_rng().random();
        assert_eq!(x, y);
        let z: u64 = a.next_rng().random();
        assert_ne!(x, z);
    }
}
