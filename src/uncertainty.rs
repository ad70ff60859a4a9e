// SPDX-FileCopyrightText: 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto
// SPDX-License-Identifier: MIT
//
// ULCA — Unified Life-Cycle Assessment Core
// Uncertainty distributions for exchange amounts and parameters

use rand::Rng;
use serde::{Deserialize, Serialize};

/// An uncertainty distribution attached to an exchange amount, a
/// characterization factor, or a parameter value.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Uncertainty {
    /// Geometric mean and geometric standard deviation (> 1).
    LogNormal { gmean: f64, gsd: f64 },
    Normal { mean: f64, sd: f64 },
    Triangle { min: f64, mode: f64, max: f64 },
    Uniform { min: f64, max: f64 },
}

impl Uncertainty {
    /// Draw a value from the distribution. The generator travels as an
    /// explicit parameter of the calculation context; there is no global
    /// RNG state.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        match *self {
            Uncertainty::LogNormal { gmean, gsd } => {
                if gmean <= 0.0 || gsd <= 0.0 {
                    return gmean;
                }
                let z = standard_normal(rng);
                (gmean.ln() + gsd.ln() * z).exp()
            }
            Uncertainty::Normal { mean, sd } => mean + sd * standard_normal(rng),
            Uncertainty::Triangle { min, mode, max } => {
                if max <= min {
                    return min;
                }
                // inverse CDF of the triangular distribution
                let u: f64 = rng.gen();
                let fc = (mode - min) / (max - min);
                if u < fc {
                    min + (u * (max - min) * (mode - min)).sqrt()
                } else {
                    max - ((1.0 - u) * (max - min) * (max - mode)).sqrt()
                }
            }
            Uncertainty::Uniform { min, max } => {
                let u: f64 = rng.gen();
                min + u * (max - min)
            }
        }
    }
}

/// Standard normal draw via Box-Muller.
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let mut u1: f64 = rng.gen();
    if u1 <= f64::MIN_POSITIVE {
        u1 = f64::MIN_POSITIVE;
    }
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_uniform_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let u = Uncertainty::Uniform { min: 2.0, max: 5.0 };
        for _ in 0..1000 {
            let v = u.sample(&mut rng);
            assert!((2.0..=5.0).contains(&v), "out of bounds: {}", v);
        }
    }

    #[test]
    fn test_triangle_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let t = Uncertainty::Triangle {
            min: 1.0,
            mode: 2.0,
            max: 4.0,
        };
        for _ in 0..1000 {
            let v = t.sample(&mut rng);
            assert!((1.0..=4.0).contains(&v), "out of bounds: {}", v);
        }
    }

    #[test]
    fn test_normal_mean_converges() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = Uncertainty::Normal { mean: 10.0, sd: 2.0 };
        let sum: f64 = (0..20_000).map(|_| n.sample(&mut rng)).sum();
        let mean = sum / 20_000.0;
        assert!((mean - 10.0).abs() < 0.1, "mean drifted: {}", mean);
    }

    #[test]
    fn test_log_normal_is_positive() {
        let mut rng = StdRng::seed_from_u64(11);
        let l = Uncertainty::LogNormal {
            gmean: 3.0,
            gsd: 1.5,
        };
        for _ in 0..1000 {
            assert!(l.sample(&mut rng) > 0.0);
        }
    }

    #[test]
    fn test_seeded_sampling_is_deterministic() {
        let u = Uncertainty::Uniform { min: 0.0, max: 1.0 };
        let a: Vec<f64> = {
            let mut rng = StdRng::seed_from_u64(99);
            (0..16).map(|_| u.sample(&mut rng)).collect()
        };
        let b: Vec<f64> = {
            let mut rng = StdRng::seed_from_u64(99);
            (0..16).map(|_| u.sample(&mut rng)).collect()
        };
        assert_eq!(a, b);
    }
}
