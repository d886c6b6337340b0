use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use crate::core::error::MatchError;
use crate::models::{FeatureVector, ScoringWeights};

const INPUT: usize = FeatureVector::LEN;
const HIDDEN1: usize = 16;
const HIDDEN2: usize = 8;

/// A scorer combines the five normalized feature scores into a single
/// ranking score in [0, 1].
///
/// Implementations must be deterministic at inference time and free of
/// interior mutation, so a single trained instance can be shared read-only
/// across concurrent match calls.
pub trait MatchScorer: Send + Sync {
    fn score(&self, features: &FeatureVector) -> f64;

    /// Short identifier for logs.
    fn name(&self) -> &'static str;
}

/// Deterministic weighted-sum scorer.
///
/// Serves two roles: the fallback when neural training fails, and the
/// labeling heuristic for the synthetic training set (the network is fit to
/// approximate exactly this combination; see DESIGN.md).
#[derive(Debug, Clone, Copy)]
pub struct HeuristicScorer {
    weights: ScoringWeights,
}

impl HeuristicScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    fn weighted_sum(&self, features: &FeatureVector) -> f64 {
        let raw = self.weights.compatibility * features.compatibility
            + self.weights.distance * features.distance
            + self.weights.urgency * features.urgency
            + self.weights.availability * features.availability
            + self.weights.history * features.history;

        let total = self.weights.sum();
        if total > 0.0 {
            (raw / total).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl MatchScorer for HeuristicScorer {
    fn score(&self, features: &FeatureVector) -> f64 {
        self.weighted_sum(features)
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

/// Training hyperparameters for the neural scorer.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_samples")]
    pub samples: usize,
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Labels are 1.0 when the weighted-sum heuristic exceeds this value.
    #[serde(default = "default_label_threshold")]
    pub label_threshold: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_samples() -> usize {
    2000
}
fn default_epochs() -> usize {
    30
}
fn default_learning_rate() -> f64 {
    0.1
}
fn default_label_threshold() -> f64 {
    0.5
}
fn default_seed() -> u64 {
    42
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            samples: default_samples(),
            epochs: default_epochs(),
            learning_rate: default_learning_rate(),
            label_threshold: default_label_threshold(),
            seed: default_seed(),
        }
    }
}

/// Feed-forward ranking model: 5 → 16 (ReLU) → 8 (ReLU) → 1 (sigmoid).
///
/// Trained once at startup on synthetic samples labeled by the weighted-sum
/// heuristic, then used purely for inference. Weights are immutable after
/// training. Known limitation carried from the platform's original design:
/// until real match-outcome data exists, the network only approximates the
/// hand-written heuristic it was fit to.
#[derive(Debug)]
pub struct NeuralScorer {
    w1: [[f64; INPUT]; HIDDEN1],
    b1: [f64; HIDDEN1],
    w2: [[f64; HIDDEN1]; HIDDEN2],
    b2: [f64; HIDDEN2],
    w3: [f64; HIDDEN2],
    b3: f64,
}

impl NeuralScorer {
    /// Train a fresh model. Deterministic for a given config (seeded RNG).
    ///
    /// # Errors
    ///
    /// Returns `MatchError::ModelUnavailable` for degenerate hyperparameters
    /// or if training diverges (non-finite loss or weights). Callers are
    /// expected to fall back to `HeuristicScorer`.
    pub fn train(config: &TrainingConfig, weights: ScoringWeights) -> Result<Self, MatchError> {
        if config.samples == 0 || config.epochs == 0 {
            return Err(MatchError::ModelUnavailable(
                "training requires at least one sample and one epoch".to_string(),
            ));
        }
        if !(config.learning_rate > 0.0 && config.learning_rate.is_finite()) {
            return Err(MatchError::ModelUnavailable(format!(
                "invalid learning rate: {}",
                config.learning_rate
            )));
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let labeler = HeuristicScorer::new(weights);

        // Synthetic training set: uniform feature vectors, labeled by the
        // heuristic threshold.
        let samples: Vec<([f64; INPUT], f64)> = (0..config.samples)
            .map(|_| {
                let x: [f64; INPUT] = std::array::from_fn(|_| rng.gen_range(0.0..1.0));
                let features = FeatureVector {
                    compatibility: x[0],
                    distance: x[1],
                    urgency: x[2],
                    availability: x[3],
                    history: x[4],
                };
                let label = if labeler.score(&features) > config.label_threshold {
                    1.0
                } else {
                    0.0
                };
                (x, label)
            })
            .collect();

        let mut model = Self::init(&mut rng);

        let lr = config.learning_rate;
        let mut last_epoch_loss = f64::NAN;

        for epoch in 0..config.epochs {
            let mut loss_sum = 0.0;

            for (x, label) in &samples {
                let (z1, h1, z2, h2, y) = model.forward(x);

                // Binary cross-entropy, clamped away from log(0).
                let y_safe = y.clamp(1e-7, 1.0 - 1e-7);
                loss_sum -= label * y_safe.ln() + (1.0 - label) * (1.0 - y_safe).ln();

                // Backprop; sigmoid + BCE gives dL/dz3 = y - label.
                let dz3 = y - label;

                let mut dz2 = [0.0; HIDDEN2];
                for j in 0..HIDDEN2 {
                    if z2[j] > 0.0 {
                        dz2[j] = dz3 * model.w3[j];
                    }
                }

                let mut dz1 = [0.0; HIDDEN1];
                for i in 0..HIDDEN1 {
                    if z1[i] > 0.0 {
                        let mut acc = 0.0;
                        for j in 0..HIDDEN2 {
                            acc += dz2[j] * model.w2[j][i];
                        }
                        dz1[i] = acc;
                    }
                }

                // Per-sample SGD update.
                for j in 0..HIDDEN2 {
                    model.w3[j] -= lr * dz3 * h2[j];
                }
                model.b3 -= lr * dz3;

                for j in 0..HIDDEN2 {
                    for i in 0..HIDDEN1 {
                        model.w2[j][i] -= lr * dz2[j] * h1[i];
                    }
                    model.b2[j] -= lr * dz2[j];
                }

                for i in 0..HIDDEN1 {
                    for k in 0..INPUT {
                        model.w1[i][k] -= lr * dz1[i] * x[k];
                    }
                    model.b1[i] -= lr * dz1[i];
                }
            }

            last_epoch_loss = loss_sum / samples.len() as f64;
            if !last_epoch_loss.is_finite() {
                return Err(MatchError::ModelUnavailable(format!(
                    "training diverged at epoch {} (loss not finite)",
                    epoch
                )));
            }
        }

        if !model.weights_finite() {
            return Err(MatchError::ModelUnavailable(
                "training produced non-finite weights".to_string(),
            ));
        }

        tracing::info!(
            "Ranking model trained: {} samples, {} epochs, final loss {:.4}",
            config.samples,
            config.epochs,
            last_epoch_loss
        );

        Ok(model)
    }

    fn init(rng: &mut StdRng) -> Self {
        // Xavier-style uniform init per layer.
        let r1 = (6.0 / (INPUT + HIDDEN1) as f64).sqrt();
        let r2 = (6.0 / (HIDDEN1 + HIDDEN2) as f64).sqrt();
        let r3 = (6.0 / (HIDDEN2 + 1) as f64).sqrt();

        Self {
            w1: std::array::from_fn(|_| std::array::from_fn(|_| rng.gen_range(-r1..r1))),
            b1: [0.0; HIDDEN1],
            w2: std::array::from_fn(|_| std::array::from_fn(|_| rng.gen_range(-r2..r2))),
            b2: [0.0; HIDDEN2],
            w3: std::array::from_fn(|_| rng.gen_range(-r3..r3)),
            b3: 0.0,
        }
    }

    #[allow(clippy::type_complexity)]
    fn forward(
        &self,
        x: &[f64; INPUT],
    ) -> ([f64; HIDDEN1], [f64; HIDDEN1], [f64; HIDDEN2], [f64; HIDDEN2], f64) {
        let mut z1 = [0.0; HIDDEN1];
        let mut h1 = [0.0; HIDDEN1];
        for i in 0..HIDDEN1 {
            let mut acc = self.b1[i];
            for k in 0..INPUT {
                acc += self.w1[i][k] * x[k];
            }
            z1[i] = acc;
            h1[i] = acc.max(0.0);
        }

        let mut z2 = [0.0; HIDDEN2];
        let mut h2 = [0.0; HIDDEN2];
        for j in 0..HIDDEN2 {
            let mut acc = self.b2[j];
            for i in 0..HIDDEN1 {
                acc += self.w2[j][i] * h1[i];
            }
            z2[j] = acc;
            h2[j] = acc.max(0.0);
        }

        let mut z3 = self.b3;
        for j in 0..HIDDEN2 {
            z3 += self.w3[j] * h2[j];
        }

        (z1, h1, z2, h2, sigmoid(z3))
    }

    fn weights_finite(&self) -> bool {
        self.w1.iter().flatten().all(|w| w.is_finite())
            && self.b1.iter().all(|w| w.is_finite())
            && self.w2.iter().flatten().all(|w| w.is_finite())
            && self.b2.iter().all(|w| w.is_finite())
            && self.w3.iter().all(|w| w.is_finite())
            && self.b3.is_finite()
    }
}

impl MatchScorer for NeuralScorer {
    fn score(&self, features: &FeatureVector) -> f64 {
        let (_, _, _, _, y) = self.forward(&features.as_array());
        y.clamp(0.0, 1.0)
    }

    fn name(&self) -> &'static str {
        "neural"
    }
}

#[inline]
fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(values: [f64; 5]) -> FeatureVector {
        FeatureVector {
            compatibility: values[0],
            distance: values[1],
            urgency: values[2],
            availability: values[3],
            history: values[4],
        }
    }

    #[test]
    fn test_heuristic_scorer_range() {
        let scorer = HeuristicScorer::new(ScoringWeights::default());
        assert_eq!(scorer.score(&features([0.0; 5])), 0.0);
        assert!((scorer.score(&features([1.0; 5])) - 1.0).abs() < 1e-9);

        let mid = scorer.score(&features([1.0, 0.5, 0.5, 0.5, 0.5]));
        assert!(mid > 0.0 && mid < 1.0);
    }

    #[test]
    fn test_training_is_deterministic() {
        let config = TrainingConfig {
            samples: 200,
            epochs: 5,
            ..TrainingConfig::default()
        };
        let a = NeuralScorer::train(&config, ScoringWeights::default()).unwrap();
        let b = NeuralScorer::train(&config, ScoringWeights::default()).unwrap();

        let probe = features([0.8, 0.3, 0.9, 0.6, 0.2]);
        assert_eq!(a.score(&probe), b.score(&probe));
    }

    #[test]
    fn test_trained_model_separates_extremes() {
        let model =
            NeuralScorer::train(&TrainingConfig::default(), ScoringWeights::default()).unwrap();

        let strong = model.score(&features([1.0, 0.9, 1.0, 1.0, 0.9]));
        let weak = model.score(&features([0.0, 0.1, 0.1, 0.0, 0.1]));

        assert!(
            strong > weak,
            "strong candidate ({}) should outscore weak ({})",
            strong,
            weak
        );
        assert!((0.0..=1.0).contains(&strong));
        assert!((0.0..=1.0).contains(&weak));
    }

    #[test]
    fn test_inference_is_pure() {
        let model =
            NeuralScorer::train(&TrainingConfig::default(), ScoringWeights::default()).unwrap();
        let probe = features([0.7, 0.2, 0.5, 1.0, 0.4]);

        let first = model.score(&probe);
        for _ in 0..10 {
            assert_eq!(model.score(&probe), first);
        }
    }

    #[test]
    fn test_degenerate_config_rejected() {
        let mut config = TrainingConfig::default();
        config.epochs = 0;
        let err = NeuralScorer::train(&config, ScoringWeights::default()).unwrap_err();
        assert!(matches!(err, MatchError::ModelUnavailable(_)));

        let mut config = TrainingConfig::default();
        config.learning_rate = f64::NAN;
        assert!(NeuralScorer::train(&config, ScoringWeights::default()).is_err());
    }
}
