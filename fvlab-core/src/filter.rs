//! TradeFilter — probability gate over simulated trades.
//!
//! Training happens elsewhere; this module only scores. A trained model is
//! anything implementing `ProbabilityModel`. The filter refuses to score a
//! trade whose feature names differ from what the model declares — that
//! trade is skipped and logged, never silently reordered.

use crate::domain::{FeatureVector, FilteredTrade, Trade};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the scoring pass.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("feature mismatch: model expects {expected:?}, trade carries {actual:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },
    #[error("model has {weights} weights for {features} feature names")]
    WeightShape { weights: usize, features: usize },
}

/// An externally trained classifier: feature names in, probability out.
pub trait ProbabilityModel {
    /// The exact feature names (and order) this model was trained on.
    fn feature_names(&self) -> &[String];

    /// Probability in [0,1] for a vector whose names match `feature_names`.
    fn predict(&self, features: &FeatureVector) -> f64;
}

/// Logistic scorer with fixed weights, loadable from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    names: Vec<String>,
    weights: Vec<f64>,
    intercept: f64,
}

impl LogisticModel {
    pub fn new(names: Vec<String>, weights: Vec<f64>, intercept: f64) -> Result<Self, FilterError> {
        if names.len() != weights.len() {
            return Err(FilterError::WeightShape {
                weights: weights.len(),
                features: names.len(),
            });
        }
        Ok(Self {
            names,
            weights,
            intercept,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl ProbabilityModel for LogisticModel {
    fn feature_names(&self) -> &[String] {
        &self.names
    }

    fn predict(&self, features: &FeatureVector) -> f64 {
        let z: f64 = self
            .weights
            .iter()
            .zip(features.values())
            .map(|(w, v)| w * v)
            .sum::<f64>()
            + self.intercept;
        1.0 / (1.0 + (-z).exp())
    }
}

/// Applies a probability model and threshold to simulated trades.
pub struct TradeFilter {
    model: Box<dyn ProbabilityModel + Send + Sync>,
    threshold: f64,
}

impl TradeFilter {
    pub fn new(model: Box<dyn ProbabilityModel + Send + Sync>, threshold: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&threshold),
            "threshold must be in [0,1]"
        );
        Self { model, threshold }
    }

    /// Score a single trade. Fails only on feature mismatch.
    pub fn score(&self, trade: &Trade) -> Result<FilteredTrade, FilterError> {
        if !trade.features.matches(self.model.feature_names()) {
            return Err(FilterError::FeatureMismatch {
                expected: self.model.feature_names().to_vec(),
                actual: trade.features.names().to_vec(),
            });
        }
        let probability = self.model.predict(&trade.features);
        Ok(FilteredTrade {
            trade: trade.clone(),
            probability,
            keep: probability >= self.threshold,
        })
    }

    /// Score a batch. A mismatched trade is fatal for that trade only:
    /// it is logged and skipped, the rest of the stream continues.
    pub fn apply(&self, trades: &[Trade]) -> Vec<FilteredTrade> {
        trades
            .iter()
            .filter_map(|trade| match self.score(trade) {
                Ok(filtered) => Some(filtered),
                Err(err) => {
                    tracing::warn!(
                        symbol = %trade.symbol,
                        entry_ts = %trade.entry_ts,
                        %err,
                        "skipping trade"
                    );
                    None
                }
            })
            .collect()
    }

    /// Order by descending probability. Exact probability ties are broken
    /// by a seeded jitter so ranking is reproducible for a given seed.
    pub fn rank(&self, filtered: &mut [FilteredTrade], seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let jitter: Vec<f64> = (0..filtered.len()).map(|_| rng.gen::<f64>()).collect();
        let mut order: Vec<usize> = (0..filtered.len()).collect();
        order.sort_by(|&a, &b| {
            filtered[b]
                .probability
                .partial_cmp(&filtered[a].probability)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(
                    jitter[a]
                        .partial_cmp(&jitter[b])
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
        });
        let reordered: Vec<FilteredTrade> = order.iter().map(|&i| filtered[i].clone()).collect();
        filtered.clone_from_slice(&reordered);
    }
}
