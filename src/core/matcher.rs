use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::error::MatchError;
use crate::core::model::{HeuristicScorer, MatchScorer, NeuralScorer, TrainingConfig};
use crate::core::scoring::compute_features;
use crate::models::{CandidateDonor, MatchRequest, MatchResult, ScoringWeights};

/// Matching orchestrator.
///
/// Stateless with respect to external systems: callers supply the request
/// and the candidate pool, the matcher computes feature scores, runs the
/// ranking model and returns a sorted, truncated result list. The only
/// long-lived state is the trained scorer, which is immutable after
/// construction and shared read-only across concurrent calls.
#[derive(Clone)]
pub struct Matcher {
    scorer: Arc<dyn MatchScorer>,
    weights: ScoringWeights,
    search_radius_km: f64,
}

impl Matcher {
    /// Build a matcher with a freshly trained neural scorer.
    ///
    /// If training fails the matcher falls back to the deterministic
    /// weighted-sum heuristic instead of refusing to start.
    pub fn new(weights: ScoringWeights, search_radius_km: f64, training: &TrainingConfig) -> Self {
        let scorer: Arc<dyn MatchScorer> = match NeuralScorer::train(training, weights) {
            Ok(model) => Arc::new(model),
            Err(e) => {
                tracing::warn!(
                    "Ranking model unavailable ({}), falling back to weighted-sum heuristic",
                    e
                );
                Arc::new(HeuristicScorer::new(weights))
            }
        };

        Self {
            scorer,
            weights,
            search_radius_km,
        }
    }

    /// Injection point for tests and for swapping in a real trained model
    /// later without touching the orchestration.
    pub fn with_scorer(
        scorer: Arc<dyn MatchScorer>,
        weights: ScoringWeights,
        search_radius_km: f64,
    ) -> Self {
        Self {
            scorer,
            weights,
            search_radius_km,
        }
    }

    pub fn with_default_weights(search_radius_km: f64) -> Self {
        Self::new(
            ScoringWeights::default(),
            search_radius_km,
            &TrainingConfig::default(),
        )
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    /// Rank candidate donors for a request.
    ///
    /// The candidate pool may be empty (returns an empty list, not an
    /// error); `limit` must be at least 1. Results are sorted descending by
    /// score with ties broken by donor id, so identical inputs always
    /// produce identical output.
    pub fn find_matches(
        &self,
        request: &MatchRequest,
        candidates: Vec<CandidateDonor>,
        limit: usize,
    ) -> Result<Vec<MatchResult>, MatchError> {
        self.find_matches_at(request, candidates, Utc::now(), limit)
    }

    /// Same pipeline with an explicit clock. The timestamp is applied to
    /// every candidate in the run, keeping a single run internally
    /// consistent and reproducible in tests.
    pub fn find_matches_at(
        &self,
        request: &MatchRequest,
        candidates: Vec<CandidateDonor>,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<MatchResult>, MatchError> {
        if limit == 0 {
            return Err(MatchError::InvalidLimit(limit));
        }
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let total = candidates.len();

        let mut results: Vec<MatchResult> = candidates
            .into_iter()
            .map(|donor| {
                let (features, km) =
                    compute_features(request, &donor, now, self.search_radius_km);

                // The binary compatibility feature gates the overall score:
                // an incompatible donor scores exactly 0.0 no matter what
                // the model predicts, so it can never outrank a compatible
                // one.
                let model_score = self.scorer.score(&features).clamp(0.0, 1.0);
                let score = model_score * features.compatibility;

                MatchResult {
                    donor_id: donor.id,
                    score,
                    compatibility: features.compatibility,
                    distance_score: features.distance,
                    urgency_score: features.urgency,
                    availability_score: features.availability,
                    history_score: features.history,
                    distance_km: km,
                }
            })
            .collect();

        // Descending by score, ascending donor id as the deterministic
        // tie-break.
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.donor_id.cmp(&b.donor_id))
        });

        results.truncate(limit);

        tracing::debug!(
            "Ranked {} of {} candidates for {} request ({} scorer)",
            results.len(),
            total,
            request.blood_type,
            self.scorer.name()
        );

        Ok(results)
    }
}
