use thiserror::Error;

/// Errors produced at the matching engine boundary.
///
/// Scoring-level pure functions are total over well-formed inputs and never
/// return errors; only malformed boundary input, model initialization and
/// bounded external calls can fail.
#[derive(Debug, Error)]
pub enum MatchError {
    /// The supplied blood type is not one of the eight ABO/Rh types.
    #[error("invalid blood type: '{0}'")]
    InvalidBloodType(String),

    /// `limit` must be at least 1.
    #[error("invalid result limit: {0} (must be >= 1)")]
    InvalidLimit(usize),

    /// The ranking model failed to initialize or train. Recoverable: the
    /// orchestrator falls back to the weighted-sum heuristic.
    #[error("ranking model unavailable: {0}")]
    ModelUnavailable(String),

    /// A bounded external call (candidate fetch, inference) exceeded its
    /// time budget. Retry policy is the caller's responsibility.
    #[error("match {stage} timed out after {elapsed_ms}ms")]
    Timeout {
        stage: &'static str,
        elapsed_ms: u64,
    },
}
