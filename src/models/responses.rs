use serde::{Deserialize, Serialize};

use crate::models::domain::{MatchResult, MatchingStatistics};

/// Response for the find-matches endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindMatchesResponse {
    pub matches: Vec<MatchResult>,
    #[serde(rename = "totalCandidates")]
    pub total_candidates: usize,
    /// Which scorer produced the ranking ("neural" or "heuristic").
    pub scorer: String,
}

/// Response for recipient-side recommendations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Id of the open request the recommendations were computed for, if
    /// the user has one.
    #[serde(rename = "requestId")]
    pub request_id: Option<String>,
    pub matches: Vec<MatchResult>,
}

/// Response for the compatibility badge endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityResponse {
    pub recipient: String,
    pub donor: String,
    pub compatible: bool,
    pub score: f64,
}

/// Response for the statistics endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsResponse {
    #[serde(flatten)]
    pub statistics: MatchingStatistics,
    /// Total recorded runs the aggregates are based on. Zero means the
    /// numbers are placeholder defaults, not observed history.
    #[serde(rename = "recordedRuns")]
    pub recorded_runs: i64,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub scorer: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
