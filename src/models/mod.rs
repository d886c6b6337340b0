// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    BloodType, CandidateDonor, FeatureVector, GeoPoint, MatchRequest, MatchResult,
    MatchingStatistics, ScoringWeights, Urgency,
};
pub use requests::{CompatibilityQuery, FindMatchesRequest, RecommendationsQuery};
pub use responses::{
    CompatibilityResponse, ErrorResponse, FindMatchesResponse, HealthResponse,
    RecommendationsResponse, StatisticsResponse,
};
