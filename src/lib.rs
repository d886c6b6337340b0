//! BloodLink Match - donor matching service for the BloodLink platform
//!
//! This library implements the donor-recipient matching engine: the ABO/Rh
//! compatibility table, the per-candidate feature scorers, a small ranking
//! model with a deterministic fallback, and the orchestrator that ties them
//! together.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{
    compatibility_score, compatible_donors_for, compatible_recipients_for, is_compatible,
    MatchError, Matcher, MatchScorer, TrainingConfig,
};
pub use models::{
    BloodType, CandidateDonor, FeatureVector, GeoPoint, MatchRequest, MatchResult, ScoringWeights,
    Urgency,
};
