// Core engine exports
pub mod compatibility;
pub mod distance;
pub mod error;
pub mod matcher;
pub mod model;
pub mod scoring;

pub use compatibility::{
    compatibility_score, compatible_donors_for, compatible_recipients_for, is_compatible,
};
pub use distance::{bounding_box, distance_km, is_within_bounding_box, BoundingBox};
pub use error::MatchError;
pub use matcher::Matcher;
pub use model::{HeuristicScorer, MatchScorer, NeuralScorer, TrainingConfig};
