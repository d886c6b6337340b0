use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::MatchError;

/// The eight ABO/Rh blood types.
///
/// Wire form matches the clinical notation ("A+", "O-", ...). Parsing via
/// `FromStr` is the single validation point for blood type strings coming
/// in over the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BloodType {
    #[serde(rename = "A+")]
    APos,
    #[serde(rename = "A-")]
    ANeg,
    #[serde(rename = "B+")]
    BPos,
    #[serde(rename = "B-")]
    BNeg,
    #[serde(rename = "AB+")]
    AbPos,
    #[serde(rename = "AB-")]
    AbNeg,
    #[serde(rename = "O+")]
    OPos,
    #[serde(rename = "O-")]
    ONeg,
}

impl BloodType {
    /// All eight types, in matrix row/column order.
    pub const ALL: [BloodType; 8] = [
        BloodType::APos,
        BloodType::ANeg,
        BloodType::BPos,
        BloodType::BNeg,
        BloodType::AbPos,
        BloodType::AbNeg,
        BloodType::OPos,
        BloodType::ONeg,
    ];

    /// Stable index into the compatibility matrix.
    pub const fn index(self) -> usize {
        match self {
            BloodType::APos => 0,
            BloodType::ANeg => 1,
            BloodType::BPos => 2,
            BloodType::BNeg => 3,
            BloodType::AbPos => 4,
            BloodType::AbNeg => 5,
            BloodType::OPos => 6,
            BloodType::ONeg => 7,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            BloodType::APos => "A+",
            BloodType::ANeg => "A-",
            BloodType::BPos => "B+",
            BloodType::BNeg => "B-",
            BloodType::AbPos => "AB+",
            BloodType::AbNeg => "AB-",
            BloodType::OPos => "O+",
            BloodType::ONeg => "O-",
        }
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BloodType {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A+" => Ok(BloodType::APos),
            "A-" => Ok(BloodType::ANeg),
            "B+" => Ok(BloodType::BPos),
            "B-" => Ok(BloodType::BNeg),
            "AB+" => Ok(BloodType::AbPos),
            "AB-" => Ok(BloodType::AbNeg),
            "O+" => Ok(BloodType::OPos),
            "O-" => Ok(BloodType::ONeg),
            other => Err(MatchError::InvalidBloodType(other.to_string())),
        }
    }
}

/// Request urgency level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    /// Lenient parse for the API boundary: unknown strings fall back to
    /// `Medium` rather than rejecting the request.
    pub fn parse_lenient(s: &str) -> Urgency {
        match s.trim().to_lowercase().as_str() {
            "low" => Urgency::Low,
            "medium" => Urgency::Medium,
            "high" => Urgency::High,
            "critical" => Urgency::Critical,
            other => {
                tracing::debug!("Unknown urgency '{}', defaulting to medium", other);
                Urgency::Medium
            }
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
            Urgency::Critical => "critical",
        }
    }
}

/// Geographic coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// A recipient's open blood request — read-only input to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRequest {
    #[serde(rename = "bloodType")]
    pub blood_type: BloodType,
    pub location: GeoPoint,
    pub urgency: Urgency,
    /// Requested amount in units, when known.
    #[serde(default)]
    pub amount: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
}

impl MatchRequest {
    /// Build a request from boundary input. The blood type string is the
    /// only fallible field; urgency parses leniently.
    pub fn new(blood_type: &str, location: GeoPoint, urgency: &str) -> Result<Self, MatchError> {
        Ok(Self {
            blood_type: blood_type.parse()?,
            location,
            urgency: Urgency::parse_lenient(urgency),
            amount: None,
            description: None,
        })
    }

    pub fn with_amount(mut self, amount: u32) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Immutable donor snapshot supplied by the donor store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateDonor {
    pub id: String,
    #[serde(rename = "bloodType")]
    pub blood_type: BloodType,
    pub location: GeoPoint,
    #[serde(rename = "lastDonation", default)]
    pub last_donation: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(rename = "donationCount", default)]
    pub donation_count: u32,
}

/// Per-candidate feature scores, each in [0, 1]. Ephemeral — computed per
/// (request, donor) pair and discarded after scoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub compatibility: f64,
    pub distance: f64,
    pub urgency: f64,
    pub availability: f64,
    pub history: f64,
}

impl FeatureVector {
    pub const LEN: usize = 5;

    pub const fn as_array(&self) -> [f64; Self::LEN] {
        [
            self.compatibility,
            self.distance,
            self.urgency,
            self.availability,
            self.history,
        ]
    }
}

/// One ranked match with its score breakdown for explainability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(rename = "userId")]
    pub donor_id: String,
    /// Overall score in [0, 1], gated to 0.0 for incompatible donors.
    pub score: f64,
    pub compatibility: f64,
    #[serde(rename = "distance")]
    pub distance_score: f64,
    #[serde(rename = "urgencyScore")]
    pub urgency_score: f64,
    #[serde(rename = "availabilityScore")]
    pub availability_score: f64,
    #[serde(rename = "historyScore")]
    pub history_score: f64,
    #[serde(rename = "distanceKm")]
    pub distance_km: f64,
}

/// Weights for the deterministic weighted-sum combination. Used both as the
/// fallback scorer and to label the synthetic training set.
#[derive(Debug, Clone, Copy)]
pub struct ScoringWeights {
    pub compatibility: f64,
    pub distance: f64,
    pub urgency: f64,
    pub availability: f64,
    pub history: f64,
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.compatibility + self.distance + self.urgency + self.availability + self.history
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            compatibility: 0.40,
            distance: 0.20,
            urgency: 0.15,
            availability: 0.15,
            history: 0.10,
        }
    }
}

/// Aggregate statistics over recorded match runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingStatistics {
    #[serde(rename = "averageMatchTimeMs")]
    pub average_match_time_ms: f64,
    #[serde(rename = "successRate")]
    pub success_rate: f64,
    #[serde(rename = "averageDistanceKm")]
    pub average_distance_km: f64,
    #[serde(rename = "criticalRequestsMatched")]
    pub critical_requests_matched: i64,
}

impl Default for MatchingStatistics {
    fn default() -> Self {
        Self {
            average_match_time_ms: 0.0,
            success_rate: 0.0,
            average_distance_km: 0.0,
            critical_requests_matched: 0,
        }
    }
}
