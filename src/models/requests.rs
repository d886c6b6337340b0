use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to rank donors for a blood request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FindMatchesRequest {
    /// Blood type in clinical notation ("A+", "O-", ...). Validated against
    /// the 8-type enum by the handler; malformed values are a 400.
    #[validate(length(min = 1))]
    #[serde(alias = "blood_type", rename = "bloodType")]
    pub blood_type: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_urgency")]
    pub urgency: String,
    /// Requested amount in units.
    #[serde(default)]
    pub amount: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
    #[validate(range(min = 1))]
    #[serde(default = "default_limit")]
    pub limit: u16,
}

fn default_urgency() -> String {
    "medium".to_string()
}

fn default_limit() -> u16 {
    10
}

/// Query for recipient-side recommendations.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecommendationsQuery {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[serde(default = "default_limit")]
    pub limit: u16,
}

/// Query for the compatibility badge endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityQuery {
    pub recipient: String,
    pub donor: String,
}
