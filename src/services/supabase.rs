use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::core::distance::bounding_box;
use crate::models::{CandidateDonor, GeoPoint};

/// Errors that can occur when talking to the Supabase backend.
#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: invalid API key")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Table names in the Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseTables {
    pub donors: String,
    pub blood_requests: String,
}

/// Supabase (PostgREST) client.
///
/// The platform keeps donors and blood requests in Supabase; this client
/// covers the two reads the matching service needs: a recipient's open
/// request and the donor pool around a location.
pub struct SupabaseClient {
    base_url: String,
    api_key: String,
    client: Client,
    tables: SupabaseTables,
}

/// An open blood request row, as stored by the platform.
#[derive(Debug, Clone, Deserialize)]
pub struct BloodRequestRecord {
    pub id: String,
    pub recipient_id: String,
    pub blood_type: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub urgency: Option<String>,
    #[serde(default)]
    pub amount: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
    pub status: String,
}

/// A donor row. Kept separate from the domain `CandidateDonor` so malformed
/// rows can be skipped instead of failing the whole pool.
#[derive(Debug, Clone, Deserialize)]
struct DonorRow {
    id: String,
    blood_type: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    last_donation: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    donation_count: Option<u32>,
}

impl SupabaseClient {
    pub fn new(base_url: String, api_key: String, tables: SupabaseTables) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            api_key,
            client,
            tables,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            self.base_url.trim_end_matches('/'),
            table
        )
    }

    async fn get_rows(&self, url: &str) -> Result<serde_json::Value, SupabaseError> {
        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(SupabaseError::Unauthorized);
        }
        if !status.is_success() {
            return Err(SupabaseError::ApiError(format!(
                "request to {} failed: {}",
                url, status
            )));
        }

        Ok(response.json().await?)
    }

    /// Fetch the most recent open blood request for a recipient.
    ///
    /// Returns `Ok(None)` when the user has no open request — an
    /// empty-but-valid state, not an error.
    pub async fn get_open_request(
        &self,
        user_id: &str,
    ) -> Result<Option<BloodRequestRecord>, SupabaseError> {
        let url = format!(
            "{}?recipient_id=eq.{}&status=eq.open&order=created_at.desc&limit=1",
            self.table_url(&self.tables.blood_requests),
            urlencoding::encode(user_id)
        );

        tracing::debug!("Fetching open request for recipient {}", user_id);

        let json = self.get_rows(&url).await?;
        let rows = json
            .as_array()
            .ok_or_else(|| SupabaseError::InvalidResponse("expected a JSON array".into()))?;

        match rows.first() {
            None => Ok(None),
            Some(row) => serde_json::from_value(row.clone()).map(Some).map_err(|e| {
                SupabaseError::InvalidResponse(format!("failed to parse blood request: {}", e))
            }),
        }
    }

    /// Query available donors inside a bounding box around the request
    /// location. PostgREST combines repeated column filters with AND.
    ///
    /// Rows with malformed blood types are skipped with a warning; one bad
    /// row must not sink the pool.
    pub async fn query_donors(
        &self,
        center: GeoPoint,
        radius_km: f64,
        exclude_id: Option<&str>,
    ) -> Result<Vec<CandidateDonor>, SupabaseError> {
        let bbox = bounding_box(center, radius_km);

        let mut url = format!(
            "{}?is_available=eq.true&latitude=gte.{}&latitude=lte.{}&longitude=gte.{}&longitude=lte.{}",
            self.table_url(&self.tables.donors),
            bbox.min_lat,
            bbox.max_lat,
            bbox.min_lon,
            bbox.max_lon
        );
        if let Some(id) = exclude_id {
            url.push_str(&format!("&id=neq.{}", urlencoding::encode(id)));
        }

        let json = self.get_rows(&url).await?;
        let rows = json
            .as_array()
            .ok_or_else(|| SupabaseError::InvalidResponse("expected a JSON array".into()))?;

        let donors: Vec<CandidateDonor> = rows
            .iter()
            .filter_map(|row| {
                let parsed: DonorRow = match serde_json::from_value(row.clone()) {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Skipping malformed donor row: {}", e);
                        return None;
                    }
                };

                let blood_type = match parsed.blood_type.parse() {
                    Ok(bt) => bt,
                    Err(_) => {
                        tracing::warn!(
                            "Skipping donor {} with unknown blood type '{}'",
                            parsed.id,
                            parsed.blood_type
                        );
                        return None;
                    }
                };

                Some(CandidateDonor {
                    id: parsed.id,
                    blood_type,
                    location: GeoPoint::new(parsed.latitude, parsed.longitude),
                    last_donation: parsed.last_donation,
                    donation_count: parsed.donation_count.unwrap_or(0),
                })
            })
            .collect();

        tracing::debug!(
            "Queried {} donors within {}km of ({}, {})",
            donors.len(),
            radius_km,
            center.latitude,
            center.longitude
        );

        Ok(donors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn tables() -> SupabaseTables {
        SupabaseTables {
            donors: "donors".to_string(),
            blood_requests: "blood_requests".to_string(),
        }
    }

    #[tokio::test]
    async fn test_query_donors_parses_and_skips_bad_rows() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!([
            {
                "id": "donor-1",
                "blood_type": "O-",
                "latitude": 40.72,
                "longitude": -74.01,
                "last_donation": null,
                "donation_count": 5
            },
            {
                "id": "donor-2",
                "blood_type": "Z+",
                "latitude": 40.73,
                "longitude": -74.02,
                "donation_count": 1
            }
        ]);

        let _mock = server
            .mock("GET", Matcher::Regex(r"^/rest/v1/donors".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let client = SupabaseClient::new(server.url(), "test-key".to_string(), tables());
        let donors = client
            .query_donors(GeoPoint::new(40.7128, -74.0060), 50.0, None)
            .await
            .unwrap();

        // The Z+ row is skipped, not fatal.
        assert_eq!(donors.len(), 1);
        assert_eq!(donors[0].id, "donor-1");
        assert_eq!(donors[0].donation_count, 5);
    }

    #[tokio::test]
    async fn test_get_open_request_none_when_empty() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Regex(r"^/rest/v1/blood_requests".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let client = SupabaseClient::new(server.url(), "test-key".to_string(), tables());
        let request = client.get_open_request("user-1").await.unwrap();
        assert!(request.is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Regex(r"^/rest/v1/donors".to_string()))
            .with_status(401)
            .create_async()
            .await;

        let client = SupabaseClient::new(server.url(), "bad-key".to_string(), tables());
        let err = client
            .query_donors(GeoPoint::new(0.0, 0.0), 10.0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SupabaseError::Unauthorized));
    }
}
