use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::core::{compatibility, Matcher, MatchError};
use crate::models::{
    CandidateDonor, CompatibilityQuery, CompatibilityResponse, ErrorResponse, FindMatchesRequest,
    FindMatchesResponse, GeoPoint, HealthResponse, MatchRequest, RecommendationsQuery,
    RecommendationsResponse, StatisticsResponse,
};
use crate::services::{CacheKey, CacheManager, MatchRun, PostgresClient, SupabaseClient};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub supabase: Arc<SupabaseClient>,
    pub cache: Arc<CacheManager>,
    pub postgres: Arc<PostgresClient>,
    pub matcher: Matcher,
    pub search_radius_km: f64,
    pub max_limit: u16,
    pub fetch_timeout: Duration,
}

/// Configure all match-related routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/matches/find", web::post().to(find_matches))
        .route("/matches/recommendations", web::get().to(get_recommendations))
        .route("/matches/statistics", web::get().to(get_statistics))
        .route("/compatibility", web::get().to(get_compatibility));
}

fn bad_request(error: &str, message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: 400,
    })
}

fn internal_error(error: &str, message: String) -> HttpResponse {
    HttpResponse::InternalServerError().json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: 500,
    })
}

fn gateway_timeout(message: String) -> HttpResponse {
    HttpResponse::GatewayTimeout().json(ErrorResponse {
        error: "timeout".to_string(),
        message,
        status_code: 504,
    })
}

/// Health check endpoint.
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let pg_healthy = state.postgres.health_check().await.unwrap_or(false);
    let status = if pg_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        scorer: state.matcher.scorer_name().to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Fetch the donor pool around a location, bounded by the configured
/// timeout.
async fn fetch_donor_pool(
    state: &AppState,
    center: GeoPoint,
    exclude_id: Option<&str>,
) -> Result<Vec<CandidateDonor>, HttpResponse> {
    let started = Instant::now();
    let fetch = state
        .supabase
        .query_donors(center, state.search_radius_km, exclude_id);

    match tokio::time::timeout(state.fetch_timeout, fetch).await {
        Ok(Ok(donors)) => Ok(donors),
        Ok(Err(e)) => {
            tracing::error!("Failed to query donors: {}", e);
            Err(internal_error(
                "donor_pool_unavailable",
                format!("Failed to query donors: {}", e),
            ))
        }
        Err(_) => {
            let err = MatchError::Timeout {
                stage: "candidate fetch",
                elapsed_ms: started.elapsed().as_millis() as u64,
            };
            tracing::warn!("{}", err);
            Err(gateway_timeout(err.to_string()))
        }
    }
}

/// Find matches endpoint.
///
/// POST /api/v1/matches/find
///
/// Request body:
/// ```json
/// {
///   "bloodType": "A+",
///   "latitude": 40.7128,
///   "longitude": -74.0060,
///   "urgency": "critical",
///   "limit": 10
/// }
/// ```
async fn find_matches(
    state: web::Data<AppState>,
    req: web::Json<FindMatchesRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for find_matches request: {:?}", errors);
        return bad_request("validation_failed", errors.to_string());
    }

    let location = GeoPoint::new(req.latitude, req.longitude);
    let mut request = match MatchRequest::new(&req.blood_type, location, &req.urgency) {
        Ok(r) => r,
        Err(e) => {
            tracing::info!("Rejected find_matches request: {}", e);
            return bad_request("invalid_blood_type", e.to_string());
        }
    };
    if let Some(amount) = req.amount {
        request = request.with_amount(amount);
    }
    if let Some(description) = &req.description {
        request = request.with_description(description.clone());
    }

    // Cap limit to keep a single request from walking the whole pool.
    let limit = req.limit.min(state.max_limit) as usize;

    tracing::info!(
        "Finding matches: {} {} within {}km, limit {}",
        request.blood_type,
        request.urgency.as_str(),
        state.search_radius_km,
        limit
    );

    let candidates = match fetch_donor_pool(&state, location, None).await {
        Ok(donors) => donors,
        Err(response) => return response,
    };
    let total_candidates = candidates.len();

    let started = Instant::now();
    let matches = match state.matcher.find_matches(&request, candidates, limit) {
        Ok(m) => m,
        Err(e @ MatchError::InvalidLimit(_)) => {
            return bad_request("invalid_limit", e.to_string());
        }
        Err(e) => {
            tracing::error!("Matching failed: {}", e);
            return internal_error("matching_failed", e.to_string());
        }
    };

    // History recording is best-effort; a down database must not fail the
    // match response.
    let run = MatchRun::from_results(
        None,
        request.blood_type.as_str(),
        request.urgency.as_str(),
        total_candidates,
        &matches,
        started.elapsed(),
    );
    if let Err(e) = state.postgres.record_run(&run).await {
        tracing::warn!("Failed to record match run: {}", e);
    }

    tracing::info!(
        "Returning {} matches (from {} candidates)",
        matches.len(),
        total_candidates
    );

    HttpResponse::Ok().json(FindMatchesResponse {
        matches,
        total_candidates,
        scorer: state.matcher.scorer_name().to_string(),
    })
}

/// Recipient-side recommendations.
///
/// GET /api/v1/matches/recommendations?userId={userId}
///
/// Looks up the user's open blood request and ranks donors for it. A user
/// without an open request gets an empty list, not an error.
async fn get_recommendations(
    state: web::Data<AppState>,
    query: web::Query<RecommendationsQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return bad_request("validation_failed", errors.to_string());
    }

    let user_id = &query.user_id;

    let cache_key = CacheKey::recommendations(user_id);
    match state.cache.get::<RecommendationsResponse>(&cache_key).await {
        Ok(Some(cached)) => return HttpResponse::Ok().json(cached),
        Ok(None) => {}
        Err(e) => tracing::warn!("Cache read failed for {}: {}", cache_key, e),
    }

    let open_request = match state.supabase.get_open_request(user_id).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to fetch open request for {}: {}", user_id, e);
            return internal_error(
                "request_lookup_failed",
                format!("Failed to fetch open request: {}", e),
            );
        }
    };

    let Some(record) = open_request else {
        tracing::debug!("No open request for {}", user_id);
        return HttpResponse::Ok().json(RecommendationsResponse {
            user_id: user_id.clone(),
            request_id: None,
            matches: vec![],
        });
    };

    let location = GeoPoint::new(record.latitude, record.longitude);
    let request = match MatchRequest::new(
        &record.blood_type,
        location,
        record.urgency.as_deref().unwrap_or("medium"),
    ) {
        Ok(r) => r,
        Err(e) => {
            // Stored data, not caller input: surface as a server-side fault.
            tracing::error!("Open request {} has bad blood type: {}", record.id, e);
            return internal_error("corrupt_request_record", e.to_string());
        }
    };

    let candidates = match fetch_donor_pool(&state, location, Some(user_id)).await {
        Ok(donors) => donors,
        Err(response) => return response,
    };
    let total_candidates = candidates.len();

    let started = Instant::now();
    let limit = query.limit.min(state.max_limit) as usize;
    let matches = match state.matcher.find_matches(&request, candidates, limit.max(1)) {
        Ok(m) => m,
        Err(e) => {
            tracing::error!("Matching failed for {}: {}", user_id, e);
            return internal_error("matching_failed", e.to_string());
        }
    };

    let run = MatchRun::from_results(
        Some(user_id),
        request.blood_type.as_str(),
        request.urgency.as_str(),
        total_candidates,
        &matches,
        started.elapsed(),
    );
    if let Err(e) = state.postgres.record_run(&run).await {
        tracing::warn!("Failed to record match run: {}", e);
    }

    let response = RecommendationsResponse {
        user_id: user_id.clone(),
        request_id: Some(record.id),
        matches,
    };

    if let Err(e) = state.cache.set(&cache_key, &response).await {
        tracing::warn!("Cache write failed for {}: {}", cache_key, e);
    }

    HttpResponse::Ok().json(response)
}

/// Aggregate matching statistics from recorded runs.
///
/// GET /api/v1/matches/statistics
async fn get_statistics(state: web::Data<AppState>) -> impl Responder {
    let cache_key = CacheKey::statistics();
    match state.cache.get::<StatisticsResponse>(&cache_key).await {
        Ok(Some(cached)) => return HttpResponse::Ok().json(cached),
        Ok(None) => {}
        Err(e) => tracing::warn!("Cache read failed for {}: {}", cache_key, e),
    }

    match state.postgres.get_statistics().await {
        Ok((statistics, recorded_runs)) => {
            let response = StatisticsResponse {
                statistics,
                recorded_runs,
            };
            if let Err(e) = state.cache.set(&cache_key, &response).await {
                tracing::warn!("Cache write failed for {}: {}", cache_key, e);
            }
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            tracing::error!("Failed to compute statistics: {}", e);
            internal_error("statistics_unavailable", e.to_string())
        }
    }
}

/// Compatibility badge lookup.
///
/// GET /api/v1/compatibility?recipient=A%2B&donor=O-
async fn get_compatibility(query: web::Query<CompatibilityQuery>) -> impl Responder {
    let recipient = match query.recipient.parse() {
        Ok(bt) => bt,
        Err(e) => return bad_request("invalid_blood_type", format!("recipient: {}", e)),
    };
    let donor = match query.donor.parse() {
        Ok(bt) => bt,
        Err(e) => return bad_request("invalid_blood_type", format!("donor: {}", e)),
    };

    HttpResponse::Ok().json(CompatibilityResponse {
        recipient: query.recipient.clone(),
        donor: query.donor.clone(),
        compatible: compatibility::is_compatible(recipient, donor),
        score: compatibility::compatibility_score(recipient, donor),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::HeuristicScorer;
    use crate::models::ScoringWeights;
    use crate::services::SupabaseTables;
    use actix_web::{test, App};
    use mockito::Matcher as PathMatcher;

    /// State wired to a mock Supabase server, an L1-only cache and a lazy
    /// Postgres pool that is never reached before the first query.
    fn test_state(supabase_url: &str) -> AppState {
        let tables = SupabaseTables {
            donors: "donors".to_string(),
            blood_requests: "blood_requests".to_string(),
        };
        let weights = ScoringWeights::default();

        AppState {
            supabase: Arc::new(SupabaseClient::new(
                supabase_url.to_string(),
                "test-key".to_string(),
                tables,
            )),
            cache: Arc::new(CacheManager::in_memory(100, 60)),
            postgres: Arc::new(
                PostgresClient::connect_lazy("postgres://127.0.0.1:1/none")
                    .expect("lazy pool"),
            ),
            matcher: Matcher::with_scorer(
                Arc::new(HeuristicScorer::new(weights)),
                weights,
                50.0,
            ),
            search_radius_km: 50.0,
            max_limit: 100,
            fetch_timeout: Duration::from_secs(2),
        }
    }

    #[actix_web::test]
    async fn test_recommendations_without_open_request_is_empty_ok() {
        let mut server = mockito::Server::new_async().await;
        let _requests = server
            .mock("GET", PathMatcher::Regex(r"^/rest/v1/blood_requests".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(&server.url())))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/matches/recommendations?userId=user-1")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK);

        let body: RecommendationsResponse = test::read_body_json(resp).await;
        assert_eq!(body.user_id, "user-1");
        assert!(body.request_id.is_none());
        assert!(body.matches.is_empty());
    }

    #[actix_web::test]
    async fn test_recommendations_rank_donors_for_open_request() {
        let mut server = mockito::Server::new_async().await;
        let request_row = serde_json::json!([{
            "id": "req-42",
            "recipient_id": "user-1",
            "blood_type": "A+",
            "latitude": 40.7128,
            "longitude": -74.0060,
            "urgency": "critical",
            "status": "open"
        }]);
        let donor_rows = serde_json::json!([{
            "id": "donor-1",
            "blood_type": "O-",
            "latitude": 40.72,
            "longitude": -74.01,
            "last_donation": null,
            "donation_count": 4
        }]);

        let _requests = server
            .mock("GET", PathMatcher::Regex(r"^/rest/v1/blood_requests".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(request_row.to_string())
            .create_async()
            .await;
        let _donors = server
            .mock("GET", PathMatcher::Regex(r"^/rest/v1/donors".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(donor_rows.to_string())
            .create_async()
            .await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(&server.url())))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/matches/recommendations?userId=user-1")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK);

        let body: RecommendationsResponse = test::read_body_json(resp).await;
        assert_eq!(body.request_id.as_deref(), Some("req-42"));
        assert_eq!(body.matches.len(), 1);
        assert_eq!(body.matches[0].donor_id, "donor-1");
        assert!(body.matches[0].score > 0.0);
    }

    #[actix_web::test]
    async fn test_health_check_response() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
            scorer: "neural".to_string(),
            timestamp: chrono::Utc::now(),
        };

        assert_eq!(response.status, "healthy");
        assert_eq!(response.scorer, "neural");
    }
}
