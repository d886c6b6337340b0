use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use thiserror::Error;

use crate::models::MatchingStatistics;

/// Errors that can occur when interacting with PostgreSQL.
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
}

/// One recorded match run, written after every ranking call.
///
/// The engine itself stays stateless; this history exists only to feed the
/// statistics endpoint with observed data instead of fabricated numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRun {
    pub id: uuid::Uuid,
    pub requester_id: Option<String>,
    pub blood_type: String,
    pub urgency: String,
    pub candidate_count: i32,
    pub match_count: i32,
    pub best_score: Option<f64>,
    pub avg_distance_km: Option<f64>,
    pub duration_ms: i64,
}

impl MatchRun {
    /// Summarize a completed ranking call.
    pub fn from_results(
        requester_id: Option<&str>,
        blood_type: &str,
        urgency: &str,
        candidate_count: usize,
        results: &[crate::models::MatchResult],
        duration: Duration,
    ) -> Self {
        // Only compatible matches count toward distance/score aggregates.
        let matched: Vec<_> = results.iter().filter(|r| r.score > 0.0).collect();
        let avg_distance_km = if matched.is_empty() {
            None
        } else {
            Some(matched.iter().map(|r| r.distance_km).sum::<f64>() / matched.len() as f64)
        };

        Self {
            id: uuid::Uuid::new_v4(),
            requester_id: requester_id.map(String::from),
            blood_type: blood_type.to_string(),
            urgency: urgency.to_string(),
            candidate_count: candidate_count as i32,
            match_count: matched.len() as i32,
            best_score: matched.first().map(|r| r.score),
            avg_distance_km,
            duration_ms: duration.as_millis() as i64,
        }
    }
}

/// PostgreSQL client for match-run history.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Connect and run migrations.
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Pool that connects on first use, for tests that never reach the
    /// database.
    #[cfg(test)]
    pub(crate) fn connect_lazy(database_url: &str) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy(database_url)?;
        Ok(Self { pool })
    }

    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL");
        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
        )
        .await
    }

    /// Record a completed match run.
    pub async fn record_run(&self, run: &MatchRun) -> Result<(), PostgresError> {
        let query = r#"
            INSERT INTO match_runs
                (id, requester_id, blood_type, urgency, candidate_count,
                 match_count, best_score, avg_distance_km, duration_ms, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
        "#;

        sqlx::query(query)
            .bind(run.id)
            .bind(&run.requester_id)
            .bind(&run.blood_type)
            .bind(&run.urgency)
            .bind(run.candidate_count)
            .bind(run.match_count)
            .bind(run.best_score)
            .bind(run.avg_distance_km)
            .bind(run.duration_ms)
            .execute(&self.pool)
            .await?;

        tracing::debug!(
            "Recorded match run {}: {} {} ({}/{} matched, {}ms)",
            run.id,
            run.blood_type,
            run.urgency,
            run.match_count,
            run.candidate_count,
            run.duration_ms
        );

        Ok(())
    }

    /// Aggregate recorded runs into platform statistics.
    ///
    /// Returns the statistics and the number of runs they are based on;
    /// with zero runs the defaults are placeholders, not observations.
    pub async fn get_statistics(&self) -> Result<(MatchingStatistics, i64), PostgresError> {
        let query = r#"
            SELECT
                COUNT(*) AS total_runs,
                COALESCE(AVG(duration_ms), 0)::float8 AS avg_duration_ms,
                COALESCE(AVG(CASE WHEN match_count > 0 THEN 1.0 ELSE 0.0 END), 0)::float8 AS success_rate,
                COALESCE(AVG(avg_distance_km) FILTER (WHERE match_count > 0), 0)::float8 AS avg_distance_km,
                COUNT(*) FILTER (WHERE urgency = 'critical' AND match_count > 0) AS critical_matched
            FROM match_runs
        "#;

        let row = sqlx::query(query).fetch_one(&self.pool).await?;

        let total_runs: i64 = row.get("total_runs");
        let statistics = MatchingStatistics {
            average_match_time_ms: row.get("avg_duration_ms"),
            success_rate: row.get("success_rate"),
            average_distance_km: row.get("avg_distance_km"),
            critical_requests_matched: row.get("critical_matched"),
        };

        Ok((statistics, total_runs))
    }

    /// Health check for the database connection.
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchResult;

    fn result(id: &str, score: f64, distance_km: f64) -> MatchResult {
        MatchResult {
            donor_id: id.to_string(),
            score,
            compatibility: if score > 0.0 { 1.0 } else { 0.0 },
            distance_score: 0.5,
            urgency_score: 1.0,
            availability_score: 1.0,
            history_score: 0.5,
            distance_km,
        }
    }

    #[test]
    fn test_match_run_summarizes_results() {
        let results = vec![
            result("a", 0.9, 2.0),
            result("b", 0.7, 4.0),
            result("c", 0.0, 1.0), // incompatible, excluded from aggregates
        ];

        let run = MatchRun::from_results(
            Some("user-1"),
            "A+",
            "critical",
            5,
            &results,
            Duration::from_millis(12),
        );

        assert_eq!(run.candidate_count, 5);
        assert_eq!(run.match_count, 2);
        assert_eq!(run.best_score, Some(0.9));
        assert_eq!(run.avg_distance_km, Some(3.0));
        assert_eq!(run.duration_ms, 12);
    }

    #[test]
    fn test_match_run_with_no_matches() {
        let run = MatchRun::from_results(None, "O-", "low", 0, &[], Duration::from_millis(1));
        assert_eq!(run.match_count, 0);
        assert_eq!(run.best_score, None);
        assert_eq!(run.avg_distance_km, None);
    }
}
