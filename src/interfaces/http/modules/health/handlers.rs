//! Liveness: database round trip and the last stay sweep

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::StayScheduler;

#[derive(Clone)]
pub struct HealthState {
    pub db: DatabaseConnection,
    pub scheduler: Arc<StayScheduler>,
    pub started_at: Arc<Instant>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthReport {
    /// `ok`, or `degraded` when the database does not answer
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub database: DatabaseHealth,
    pub scheduler: SweepHealth,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DatabaseHealth {
    pub reachable: bool,
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SweepHealth {
    pub enabled: bool,
    /// None until the first sweep has finished
    pub last_sweep_at: Option<DateTime<Utc>>,
    /// Bookings the last sweep could not move
    pub last_failures: usize,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthReport),
        (status = 503, description = "Database unreachable", body = HealthReport)
    )
)]
pub async fn health_check(State(state): State<HealthState>) -> (StatusCode, Json<HealthReport>) {
    let ping = Instant::now();
    let backend = state.db.get_database_backend();
    let database = match state
        .db
        .execute(Statement::from_string(backend, "SELECT 1".to_string()))
        .await
    {
        Ok(_) => DatabaseHealth {
            reachable: true,
            latency_ms: Some(ping.elapsed().as_millis() as u64),
        },
        Err(e) => {
            tracing::warn!(error = %e, "Health check database ping failed");
            DatabaseHealth {
                reachable: false,
                latency_ms: None,
            }
        }
    };

    let last = state.scheduler.last_report().await;
    let scheduler = SweepHealth {
        enabled: state.scheduler.config().enabled,
        last_sweep_at: last.as_ref().map(|r| r.finished_at),
        last_failures: last.map(|r| r.failures.len()).unwrap_or(0),
    };

    let code = if database.reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let status = if database.reachable { "ok" } else { "degraded" };

    (
        code,
        Json(HealthReport {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: state.started_at.elapsed().as_secs(),
            database,
            scheduler,
        }),
    )
}
