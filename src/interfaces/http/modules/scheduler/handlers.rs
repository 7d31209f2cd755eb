//! Last sweep report. The sweep itself has no inbound trigger.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::services::{RuleStats, SweepRule};
use crate::application::SweepReport;
use crate::interfaces::http::common::{ApiResponse, ApiResult};
use crate::interfaces::http::router::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct RuleStatsDto {
    pub matched: u32,
    pub succeeded: u32,
}

impl From<RuleStats> for RuleStatsDto {
    fn from(s: RuleStats) -> Self {
        Self {
            matched: s.matched,
            succeeded: s.succeeded,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SweepFailureDto {
    pub booking_id: i32,
    pub rule: String,
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SweepReportDto {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub scanned: usize,
    pub unpaid_timeout: RuleStatsDto,
    pub no_show: RuleStatsDto,
    pub forced_checkout: RuleStatsDto,
    pub failures: Vec<SweepFailureDto>,
}

impl From<SweepReport> for SweepReportDto {
    fn from(r: SweepReport) -> Self {
        Self {
            started_at: r.started_at,
            finished_at: r.finished_at,
            scanned: r.scanned,
            unpaid_timeout: r.stats(SweepRule::UnpaidTimeout).into(),
            no_show: r.stats(SweepRule::NoShow).into(),
            forced_checkout: r.stats(SweepRule::ForcedCheckout).into(),
            failures: r
                .failures
                .into_iter()
                .map(|f| SweepFailureDto {
                    booking_id: f.booking_id,
                    rule: f.rule.as_str().to_string(),
                    error: f.error,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SchedulerStatusDto {
    pub enabled: bool,
    pub interval_secs: u64,
    /// `null` until the first sweep has finished
    pub last_sweep: Option<SweepReportDto>,
}

#[utoipa::path(
    get,
    path = "/api/v1/scheduler",
    tag = "Scheduler",
    responses(
        (status = 200, description = "Sweep settings and the last report", body = ApiResponse<SchedulerStatusDto>)
    )
)]
pub async fn scheduler_status(State(state): State<AppState>) -> ApiResult<SchedulerStatusDto> {
    let config = state.scheduler.config();
    Ok(Json(ApiResponse::success(SchedulerStatusDto {
        enabled: config.enabled,
        interval_secs: config.interval.as_secs(),
        last_sweep: state.scheduler.last_report().await.map(Into::into),
    })))
}
