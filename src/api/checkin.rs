use axum::{extract::State, Json};
use std::sync::Arc;

use crate::error::DashboardError;
use crate::models::{CheckinOutcome, CheckinStatus};
use crate::AppState;

/// GET /api/v1/checkin/status - Whether today's check-in is done and time to the next one
#[utoipa::path(
    get,
    path = "/checkin/status",
    tag = "checkin",
    responses(
        (status = 200, description = "Check-in status", body = CheckinStatus),
        (status = 401, description = "No wallet session")
    )
)]
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CheckinStatus>, DashboardError> {
    let ctx = state.dashboard.open_context().await?;
    Ok(Json(state.dashboard.checkin_status(&ctx)))
}

/// POST /api/v1/checkin - Daily check-in
#[utoipa::path(
    post,
    path = "/checkin",
    tag = "checkin",
    responses(
        (status = 200, description = "Check-in recorded", body = CheckinOutcome),
        (status = 401, description = "No wallet session"),
        (status = 409, description = "Already checked in today or check-in in progress"),
        (status = 502, description = "Storage unavailable"),
        (status = 504, description = "Timed out")
    )
)]
pub async fn checkin(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CheckinOutcome>, DashboardError> {
    let mut ctx = state.dashboard.open_context().await?;
    let outcome = state.dashboard.daily_checkin(&mut ctx).await?;
    Ok(Json(outcome))
}
