use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::error::DashboardError;
use crate::models::{MissionOutcome, MissionView};
use crate::AppState;

/// GET /api/v1/missions - Active missions with their state
#[utoipa::path(
    get,
    path = "/missions",
    tag = "missions",
    responses(
        (status = 200, description = "Active missions, highest reward first", body = Vec<MissionView>),
        (status = 401, description = "No wallet session"),
        (status = 502, description = "Storage unavailable")
    )
)]
pub async fn get_missions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<MissionView>>, DashboardError> {
    let ctx = state.dashboard.open_context().await?;
    let missions = state.dashboard.missions(&ctx).await?;
    Ok(Json(missions))
}

/// POST /api/v1/missions/{id}/complete - Complete a mission and collect its rewards
#[utoipa::path(
    post,
    path = "/missions/{id}/complete",
    tag = "missions",
    params(
        ("id" = String, Path, description = "Mission ID")
    ),
    responses(
        (status = 200, description = "Mission completed", body = MissionOutcome),
        (status = 400, description = "Mission is not active"),
        (status = 401, description = "No wallet session"),
        (status = 404, description = "Mission not found"),
        (status = 409, description = "Already completed or in progress"),
        (status = 502, description = "Storage unavailable"),
        (status = 504, description = "Timed out")
    )
)]
pub async fn complete_mission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MissionOutcome>, DashboardError> {
    let mut ctx = state.dashboard.open_context().await?;
    let outcome = state.dashboard.complete_mission(&mut ctx, &id).await?;
    Ok(Json(outcome))
}
