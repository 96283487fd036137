use axum::{extract::State, Json};
use std::sync::Arc;

use crate::error::DashboardError;
use crate::models::EarnedAchievement;
use crate::AppState;

/// GET /api/v1/achievements - Achievements the user holds
#[utoipa::path(
    get,
    path = "/achievements",
    tag = "achievements",
    responses(
        (status = 200, description = "Earned achievements in grant order", body = Vec<EarnedAchievement>),
        (status = 401, description = "No wallet session"),
        (status = 502, description = "Storage unavailable")
    )
)]
pub async fn get_achievements(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<EarnedAchievement>>, DashboardError> {
    let ctx = state.dashboard.open_context().await?;
    let earned = state.dashboard.achievements(&ctx).await?;
    Ok(Json(earned))
}
