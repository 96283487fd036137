use axum::{extract::State, Json};
use std::sync::Arc;

use crate::error::DashboardError;
use crate::models::{User, WalletTransaction};
use crate::AppState;

/// GET /api/v1/user - Current user, created on first access
#[utoipa::path(
    get,
    path = "/user",
    tag = "user",
    responses(
        (status = 200, description = "Logged-in user", body = User),
        (status = 401, description = "No wallet session"),
        (status = 502, description = "Storage unavailable")
    )
)]
pub async fn get_user(State(state): State<Arc<AppState>>) -> Result<Json<User>, DashboardError> {
    let ctx = state.dashboard.open_context().await?;
    Ok(Json(ctx.user))
}

/// GET /api/v1/transactions - Latest wallet transactions
#[utoipa::path(
    get,
    path = "/transactions",
    tag = "user",
    responses(
        (status = 200, description = "Three most recent transactions, newest first", body = Vec<WalletTransaction>),
        (status = 401, description = "No wallet session"),
        (status = 502, description = "Storage unavailable")
    )
)]
pub async fn get_transactions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<WalletTransaction>>, DashboardError> {
    let ctx = state.dashboard.open_context().await?;
    let transactions = state.dashboard.transactions(&ctx).await?;
    Ok(Json(transactions))
}
