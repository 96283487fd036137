use axum::Router;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::models::*;
use crate::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sunaryum Dashboard API",
        version = "1.0.0",
        description = "Airdrop dashboard API.

Every endpoint acts on the wallet of the current session (log in through `POST /login`).

## Features
- Daily check-in with streak bonus (up to 3.5x at 35+ days)
- One-time missions with points and SUN rewards
- Threshold achievements granted automatically
- Latest wallet transactions",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    tags(
        (name = "user", description = "Current user and wallet"),
        (name = "checkin", description = "Daily check-in"),
        (name = "missions", description = "Missions"),
        (name = "achievements", description = "Achievements")
    ),
    paths(
        crate::api::user::get_user,
        crate::api::user::get_transactions,
        crate::api::checkin::get_status,
        crate::api::checkin::checkin,
        crate::api::missions::get_missions,
        crate::api::missions::complete_mission,
        crate::api::achievements::get_achievements,
    ),
    components(
        schemas(
            User,
            Mission,
            MissionView,
            MissionState,
            MissionOutcome,
            Achievement,
            ConditionType,
            EarnedAchievement,
            Notification,
            CheckinStatus,
            CheckinOutcome,
            WalletTransaction,
            TransactionKind,
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
