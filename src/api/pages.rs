//! Server-rendered pages and the form actions behind their buttons

use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::dashboard::UserContext;
use crate::error::DashboardError;
use crate::render::page::{self, DashboardPage, Retry};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub wallet_address: String,
}

/// Page for a failed context load; no session sends the user to login
fn context_failure(err: DashboardError) -> Response {
    match err {
        DashboardError::Unauthenticated => Redirect::to("/login").into_response(),
        err => {
            tracing::warn!("Failed to load user: {}", err);
            (err.status(), Html(page::error_page(&err))).into_response()
        }
    }
}

async fn render_dashboard(state: &AppState, ctx: &UserContext, notices: Vec<String>) -> Response {
    let renderers = &state.renderers;
    let dashboard = &state.dashboard;

    let missions = match dashboard.missions(ctx).await {
        Ok(missions) => renderers.missions.missions(&missions),
        Err(e) => page::error_panel(&e, Retry::Reload),
    };
    let achievements = match dashboard.achievements(ctx).await {
        Ok(earned) => renderers.achievements.achievements(&earned),
        Err(e) => page::error_panel(&e, Retry::Reload),
    };
    let transactions = match dashboard.transactions(ctx).await {
        Ok(txs) => renderers.transactions.transactions(&txs),
        Err(e) => page::error_panel(&e, Retry::Reload),
    };
    let status = dashboard.checkin_status(ctx);

    Html(page::dashboard_page(&DashboardPage {
        ctx,
        status: &status,
        notices,
        missions,
        achievements,
        transactions,
    }))
    .into_response()
}

/// GET / - Dashboard
pub async fn index(State(state): State<Arc<AppState>>) -> Response {
    match state.dashboard.open_context().await {
        Ok(ctx) => render_dashboard(&state, &ctx, Vec::new()).await,
        Err(e) => context_failure(e),
    }
}

/// GET /login - Wallet address form
pub async fn login_form() -> Html<String> {
    Html(page::login_page(None))
}

/// POST /login - Start a session for the submitted wallet
pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.dashboard.login(&form.wallet_address).await {
        Ok(_) => Redirect::to("/").into_response(),
        Err(e) => {
            tracing::warn!("Login failed: {}", e);
            (e.status(), Html(page::login_page(Some(&e.to_string())))).into_response()
        }
    }
}

/// POST /logout - Forget the session
pub async fn logout(State(state): State<Arc<AppState>>) -> Response {
    match state.dashboard.logout() {
        Ok(()) => Redirect::to("/login").into_response(),
        Err(e) => context_failure(e),
    }
}

/// POST /actions/checkin - Daily check-in from the dashboard button
pub async fn checkin(State(state): State<Arc<AppState>>) -> Response {
    let mut ctx = match state.dashboard.open_context().await {
        Ok(ctx) => ctx,
        Err(e) => return context_failure(e),
    };

    let notices = match state.dashboard.daily_checkin(&mut ctx).await {
        Ok(outcome) => {
            let mut notices = vec![page::notice(&format!(
                "Check-in complete! +{} points ({}x streak bonus, {} days)",
                outcome.points_earned, outcome.multiplier, outcome.streak
            ))];
            notices.extend(
                outcome
                    .notifications
                    .iter()
                    .map(|n| state.renderers.achievements.notification(n)),
            );
            notices
        }
        Err(e) => vec![page::error_panel(&e, Retry::Post("/actions/checkin"))],
    };

    render_dashboard(&state, &ctx, notices).await
}

/// POST /actions/missions/:id/complete - Complete a mission from its card
pub async fn complete_mission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let mut ctx = match state.dashboard.open_context().await {
        Ok(ctx) => ctx,
        Err(e) => return context_failure(e),
    };

    let notices = match state.dashboard.complete_mission(&mut ctx, &id).await {
        Ok(outcome) => {
            let mut notices = vec![page::notice(&format!(
                "Mission complete! +{} points, +{} SUN",
                outcome.points_earned, outcome.sun_earned
            ))];
            notices.extend(
                outcome
                    .notifications
                    .iter()
                    .map(|n| state.renderers.achievements.notification(n)),
            );
            notices
        }
        Err(e) => {
            let retry = format!("/actions/missions/{}/complete", id);
            vec![page::error_panel(&e, Retry::Post(&retry))]
        }
    };

    render_dashboard(&state, &ctx, notices).await
}
