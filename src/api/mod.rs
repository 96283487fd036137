pub mod achievements;
pub mod checkin;
pub mod missions;
pub mod pages;
pub mod swagger;
pub mod user;

use axum::{
    extract::Request,
    http::{
        header::{HOST, ORIGIN},
        HeaderMap, Method,
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::error::DashboardError;
use crate::AppState;

/// Build the API v1 router with all endpoints
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        // User
        .route("/user", get(user::get_user))
        .route("/transactions", get(user::get_transactions))
        // Check-in
        .route("/checkin", post(checkin::checkin))
        .route("/checkin/status", get(checkin::get_status))
        // Missions
        .route("/missions", get(missions::get_missions))
        .route("/missions/:id/complete", post(missions::complete_mission))
        // Achievements
        .route("/achievements", get(achievements::get_achievements))
}

/// HTML pages and their form actions
pub fn page_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(pages::index))
        .route("/login", get(pages::login_form).post(pages::login))
        .route("/logout", post(pages::logout))
        .route("/actions/checkin", post(pages::checkin))
        .route("/actions/missions/:id/complete", post(pages::complete_mission))
}

/// A write whose `Origin` does not name the host it was sent to.
/// Requests without an `Origin` header (curl, same-origin GET) pass.
fn is_cross_origin_write(method: &Method, headers: &HeaderMap) -> bool {
    if matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS) {
        return false;
    }
    let Some(origin) = headers.get(ORIGIN) else {
        return false;
    };

    let origin_authority = origin
        .to_str()
        .ok()
        .and_then(|o| o.split_once("://"))
        .map(|(_, authority)| authority.trim_end_matches('/'));
    let host = headers.get(HOST).and_then(|h| h.to_str().ok());

    match (origin_authority, host) {
        (Some(origin), Some(host)) => !origin.eq_ignore_ascii_case(host),
        _ => true,
    }
}

async fn same_origin_writes(req: Request, next: Next) -> Response {
    if is_cross_origin_write(req.method(), req.headers()) {
        tracing::warn!("Rejected cross-origin {} {}", req.method(), req.uri());
        return DashboardError::CrossOrigin.into_response();
    }
    next.run(req).await
}

/// Full application with middleware
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(page_routes())
        // API v1 routes
        .nest("/api/v1", routes())
        // Health check
        .route("/health", get(|| async { "OK" }))
        // Swagger UI
        .merge(swagger::swagger_routes())
        .layer(middleware::from_fn(same_origin_writes))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::{clock::FixedClock, Dashboard, DashboardSettings};
    use crate::models::Mission;
    use crate::render::Renderers;
    use crate::session::SessionStore;
    use crate::store::{LocalStore, Store};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use chrono::{Local, TimeZone, Utc};
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const WALLET: &str = "0xabc123def456";

    fn test_app() -> (Router, Arc<LocalStore>, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::for_tests());
        let noon = Local
            .with_ymd_and_hms(2026, 3, 10, 12, 0, 0)
            .unwrap()
            .with_timezone(&Utc);

        let dashboard = Dashboard::new(
            store.clone(),
            SessionStore::new(dir.path().join("session.json")),
            Arc::new(FixedClock(noon)),
            DashboardSettings {
                flow_timeout: Duration::from_secs(5),
                ..DashboardSettings::default()
            },
        );
        let state = Arc::new(AppState {
            dashboard,
            renderers: Renderers::html(),
        });

        (app(state), store, dir)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn login_request(wallet: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("wallet_address={}", wallet)))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _store, _dir) = test_app();
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");
    }

    #[tokio::test]
    async fn test_without_session() {
        let (app, _store, _dir) = test_app();

        let response = app.clone().oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");

        let response = app.oneshot(get("/api/v1/user")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_login_then_user_and_dashboard() {
        let (app, _store, _dir) = test_app();

        let response = app.clone().oneshot(login_request("0xABC123DEF456")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");

        let response = app.clone().oneshot(get("/api/v1/user")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let user = body_json(response).await;
        assert_eq!(user["wallet_address"], WALLET);
        assert_eq!(user["total_points"], 0);

        let response = app.oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("0xabc1...f456"));
        assert!(html.contains("Daily Check-in"));
    }

    #[tokio::test]
    async fn test_invalid_login_rerenders_form() {
        let (app, _store, _dir) = test_app();
        let response = app.oneshot(login_request("nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains(r#"action="/login""#));
    }

    #[tokio::test]
    async fn test_checkin_api_twice() {
        let (app, _store, _dir) = test_app();
        app.clone().oneshot(login_request(WALLET)).await.unwrap();

        let response = app.clone().oneshot(post("/api/v1/checkin")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let outcome = body_json(response).await;
        assert_eq!(outcome["streak"], 1);
        assert_eq!(outcome["pointsEarned"], 10);

        let response = app.clone().oneshot(post("/api/v1/checkin")).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["code"], "ALREADY_CHECKED_IN");

        let response = app.oneshot(get("/api/v1/checkin/status")).await.unwrap();
        let status = body_json(response).await;
        assert_eq!(status["checkedInToday"], true);
        assert_eq!(status["nextCheckinLabel"], "12h 0m");
    }

    #[tokio::test]
    async fn test_mission_api() {
        let (app, store, _dir) = test_app();
        store.insert_mission(&Mission {
            id: "m1".to_string(),
            name: "Join Discord".to_string(),
            description: String::new(),
            mission_type: "discord".to_string(),
            points_reward: 20,
            sun_reward: 5,
            action_url: None,
            is_active: true,
        });
        app.clone().oneshot(login_request(WALLET)).await.unwrap();

        let response = app.clone().oneshot(get("/api/v1/missions")).await.unwrap();
        let missions = body_json(response).await;
        assert_eq!(missions[0]["state"], "available");

        let response = app
            .clone()
            .oneshot(post("/api/v1/missions/m1/complete"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let outcome = body_json(response).await;
        assert_eq!(outcome["user"]["total_points"], 20);
        assert_eq!(outcome["sunEarned"], 5);

        let response = app
            .clone()
            .oneshot(post("/api/v1/missions/m1/complete"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app
            .oneshot(post("/api/v1/missions/unknown/complete"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_checkin_form_action_renders_notice() {
        let (app, _store, _dir) = test_app();
        app.clone().oneshot(login_request(WALLET)).await.unwrap();

        let response = app.clone().oneshot(post("/actions/checkin")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Check-in complete! +10 points"));
        assert!(html.contains("Next check-in in 12h 0m"));

        let response = app.oneshot(post("/actions/checkin")).await.unwrap();
        let html = body_text(response).await;
        assert!(html.contains("Already checked in today"));
    }

    #[tokio::test]
    async fn test_logout_redirects_to_login() {
        let (app, _store, _dir) = test_app();
        app.clone().oneshot(login_request(WALLET)).await.unwrap();

        let response = app.clone().oneshot(post("/logout")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");

        let response = app.oneshot(get("/api/v1/user")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    fn post_from(uri: &str, origin: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::HOST, "127.0.0.1:8080")
            .header(header::ORIGIN, origin)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_cross_origin_writes_are_rejected() {
        let (app, store, _dir) = test_app();
        app.clone().oneshot(login_request(WALLET)).await.unwrap();

        let response = app
            .clone()
            .oneshot(post_from("/api/v1/checkin", "https://evil.example"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["code"], "FORBIDDEN");

        let response = app
            .clone()
            .oneshot(post_from("/actions/checkin", "null"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let user = store.find_user_by_wallet(WALLET).await.unwrap();
        assert!(user.last_checkin.is_none());

        // No CORS headers are handed out to other sites
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/user")
                    .header(header::ORIGIN, "https://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());

        let response = app
            .oneshot(post_from("/api/v1/checkin", "http://127.0.0.1:8080"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_openapi_document() {
        let (app, _store, _dir) = test_app();
        let response = app.oneshot(get("/api-docs/openapi.json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let doc = body_json(response).await;
        assert!(doc["paths"]["/checkin"].is_object());
        assert!(doc["paths"]["/missions/{id}/complete"].is_object());
    }
}
