use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod dashboard;
mod engine;
mod error;
mod models;
mod render;
mod session;
mod store;

use dashboard::{clock::SystemClock, Dashboard, DashboardSettings};
use render::Renderers;
use session::SessionStore;
use store::{LocalStore, Store, SupabaseStore};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Hosted Supabase project over PostgREST
    Supabase,
    /// DuckDB file on this machine
    Local,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "sunaryum-dashboard")]
#[command(about = "Sunaryum airdrop dashboard: check-ins, missions and achievements")]
pub struct Config {
    /// Storage backend
    #[arg(long, env = "BACKEND", value_enum, default_value = "supabase")]
    pub backend: Backend,

    /// Supabase project URL
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Supabase anon key
    #[arg(long, env = "SUPABASE_ANON_KEY")]
    pub supabase_anon_key: Option<String>,

    /// Database file path (local backend)
    #[arg(long, env = "DATABASE_PATH", default_value = "./data/sunaryum.duckdb")]
    pub database: String,

    /// Session file holding the logged-in wallet
    #[arg(long, env = "SESSION_FILE", default_value = "./data/session.json")]
    pub session_file: String,

    /// HTTP server port
    #[arg(long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// HTTP server host
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Upper bound for each remote request and each flow, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "15")]
    pub request_timeout_secs: u64,

    /// Achievement granted on a user's first check-in
    #[arg(
        long,
        env = "FIRST_LOGIN_ACHIEVEMENT_ID",
        default_value = "a1eebc99-9c0b-4ef8-bb6d-6bb9bd380a11"
    )]
    pub first_login_achievement_id: String,
}

pub struct AppState {
    pub dashboard: Dashboard,
    pub renderers: Renderers,
}

fn open_store(config: &Config) -> Result<Arc<dyn Store>> {
    match config.backend {
        Backend::Supabase => {
            let url = config.supabase_url.as_deref().filter(|u| !u.trim().is_empty());
            let key = config.supabase_anon_key.as_deref().filter(|k| !k.trim().is_empty());
            let (Some(url), Some(key)) = (url, key) else {
                bail!("SUPABASE_URL and SUPABASE_ANON_KEY are required for the supabase backend");
            };

            let store = SupabaseStore::new(
                url,
                key.to_string(),
                Duration::from_secs(config.request_timeout_secs),
            )?;
            tracing::info!("Supabase: {}", store.url);
            Ok(Arc::new(store))
        }
        Backend::Local => {
            // Ensure data directory exists
            if let Some(parent) = std::path::Path::new(&config.database).parent() {
                std::fs::create_dir_all(parent)?;
            }

            let store = LocalStore::open(&config.database)?;
            store.migrate()?;
            if store.seed_default_catalog()? {
                tracing::info!("Seeded default missions and achievements");
            }
            tracing::info!("Database: {}", config.database);
            Ok(Arc::new(store))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sunaryum_dashboard=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();

    tracing::info!("Starting sunaryum-dashboard v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Backend: {:?}", config.backend);

    let store = open_store(&config)?;
    let sessions = SessionStore::new(&config.session_file);
    tracing::info!("Session file: {}", sessions.path().display());

    let dashboard = Dashboard::new(
        store,
        sessions,
        Arc::new(SystemClock),
        DashboardSettings {
            first_login_achievement_id: config.first_login_achievement_id.clone(),
            flow_timeout: Duration::from_secs(config.request_timeout_secs),
        },
    );

    let state = Arc::new(AppState {
        dashboard,
        renderers: Renderers::html(),
    });

    let app = api::app(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
