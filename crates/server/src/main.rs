mod error;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::FromRef,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use tallyback_core::config::{CONFIG_FILE_NAME, TallybackConfig};
use tallyback_store::ReviewDb;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<ReviewDb>,
    pub config: AppConfig,
    pub clock: Clock,
}

/// Server configuration loaded from environment variables.
#[derive(Clone)]
pub struct AppConfig {
    pub base_url: String,
}

/// Source of `now` for every handler.
#[derive(Clone)]
pub struct Clock(Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>);

impl Clock {
    pub fn system() -> Self {
        Self(Arc::new(Utc::now))
    }

    #[cfg(test)]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self(Arc::new(move || at))
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.0)()
    }
}

impl FromRef<AppState> for Arc<ReviewDb> {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Clock {
    fn from_ref(state: &AppState) -> Self {
        state.clock.clone()
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

/// Workflow settings from `tallyback.toml` in the data directory, with
/// `TALLYBACK_REVIEW_WINDOW_DAYS` taking precedence over the file.
fn load_workflow_config(data_dir: &std::path::Path) -> anyhow::Result<TallybackConfig> {
    let path = data_dir.join(CONFIG_FILE_NAME);
    let mut config = TallybackConfig::load(&path)
        .with_context(|| format!("loading {}", path.display()))?;
    if let Some(raw) = env_nonempty("TALLYBACK_REVIEW_WINDOW_DAYS") {
        config.review.window_days = raw
            .trim()
            .parse()
            .with_context(|| format!("TALLYBACK_REVIEW_WINDOW_DAYS={raw:?} is not a number"))?;
        config.check()?;
    }
    Ok(config)
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        // Health
        .route("/health", get(routes::health::health))
        // Token-gated pages
        .route("/access/{token}", get(routes::access::resolve))
        .route("/access/{token}/visit", post(routes::access::visit))
        .route("/access/{token}/accept", post(routes::review::accept))
        .route("/access/{token}/dispute", post(routes::review::dispute))
        .route("/access/{token}/respond", post(routes::clarifications::respond))
        // Internal clarification view
        .route("/assignments", get(routes::clarifications::list_open))
        .route("/assignments/{id}", get(routes::clarifications::thread))
        .route("/assignments/{id}/reply", post(routes::clarifications::reply))
        .route("/assignments/{id}/clear", post(routes::clarifications::clear))
        .route("/assignments/{id}/cancel", post(routes::clarifications::cancel))
        // Issuance
        .route("/clarifications", post(routes::issuance::create_clarification))
        .route(
            "/report-periods/{id}/review-token",
            post(routes::issuance::issue_review_token),
        );

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tallyback_server=info,tower_http=info".into()),
        )
        .init();

    let data_dir = std::env::var("TALLYBACK_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"));
    tracing::info!("data directory: {}", data_dir.display());

    let workflow = load_workflow_config(&data_dir)?;
    tracing::info!(
        review_window_days = workflow.review.window_days,
        clarification_window_days = workflow.clarification.window_days,
        "workflow settings loaded"
    );

    let db = ReviewDb::open_path(&data_dir.join("tallyback.db"), workflow)
        .context("opening SQLite database")?;
    tracing::info!("database initialized");

    let base_url = env_nonempty("BASE_URL").unwrap_or_else(|| "http://localhost:3000".into());
    let state = AppState {
        db: Arc::new(db),
        config: AppConfig {
            base_url: base_url.clone(),
        },
        clock: Clock::system(),
    };

    tracing::info!("starting server at {base_url}");

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
