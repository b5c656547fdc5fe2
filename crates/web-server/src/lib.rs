use analytics::{AnalyticsEngine, KpiCalculator};
use auth::AuthService;
use axum::{
    http::HeaderMap,
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::{Key, SignedCookieJar};
use chrono::Local;
use configuration::Settings;
use core_types::FilterParams;
use database::DbRepository;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer, ExposeHeaders},
    trace::TraceLayer,
};

pub mod cache;
pub mod error;
pub mod filters;
pub mod handlers;
pub mod session;

use cache::ResponseCache;
use error::AppError;
use filters::FilterQuery;

/// The shared application state that all handlers can access.
pub struct AppState {
    pub settings: Settings,
    pub repo: DbRepository,
    pub engine: AnalyticsEngine,
    pub kpis: KpiCalculator,
    pub auth: AuthService,
    pub cache: ResponseCache,
    cookie_key: Key,
}

impl AppState {
    pub fn new(settings: Settings, repo: DbRepository) -> anyhow::Result<Self> {
        let secret = settings.security.secret_key.as_bytes();
        anyhow::ensure!(
            secret.len() >= configuration::MIN_SECRET_KEY_LEN,
            "security.secret_key must be at least {} bytes",
            configuration::MIN_SECRET_KEY_LEN
        );

        Ok(Self {
            cookie_key: Key::derive_from(secret),
            engine: AnalyticsEngine::new(settings.analytics.clone()),
            kpis: KpiCalculator::new(),
            auth: AuthService::new(&settings.security)?,
            cache: ResponseCache::new(),
            repo,
            settings,
        })
    }

    /// The request's cookies, verified against the session signing key.
    pub fn cookie_jar(&self, headers: &HeaderMap) -> SignedCookieJar {
        SignedCookieJar::from_headers(headers, self.cookie_key.clone())
    }

    /// Resolves query-string filters against today's local date.
    pub fn filters(&self, query: FilterQuery) -> Result<FilterParams, AppError> {
        let today = Local::now().date_naive();
        Ok(query.into_params(today, self.settings.analytics.default_period_days)?)
    }

    pub fn cache_ttl(&self) -> Duration {
        self.settings.analytics.cache_ttl()
    }
}

/// Every dashboard route. `/api/health`, `/api/login-options` and the
/// login endpoints are public; the rest require a session cookie.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any())
        .expose_headers(ExposeHeaders::any());

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/login-options", get(handlers::login_options))
        .route("/api/login", post(handlers::login))
        .route("/api/logout", post(handlers::logout))
        .route("/api/me", get(handlers::me))
        .route("/api/filters/options", get(handlers::filter_options))
        .route("/api/kpis", get(handlers::kpis))
        .route("/api/extract", get(handlers::extract))
        .route("/api/analysis/:kind", get(handlers::analysis))
        .route("/api/operations/summary", get(handlers::operation_summary))
        .route("/api/balance/history", get(handlers::balance_history))
        .route("/api/cache/clear", post(handlers::clear_cache))
        .route("/api/monitoring", get(handlers::monitoring))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Connects to the ledger database (or falls back to offline mode) and
/// serves the dashboard API until Ctrl-C.
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let addr: SocketAddr = settings.server.bind_addr.parse()?;
    let repo = database::connect_or_offline(&settings.database).await?;
    if !repo.is_connected() {
        tracing::warn!("Serving in demo mode: ledger reads will return empty data.");
    }

    let state = Arc::new(AppState::new(settings, repo)?);
    let app = build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server started and listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.repo.close().await;
    tracing::info!("Web server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for the shutdown signal.");
    }
}
