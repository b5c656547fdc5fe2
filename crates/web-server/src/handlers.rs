use crate::{
    error::AppError,
    filters::FilterQuery,
    session::{CurrentUser, SESSION_COOKIE},
    AppState,
};
use analytics::ExtractSummary;
use auth::{Profile, DEMO_CREDENTIALS};
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use chrono::Local;
use core_types::{AnalysisType, FilterParams};
use database::DbError;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Funds and custodians rarely change; their lists are kept for an hour.
const FILTER_OPTIONS_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// # GET /api/login-options
/// What the login page should offer. Demo credentials are listed only while
/// the database is offline.
pub async fn login_options(State(state): State<Arc<AppState>>) -> Json<Value> {
    let demo_mode = !state.repo.is_connected();
    let credentials: Vec<Value> = if demo_mode {
        DEMO_CREDENTIALS
            .iter()
            .map(|(username, password, _, profile)| {
                json!({ "username": username, "password": password, "profile": profile })
            })
            .collect()
    } else {
        Vec::new()
    };

    Json(json!({
        "demo_mode": demo_mode,
        "entra_enabled": state.settings.entra.is_enabled(),
        "demo_credentials": credentials,
    }))
}

/// # POST /api/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<(SignedCookieJar, Json<Value>), AppError> {
    let (session_id, user) = state.auth.login(&request.username, &request.password)?;
    let jar = state.cookie_jar(&headers);
    let cookie = Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    Ok((jar.add(cookie), Json(user.to_display())))
}

/// # POST /api/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> (SignedCookieJar, Json<Value>) {
    let jar = state.cookie_jar(&headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.auth.logout(cookie.value());
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Json(json!({ "success": true })))
}

/// # GET /api/me
pub async fn me(CurrentUser(user): CurrentUser) -> Json<Value> {
    Json(user.to_display())
}

/// # GET /api/filters/options
pub async fn filter_options(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
) -> Json<Value> {
    let key = "filter-options";
    if let Some(cached) = state.cache.get(key).await {
        return Json(cached);
    }

    let (funds, funds_message) = degrade(state.repo.get_available_funds().await, "fundos");
    let (custodians, custodians_message) =
        degrade(state.repo.get_available_custodians().await, "custodiantes");
    let message = funds_message.or(custodians_message);

    let body = json!({ "funds": funds, "custodians": custodians, "message": message });
    if message.is_none() {
        state
            .cache
            .put(key.to_string(), body.clone(), FILTER_OPTIONS_TTL)
            .await;
    }
    Json(body)
}

/// # GET /api/kpis
pub async fn kpis(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Value>, AppError> {
    let filters = state.filters(query)?;
    let key = cache_key("kpis", &filters);
    if let Some(cached) = state.cache.get(&key).await {
        return Ok(Json(cached));
    }

    let (entries, message) = degrade(state.repo.get_extract_data(&filters).await, "extrato");
    let snapshot = state
        .kpis
        .calculate(&entries, &filters, Local::now().naive_local());
    let alerts = state.kpis.alerts(&snapshot);

    let body = json!({ "kpis": snapshot, "alerts": alerts, "message": message });
    if message.is_none() {
        state.cache.put(key, body.clone(), state.cache_ttl()).await;
    }
    Ok(Json(body))
}

/// # GET /api/extract
/// Row-level postings plus their summary cards. The listing is capped at
/// `ui.max_records_display` unless the request asks for fewer.
pub async fn extract(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Value>, AppError> {
    let mut filters = state.filters(query)?;
    let max = state.settings.ui.max_records_display;
    filters.limit = Some(filters.limit.map_or(max, |limit| limit.min(max)));

    let (rows, message) = degrade(state.repo.get_extract_data(&filters).await, "extrato");
    let summary = ExtractSummary::from_entries(&rows);
    Ok(Json(json!({
        "count": rows.len(),
        "rows": rows,
        "summary": summary,
        "message": message,
    })))
}

/// # GET /api/analysis/:kind
/// `kind` is `liquidity`, `concentration` or `balance-evolution`.
pub async fn analysis(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(kind): Path<String>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Value>, AppError> {
    let analysis_type = parse_analysis(&kind)
        .ok_or_else(|| AppError::NotFound(format!("Unknown analysis '{kind}'")))?;
    let filters = state.filters(query)?;

    let key = cache_key(analysis_type.as_str(), &filters);
    if let Some(cached) = state.cache.get(&key).await {
        return Ok(Json(cached));
    }

    let result = state
        .engine
        .analyze(analysis_type, &state.repo, &filters)
        .await;
    let display = result.to_display();
    if result.success {
        state.cache.put(key, display.clone(), state.cache_ttl()).await;
    }
    Ok(Json(display))
}

/// # GET /api/operations/summary
pub async fn operation_summary(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Value>, AppError> {
    let filters = state.filters(query)?;
    let (rows, message) = degrade(
        state.repo.get_operation_summary(&filters).await,
        "resumo de operações",
    );
    Ok(Json(json!({ "rows": rows, "message": message })))
}

/// # GET /api/balance/history
pub async fn balance_history(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Value>, AppError> {
    let filters = state.filters(query)?;
    let (rows, message) = degrade(
        state.repo.get_balance_evolution(&filters).await,
        "evolução de saldo",
    );
    Ok(Json(json!({ "rows": rows, "message": message })))
}

/// # POST /api/cache/clear
pub async fn clear_cache(State(state): State<Arc<AppState>>, _user: CurrentUser) -> Json<Value> {
    let cleared = state.cache.clear().await;
    tracing::info!(cleared, "Response cache cleared.");
    Json(json!({ "cleared": cleared }))
}

/// # GET /api/monitoring
/// Connection status and effective configuration. Admins and managers only.
pub async fn monitoring(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Value>, AppError> {
    if !user.has_permission(&[Profile::Admin, Profile::Gestor]) {
        tracing::warn!(username = %user.username, "Monitoring access denied.");
        return Err(AppError::Forbidden);
    }

    let settings = &state.settings;
    Ok(Json(json!({
        "database": {
            "connected": state.repo.is_connected(),
            "host": settings.database.host,
            "port": settings.database.port,
            "database": settings.database.database,
            "view": state.repo.queries().view(),
            "pool_size": settings.database.pool_size,
        },
        "analytics": {
            "liquidity_ratio_min": settings.analytics.liquidity_ratio_min,
            "liquidity_ratio_max": settings.analytics.liquidity_ratio_max,
            "concentration_threshold": settings.analytics.concentration_threshold,
            "default_period_days": settings.analytics.default_period_days,
            "cache_ttl": settings.analytics.cache_ttl,
        },
        "ui": {
            "refresh_interval": settings.ui.refresh_interval,
            "max_records_display": settings.ui.max_records_display,
        },
        "entra_enabled": settings.entra.is_enabled(),
        "active_sessions": state.auth.active_sessions(),
        "cache_entries": state.cache.len().await,
    })))
}

fn parse_analysis(kind: &str) -> Option<AnalysisType> {
    match kind {
        "liquidity" => Some(AnalysisType::Liquidity),
        "concentration" => Some(AnalysisType::Concentration),
        "balance-evolution" | "balance_evolution" => Some(AnalysisType::BalanceEvolution),
        _ => None,
    }
}

fn cache_key(prefix: &str, filters: &FilterParams) -> String {
    format!(
        "{prefix}:{}",
        serde_json::to_string(filters).unwrap_or_default()
    )
}

/// Replaces a failed read with an empty value and a user-facing message.
fn degrade<T: Default>(result: Result<T, DbError>, what: &str) -> (T, Option<String>) {
    match result {
        Ok(value) => (value, None),
        Err(DbError::Offline) => {
            tracing::warn!(what, "Database offline; serving empty data.");
            (
                T::default(),
                Some("Banco de dados indisponível - modo demonstração".to_string()),
            )
        }
        Err(e) => {
            tracing::error!(error = ?e, what, "Failed to load data.");
            (T::default(), Some(format!("Erro ao carregar {what}")))
        }
    }
}
