use std::sync::Arc;

use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use pawkit_core::api::WireRecord;
use pawkit_core::models::{DeviceSession, RecordId, RecordKind, SyncRecord};

use crate::auth::{extract_bearer_token, WorkspaceContext};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::rate_limit::{RateLimitMetricsSnapshot, WriteRateLimiter};
use crate::sessions::SessionRegistry;
use crate::store::SyncStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    store: SyncStore,
    sessions: SessionRegistry,
    limiter: WriteRateLimiter,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, store: SyncStore) -> Self {
        Self {
            sessions: SessionRegistry::new(config.session_ttl),
            limiter: WriteRateLimiter::from_config(&config),
            config,
            store,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/sessions/heartbeat", get(list_sessions).post(heartbeat))
        .route("/{resource}", get(list_records).post(create_record))
        .route(
            "/{resource}/{id}",
            axum::routing::patch(update_record).delete(delete_record),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    rate_limit: RateLimitMetricsSnapshot,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        rate_limit: state.limiter.metrics_snapshot(),
    })
}

async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;
    let workspace_id = state
        .config
        .workspace_for_token(token)
        .ok_or_else(|| AppError::unauthorized("Unknown API token"))?
        .to_string();
    request
        .extensions_mut()
        .insert(WorkspaceContext { workspace_id });
    Ok(next.run(request).await)
}

#[derive(Debug, Deserialize)]
struct SinceQuery {
    since: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteQuery {
    updated_at: i64,
    deleted_at: i64,
}

fn parse_kind(resource: &str) -> Result<RecordKind, AppError> {
    resource
        .parse()
        .map_err(|_| AppError::not_found(format!("unknown resource: {resource}")))
}

fn parse_since(query: &SinceQuery) -> Result<i64, AppError> {
    match query.since.as_deref() {
        None => Ok(0),
        Some(raw) => chrono::DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.timestamp_millis())
            .map_err(|_| AppError::bad_request("since must be an RFC3339 timestamp")),
    }
}

fn parse_record_id(id: &str) -> Result<RecordId, AppError> {
    id.parse()
        .map_err(|_| AppError::bad_request(format!("invalid record id: {id}")))
}

async fn list_records(
    State(state): State<AppState>,
    Extension(workspace): Extension<WorkspaceContext>,
    Path(resource): Path<String>,
    Query(query): Query<SinceQuery>,
) -> Result<Json<Vec<WireRecord>>, AppError> {
    let kind = parse_kind(&resource)?;
    let since = parse_since(&query)?;

    let records = state
        .store
        .changes_since(kind, &workspace.workspace_id, since)
        .await?;
    tracing::debug!(
        workspace = %workspace.workspace_id,
        resource = %resource,
        since,
        count = records.len(),
        "Delta pull served"
    );
    Ok(Json(records.iter().map(WireRecord::from).collect()))
}

async fn create_record(
    State(state): State<AppState>,
    Extension(workspace): Extension<WorkspaceContext>,
    Path(resource): Path<String>,
    Json(body): Json<WireRecord>,
) -> Result<Json<WireRecord>, AppError> {
    let kind = parse_kind(&resource)?;
    state.limiter.check(&workspace.workspace_id).await?;

    let record = body.into_record(kind);
    let stored = state.store.apply(&workspace.workspace_id, record).await?;
    tracing::info!(
        workspace = %workspace.workspace_id,
        resource = %resource,
        record = %stored.id,
        "Record created"
    );
    Ok(Json(WireRecord::from(&stored)))
}

async fn update_record(
    State(state): State<AppState>,
    Extension(workspace): Extension<WorkspaceContext>,
    Path((resource, id)): Path<(String, String)>,
    Json(body): Json<WireRecord>,
) -> Result<Json<WireRecord>, AppError> {
    let kind = parse_kind(&resource)?;
    let id = parse_record_id(&id)?;
    if body.id != id {
        return Err(AppError::bad_request("body id does not match path id"));
    }
    state.limiter.check(&workspace.workspace_id).await?;

    let record: SyncRecord = body.into_record(kind);
    let stored = state.store.apply(&workspace.workspace_id, record).await?;
    Ok(Json(WireRecord::from(&stored)))
}

async fn delete_record(
    State(state): State<AppState>,
    Extension(workspace): Extension<WorkspaceContext>,
    Path((resource, id)): Path<(String, String)>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<WireRecord>, AppError> {
    let kind = parse_kind(&resource)?;
    let id = parse_record_id(&id)?;
    state.limiter.check(&workspace.workspace_id).await?;

    let stored = state
        .store
        .apply_delete(
            &workspace.workspace_id,
            kind,
            id,
            query.updated_at,
            query.deleted_at,
        )
        .await?;
    tracing::info!(
        workspace = %workspace.workspace_id,
        resource = %resource,
        record = %stored.id,
        "Record soft-deleted"
    );
    Ok(Json(WireRecord::from(&stored)))
}

async fn heartbeat(
    State(state): State<AppState>,
    Extension(workspace): Extension<WorkspaceContext>,
    Json(session): Json<DeviceSession>,
) -> StatusCode {
    tracing::debug!(
        workspace = %workspace.workspace_id,
        session = %session.session_id,
        device = %session.device_name,
        "Heartbeat"
    );
    state.sessions.record(&workspace.workspace_id, session).await;
    StatusCode::NO_CONTENT
}

async fn list_sessions(
    State(state): State<AppState>,
    Extension(workspace): Extension<WorkspaceContext>,
) -> Json<Vec<DeviceSession>> {
    Json(state.sessions.active(&workspace.workspace_id).await)
}
