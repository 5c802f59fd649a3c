//! Axum server and routes.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use registry_core::Registry;
use registry_types::{
    apply_audit_list_opts, AckResponse, AggregateData, AggregateResponse, AuditListOptions,
    AuditListResponse, BaseResponse, DeactivateRequest, RecordListResponse, RecordResponse,
    RegisterRequest, RegistryError, StatusResponse, UpdateRecordRequest,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Header carrying the caller identity, resolved upstream by the transport/auth layer.
pub const CALLER_HEADER: &str = "x-caller-id";

pub struct AppState {
    pub registry: Arc<Registry>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/registry/register", post(handle_register))
        .route("/registry/update_record", post(handle_update_record))
        .route("/registry/deactivate", post(handle_deactivate))
        .route("/registry/close", post(handle_close))
        .route("/registry/reopen", post(handle_reopen))
        .route("/registry/reset", post(handle_reset))
        .route("/registry/record", get(handle_get_record))
        .route("/registry/records", get(handle_list_records))
        .route("/registry/aggregate", get(handle_aggregate))
        .route("/registry/status", get(handle_status))
        .route("/registry/audit", get(handle_audit_list))
        .route("/health", get(handle_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn caller_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CALLER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn missing_caller<T>() -> Json<BaseResponse<T>> {
    Json(BaseResponse::error(400, format!("{CALLER_HEADER} header is required")))
}

fn from_error<T>(e: RegistryError) -> Json<BaseResponse<T>> {
    if let RegistryError::Audit(ref inner) = e {
        tracing::error!(error = %inner, "audit sink failure");
    }
    Json(BaseResponse::error(e.code(), e.to_string()))
}

fn ack(res: Result<(), RegistryError>) -> Json<AckResponse> {
    match res {
        Ok(()) => Json(BaseResponse::ok(())),
        Err(e) => from_error(e),
    }
}

async fn handle_register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> Json<AckResponse> {
    let Some(caller) = caller_id(&headers) else {
        return missing_caller();
    };
    let res = state
        .registry
        .register(&caller, &req.name, req.numeric_attribute)
        .await;
    if res.is_ok() {
        tracing::debug!(caller_id = %caller, "registration accepted");
    }
    ack(res)
}

async fn handle_update_record(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<UpdateRecordRequest>,
) -> Json<AckResponse> {
    let Some(caller) = caller_id(&headers) else {
        return missing_caller();
    };
    ack(
        state
            .registry
            .update_record(&caller, &req.target_id, req.numeric_attribute)
            .await,
    )
}

async fn handle_deactivate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<DeactivateRequest>,
) -> Json<AckResponse> {
    let Some(caller) = caller_id(&headers) else {
        return missing_caller();
    };
    ack(state.registry.deactivate(&caller, &req.target_id).await)
}

async fn handle_close(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<AckResponse> {
    let Some(caller) = caller_id(&headers) else {
        return missing_caller();
    };
    ack(state.registry.close(&caller).await)
}

async fn handle_reopen(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<AckResponse> {
    let Some(caller) = caller_id(&headers) else {
        return missing_caller();
    };
    ack(state.registry.reopen(&caller).await)
}

async fn handle_reset(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<AckResponse> {
    let Some(caller) = caller_id(&headers) else {
        return missing_caller();
    };
    ack(state.registry.admin_reset(&caller).await)
}

#[derive(Debug, Deserialize)]
pub struct RecordQuery {
    #[serde(default)]
    pub id: Option<String>,
}

async fn handle_get_record(
    State(state): State<Arc<AppState>>,
    Query(q): Query<RecordQuery>,
) -> Json<RecordResponse> {
    let id = match &q.id {
        Some(id) => id.as_str(),
        None => return Json(BaseResponse::error(400, "id is required")),
    };
    match state.registry.get_record(id).await {
        Ok(record) => Json(BaseResponse::ok(record)),
        Err(e) => from_error(e),
    }
}

async fn handle_list_records(State(state): State<Arc<AppState>>) -> Json<RecordListResponse> {
    Json(BaseResponse::ok(state.registry.list_records().await))
}

async fn handle_aggregate(State(state): State<Arc<AppState>>) -> Json<AggregateResponse> {
    let aggregate = state.registry.aggregate_attribute().await;
    Json(BaseResponse::ok(AggregateData { aggregate }))
}

async fn handle_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(BaseResponse::ok(state.registry.status().await))
}

#[derive(Debug, Deserialize)]
pub struct AuditListQuery {
    #[serde(default)]
    pub caller_id: Option<String>,
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

async fn handle_audit_list(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AuditListQuery>,
) -> Json<AuditListResponse> {
    let opts = AuditListOptions {
        caller_id: q.caller_id,
        since: q.since,
        limit: q.limit,
        offset: q.offset,
    };
    let mut entries = state.registry.audit_log().await;
    apply_audit_list_opts(&mut entries, &opts);
    Json(BaseResponse::ok(entries))
}

async fn handle_health() -> &'static str {
    "ok"
}
