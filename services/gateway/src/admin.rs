//! Admin API for pool record management
//!
//! Invalid input (malformed bodies, non-object patches) is rejected here
//! synchronously; the store itself treats unknown identities as logged
//! no-ops. When an admin token is configured every endpoint requires
//! `Authorization: Bearer <token>`.
//!
//! Endpoints:
//! - GET    /admin/records                          — list records (credentials redacted)
//! - POST   /admin/records/{type}                   — add a record
//! - PATCH  /admin/records/{type}/{uuid}            — merge a JSON patch into a record
//! - DELETE /admin/records/{type}/{uuid}            — remove a record
//! - POST   /admin/records/{type}/{uuid}/enable     — clear the disabled flag
//! - POST   /admin/records/{type}/{uuid}/disable    — set the disabled flag
//! - POST   /admin/records/{type}/{uuid}/reset      — zero usage and error counters
//! - POST   /admin/records/{type}/{uuid}/check      — on-demand health probe

use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use serde_json::{Value, json};
use tracing::info;

use backend::BackendFactory;
use provider_pool::{BaseConfigs, PoolStore, ProviderRecord, probe_record};

/// Shared state for admin API handlers.
#[derive(Clone)]
pub struct AdminState {
    pub store: Arc<PoolStore>,
    pub factory: Arc<dyn BackendFactory>,
    pub base: BaseConfigs,
    pub token: Option<Arc<str>>,
}

/// Build the admin axum router with all record management endpoints.
pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/records", get(list_records))
        .route("/admin/records/{provider_type}", post(add_record))
        .route(
            "/admin/records/{provider_type}/{uuid}",
            patch(update_record).delete(delete_record),
        )
        .route(
            "/admin/records/{provider_type}/{uuid}/enable",
            post(enable_record),
        )
        .route(
            "/admin/records/{provider_type}/{uuid}/disable",
            post(disable_record),
        )
        .route(
            "/admin/records/{provider_type}/{uuid}/reset",
            post(reset_record),
        )
        .route(
            "/admin/records/{provider_type}/{uuid}/check",
            post(check_record),
        )
        .with_state(state)
}

fn json_response(status: StatusCode, body: Value) -> Response {
    (
        status,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}

fn authorized(state: &AdminState, headers: &HeaderMap) -> bool {
    match &state.token {
        None => true,
        Some(token) => headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|presented| presented == token.as_ref()),
    }
}

fn unauthorized() -> Response {
    json_response(
        StatusCode::UNAUTHORIZED,
        json!({"error": "missing or invalid admin token"}),
    )
}

fn not_found(provider_type: &str, uuid: &str) -> Response {
    json_response(
        StatusCode::NOT_FOUND,
        json!({"error": format!("no record {uuid} in pool {provider_type}")}),
    )
}

/// Record view with credential fields stripped. Admin listings never
/// expose secrets.
fn redacted(record: &ProviderRecord) -> Value {
    json!({
        "uuid": record.uuid,
        "name": record.name,
        "isHealthy": record.is_healthy,
        "isDisabled": record.is_disabled,
        "usageCount": record.usage_count,
        "errorCount": record.error_count,
        "lastUsed": record.last_used,
        "lastErrorTime": record.last_error_time,
        "lastErrorMessage": record.last_error_message,
        "checkHealth": record.check_health,
        "checkModelName": record.check_model_name,
        "notSupportedModels": record.not_supported_models,
    })
}

/// GET /admin/records — every pool's records, credentials redacted.
async fn list_records(State(state): State<AdminState>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }

    let document = state.store.snapshot_all().await;
    let mut pools = serde_json::Map::new();
    for (provider_type, records) in &document {
        pools.insert(
            provider_type.clone(),
            Value::Array(records.iter().map(redacted).collect()),
        );
    }
    json_response(StatusCode::OK, json!({"pools": pools}))
}

/// POST /admin/records/{type} — add a record from a JSON body.
async fn add_record(
    State(state): State<AdminState>,
    Path(provider_type): Path<String>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<Value>,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    if !body.is_object() {
        return json_response(
            StatusCode::BAD_REQUEST,
            json!({"error": "record body must be a JSON object"}),
        );
    }

    let record: ProviderRecord = match serde_json::from_value(body) {
        Ok(record) => record,
        Err(e) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                json!({"error": format!("invalid record: {e}")}),
            );
        }
    };

    let uuid = state.store.add_record(&provider_type, record).await;
    info!(provider_type, uuid, "admin added record");
    json_response(StatusCode::OK, json!({"uuid": uuid, "status": "added"}))
}

/// PATCH /admin/records/{type}/{uuid} — deep-merge a patch into a record.
async fn update_record(
    State(state): State<AdminState>,
    Path((provider_type, uuid)): Path<(String, String)>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<Value>,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let Value::Object(patch) = body else {
        return json_response(
            StatusCode::BAD_REQUEST,
            json!({"error": "patch body must be a JSON object"}),
        );
    };

    if state.store.update_record(&provider_type, &uuid, &patch).await {
        json_response(StatusCode::OK, json!({"uuid": uuid, "status": "updated"}))
    } else {
        not_found(&provider_type, &uuid)
    }
}

/// DELETE /admin/records/{type}/{uuid} — remove a record (idempotent).
async fn delete_record(
    State(state): State<AdminState>,
    Path((provider_type, uuid)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }

    state.store.remove_record(&provider_type, &uuid).await;
    json_response(StatusCode::OK, json!({"uuid": uuid, "status": "removed"}))
}

async fn enable_record(
    State(state): State<AdminState>,
    Path((provider_type, uuid)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    if state.store.set_disabled(&provider_type, &uuid, false).await {
        json_response(StatusCode::OK, json!({"uuid": uuid, "status": "enabled"}))
    } else {
        not_found(&provider_type, &uuid)
    }
}

async fn disable_record(
    State(state): State<AdminState>,
    Path((provider_type, uuid)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    if state.store.set_disabled(&provider_type, &uuid, true).await {
        json_response(StatusCode::OK, json!({"uuid": uuid, "status": "disabled"}))
    } else {
        not_found(&provider_type, &uuid)
    }
}

/// POST .../reset — zero both counters without touching the health flag.
async fn reset_record(
    State(state): State<AdminState>,
    Path((provider_type, uuid)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    if state.store.reset_counters(&provider_type, &uuid).await {
        json_response(StatusCode::OK, json!({"uuid": uuid, "status": "reset"}))
    } else {
        not_found(&provider_type, &uuid)
    }
}

/// POST .../check — probe the record now and return its new state.
async fn check_record(
    State(state): State<AdminState>,
    Path((provider_type, uuid)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let Some(record) = state.store.find(&provider_type, &uuid).await else {
        return not_found(&provider_type, &uuid);
    };

    probe_record(
        &state.store,
        state.factory.as_ref(),
        &state.base,
        &provider_type,
        &record,
    )
    .await;

    match state.store.find(&provider_type, &uuid).await {
        Some(record) => json_response(StatusCode::OK, json!({"record": redacted(&record)})),
        None => not_found(&provider_type, &uuid),
    }
}
