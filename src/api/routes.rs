//! API route handlers.
//!
//! Handlers only extract and type the request, then call into the delegation
//! models. Unknown service keys in token paths read as "not found", since no
//! token can exist for them; in app and delegation paths they are
//! `ServiceUnsupported`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::AuthError;
use crate::models::AppDraft;
use crate::providers::Service;
use crate::SharedState;

// =============================================================================
// V1 Router
// =============================================================================

pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        // ── Health ───────────────────────────────────────────────────────
        .route("/status", get(status))
        // ── Apps ─────────────────────────────────────────────────────────
        .route("/apps/by-id/{id}", get(app_by_id))
        .route("/apps/by-id/{id}/status/{status}", patch(app_set_status))
        .route("/apps/{service}", get(app_by_service).post(app_create))
        .route("/apps/{service}/{user_id}", get(auth_code_url))
        // ── Tokens ───────────────────────────────────────────────────────
        .route("/tokens", get(token_create))
        .route("/tokens/{user_id}/{service}", get(token_get).put(token_refresh))
        .with_state(state)
}

fn token_key(user_id: &str, service: &str) -> Result<(i64, Service), AuthError> {
    let not_found = || AuthError::NotFound("token".into());
    let user_id = user_id.parse::<i64>().map_err(|_| not_found())?;
    let service = service.parse::<Service>().map_err(|_| not_found())?;
    Ok((user_id, service))
}

// =============================================================================
// Health
// =============================================================================

async fn status() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "authbroker",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// App Endpoints
// =============================================================================

/// GET /api/v1/apps/by-id/:id — Get an app whatever its status.
async fn app_by_id(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AuthError> {
    let app = state.delegation.apps().resolve_by_id(&id).await?;
    Ok(Json(json!({ "data": app })))
}

/// GET /api/v1/apps/:service — Get the enabled app serving a service.
async fn app_by_service(
    State(state): State<SharedState>,
    Path(service): Path<String>,
) -> Result<Json<serde_json::Value>, AuthError> {
    let service: Service = service
        .parse()
        .map_err(|_| AuthError::NotFound("app".into()))?;

    let app = state.delegation.apps().resolve_by_service(service).await?;
    Ok(Json(json!({ "data": app })))
}

/// POST /api/v1/apps/:service — Register an app for a service.
async fn app_create(
    State(state): State<SharedState>,
    Path(service): Path<String>,
    Json(body): Json<AppDraft>,
) -> Result<(StatusCode, Json<serde_json::Value>), AuthError> {
    let service: Service = service.parse()?;
    let apps = state.delegation.apps();

    let id = apps.create(&state.validator, service, body).await?;
    let app = apps.resolve_by_id(&id).await?;

    Ok((StatusCode::CREATED, Json(json!({ "data": app }))))
}

/// PATCH /api/v1/apps/by-id/:id/status/:status — Enable or disable an app.
async fn app_set_status(
    State(state): State<SharedState>,
    Path((id, status)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AuthError> {
    let app = state.delegation.apps().set_status(&id, &status).await?;
    Ok(Json(json!({ "data": app })))
}

/// GET /api/v1/apps/:service/:user_id — Start delegation, returning the
/// provider authorization URL.
async fn auth_code_url(
    State(state): State<SharedState>,
    Path((service, user_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AuthError> {
    let user_id: i64 = user_id
        .parse()
        .map_err(|_| AuthError::BadRequest(format!("invalid user id: {user_id}")))?;
    let service: Service = service.parse()?;

    let url = state.delegation.start(service, user_id).await?;
    Ok(Json(json!({ "data": { "url": url } })))
}

// =============================================================================
// Token Endpoints
// =============================================================================

#[derive(Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
}

/// GET /api/v1/tokens?code=&state= — Provider callback: redeem the code.
async fn token_create(
    State(state): State<SharedState>,
    Query(q): Query<CallbackQuery>,
) -> Result<(StatusCode, Json<serde_json::Value>), AuthError> {
    let code = q
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AuthError::BadRequest("code not specified".into()))?;
    let exchange_id = q
        .state
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AuthError::BadRequest("state not specified".into()))?;

    let user_id = state.delegation.complete(&code, &exchange_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "data": { "user_id": user_id } })),
    ))
}

/// GET /api/v1/tokens/:user_id/:service — Get the stored token.
async fn token_get(
    State(state): State<SharedState>,
    Path((user_id, service)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AuthError> {
    let (user_id, service) = token_key(&user_id, &service)?;
    let token = state.delegation.token(user_id, service).await?;
    Ok(Json(json!({ "data": token })))
}

/// PUT /api/v1/tokens/:user_id/:service — Refresh the stored token.
async fn token_refresh(
    State(state): State<SharedState>,
    Path((user_id, service)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AuthError> {
    let (user_id, service) = token_key(&user_id, &service)?;
    let token = state.delegation.refresh(user_id, service).await?;
    Ok(Json(json!({ "data": token })))
}
