//! REST API surface for the servo bridge.
//!
//! Every response carries a `success` flag. Successful bodies are the
//! service DTOs flattened next to it; failures go through [`AppError`].

use axum::{
    extract::{rejection::JsonRejection, State as AxumState},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    service::{CommandResult, ConnectResult, DisconnectResult, ServoService, StatusReport},
};

#[derive(Clone)]
pub struct RestContext {
    pub service: ServoService,
}

/// Body of a command request. `direction` is kept as raw JSON so a wrong
/// type is reported as an invalid direction rather than a malformed body.
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    #[serde(default)]
    pub direction: Option<Value>,
}

impl CommandRequest {
    /// The direction name, or an empty string if it is missing or not a string.
    pub fn direction_name(&self) -> &str {
        match &self.direction {
            Some(Value::String(name)) => name,
            _ => "",
        }
    }
}

/// Successful response: `{"success": true, ...body}`.
#[derive(Debug, Serialize)]
pub struct Success<T> {
    pub success: bool,
    #[serde(flatten)]
    pub body: T,
}

fn ok<T: Serialize>(body: T) -> Json<Success<T>> {
    Json(Success {
        success: true,
        body,
    })
}

// ---------- Router Builder ----------
pub fn build_router(ctx: RestContext) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ports", get(list_ports))
        .route("/connect", post(connect))
        .route("/disconnect", post(disconnect))
        .route("/status", get(status))
        .route("/command", post(command))
        .route("/api/servo", post(command))
        .route("/api/servo/connect", post(connect))
        .route("/api/servo/disconnect", post(disconnect))
        .route("/api/servo/status", get(status))
        .with_state(ctx)
}

// ---------- Handlers ----------
async fn health() -> &'static str {
    "ok"
}

async fn list_ports(AxumState(ctx): AxumState<RestContext>) -> AppResult<Json<Value>> {
    let ports = ctx.service.ports().await?;
    Ok(Json(json!({"success": true, "ports": ports})))
}

async fn connect(
    AxumState(ctx): AxumState<RestContext>,
) -> AppResult<Json<Success<ConnectResult>>> {
    Ok(ok(ctx.service.connect().await?))
}

async fn disconnect(
    AxumState(ctx): AxumState<RestContext>,
) -> AppResult<Json<Success<DisconnectResult>>> {
    Ok(ok(ctx.service.disconnect().await?))
}

async fn status(AxumState(ctx): AxumState<RestContext>) -> AppResult<Json<Success<StatusReport>>> {
    Ok(ok(ctx.service.status().await?))
}

async fn command(
    AxumState(ctx): AxumState<RestContext>,
    payload: Result<Json<CommandRequest>, JsonRejection>,
) -> AppResult<Json<Success<CommandResult>>> {
    let Json(req) = payload.map_err(|e| AppError::InvalidPayload(e.body_text()))?;
    Ok(ok(ctx.service.command(req.direction_name()).await?))
}
