//! HTTP request handlers
//!
//! Dispatcher calls may block (cancel joins the playback worker), so every
//! inbound message is handed to the blocking pool.

use crate::api::AppState;
use crate::dispatcher::{DispatchOutcome, EventDispatcher};
use crate::state::PlaybackFlags;
use axum::{extract::State, http::StatusCode, response::Json};
use ltrp_common::events::{
    BroadcastMessage, HealthReport, RemoteControlMessage, ShutdownMessage,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub port: u16,
    pub report: HealthReport,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub playback: PlaybackFlags,
    pub health: HealthReport,
}

type HandlerError = (StatusCode, Json<StatusResponse>);

// ============================================================================
// Health and State
// ============================================================================

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "ltrp-broadcast".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        port: state.port,
        report: state.health.report(),
    })
}

/// GET /api/v1/state - Playback flags and current health report
pub async fn get_state(State(state): State<AppState>) -> Json<StateResponse> {
    Json(StateResponse {
        playback: state.dispatcher.state().snapshot(),
        health: state.health.report(),
    })
}

// ============================================================================
// Inbound Messages
// ============================================================================

/// POST /api/v1/broadcast
pub async fn broadcast(
    State(state): State<AppState>,
    Json(message): Json<BroadcastMessage>,
) -> Result<Json<DispatchOutcome>, HandlerError> {
    debug!("Broadcast message: {:?}", message);
    dispatch(&state, move |dispatcher| dispatcher.handle_broadcast(&message)).await
}

/// POST /api/v1/remote_control
pub async fn remote_control(
    State(state): State<AppState>,
    Json(message): Json<RemoteControlMessage>,
) -> Result<Json<DispatchOutcome>, HandlerError> {
    debug!("Remote control message: {:?}", message);
    dispatch(&state, move |dispatcher| {
        dispatcher.handle_remote_control(message.command)
    })
    .await
}

/// POST /api/v1/shutdown
pub async fn shutdown(
    State(state): State<AppState>,
    Json(message): Json<ShutdownMessage>,
) -> Result<Json<DispatchOutcome>, HandlerError> {
    debug!("Shutdown message: {:?}", message);
    dispatch(&state, move |dispatcher| dispatcher.handle_shutdown(message.code)).await
}

async fn dispatch<F>(state: &AppState, handle: F) -> Result<Json<DispatchOutcome>, HandlerError>
where
    F: FnOnce(&EventDispatcher) -> DispatchOutcome + Send + 'static,
{
    let dispatcher = Arc::clone(&state.dispatcher);

    tokio::task::spawn_blocking(move || handle(&dispatcher))
        .await
        .map(Json)
        .map_err(|e| {
            error!("Dispatcher task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusResponse {
                    status: format!("error: {}", e),
                }),
            )
        })
}
