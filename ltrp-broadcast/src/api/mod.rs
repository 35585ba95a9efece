//! HTTP adapter for the broadcast node
//!
//! Stands in for the robot's message bus: inbound messages arrive as JSON
//! POSTs, outbound reports leave as Server-Sent Events.

pub mod handlers;
pub mod sse;

use crate::dispatcher::EventDispatcher;
use crate::error::{Error, Result};
use crate::health::NodeHealth;
use crate::node::BroadcastNode;
use axum::{
    routing::{get, post},
    Router,
};
use ltrp_common::events::EventBus;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<EventDispatcher>,
    pub health: Arc<NodeHealth>,
    pub bus: EventBus,
    /// Becomes true once the supervisor has finished
    pub terminated: watch::Receiver<bool>,
    /// Server port
    pub port: u16,
}

impl AppState {
    pub fn new(node: &BroadcastNode, terminated: watch::Receiver<bool>, port: u16) -> Self {
        Self {
            dispatcher: Arc::clone(node.dispatcher()),
            health: Arc::clone(node.health()),
            bus: node.bus().clone(),
            terminated,
            port,
        }
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check (no prefix for health endpoint)
        .route("/health", get(handlers::health))
        .nest(
            "/api/v1",
            Router::new()
                // Inbound messages
                .route("/broadcast", post(handlers::broadcast))
                .route("/remote_control", post(handlers::remote_control))
                .route("/shutdown", post(handlers::shutdown))
                // Node state
                .route("/state", get(handlers::get_state))
                // Outbound reports
                .route("/events", get(sse::event_stream)),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve the API until the supervisor has finished
pub async fn run(state: AppState) -> Result<()> {
    let mut terminated = state.terminated.clone();
    let addr = SocketAddr::from(([0, 0, 0, 0], state.port));
    let app = create_router(state);

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            // A dropped sender also means the node is gone
            let _ = terminated.wait_for(|done| *done).await;
            info!("Node terminated, stopping HTTP server");
        })
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    Ok(())
}
