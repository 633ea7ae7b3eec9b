//! HTTP surface over the relay and the schedule service.

mod error;
pub mod handlers;

pub use error::ApiError;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::relay::GenerationRelay;
use crate::schedule::ScheduleService;
use crate::store::RecordStore;
use crate::Error;

/// Shared handles for every request. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub relay: GenerationRelay,
    pub schedules: ScheduleService,
}

impl AppState {
    pub fn new(relay: GenerationRelay, store: Arc<dyn RecordStore>) -> Self {
        Self {
            schedules: ScheduleService::new(relay.clone(), store),
            relay,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route("/api/test", get(handlers::api_test))
        .route("/api/patients", post(handlers::submit_patient))
        .route("/api/patients/{id}", get(handlers::get_patient))
        .route("/api/schedule/{id}", get(handlers::get_schedule))
        .route("/api/chat", post(handlers::chat))
        .route("/api/chat/stream", post(handlers::chat_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), Error> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
