//! HTTP surface for the outbreak engine
//!
//! REST endpoints live under `/api/v1`; `/health` sits at the root for
//! probes. The browser client talks cross-origin, so CORS stays permissive.

pub mod handlers;
pub mod sse;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the router with all routes attached.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .nest(
            "/api/v1",
            Router::new()
                .route("/reports", post(handlers::submit_report))
                .route("/reports", get(handlers::list_reports))
                .route("/reports/:report_id/resolve", post(handlers::resolve_report))
                .route("/clusters", get(handlers::nearby_clusters))
                .route("/combos", get(handlers::list_combos))
                .route("/votes", get(handlers::list_votes))
                .route("/votes/:disease_key", post(handlers::vote_ok))
                .route("/prone-alerts", get(handlers::list_prone_alerts))
                .route("/prone-alerts", post(handlers::submit_prone_alert))
                .route("/events", get(sse::event_stream)),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
