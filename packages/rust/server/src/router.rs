//! Router construction for the ConceptLens server.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the full axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/identify_unknown_concepts/",
            post(handlers::identify::identify_unknown_concepts),
        )
        .route(
            "/identify_unknown_concepts",
            post(handlers::identify::identify_unknown_concepts),
        )
        .route(
            "/identify_unknown_concepts/labels",
            post(handlers::identify::unknown_labels),
        )
        .route("/concepts/synonyms", post(handlers::concepts::synonyms))
        .route("/concepts/descriptions", post(handlers::concepts::descriptions))
        .route("/concepts/ontologies", post(handlers::concepts::ontologies))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
