//! API router. All routes live under `/api` with permissive CORS, the
//! way the browser client expects.

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::handlers;
use crate::state::AppState;

/// Build the full application router.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route(
            "/medicamentos",
            post(handlers::create_medication).get(handlers::list_medications),
        )
        .route("/medicamentos/:id", delete(handlers::delete_medication))
        .route("/historico", get(handlers::list_medications))
        .route("/registro", post(handlers::record_dose))
        .route("/alertas", get(handlers::list_alerts))
        .route("/proximos-horarios/:id", get(handlers::upcoming_schedule))
        .route("/health", get(handlers::health))
        .with_state(state);

    Router::new().nest("/api", api).layer(CorsLayer::permissive())
}
