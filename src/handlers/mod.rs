pub mod points;
pub mod redemptions;
pub mod subscriptions;

use axum::{Json, Router, middleware::from_fn_with_state, routing::get};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::AppState;
use crate::middleware::user_auth;

/// Assemble the full application router.
pub fn app(state: AppState) -> Router {
    let authed = Router::new()
        .nest("/redemptions", redemptions::router())
        .nest("/points", points::router())
        .nest("/subscriptions", subscriptions::router())
        .layer(from_fn_with_state(state.clone(), user_auth));

    Router::new()
        .route("/health", get(health))
        .merge(authed)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
