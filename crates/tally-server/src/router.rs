//! Axum router wiring.
//!
//! The instrumentation layer wraps the whole router, so `/metrics` and the
//! not-found fallback are counted like any other request.

use axum::{middleware, routing::get, Router};

use crate::{api, app_state::AppState, obs, ops};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::hello))
        .route("/slow", get(api::slow))
        .route("/metrics", get(ops::metrics))
        .layer(middleware::from_fn_with_state(
            state.http_metrics(),
            obs::middleware::track,
        ))
        .with_state(state)
}
