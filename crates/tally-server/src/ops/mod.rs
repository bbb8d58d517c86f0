//! Operational HTTP endpoints.
//!
//! - `/metrics` : Prometheus text format

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::app_state::AppState;

pub async fn metrics(State(state): State<AppState>) -> Response {
    let (content_type, body) = state.registry().render();

    (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
}
