//! Demo endpoints: `/` and `/slow`.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::app_state::AppState;

#[derive(Debug, Serialize)]
pub struct Greeting {
    pub message: &'static str,
}

/// Field order is part of the wire format.
#[derive(Debug, Serialize)]
pub struct SlowOk {
    pub status: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SlowErr {
    pub status: &'static str,
    pub error: &'static str,
}

pub async fn hello() -> Json<Greeting> {
    tracing::info!("request came on / route");
    Json(Greeting { message: "Hello from Express Server" })
}

pub async fn slow(State(app): State<AppState>) -> Response {
    tracing::info!("request came on /slow route");
    match app.heavy_task().run().await {
        Ok(ms) => (
            StatusCode::OK,
            Json(SlowOk {
                status: "success",
                message: format!("Heavy task completed in {ms} ms"),
            }),
        )
            .into_response(),
        Err(e) => {
            // Detail goes to the log only.
            tracing::error!(error = %e, "error came on /slow route");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SlowErr { status: "Error", error: "Internal Server Error" }),
            )
                .into_response()
        }
    }
}
