#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use tower::util::ServiceExt;

use tally::core::metrics::CONTENT_TYPE;
use tally::core::TallyError;
use tally::server::{app_state::AppState, config, router::build_router};

#[tokio::test]
async fn facade_builds_a_working_server() {
    let yaml = "version: 1\nheavy_task: { delays_ms: [5], failure_one_in: 0 }\n";
    let cfg = config::load_from_str(yaml).expect("must parse");
    let app = build_router(AppState::new(&cfg).unwrap());

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get("content-type").and_then(|v| v.to_str().ok()),
        Some(CONTENT_TYPE)
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8(body.to_vec()).unwrap().contains("\ntotal_request 1\n"));
}

#[test]
fn facade_reexports_the_core_error() {
    let err: TallyError = config::load_from_str("version: 3\n").expect_err("must fail");
    assert_eq!(err.kind(), "BAD_CONFIG");
}
