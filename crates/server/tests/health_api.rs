mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use common::{app, app_with, app_without_store, store};

#[tokio::test]
async fn health_reports_collaborators() {
    let resp = app().get("/health", &[]).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["status"], "ok");
    assert_eq!(resp.body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(resp.body["data_store"], true);
    assert_eq!(resp.body["cache"], false);
}

#[tokio::test]
async fn health_is_ok_when_store_is_down() {
    let resp = app_with(store().offline()).get("/health", &[]).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data_store"], false);

    let resp = app_without_store().get("/health", &[]).await;
    assert_eq!(resp.body["data_store"], false);
}

#[tokio::test]
async fn docs_are_served() {
    let resp = app()
        .router
        .clone()
        .oneshot(Request::get("/docs").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
