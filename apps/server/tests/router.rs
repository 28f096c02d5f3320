use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use lreg::domain::config::ApiConfig;
use lreg_server::Server;
use serde_json::Value;
use tower::ServiceExt;

async fn app() -> Router {
    let mut config = ApiConfig::default();
    config.database.url = "mem://".to_owned();
    Server::builder().config(config).build().await.expect("server").app()
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn root_names_the_application() {
    let app = app().await;
    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["appName"], "loeysingsregister");
}

#[tokio::test]
async fn health_reports_service_and_database_up() {
    let app = app().await;
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "up");
    assert_eq!(body["database"], "up");
}

#[tokio::test]
async fn feature_routes_are_mounted() {
    let app = app().await;
    assert_eq!(get(&app, "/v1/verksemd").await.0, StatusCode::NO_CONTENT);

    let (status, body) = get(&app, "/v1/loeysing").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), Value::Array(Vec::new()));

    assert_eq!(get(&app, "/v1/loeysing/1").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn documentation_ui_is_served() {
    let app = app().await;
    let (status, body) = get(&app, "/api").await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&body).contains("<html"));
}
