use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use tower::ServiceExt;
use serde_json::json;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path};
use uuid::Uuid;

use akshaya_api::router::create_router;
use shared_utils::test_utils::TestConfig;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn mock_settings(server: &MockServer, maintenance: bool) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/system_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "maintenance_mode": maintenance }
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_health_is_reachable_during_maintenance() {
    let server = MockServer::start().await;
    mock_settings(&server, true).await;
    let app = create_router(TestConfig::with_mock_server(&server.uri()).to_arc());

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_maintenance_blocks_public_routes() {
    let server = MockServer::start().await;
    mock_settings(&server, true).await;
    let app = create_router(TestConfig::with_mock_server(&server.uri()).to_arc());

    let uri = format!("/ratings/center/{}", Uuid::new_v4());
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["maintenance_mode"], true);

    let request = Request::builder().uri("/admin/settings/public").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cells_are_mounted() {
    let server = MockServer::start().await;
    mock_settings(&server, false).await;
    let app = create_router(TestConfig::with_mock_server(&server.uri()).to_arc());

    let request = Request::builder().uri("/payments/config").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["key_id"], "rzp_test_key");

    let request = Request::builder().uri("/appointments").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_news_is_public() {
    let server = MockServer::start().await;
    mock_settings(&server, false).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/news"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    let app = create_router(TestConfig::with_mock_server(&server.uri()).to_arc());

    let request = Request::builder().uri("/news/latest/3").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"], json!([]));
}
