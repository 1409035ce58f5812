use std::sync::Arc;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt;
use serde_json::json;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use uuid::Uuid;

use rating_cell::router::rating_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

struct TestContext {
    mock_server: MockServer,
    config: AppConfig,
    user: TestUser,
    token: String,
    center_id: String,
}

impl TestContext {
    async fn new() -> Self {
        Self::with_user(TestUser::citizen("citizen@example.com")).await
    }

    async fn with_user(user: TestUser) -> Self {
        let mock_server = MockServer::start().await;
        let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
        let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

        Self {
            mock_server,
            config,
            user,
            token,
            center_id: Uuid::new_v4().to_string(),
        }
    }

    fn app(&self) -> Router {
        rating_routes(Arc::new(self.config.clone()))
    }

    fn request(&self, method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", self.token))
            .header("content-type", "application/json");

        match body {
            Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    fn rating(&self, id: &str, stars: i64, appointment_id: Option<&str>) -> serde_json::Value {
        json!({
            "id": id,
            "center_id": self.center_id,
            "user_id": self.user.id,
            "appointment_id": appointment_id,
            "rating": stars,
            "review": "Quick and helpful",
            "categories": { "service_quality": 4 },
            "is_verified": appointment_id.is_some(),
            "status": "active",
            "created_at": "2025-01-20T10:00:00Z",
            "updated_at": "2025-01-20T10:00:00Z"
        })
    }

    /// Someone else's active review at the test center.
    fn others_rating(&self, id: &str, helpful: &[Uuid]) -> serde_json::Value {
        let mut rating = self.rating(id, 2, None);
        rating["user_id"] = json!(Uuid::new_v4());
        rating["helpful"] = json!(helpful);
        rating["helpful_count"] = json!(helpful.len());
        rating
    }

    async fn mock_staff(&self, permissions: serde_json::Value) {
        let mut staff = MockSupabaseResponses::staff_response(&self.user.id, &self.center_id);
        staff["permissions"] = permissions;
        Mock::given(method("GET"))
            .and(path("/rest/v1/staff"))
            .and(query_param("user_id", format!("eq.{}", self.user.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([staff])))
            .mount(&self.mock_server)
            .await;
    }

    /// Summary rows and the center PATCH that follow every rating change.
    async fn mock_center_refresh(&self, scores: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/center_ratings"))
            .and(query_param("select", "rating,categories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(scores))
            .mount(&self.mock_server)
            .await;

        Mock::given(method("PATCH"))
            .and(path("/rest/v1/centers"))
            .and(query_param("id", format!("eq.{}", self.center_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&self.mock_server)
            .await;
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_rating_out_of_range() {
    let ctx = TestContext::new().await;

    let body = json!({ "center_id": ctx.center_id, "rating": 6 });
    let response = ctx.app().oneshot(ctx.request("POST", "/", Some(body))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Rating must be between 1 and 5");
}

#[tokio::test]
async fn test_long_review_rejected() {
    let ctx = TestContext::new().await;

    let body = json!({ "center_id": ctx.center_id, "rating": 4, "review": "a".repeat(501) });
    let response = ctx.app().oneshot(ctx.request("POST", "/", Some(body))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rating_needs_completed_appointment() {
    let ctx = TestContext::new().await;
    let appointment_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.completed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&ctx.mock_server)
        .await;

    let body = json!({ "center_id": ctx.center_id, "appointment_id": appointment_id, "rating": 5 });
    let response = ctx.app().oneshot(ctx.request("POST", "/", Some(body))).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Completed appointment not found");
}

#[tokio::test]
async fn test_verified_rating_for_completed_appointment() {
    let ctx = TestContext::new().await;
    let appointment_id = Uuid::new_v4().to_string();
    let rating_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(query_param("user_id", format!("eq.{}", ctx.user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": appointment_id }])))
        .mount(&ctx.mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/center_ratings"))
        .and(query_param("appointment_id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&ctx.mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/center_ratings"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            ctx.rating(&rating_id, 5, Some(&appointment_id))
        ])))
        .expect(1)
        .mount(&ctx.mock_server)
        .await;

    ctx.mock_center_refresh(json!([{ "rating": 5, "categories": {} }])).await;

    let body = json!({
        "center_id": ctx.center_id,
        "appointment_id": appointment_id,
        "rating": 5,
        "categories": { "staff_behavior": 5 }
    });
    let response = ctx.app().oneshot(ctx.request("POST", "/", Some(body))).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["data"]["is_verified"], true);

    let requests = ctx.mock_server.received_requests().await.unwrap();
    let insert = requests.iter().find(|r| r.method.as_str() == "POST").unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&insert.body).unwrap();
    assert_eq!(sent["is_verified"], true);
    assert_eq!(sent["categories"]["staff_behavior"], 5);

    let center_patch = requests.iter().find(|r| r.url.path() == "/rest/v1/centers").unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&center_patch.body).unwrap();
    assert_eq!(sent["rating"], 5.0);
}

#[tokio::test]
async fn test_second_general_rating_rejected() {
    let ctx = TestContext::new().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/center_ratings"))
        .and(query_param("appointment_id", "is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": Uuid::new_v4() }])))
        .mount(&ctx.mock_server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&ctx.mock_server)
        .await;

    let body = json!({ "center_id": ctx.center_id, "rating": 3 });
    let response = ctx.app().oneshot(ctx.request("POST", "/", Some(body))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "You have already rated this center");
}

#[tokio::test]
async fn test_center_ratings_are_public() {
    let ctx = TestContext::new().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/center_ratings"))
        .and(query_param("order", "rating.desc,created_at.desc"))
        .and(query_param("status", "eq.active"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            ctx.rating(&Uuid::new_v4().to_string(), 5, None),
            ctx.rating(&Uuid::new_v4().to_string(), 4, None)
        ])))
        .mount(&ctx.mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/center_ratings"))
        .and(query_param("select", "rating,categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "rating": 5, "categories": {} },
            { "rating": 4, "categories": {} },
            { "rating": 1, "categories": {} }
        ])))
        .mount(&ctx.mock_server)
        .await;

    let uri = format!("/center/{}?sort=highest&limit=2", ctx.center_id);
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = ctx.app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["ratings"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["summary"]["total"], 3);
    assert_eq!(body["data"]["summary"]["average"], 3.3);
    assert_eq!(body["data"]["summary"]["distribution"]["1"], 1);
    assert_eq!(body["data"]["summary"]["distribution"]["2"], 0);
    assert_eq!(body["data"]["pagination"]["total_pages"], 2);
}

#[tokio::test]
async fn test_huge_page_is_capped() {
    let ctx = TestContext::new().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/center_ratings"))
        .and(query_param("limit", "50"))
        .and(query_param("offset", "499950"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&ctx.mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/center_ratings"))
        .and(query_param("select", "rating,categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&ctx.mock_server)
        .await;

    let uri = format!("/center/{}?page=100000000&limit=50", ctx.center_id);
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = ctx.app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["pagination"]["page"], 10_000);
}

#[tokio::test]
async fn test_my_rating_when_none() {
    let ctx = TestContext::new().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/center_ratings"))
        .and(query_param("user_id", format!("eq.{}", ctx.user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&ctx.mock_server)
        .await;

    let uri = format!("/my-rating/{}", ctx.center_id);
    let response = ctx.app().oneshot(ctx.request("GET", &uri, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["data"].is_null());
}

#[tokio::test]
async fn test_update_merges_categories() {
    let ctx = TestContext::new().await;
    let rating_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/center_ratings"))
        .and(query_param("id", format!("eq.{}", rating_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            ctx.rating(&rating_id, 4, None)
        ])))
        .mount(&ctx.mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/center_ratings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            ctx.rating(&rating_id, 2, None)
        ])))
        .expect(1)
        .mount(&ctx.mock_server)
        .await;

    ctx.mock_center_refresh(json!([{ "rating": 2, "categories": {} }])).await;

    let uri = format!("/{}", rating_id);
    let body = json!({ "rating": 2, "categories": { "wait_time": 1 } });
    let response = ctx.app().oneshot(ctx.request("PUT", &uri, Some(body))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let requests = ctx.mock_server.received_requests().await.unwrap();
    let patch = requests
        .iter()
        .find(|r| r.method.as_str() == "PATCH" && r.url.path() == "/rest/v1/center_ratings")
        .unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&patch.body).unwrap();
    assert_eq!(sent["rating"], 2);
    assert_eq!(sent["review"], "Quick and helpful");
    assert_eq!(sent["categories"]["service_quality"], 4);
    assert_eq!(sent["categories"]["wait_time"], 1);
}

#[tokio::test]
async fn test_cannot_delete_someone_elses_rating() {
    let ctx = TestContext::new().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/center_ratings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&ctx.mock_server)
        .await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&ctx.mock_server)
        .await;

    let uri = format!("/{}", Uuid::new_v4());
    let response = ctx.app().oneshot(ctx.request("DELETE", &uri, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_submit_requires_auth() {
    let ctx = TestContext::new().await;

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "center_id": ctx.center_id, "rating": 4 }).to_string()))
        .unwrap();
    let response = ctx.app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_mark_helpful_counts_the_vote() {
    let ctx = TestContext::new().await;
    let rating_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/center_ratings"))
        .and(query_param("id", format!("eq.{}", rating_id)))
        .and(query_param("status", "eq.active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([ctx.others_rating(&rating_id, &[])])))
        .mount(&ctx.mock_server)
        .await;

    let user_id = ctx.user.uuid();
    let mut voted = ctx.others_rating(&rating_id, &[user_id]);
    voted["helpful_count"] = json!(1);
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/center_ratings"))
        .and(query_param("helpful_count", "eq.0"))
        .and(body_partial_json(json!({ "helpful": [user_id], "helpful_count": 1 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([voted])))
        .expect(1)
        .mount(&ctx.mock_server)
        .await;

    let response = ctx
        .app()
        .oneshot(ctx.request("POST", &format!("/{}/helpful", rating_id), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["helpful_count"], 1);
}

#[tokio::test]
async fn test_helpful_vote_retries_after_concurrent_vote() {
    let ctx = TestContext::new().await;
    let rating_id = Uuid::new_v4().to_string();
    let other_voter = Uuid::new_v4();
    let user_id = ctx.user.uuid();

    Mock::given(method("GET"))
        .and(path("/rest/v1/center_ratings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([ctx.others_rating(&rating_id, &[])])))
        .up_to_n_times(1)
        .mount(&ctx.mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/center_ratings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            ctx.others_rating(&rating_id, &[other_voter])
        ])))
        .mount(&ctx.mock_server)
        .await;

    // The first write lost the race
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/center_ratings"))
        .and(query_param("helpful_count", "eq.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&ctx.mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/center_ratings"))
        .and(query_param("helpful_count", "eq.1"))
        .and(body_partial_json(json!({ "helpful": [other_voter, user_id], "helpful_count": 2 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            ctx.others_rating(&rating_id, &[other_voter, user_id])
        ])))
        .expect(1)
        .mount(&ctx.mock_server)
        .await;

    let response = ctx
        .app()
        .oneshot(ctx.request("POST", &format!("/{}/helpful", rating_id), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["helpful_count"], 2);
}

#[tokio::test]
async fn test_own_rating_cannot_be_marked_helpful() {
    let ctx = TestContext::new().await;
    let rating_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/center_ratings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([ctx.rating(&rating_id, 5, None)])))
        .mount(&ctx.mock_server)
        .await;

    let response = ctx
        .app()
        .oneshot(ctx.request("POST", &format!("/{}/helpful", rating_id), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "You cannot mark your own rating as helpful");
}

#[tokio::test]
async fn test_report_needs_a_reason() {
    let ctx = TestContext::new().await;

    let response = ctx
        .app()
        .oneshot(ctx.request("POST", &format!("/{}/report", Uuid::new_v4()), Some(json!({ "reason": " " }))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Report reason is required");
}

#[tokio::test]
async fn test_second_report_by_same_user_is_a_conflict() {
    let ctx = TestContext::new().await;
    let rating_id = Uuid::new_v4().to_string();

    let mut rating = ctx.others_rating(&rating_id, &[]);
    rating["reports"] = json!([{
        "user_id": ctx.user.id,
        "reason": "Spam",
        "reported_at": "2025-01-21T09:00:00Z"
    }]);
    rating["report_count"] = json!(1);
    Mock::given(method("GET"))
        .and(path("/rest/v1/center_ratings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([rating])))
        .mount(&ctx.mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/center_ratings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&ctx.mock_server)
        .await;

    let response = ctx
        .app()
        .oneshot(ctx.request("POST", &format!("/{}/report", rating_id), Some(json!({ "reason": "Spam" }))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"], "You have already reported this rating");
}

#[tokio::test]
async fn test_staff_responds_within_own_center() {
    let ctx = TestContext::with_user(TestUser::staff("staff@example.com")).await;
    ctx.mock_staff(json!(["manage_appointments", "manage_ratings"])).await;
    let rating_id = Uuid::new_v4().to_string();

    let mut answered = ctx.others_rating(&rating_id, &[]);
    answered["response"] = json!({
        "text": "Thank you, we have added a second counter.",
        "responded_by": ctx.user.id,
        "responded_at": "2025-01-22T09:00:00Z"
    });
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/center_ratings"))
        .and(query_param("id", format!("eq.{}", rating_id)))
        .and(query_param("center_id", format!("eq.{}", ctx.center_id)))
        .and(body_partial_json(json!({
            "response": { "text": "Thank you, we have added a second counter.", "responded_by": ctx.user.id }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([answered])))
        .expect(1)
        .mount(&ctx.mock_server)
        .await;

    let response = ctx
        .app()
        .oneshot(ctx.request(
            "POST",
            &format!("/{}/respond", rating_id),
            Some(json!({ "response_text": "  Thank you, we have added a second counter. " })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["response"]["text"], "Thank you, we have added a second counter.");
    assert!(body["data"].get("helpful").is_none());
}

#[tokio::test]
async fn test_responding_needs_manage_ratings() {
    let ctx = TestContext::with_user(TestUser::staff("staff@example.com")).await;
    ctx.mock_staff(json!(["manage_appointments"])).await;

    let response = ctx
        .app()
        .oneshot(ctx.request(
            "POST",
            &format!("/{}/respond", Uuid::new_v4()),
            Some(json!({ "response_text": "Thanks" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await["error"],
        "Access denied. Permission 'manage_ratings' required."
    );
}

#[tokio::test]
async fn test_staff_lists_hidden_low_ratings() {
    let ctx = TestContext::with_user(TestUser::staff("staff@example.com")).await;
    ctx.mock_staff(json!(["view_ratings"])).await;
    let rating_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/center_ratings"))
        .and(query_param("select", "id"))
        .and(query_param("center_id", format!("eq.{}", ctx.center_id)))
        .and(query_param("status", "eq.hidden"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": rating_id }])))
        .mount(&ctx.mock_server)
        .await;

    let mut hidden = ctx.others_rating(&rating_id, &[]);
    hidden["status"] = json!("hidden");
    Mock::given(method("GET"))
        .and(path("/rest/v1/center_ratings"))
        .and(query_param("status", "eq.hidden"))
        .and(query_param("order", "created_at.desc"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([hidden])))
        .mount(&ctx.mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/center_ratings"))
        .and(query_param("select", "rating,categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "rating": 4, "categories": {} }])))
        .mount(&ctx.mock_server)
        .await;

    let response = ctx
        .app()
        .oneshot(ctx.request("GET", "/staff/center-ratings?status=hidden&max_rating=2", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["ratings"][0]["status"], "hidden");
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["summary"]["total"], 1);
}

#[tokio::test]
async fn test_staff_hides_a_rating() {
    let ctx = TestContext::with_user(TestUser::staff("staff@example.com")).await;
    ctx.mock_staff(json!(["manage_ratings"])).await;
    let rating_id = Uuid::new_v4().to_string();

    let mut hidden = ctx.others_rating(&rating_id, &[]);
    hidden["status"] = json!("hidden");
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/center_ratings"))
        .and(query_param("center_id", format!("eq.{}", ctx.center_id)))
        .and(query_param("status", "neq.removed"))
        .and(body_partial_json(json!({ "status": "hidden" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([hidden])))
        .expect(1)
        .mount(&ctx.mock_server)
        .await;
    ctx.mock_center_refresh(json!([])).await;

    let response = ctx
        .app()
        .oneshot(ctx.request(
            "PUT",
            &format!("/staff/{}/visibility", rating_id),
            Some(json!({ "status": "hidden" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "Rating hidden successfully");
}

#[tokio::test]
async fn test_staff_cannot_remove_a_rating() {
    let ctx = TestContext::with_user(TestUser::staff("staff@example.com")).await;
    ctx.mock_staff(json!(["manage_ratings"])).await;

    let response = ctx
        .app()
        .oneshot(ctx.request(
            "PUT",
            &format!("/staff/{}/visibility", Uuid::new_v4()),
            Some(json!({ "status": "removed" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "Only administrators can remove ratings");
}

#[tokio::test]
async fn test_admin_removes_any_rating() {
    let ctx = TestContext::with_user(TestUser::admin("admin@example.com")).await;
    let rating_id = Uuid::new_v4().to_string();

    let mut removed = ctx.others_rating(&rating_id, &[]);
    removed["status"] = json!("removed");
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/center_ratings"))
        .and(query_param("id", format!("eq.{}", rating_id)))
        .and(body_partial_json(json!({ "status": "removed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([removed])))
        .expect(1)
        .mount(&ctx.mock_server)
        .await;
    ctx.mock_center_refresh(json!([])).await;

    let response = ctx
        .app()
        .oneshot(ctx.request(
            "PUT",
            &format!("/staff/{}/visibility", rating_id),
            Some(json!({ "status": "removed" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "Rating removed successfully");
}
