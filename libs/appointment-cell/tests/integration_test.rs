use std::sync::Arc;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt;
use serde_json::json;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};
use chrono::{Duration, NaiveDate};
use uuid::Uuid;

use appointment_cell::router::appointment_routes;
use appointment_cell::services::calendar::{fixed_closure, CenterClock};
use shared_config::AppConfig;
use shared_utils::test_utils::{TestConfig, TestUser, JwtTestUtils, MockSupabaseResponses};

struct TestContext {
    mock_server: MockServer,
    config: AppConfig,
    user: TestUser,
    token: String,
    service_id: String,
    center_id: String,
}

impl TestContext {
    async fn new() -> Self {
        let mock_server = MockServer::start().await;
        let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
        let user = TestUser::citizen("citizen@example.com");
        let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

        Self {
            mock_server,
            config,
            user,
            token,
            service_id: Uuid::new_v4().to_string(),
            center_id: Uuid::new_v4().to_string(),
        }
    }

    fn app(&self) -> Router {
        appointment_routes(Arc::new(self.config.clone()))
    }

    /// First day within the advance window that is not a Sunday or second Saturday.
    fn bookable_date(&self) -> NaiveDate {
        let today = CenterClock::from_config(&self.config).today();
        (1..=3)
            .map(|offset| today + Duration::days(offset))
            .find(|date| fixed_closure(*date).is_none())
            .unwrap()
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

    async fn mock_catalog(&self, center_services: &[&str]) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/services"))
            .and(query_param("id", format!("eq.{}", self.service_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockSupabaseResponses::service_response(&self.service_id, 0.0)
            ])))
            .mount(&self.mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/centers"))
            .and(query_param("id", format!("eq.{}", self.center_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockSupabaseResponses::center_response(&self.center_id, center_services)
            ])))
            .mount(&self.mock_server)
            .await;
    }

    async fn mock_holidays(&self, holidays: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/holidays"))
            .respond_with(ResponseTemplate::new(200).set_body_json(holidays))
            .mount(&self.mock_server)
            .await;
    }

    async fn mock_booked_slots(&self, booked: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/appointments"))
            .and(query_param("select", "id,time_slot"))
            .respond_with(ResponseTemplate::new(200).set_body_json(booked))
            .mount(&self.mock_server)
            .await;
    }

    fn appointment(&self, id: &str, date: NaiveDate, slot: &str, status: &str) -> serde_json::Value {
        MockSupabaseResponses::appointment_response(
            id,
            &self.user.id,
            &self.service_id,
            &self.center_id,
            &date.to_string(),
            slot,
            status,
        )
    }

    fn booking_body(&self, date: NaiveDate, slot: &str) -> serde_json::Value {
        json!({
            "service_id": self.service_id,
            "center_id": self.center_id,
            "appointment_date": date,
            "time_slot": slot,
            "notes": "First visit"
        })
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_requires_authentication() {
    let ctx = TestContext::new().await;

    let request = Request::builder()
        .method("GET")
        .uri("/")
        .body(Body::empty())
        .unwrap();

    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_my_appointments_newest_booking_first() {
    let ctx = TestContext::new().await;
    let date = ctx.bookable_date();
    let newer = Uuid::new_v4().to_string();
    let older = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("user_id", format!("eq.{}", ctx.user.id)))
        .and(query_param("order", "created_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            ctx.appointment(&newer, date, "09:00 AM", "confirmed"),
            ctx.appointment(&older, date + Duration::days(1), "11:00 AM", "confirmed")
        ])))
        .expect(1)
        .mount(&ctx.mock_server)
        .await;

    let response = ctx.app().oneshot(ctx.request("GET", "/", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["appointments"][0]["id"], newer);
}

#[tokio::test]
async fn test_book_appointment_success() {
    let ctx = TestContext::new().await;
    let date = ctx.bookable_date();
    let appointment_id = Uuid::new_v4().to_string();

    ctx.mock_catalog(&[&ctx.service_id]).await;
    ctx.mock_holidays(json!([])).await;
    ctx.mock_booked_slots(json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            ctx.appointment(&appointment_id, date, "10:00 AM", "confirmed")
        ])))
        .expect(1)
        .mount(&ctx.mock_server)
        .await;

    let response = ctx
        .app()
        .oneshot(ctx.request("POST", "/", Some(ctx.booking_body(date, "10:00 am"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["appointment"]["id"], appointment_id);
    assert_eq!(body["appointment"]["status"], "confirmed");
    assert_eq!(body["appointment"]["payment"]["status"], "unpaid");
    assert_eq!(body["appointment"]["can_cancel"], true);
}

#[tokio::test]
async fn test_booked_slot_is_rejected() {
    let ctx = TestContext::new().await;
    let date = ctx.bookable_date();

    ctx.mock_catalog(&[&ctx.service_id]).await;
    ctx.mock_holidays(json!([])).await;
    ctx.mock_booked_slots(json!([{ "id": Uuid::new_v4(), "time_slot": "10:00 AM" }])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&ctx.mock_server)
        .await;

    let response = ctx
        .app()
        .oneshot(ctx.request("POST", "/", Some(ctx.booking_body(date, "10:00"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "This time slot is already booked");
}

#[tokio::test]
async fn test_booking_on_full_day_is_rejected() {
    let ctx = TestContext::new().await;
    let date = ctx.bookable_date();

    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::service_response(&ctx.service_id, 0.0)
        ])))
        .mount(&ctx.mock_server)
        .await;

    let mut center = MockSupabaseResponses::center_response(&ctx.center_id, &[&ctx.service_id]);
    center["max_appointments_per_day"] = json!(2);
    Mock::given(method("GET"))
        .and(path("/rest/v1/centers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([center])))
        .mount(&ctx.mock_server)
        .await;

    ctx.mock_holidays(json!([])).await;
    ctx.mock_booked_slots(json!([
        { "id": Uuid::new_v4(), "time_slot": "09:00 AM" },
        { "id": Uuid::new_v4(), "time_slot": "02:30 PM" }
    ])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&ctx.mock_server)
        .await;

    let response = ctx
        .app()
        .oneshot(ctx.request("POST", "/", Some(ctx.booking_body(date, "10:00 AM"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "This center is fully booked on the selected date"
    );
}

#[tokio::test]
async fn test_unique_index_conflict_reads_as_booked_slot() {
    let ctx = TestContext::new().await;
    let date = ctx.bookable_date();

    ctx.mock_catalog(&[&ctx.service_id]).await;
    ctx.mock_holidays(json!([])).await;
    ctx.mock_booked_slots(json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            MockSupabaseResponses::error_response("duplicate key value", "23505")
        ))
        .mount(&ctx.mock_server)
        .await;

    let response = ctx
        .app()
        .oneshot(ctx.request("POST", "/", Some(ctx.booking_body(date, "11:30 AM"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "This time slot is already booked");
}

#[tokio::test]
async fn test_service_not_offered_at_center() {
    let ctx = TestContext::new().await;
    let date = ctx.bookable_date();

    ctx.mock_catalog(&[]).await;

    let response = ctx
        .app()
        .oneshot(ctx.request("POST", "/", Some(ctx.booking_body(date, "10:00 AM"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Selected service is not available at this center"
    );
}

#[tokio::test]
async fn test_holiday_blocks_booking() {
    let ctx = TestContext::new().await;
    let date = ctx.bookable_date();

    ctx.mock_catalog(&[&ctx.service_id]).await;
    ctx.mock_holidays(json!([
        MockSupabaseResponses::holiday_response(&date.to_string(), "Onam")
    ])).await;

    let response = ctx
        .app()
        .oneshot(ctx.request("POST", "/", Some(ctx.booking_body(date, "10:00 AM"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Bookings are not available on this holiday: Onam."
    );
}

#[tokio::test]
async fn test_booking_beyond_advance_window() {
    let ctx = TestContext::new().await;
    let date = CenterClock::from_config(&ctx.config).today() + Duration::days(10);

    ctx.mock_catalog(&[&ctx.service_id]).await;

    let response = ctx
        .app()
        .oneshot(ctx.request("POST", "/", Some(ctx.booking_body(date, "10:00 AM"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Appointments can only be booked up to 3 days in advance"
    );
}

#[tokio::test]
async fn test_slot_outside_opening_hours() {
    let ctx = TestContext::new().await;
    let date = ctx.bookable_date();

    ctx.mock_catalog(&[&ctx.service_id]).await;

    let response = ctx
        .app()
        .oneshot(ctx.request("POST", "/", Some(ctx.booking_body(date, "05:00 PM"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_insufficient_documents() {
    let ctx = TestContext::new().await;
    let date = ctx.bookable_date();

    ctx.mock_catalog(&[&ctx.service_id]).await;
    ctx.mock_holidays(json!([])).await;

    let mut body = ctx.booking_body(date, "10:00 AM");
    body["selected_documents"] = json!(["Aadhaar Card"]);

    let response = ctx.app().oneshot(ctx.request("POST", "/", Some(body))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Please select at least 2 documents to proceed. You have selected 1."
    );
}

#[tokio::test]
async fn test_slots_on_sunday_are_closed() {
    let ctx = TestContext::new().await;
    let sunday = NaiveDate::from_ymd_opt(2030, 1, 6).unwrap();

    let uri = format!("/slots/{}/{}", ctx.service_id, sunday);
    let response = ctx.app().oneshot(ctx.request("GET", &uri, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["is_holiday"], true);
    assert_eq!(body["data"]["reason"], "Sunday");
    assert_eq!(body["data"]["available_slots"], json!([]));
}

#[tokio::test]
async fn test_slots_exclude_booked_times() {
    let ctx = TestContext::new().await;
    let monday = NaiveDate::from_ymd_opt(2030, 1, 7).unwrap();

    ctx.mock_holidays(json!([])).await;
    ctx.mock_booked_slots(json!([
        { "id": Uuid::new_v4(), "time_slot": "09:00 AM" },
        { "id": Uuid::new_v4(), "time_slot": "02:30 PM" }
    ])).await;

    let uri = format!("/slots/{}/{}?center={}", ctx.service_id, monday, ctx.center_id);
    let response = ctx.app().oneshot(ctx.request("GET", &uri, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["is_holiday"], false);
    assert_eq!(body["data"]["available_slots"].as_array().unwrap().len(), 14);
    assert_eq!(body["data"]["booked_slots"], json!(["09:00 AM", "02:30 PM"]));
}

#[tokio::test]
async fn test_other_users_appointment_is_not_found() {
    let ctx = TestContext::new().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("user_id", format!("eq.{}", ctx.user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&ctx.mock_server)
        .await;

    let uri = format!("/{}", Uuid::new_v4());
    let response = ctx.app().oneshot(ctx.request("GET", &uri, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_before_cutoff() {
    let ctx = TestContext::new().await;
    let date = ctx.bookable_date();
    let appointment_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            ctx.appointment(&appointment_id, date, "10:00 AM", "confirmed")
        ])))
        .mount(&ctx.mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            ctx.appointment(&appointment_id, date, "10:00 AM", "cancelled")
        ])))
        .expect(1)
        .mount(&ctx.mock_server)
        .await;

    let uri = format!("/{}", appointment_id);
    let response = ctx.app().oneshot(ctx.request("DELETE", &uri, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["appointment_id"], appointment_id);
}

#[tokio::test]
async fn test_cancel_after_cutoff_is_rejected() {
    let ctx = TestContext::new().await;
    let yesterday = CenterClock::from_config(&ctx.config).today() - Duration::days(1);
    let appointment_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            ctx.appointment(&appointment_id, yesterday, "10:00 AM", "confirmed")
        ])))
        .mount(&ctx.mock_server)
        .await;

    let uri = format!("/{}", appointment_id);
    let response = ctx.app().oneshot(ctx.request("DELETE", &uri, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Appointments cannot be cancelled after 9:00 AM on the appointment day"
    );
}

#[tokio::test]
async fn test_reschedule_requires_date_and_slot() {
    let ctx = TestContext::new().await;

    let uri = format!("/{}/reschedule", Uuid::new_v4());
    let response = ctx
        .app()
        .oneshot(ctx.request("PUT", &uri, Some(json!({ "time_slot": "10:00 AM" }))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "New appointment date and time slot are required"
    );
}

#[tokio::test]
async fn test_reschedule_of_far_appointment_points_to_update() {
    let ctx = TestContext::new().await;
    let date = CenterClock::from_config(&ctx.config).today() + Duration::days(2);
    let appointment_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            ctx.appointment(&appointment_id, date, "10:00 AM", "confirmed")
        ])))
        .mount(&ctx.mock_server)
        .await;

    let uri = format!("/{}/reschedule", appointment_id);
    let body = json!({ "appointment_date": date, "time_slot": "11:00 AM" });
    let response = ctx.app().oneshot(ctx.request("PUT", &uri, Some(body))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Use standard update; appointment is editable (more than 3 hours away)"
    );
}

async fn mock_owned_appointment(ctx: &TestContext, appointment: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("user_id", format!("eq.{}", ctx.user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment])))
        .mount(&ctx.mock_server)
        .await;
}

async fn sent_patch(ctx: &TestContext) -> serde_json::Value {
    let requests = ctx.mock_server.received_requests().await.unwrap();
    let patch = requests
        .iter()
        .find(|r| r.method.as_str() == "PATCH" && r.url.path() == "/rest/v1/appointments")
        .unwrap();
    serde_json::from_slice(&patch.body).unwrap()
}

#[tokio::test]
async fn test_booking_stores_sortable_slot_start() {
    let ctx = TestContext::new().await;
    let date = ctx.bookable_date();
    let appointment_id = Uuid::new_v4().to_string();

    ctx.mock_catalog(&[&ctx.service_id]).await;
    ctx.mock_holidays(json!([])).await;
    ctx.mock_booked_slots(json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            ctx.appointment(&appointment_id, date, "01:30 PM", "confirmed")
        ])))
        .expect(1)
        .mount(&ctx.mock_server)
        .await;

    let response = ctx
        .app()
        .oneshot(ctx.request("POST", "/", Some(ctx.booking_body(date, "1:30 pm"))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let requests = ctx.mock_server.received_requests().await.unwrap();
    let insert = requests.iter().find(|r| r.method.as_str() == "POST").unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&insert.body).unwrap();
    assert_eq!(sent["time_slot"], "01:30 PM");
    assert_eq!(sent["slot_start"], "13:30:00");
}

#[tokio::test]
async fn test_update_does_not_conflict_with_itself() {
    let ctx = TestContext::new().await;
    let date = ctx.bookable_date();
    let appointment_id = Uuid::new_v4().to_string();

    mock_owned_appointment(&ctx, ctx.appointment(&appointment_id, date, "10:00 AM", "confirmed")).await;
    ctx.mock_holidays(json!([])).await;
    ctx.mock_booked_slots(json!([{ "id": appointment_id, "time_slot": "10:00 AM" }])).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/centers"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&ctx.mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("user_id", format!("eq.{}", ctx.user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            ctx.appointment(&appointment_id, date, "10:00 AM", "confirmed")
        ])))
        .expect(1)
        .mount(&ctx.mock_server)
        .await;

    let uri = format!("/{}", appointment_id);
    let body = json!({ "time_slot": "10:00 AM", "notes": "Bring originals" });
    let response = ctx.app().oneshot(ctx.request("PUT", &uri, Some(body))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let sent = sent_patch(&ctx).await;
    assert_eq!(sent["time_slot"], "10:00 AM");
    assert_eq!(sent["slot_start"], "10:00:00");
    assert_eq!(sent["notes"], "Bring originals");
}

#[tokio::test]
async fn test_update_to_full_day_is_rejected() {
    let ctx = TestContext::new().await;
    let later = CenterClock::from_config(&ctx.config).today() + Duration::days(6);
    let date = ctx.bookable_date();
    let appointment_id = Uuid::new_v4().to_string();

    mock_owned_appointment(&ctx, ctx.appointment(&appointment_id, later, "10:00 AM", "confirmed")).await;
    ctx.mock_holidays(json!([])).await;
    ctx.mock_booked_slots(json!([{ "id": Uuid::new_v4(), "time_slot": "11:00 AM" }])).await;

    let mut center = MockSupabaseResponses::center_response(&ctx.center_id, &[&ctx.service_id]);
    center["max_appointments_per_day"] = json!(1);
    Mock::given(method("GET"))
        .and(path("/rest/v1/centers"))
        .and(query_param("id", format!("eq.{}", ctx.center_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([center])))
        .mount(&ctx.mock_server)
        .await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&ctx.mock_server)
        .await;

    let uri = format!("/{}", appointment_id);
    let body = json!({ "appointment_date": date, "time_slot": "10:00 AM" });
    let response = ctx.app().oneshot(ctx.request("PUT", &uri, Some(body))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "This center is fully booked on the selected date"
    );
}

#[tokio::test]
async fn test_update_fails_when_center_lookup_fails() {
    let ctx = TestContext::new().await;
    let later = CenterClock::from_config(&ctx.config).today() + Duration::days(6);
    let date = ctx.bookable_date();
    let appointment_id = Uuid::new_v4().to_string();

    mock_owned_appointment(&ctx, ctx.appointment(&appointment_id, later, "10:00 AM", "confirmed")).await;
    ctx.mock_holidays(json!([])).await;
    ctx.mock_booked_slots(json!([])).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/centers"))
        .respond_with(ResponseTemplate::new(500).set_body_json(
            MockSupabaseResponses::error_response("connection reset", "08006")
        ))
        .mount(&ctx.mock_server)
        .await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&ctx.mock_server)
        .await;

    let uri = format!("/{}", appointment_id);
    let body = json!({ "appointment_date": date, "time_slot": "10:00 AM" });
    let response = ctx.app().oneshot(ctx.request("PUT", &uri, Some(body))).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_update_after_cutoff_is_rejected() {
    let ctx = TestContext::new().await;
    let yesterday = CenterClock::from_config(&ctx.config).today() - Duration::days(1);
    let appointment_id = Uuid::new_v4().to_string();

    mock_owned_appointment(&ctx, ctx.appointment(&appointment_id, yesterday, "10:00 AM", "confirmed")).await;

    let uri = format!("/{}", appointment_id);
    let body = json!({ "notes": "Running late" });
    let response = ctx.app().oneshot(ctx.request("PUT", &uri, Some(body))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Appointments cannot be modified after 9:00 AM on the appointment day"
    );
}

#[tokio::test]
async fn test_reschedule_missed_appointment() {
    let ctx = TestContext::new().await;
    let yesterday = CenterClock::from_config(&ctx.config).today() - Duration::days(1);
    let date = ctx.bookable_date();
    let appointment_id = Uuid::new_v4().to_string();

    mock_owned_appointment(&ctx, ctx.appointment(&appointment_id, yesterday, "10:00 AM", "confirmed")).await;
    ctx.mock_holidays(json!([])).await;
    ctx.mock_booked_slots(json!([{ "id": Uuid::new_v4(), "time_slot": "10:00 AM" }])).await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            ctx.appointment(&appointment_id, date, "11:00 AM", "confirmed")
        ])))
        .expect(1)
        .mount(&ctx.mock_server)
        .await;

    let uri = format!("/{}/reschedule", appointment_id);
    let body = json!({ "appointment_date": date, "time_slot": "11:00 AM" });
    let response = ctx.app().oneshot(ctx.request("PUT", &uri, Some(body))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["appointment"]["time_slot"], "11:00 AM");

    let sent = sent_patch(&ctx).await;
    assert_eq!(sent["appointment_date"], date.to_string());
    assert_eq!(sent["slot_start"], "11:00:00");
    let history = sent["status_history"].as_array().unwrap();
    assert!(history.last().unwrap()["reason"].as_str().unwrap().starts_with("Rescheduled from"));
}

#[tokio::test]
async fn test_reschedule_into_taken_slot_is_rejected() {
    let ctx = TestContext::new().await;
    let yesterday = CenterClock::from_config(&ctx.config).today() - Duration::days(1);
    let date = ctx.bookable_date();
    let appointment_id = Uuid::new_v4().to_string();

    mock_owned_appointment(&ctx, ctx.appointment(&appointment_id, yesterday, "10:00 AM", "confirmed")).await;
    ctx.mock_holidays(json!([])).await;
    ctx.mock_booked_slots(json!([{ "id": Uuid::new_v4(), "time_slot": "11:00 AM" }])).await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&ctx.mock_server)
        .await;

    let uri = format!("/{}/reschedule", appointment_id);
    let body = json!({ "appointment_date": date, "time_slot": "11:00 AM" });
    let response = ctx.app().oneshot(ctx.request("PUT", &uri, Some(body))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "This time slot is already booked");
}
