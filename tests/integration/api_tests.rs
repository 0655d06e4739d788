//! API integration tests, served in-process over the in-memory store

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use barberflow_server::{
    api::{self, OwnerClaims},
    config::AppConfig,
    models::{schedule::CreateScheduleRule, Money, NewService, NewShop},
    repository::Repository,
    services::{events::EventBus, Services},
    AppState,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;

const OWNER: i32 = 42;
const SECRET: &str = "test-secret";

struct TestApp {
    router: Router,
    shop_id: i32,
    service_id: i32,
}

async fn spawn_app() -> TestApp {
    let mut config = AppConfig::default();
    config.database.url = "memory://".to_string();
    config.auth.jwt_secret = SECRET.to_string();

    let services = Services::new(Repository::in_memory(), EventBus::default());
    let shop = services
        .shops
        .create(NewShop {
            name: "Navalha de Ouro".to_string(),
            slug: "navalha-de-ouro".to_string(),
            description: None,
            address: Some("Rua Augusta 100".to_string()),
            logo_url: None,
            owner_id: OWNER,
            timezone: Some("America/Sao_Paulo".to_string()),
        })
        .await
        .unwrap();
    let shop_id = shop.persisted_id().unwrap();
    let service = services
        .shops
        .add_service(
            OWNER,
            shop_id,
            NewService {
                shop_id,
                name: "Beard trim".to_string(),
                description: None,
                price: Money::brl(Decimal::new(3000, 2)).unwrap(),
                duration_minutes: 30,
            },
        )
        .await
        .unwrap();
    services
        .schedules
        .create(
            OWNER,
            shop_id,
            &CreateScheduleRule {
                day_of_week: 1,
                start_time: "09:00".to_string(),
                end_time: "18:00".to_string(),
            },
        )
        .await
        .unwrap();

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };
    TestApp {
        router: api::router(state),
        shop_id,
        service_id: service.persisted_id().unwrap(),
    }
}

fn customer() -> Value {
    json!({
        "name": "Paulo Mendes",
        "email": "paulo@mail.com",
        "phone": "+55 (11) 98765-4321"
    })
}

fn token_for(owner_id: i32) -> String {
    let now = chrono::Utc::now().timestamp();
    OwnerClaims {
        sub: owner_id,
        exp: now + 3600,
        iat: now,
    }
    .create_token(SECRET)
    .unwrap()
}

async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let (status, body) = send(&app, Method::GET, "/api/v1/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn test_public_shop_page() {
    let app = spawn_app().await;
    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/public/shops/navalha-de-ouro",
        None,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timezone"], "America/Sao_Paulo");
    assert_eq!(body["services"][0]["price"], "30.00");
    assert_eq!(body["opening_hours"][0]["day_name"], "Monday");
    assert_eq!(body["opening_hours"][0]["start_time"], "09:00");

    let (status, body) = send(&app, Method::GET, "/api/v1/public/shops/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn test_book_then_conflict_then_cancel() {
    let app = spawn_app().await;
    let availability = format!(
        "/api/v1/public/shops/navalha-de-ouro/availability?date=2025-03-10&service_id={}",
        app.service_id
    );

    let (status, body) = send(&app, Method::GET, &availability, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slots"].as_array().unwrap().len(), 35);
    assert_eq!(body["slots"][0]["start_time"], "2025-03-10T09:00:00Z");
    assert_eq!(body["slots"][0]["local_start"], "06:00");

    let booking = json!({
        "service_id": app.service_id,
        "customer": customer(),
        "start_time": "2025-03-10T09:00:00Z"
    });
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/public/shops/navalha-de-ouro/appointments",
        None,
        Some(booking.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["appointment"]["status"], "CONFIRMED");
    assert_eq!(body["appointment"]["end_time"], "2025-03-10T09:30:00Z");
    let cancel_token = body["cancel_token"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/public/shops/navalha-de-ouro/appointments",
        None,
        Some(booking.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 9);

    let (_, body) = send(&app, Method::GET, &availability, None, None).await;
    assert_eq!(body["slots"][0]["start_time"], "2025-03-10T09:30:00Z");

    let cancel = format!("/api/v1/public/appointments/cancel/{}", cancel_token);
    let (status, body) = send(
        &app,
        Method::POST,
        &cancel,
        None,
        Some(json!({ "reason": "travel" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CANCELED");
    assert_eq!(body["cancellation_reason"], "travel");

    // Already canceled
    let (status, _) = send(&app, Method::POST, &cancel, None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // The window is free again
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/public/shops/navalha-de-ouro/appointments",
        None,
        Some(booking),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_booking_outside_offered_slots() {
    let app = spawn_app().await;
    // Tuesday, no rule
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/public/shops/navalha-de-ouro/appointments",
        None,
        Some(json!({
            "service_id": app.service_id,
            "customer": customer(),
            "start_time": "2025-03-11T10:00:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 9);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/public/shops/navalha-de-ouro/appointments",
        None,
        Some(json!({
            "service_id": 0,
            "customer": customer(),
            "start_time": "2025-03-10T10:00:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/public/shops/navalha-de-ouro/appointments",
        None,
        Some(json!({
            "service_id": app.service_id,
            "customer": { "name": "Paulo", "email": "not-an-email", "phone": "11987654321" },
            "start_time": "2025-03-10T10:00:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn test_start_time_at_calendar_end_is_rejected() {
    let app = spawn_app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/public/shops/navalha-de-ouro/appointments",
        None,
        Some(json!({
            "service_id": app.service_id,
            "customer": customer(),
            "start_time": "+262142-12-31T23:50:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidRange");

    // The server keeps serving
    let (status, _) = send(&app, Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_returning_customer_keeps_one_history() {
    let app = spawn_app().await;
    let book = |start: &str, email: &str| {
        json!({
            "service_id": app.service_id,
            "customer": { "name": "Paulo Mendes", "email": email, "phone": "11 98765-4321" },
            "start_time": start
        })
    };

    let (status, first) = send(
        &app,
        Method::POST,
        "/api/v1/public/shops/navalha-de-ouro/appointments",
        None,
        Some(book("2025-03-10T10:00:00Z", "paulo@mail.com")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    // Different email, same phone
    let (status, second) = send(
        &app,
        Method::POST,
        "/api/v1/public/shops/navalha-de-ouro/appointments",
        None,
        Some(book("2025-03-17T10:00:00Z", "paulo@work.com")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let customer_id = first["appointment"]["customer_id"].as_i64().unwrap();
    assert_eq!(second["appointment"]["customer_id"].as_i64().unwrap(), customer_id);

    let history = format!(
        "/api/v1/shops/{}/customers/{}/appointments",
        app.shop_id, customer_id
    );
    let (status, body) = send(&app, Method::GET, &history, Some(&token_for(OWNER)), None).await;
    assert_eq!(status, StatusCode::OK);
    let body = body.as_array().unwrap();
    assert_eq!(body.len(), 2);
    assert_eq!(body[0]["start_time"], "2025-03-17T10:00:00Z");

    let (status, _) = send(&app, Method::GET, &history, Some(&token_for(OWNER + 1)), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_owner_shop_and_service_management() {
    let app = spawn_app().await;
    let owner = token_for(OWNER);

    let (status, body) = send(&app, Method::GET, "/api/v1/shops", Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["slug"], "navalha-de-ouro");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/shops",
        Some(&owner),
        Some(json!({ "name": "Navalha Centro", "slug": "navalha-centro" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["timezone"], "UTC");
    assert_eq!(body["owner_id"], OWNER);
    let new_shop = body["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/shops",
        Some(&owner),
        Some(json!({ "name": "Copy", "slug": "navalha-centro" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");

    let shop = format!("/api/v1/shops/{}", new_shop);
    let (status, body) = send(
        &app,
        Method::PUT,
        &shop,
        Some(&owner),
        Some(json!({ "timezone": "Europe/Lisbon", "address": "Rua Garrett 1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timezone"], "Europe/Lisbon");
    assert_eq!(body["name"], "Navalha Centro");

    let (status, _) = send(&app, Method::GET, &shop, Some(&token_for(OWNER + 1)), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let services = format!("{}/services", shop);
    let (status, body) = send(
        &app,
        Method::POST,
        &services,
        Some(&owner),
        Some(json!({ "name": "Corte", "price": "55.5", "duration_minutes": 45 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["price"], "55.50");
    assert_eq!(body["currency"], "BRL");
    assert_eq!(body["is_active"], true);
    let service_id = body["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        Method::POST,
        &services,
        Some(&owner),
        Some(json!({ "name": "Free", "price": "10.00", "duration_minutes": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let one = format!("{}/{}", services, service_id);
    let (status, body) = send(
        &app,
        Method::PUT,
        &one,
        Some(&owner),
        Some(json!({ "duration_minutes": 60 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["duration_minutes"], 60);

    let (status, _) = send(&app, Method::DELETE, &one, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&app, Method::GET, &services, Some(&owner), None).await;
    assert_eq!(body[0]["is_active"], false);
    let (_, body) = send(&app, Method::GET, "/api/v1/public/shops/navalha-centro", None, None).await;
    assert!(body["services"].as_array().unwrap().is_empty());

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("{}/999", services),
        Some(&owner),
        Some(json!({ "is_active": true })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_owner_routes_require_token() {
    let app = spawn_app().await;
    let rules = format!("/api/v1/shops/{}/schedule-rules", app.shop_id);

    let (status, _) = send(&app, Method::GET, &rules, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, &rules, Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let stranger = token_for(OWNER + 1);
    let (status, _) = send(&app, Method::GET, &rules, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let owner = token_for(OWNER);
    let (status, body) = send(&app, Method::GET, &rules, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_schedule_rule_lifecycle() {
    let app = spawn_app().await;
    let owner = token_for(OWNER);
    let rules = format!("/api/v1/shops/{}/schedule-rules", app.shop_id);

    let (status, body) = send(
        &app,
        Method::POST,
        &rules,
        Some(&owner),
        Some(json!({ "day_of_week": 1, "start_time": "17:30", "end_time": "20:00" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "RuleConflict");

    let (status, _) = send(
        &app,
        Method::POST,
        &rules,
        Some(&owner),
        Some(json!({ "day_of_week": 2, "start_time": "18:00", "end_time": "09:00" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        &rules,
        Some(&owner),
        Some(json!({ "day_of_week": 6, "start_time": "08:00", "end_time": "12:00" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["day_name"], "Saturday");
    let rule_id = body["id"].as_i64().unwrap();

    let rule = format!("{}/{}", rules, rule_id);
    let (status, body) = send(
        &app,
        Method::PUT,
        &rule,
        Some(&owner),
        Some(json!({ "end_time": "13:00" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["start_time"], "08:00");
    assert_eq!(body["end_time"], "13:00");

    let (status, _) = send(&app, Method::DELETE, &rule, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::DELETE, &rule, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_owner_appointment_management() {
    let app = spawn_app().await;
    let owner = token_for(OWNER);

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/v1/public/shops/navalha-de-ouro/appointments",
        None,
        Some(json!({
            "service_id": app.service_id,
            "customer": customer(),
            "start_time": "2025-03-10T10:00:00Z"
        })),
    )
    .await;
    let id = body["appointment"]["id"].as_i64().unwrap();

    let list = format!(
        "/api/v1/shops/{}/appointments?start_date=2025-03-10&end_date=2025-03-10",
        app.shop_id
    );
    let (status, body) = send(&app, Method::GET, &list, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert!(body[0].get("cancel_token").is_none());

    let backwards = format!(
        "/api/v1/shops/{}/appointments?start_date=2025-03-11&end_date=2025-03-10",
        app.shop_id
    );
    let (status, _) = send(&app, Method::GET, &backwards, Some(&owner), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let one = format!("/api/v1/shops/{}/appointments/{}", app.shop_id, id);
    let (status, body) = send(
        &app,
        Method::PUT,
        &one,
        Some(&owner),
        Some(json!({ "status": "COMPLETED", "notes": "Paid cash" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "COMPLETED");
    assert_eq!(body["notes"], "Paid cash");

    // Terminal
    let (status, body) = send(
        &app,
        Method::PUT,
        &one,
        Some(&owner),
        Some(json!({ "status": "CANCELED" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 11);

    let (status, body) = send(&app, Method::GET, &one, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "COMPLETED");
}
