use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use loyalty_engine::{
    db_types::{OrderStatusType, OrderWithAccrual, Points},
    test_utils::memory_db::MemoryDatabase,
    traits::OrderManagementError,
    AccountApi,
};
use serde_json::Value;

use super::{
    helpers::{get_request, memory_order_flow, send_request},
    mocks::MockLoyaltyDb,
};
use crate::routes::{MyOrdersRoute, SubmitOrderRoute};

fn submit(body: &str) -> TestRequest {
    TestRequest::post().uri("/api/user/orders").insert_header(("Content-Type", "text/plain")).set_payload(body.to_string())
}

fn configure_submissions(db: &MemoryDatabase) -> impl FnOnce(&mut ServiceConfig) {
    let api = memory_order_flow(db);
    move |cfg: &mut ServiceConfig| {
        cfg.service(web::scope("/api").service(SubmitOrderRoute::<MemoryDatabase>::new()))
            .app_data(web::Data::new(api));
    }
}

#[actix_web::test]
async fn submit_order_without_user() {
    let db = MemoryDatabase::new();
    let (status, body) = send_request(submit("12345678903"), None, configure_submissions(&db)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("X-User-Id"));
    let (status, _) = send_request(submit("12345678903"), Some("nobody"), configure_submissions(&db)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(db.order("12345678903").is_none());
}

#[actix_web::test]
async fn submit_order_lifecycle() {
    let db = MemoryDatabase::new();
    let (status, _) = send_request(submit("12345678903\n"), Some("1"), configure_submissions(&db)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(db.order("12345678903").unwrap().status, OrderStatusType::New);

    let (status, _) = send_request(submit("12345678903"), Some("1"), configure_submissions(&db)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_request(submit("12345678903"), Some("2"), configure_submissions(&db)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("another user"));
}

#[actix_web::test]
async fn submit_malformed_orders() {
    let db = MemoryDatabase::new();
    let (status, _) = send_request(submit("12ab"), Some("1"), configure_submissions(&db)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = send_request(submit("   "), Some("1"), configure_submissions(&db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn configure_orders(orders: Vec<OrderWithAccrual>) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let mut db = MockLoyaltyDb::new();
        db.expect_fetch_orders_for_user().withf(|id| *id == 1).returning(move |_| Ok(orders.clone()));
        db.expect_fetch_orders_for_user()
            .returning(|_| Err(OrderManagementError::DatabaseError("connection lost".into())));
        let api = AccountApi::new(db);
        cfg.service(web::scope("/api").service(MyOrdersRoute::<MockLoyaltyDb>::new())).app_data(web::Data::new(api));
    }
}

fn orders_response() -> Vec<OrderWithAccrual> {
    vec![
        OrderWithAccrual {
            number: "9278923470".into(),
            status: OrderStatusType::Processed,
            accrual: Some(Points::from_points(500)),
            uploaded_at: Utc.with_ymd_and_hms(2024, 3, 15, 18, 30, 0).unwrap(),
        },
        OrderWithAccrual {
            number: "346436439".into(),
            status: OrderStatusType::Invalid,
            accrual: None,
            uploaded_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
        },
    ]
}

#[actix_web::test]
async fn fetch_my_orders() {
    let (status, body) = get_request("/api/user/orders", Some("1"), configure_orders(orders_response())).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    let orders = json.as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["number"], "9278923470");
    assert_eq!(orders[0]["status"], "PROCESSED");
    assert_eq!(orders[0]["accrual"].as_f64(), Some(500.0));
    assert_eq!(orders[0]["uploaded_at"], "2024-03-15T18:30:00Z");
    assert_eq!(orders[1]["status"], "INVALID");
    assert!(orders[1].get("accrual").is_none());
}

#[actix_web::test]
async fn fetch_my_orders_when_there_are_none() {
    let (status, body) = get_request("/api/user/orders", Some("1"), configure_orders(vec![])).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
}

#[actix_web::test]
async fn fetch_my_orders_database_error() {
    let (status, body) = get_request("/api/user/orders", Some("2"), configure_orders(vec![])).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("connection lost"));
}
