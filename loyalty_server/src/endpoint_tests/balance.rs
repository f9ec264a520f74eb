use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use loyalty_engine::{
    db_types::{Balance, Points, Withdrawal},
    test_utils::memory_db::MemoryDatabase,
    AccountApi,
};
use serde_json::{json, Value};

use super::{
    helpers::{get_request, memory_order_flow, send_request},
    mocks::MockLoyaltyDb,
};
use crate::routes::{MyBalanceRoute, MyWithdrawalsRoute, WithdrawRoute};

fn configure_accounts(cfg: &mut ServiceConfig) {
    let mut db = MockLoyaltyDb::new();
    db.expect_balance_for_user()
        .returning(|_| Ok(Balance { current: Points::from(50_050), withdrawn: Points::from_points(42) }));
    db.expect_withdrawals_for_user().withf(|id| *id == 1).returning(|_| {
        Ok(vec![Withdrawal {
            order_number: "2377225624".into(),
            sum: Points::from_points(500),
            processed_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        }])
    });
    db.expect_withdrawals_for_user().returning(|_| Ok(vec![]));
    let api = AccountApi::new(db);
    cfg.service(
        web::scope("/api")
            .service(MyBalanceRoute::<MockLoyaltyDb>::new())
            .service(MyWithdrawalsRoute::<MockLoyaltyDb>::new()),
    )
    .app_data(web::Data::new(api));
}

#[actix_web::test]
async fn fetch_my_balance() {
    let (status, body) = get_request("/api/user/balance", Some("1"), configure_accounts).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["current"].as_f64(), Some(500.5));
    assert_eq!(json["withdrawn"].as_f64(), Some(42.0));
}

#[actix_web::test]
async fn fetch_my_balance_without_user() {
    let (status, _) = get_request("/api/user/balance", None, configure_accounts).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn fetch_my_withdrawals() {
    let (status, body) = get_request("/api/user/withdrawals", Some("1"), configure_accounts).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json[0]["order"], "2377225624");
    assert_eq!(json[0]["sum"].as_f64(), Some(500.0));
    assert_eq!(json[0]["processed_at"], "2024-05-01T09:00:00Z");

    let (status, _) = get_request("/api/user/withdrawals", Some("2"), configure_accounts).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

fn withdraw(body: Value) -> TestRequest {
    TestRequest::post().uri("/api/user/balance/withdraw").set_json(body)
}

fn configure_withdrawals(db: &MemoryDatabase) -> impl FnOnce(&mut ServiceConfig) {
    let api = memory_order_flow(db);
    move |cfg: &mut ServiceConfig| {
        cfg.service(web::scope("/api").service(WithdrawRoute::<MemoryDatabase>::new())).app_data(web::Data::new(api));
    }
}

#[actix_web::test]
async fn withdraw_points() {
    let db = MemoryDatabase::new();
    db.credit(1, Points::from_points(500), "10");
    let request = json!({"order": "2377225624", "sum": 120.5});
    let (status, _) = send_request(withdraw(request.clone()), Some("1"), configure_withdrawals(&db)).await;
    assert_eq!(status, StatusCode::OK);
    let entries = db.ledger_entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].difference, Points::from(-12_050));

    let (status, _) = send_request(withdraw(request), Some("1"), configure_withdrawals(&db)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn withdraw_more_than_the_balance() {
    let db = MemoryDatabase::new();
    db.credit(1, Points::from_points(10), "10");
    let request = json!({"order": "2377225624", "sum": 10.01});
    let (status, body) = send_request(withdraw(request), Some("1"), configure_withdrawals(&db)).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(body.contains("Insufficient funds"));
    assert_eq!(db.ledger_entries().len(), 1);
}

#[actix_web::test]
async fn withdraw_with_bad_input() {
    let db = MemoryDatabase::new();
    db.credit(1, Points::from_points(10), "10");
    let (status, _) =
        send_request(withdraw(json!({"order": "23a7", "sum": 1})), Some("1"), configure_withdrawals(&db)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) =
        send_request(withdraw(json!({"order": "2377", "sum": -1})), Some("1"), configure_withdrawals(&db)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = send_request(withdraw(json!({"order": "2377"})), Some("1"), configure_withdrawals(&db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send_request(withdraw(json!({"order": "2377", "sum": 1})), None, configure_withdrawals(&db)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(db.ledger_entries().len(), 1);
}
