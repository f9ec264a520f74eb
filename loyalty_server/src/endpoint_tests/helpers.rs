use std::{sync::Arc, time::Duration};

use actix_web::{http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use log::debug;
use loyalty_engine::{
    accrual_pool::{AccrualPool, PoolConfig},
    balance_service::BalanceService,
    test_utils::{memory_db::MemoryDatabase, scripted_accrual::ScriptedAccrual},
    user_locks::UserLocks,
    OrderFlowApi,
};
use tokio::sync::watch;

use crate::helpers::USER_ID_HEADER;

pub async fn send_request<F>(req: TestRequest, user_id: Option<&str>, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let _ = env_logger::try_init();
    let req = match user_id {
        Some(id) => req.insert_header((USER_ID_HEADER, id)),
        None => req,
    };
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}

pub async fn get_request<F>(path: &str, user_id: Option<&str>, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    send_request(TestRequest::get().uri(path), user_id, configure).await
}

/// An order flow API backed by an in-memory database, with an idle accrual pool, so submitted orders stay queued.
pub fn memory_order_flow(db: &MemoryDatabase) -> OrderFlowApi<MemoryDatabase> {
    let config = PoolConfig {
        queue_capacity: 10,
        worker_count: 0,
        reconcile_interval: Duration::from_secs(3600),
        stale_after: Duration::from_secs(3600),
    };
    let (_, rx) = watch::channel(false);
    let pool =
        AccrualPool::start(config, Arc::new(db.clone()), Arc::new(db.clone()), Arc::new(ScriptedAccrual::new()), rx);
    let balance = BalanceService::new(Arc::new(db.clone()), UserLocks::new());
    OrderFlowApi::new(db.clone(), pool, balance)
}
