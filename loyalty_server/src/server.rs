use std::{sync::Arc, time::Duration};

use accrual_client::AccrualProxy;
use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use loyalty_engine::{
    accrual_pool::AccrualPool,
    balance_service::BalanceService,
    user_locks::UserLocks,
    AccountApi,
    OrderFlowApi,
    SqliteDatabase,
};
use tokio::sync::watch;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    routes::{health, MyBalanceRoute, MyOrdersRoute, MyWithdrawalsRoute, SubmitOrderRoute, WithdrawRoute},
};

/// Wires up the database, the accrual proxy, the accrual pool and the HTTP server, and runs until the server stops.
///
/// Once the HTTP server has shut down (e.g. on SIGINT), the shutdown signal is fired and the accrual pool is drained
/// before returning.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(config.database_url.reveal(), config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
        info!("🗃️ Database migrations complete");
    }
    let proxy = AccrualProxy::new(config.accrual.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("🌐️ Accrual service at {}", config.accrual.base_url);
    let (shutdown, shutdown_signal) = watch::channel(false);
    let pool = AccrualPool::start(
        config.pool.clone(),
        Arc::new(db.clone()),
        Arc::new(db.clone()),
        Arc::new(proxy),
        shutdown_signal,
    );
    let balance = BalanceService::new(Arc::new(db.clone()), UserLocks::new());
    let srv = create_server_instance(&config, db, pool.clone(), balance)?;
    info!("🚀️ Listening on {}:{}", config.host, config.port);
    let result = srv.await;
    info!("🚀️ HTTP server stopped. Shutting down the accrual pool");
    let _ = shutdown.send(true);
    pool.close().await;
    result.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: &ServerConfig,
    db: SqliteDatabase,
    pool: AccrualPool,
    balance: BalanceService,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), pool.clone(), balance.clone());
        let accounts_api = AccountApi::new(db.clone());
        let api_scope = web::scope("/api")
            .service(SubmitOrderRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(MyBalanceRoute::<SqliteDatabase>::new())
            .service(WithdrawRoute::<SqliteDatabase>::new())
            .service(MyWithdrawalsRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("lps::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(accounts_api))
            .service(health)
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
