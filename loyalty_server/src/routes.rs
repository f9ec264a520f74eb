//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Since each worker thread processes its requests sequentially, handlers must never block the current thread. Every
//! database or network call in here is awaited.
//!
//! All `/api/user` routes identify the caller through the [`AuthenticatedUser`] extractor.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use loyalty_engine::{
    order_objects::{SubmitOrderResult, WithdrawalRequest},
    traits::{LedgerManagement, OrderManagement},
    AccountApi,
    OrderFlowApi,
};

use crate::{errors::ServerError, helpers::AuthenticatedUser};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// ----------------------------------------------   Orders  ----------------------------------------------------
route!(submit_order => Post "/user/orders" impl OrderManagement, LedgerManagement);
/// Route handler for order submissions
///
/// The body is the order number as plain text. Responds with
/// * `202 Accepted` when the order is new and has been queued for accrual,
/// * `200 OK` when the caller already submitted this order,
/// * `409 Conflict` when another user owns the order,
/// * `422 Unprocessable Entity` when the number is not all digits, and
/// * `400 Bad Request` when the body is empty.
pub async fn submit_order<B>(
    user: AuthenticatedUser,
    body: String,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + LedgerManagement,
{
    let number = body.trim();
    if number.is_empty() {
        return Err(ServerError::InvalidRequestBody("The order number is missing".into()));
    }
    debug!("💻️ POST submit_order {number} for user #{}", user.id());
    match api.submit_order(user.id(), number).await? {
        SubmitOrderResult::Accepted(_) => Ok(HttpResponse::Accepted().finish()),
        SubmitOrderResult::AlreadySubmitted(_) => Ok(HttpResponse::Ok().finish()),
    }
}

route!(my_orders => Get "/user/orders" impl OrderManagement, LedgerManagement);
/// Route handler for the caller's order list, newest first. Responds with `204 No Content` if there are no orders.
pub async fn my_orders<B>(user: AuthenticatedUser, api: web::Data<AccountApi<B>>) -> Result<HttpResponse, ServerError>
where B: OrderManagement + LedgerManagement {
    debug!("💻️ GET my_orders for user #{}", user.id());
    let orders = api.orders(user.id()).await?;
    if orders.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }
    Ok(HttpResponse::Ok().json(orders))
}

// ----------------------------------------------   Balance  ---------------------------------------------------
route!(my_balance => Get "/user/balance" impl OrderManagement, LedgerManagement);
pub async fn my_balance<B>(user: AuthenticatedUser, api: web::Data<AccountApi<B>>) -> Result<HttpResponse, ServerError>
where B: OrderManagement + LedgerManagement {
    debug!("💻️ GET my_balance for user #{}", user.id());
    let balance = api.balance(user.id()).await?;
    Ok(HttpResponse::Ok().json(balance))
}

route!(withdraw => Post "/user/balance/withdraw" impl OrderManagement, LedgerManagement);
/// Route handler for spending points.
///
/// Responds with `402 Payment Required` if the balance is too low, `422` for a malformed order number or a
/// non-positive sum, and `409 Conflict` if the order number has already been withdrawn against.
pub async fn withdraw<B>(
    user: AuthenticatedUser,
    body: web::Json<WithdrawalRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + LedgerManagement,
{
    let request = body.into_inner();
    debug!("💻️ POST withdraw {} against order {} for user #{}", request.sum, request.order, user.id());
    api.withdraw(user.id(), &request.order, request.sum).await?;
    Ok(HttpResponse::Ok().finish())
}

route!(my_withdrawals => Get "/user/withdrawals" impl OrderManagement, LedgerManagement);
/// Route handler for the caller's withdrawal history, newest first. Responds with `204 No Content` if there are none.
pub async fn my_withdrawals<B>(
    user: AuthenticatedUser,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + LedgerManagement,
{
    debug!("💻️ GET my_withdrawals for user #{}", user.id());
    let withdrawals = api.withdrawals(user.id()).await?;
    if withdrawals.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }
    Ok(HttpResponse::Ok().json(withdrawals))
}
