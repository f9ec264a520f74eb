use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db::sqlite::{errors::is_unique_violation, SqliteDatabaseError},
    db_types::{NewOrder, Order, OrderNumber, OrderStatusType, OrderWithAccrual, UserId},
};

const ORDER_COLUMNS: &str = "number, user_id, status, created_at, updated_at, last_checked_at";

/// Inserts a new order with status `NEW`. This is not atomic. You can embed this call inside a transaction if you need
/// to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, SqliteDatabaseError> {
    let now = Utc::now();
    let result = sqlx::query_as::<_, Order>(
        r#"
            INSERT INTO orders (number, user_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING number, user_id, status, created_at, updated_at, last_checked_at;
        "#,
    )
    .bind(&order.number)
    .bind(order.user_id)
    .bind(OrderStatusType::New)
    .bind(now)
    .fetch_one(conn)
    .await;
    match result {
        Ok(o) => {
            debug!("🗃️ Order {} saved for user #{}", o.number, o.user_id);
            Ok(o)
        },
        Err(e) if is_unique_violation(&e) => Err(SqliteDatabaseError::DuplicateOrder(order.number)),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_order(number: &OrderNumber, conn: &mut SqliteConnection) -> Result<Option<Order>, SqliteDatabaseError> {
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE number = $1"))
        .bind(number)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Fetches the user's orders, newest first, joined with the credit each order earned.
pub async fn fetch_orders_for_user(
    user_id: UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderWithAccrual>, SqliteDatabaseError> {
    let orders = sqlx::query_as::<_, OrderWithAccrual>(
        r#"
            SELECT
                o.number AS number,
                o.status AS status,
                l.difference AS accrual,
                o.created_at AS uploaded_at
            FROM orders o
            LEFT JOIN ledger l ON l.order_number = o.number AND l.difference > 0
            WHERE o.user_id = $1
            ORDER BY julianday(o.created_at) DESC;
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    trace!("🗃️ User #{user_id} has {} orders", orders.len());
    Ok(orders)
}

/// Fetches up to `limit` orders with one of the given statuses that have not been looked at since `older_than`, and
/// that are not in the `excluded` list. Orders are returned oldest first.
pub async fn fetch_unresolved_orders(
    limit: usize,
    excluded: &[OrderNumber],
    older_than: DateTime<Utc>,
    statuses: &[OrderStatusType],
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, SqliteDatabaseError> {
    if limit == 0 || statuses.is_empty() {
        return Ok(vec![]);
    }
    let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE status IN ("));
    let mut status_list = builder.separated(", ");
    for status in statuses {
        status_list.push_bind(*status);
    }
    builder.push(")");
    if !excluded.is_empty() {
        builder.push(" AND number NOT IN (");
        let mut number_list = builder.separated(", ");
        for number in excluded {
            number_list.push_bind(number.clone());
        }
        builder.push(")");
    }
    builder.push(" AND julianday(COALESCE(last_checked_at, created_at)) < julianday(");
    builder.push_bind(older_than);
    builder.push(") ORDER BY julianday(created_at) ASC LIMIT ");
    builder.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ Result of fetch_unresolved_orders: {}", orders.len());
    Ok(orders)
}

pub async fn update_order(order: &Order, conn: &mut SqliteConnection) -> Result<(), SqliteDatabaseError> {
    let res = sqlx::query(
        "UPDATE orders SET status = $1, last_checked_at = $2, updated_at = $3 WHERE number = $4",
    )
    .bind(order.status)
    .bind(order.last_checked_at)
    .bind(Utc::now())
    .bind(&order.number)
    .execute(conn)
    .await?;
    if res.rows_affected() == 0 {
        return Err(SqliteDatabaseError::OrderNotFound(order.number.clone()));
    }
    trace!("🗃️ Order {} is now {}", order.number, order.status);
    Ok(())
}
