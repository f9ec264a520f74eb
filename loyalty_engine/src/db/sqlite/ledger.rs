use chrono::Utc;
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::{errors::is_unique_violation, SqliteDatabaseError},
    db_types::{Balance, LedgerEntry, NewLedgerEntry, OrderNumber, Points, UserId, Withdrawal},
};

pub async fn insert_entry(
    entry: NewLedgerEntry,
    conn: &mut SqliteConnection,
) -> Result<LedgerEntry, SqliteDatabaseError> {
    let now = Utc::now();
    let result = sqlx::query_as::<_, LedgerEntry>(
        r#"
            INSERT INTO ledger (user_id, difference, order_number, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id, user_id, difference, order_number, created_at, updated_at;
        "#,
    )
    .bind(entry.user_id)
    .bind(entry.difference)
    .bind(&entry.order_number)
    .bind(now)
    .fetch_one(conn)
    .await;
    match result {
        Ok(e) => {
            debug!("🗃️ Ledger entry #{} for user #{}: {}", e.id, e.user_id, e.difference);
            Ok(e)
        },
        Err(e) if is_unique_violation(&e) => {
            let order = entry.order_number.unwrap_or_else(|| OrderNumber(String::default()));
            if entry.difference.is_positive() {
                Err(SqliteDatabaseError::DuplicateCredit(order))
            } else {
                Err(SqliteDatabaseError::DuplicateWithdrawal(order))
            }
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn sum_for_user(user_id: UserId, conn: &mut SqliteConnection) -> Result<Points, SqliteDatabaseError> {
    let sum = sqlx::query_scalar::<_, i64>("SELECT COALESCE(SUM(difference), 0) FROM ledger WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(conn)
        .await?;
    trace!("🗃️ Ledger sum for user #{user_id}: {sum}");
    Ok(Points::from(sum))
}

pub async fn balance_for_user(user_id: UserId, conn: &mut SqliteConnection) -> Result<Balance, SqliteDatabaseError> {
    let balance = sqlx::query_as::<_, Balance>(
        r#"
            SELECT
                COALESCE(SUM(difference), 0) AS current,
                COALESCE(SUM(CASE WHEN difference < 0 THEN -difference ELSE 0 END), 0) AS withdrawn
            FROM ledger
            WHERE user_id = $1;
        "#,
    )
    .bind(user_id)
    .fetch_one(conn)
    .await?;
    Ok(balance)
}

pub async fn withdrawals_for_user(
    user_id: UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Withdrawal>, SqliteDatabaseError> {
    let withdrawals = sqlx::query_as::<_, Withdrawal>(
        r#"
            SELECT order_number, -difference AS sum, created_at AS processed_at
            FROM ledger
            WHERE user_id = $1 AND difference < 0 AND order_number IS NOT NULL
            ORDER BY julianday(created_at) DESC, id DESC;
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(withdrawals)
}

pub async fn withdrawal_for_order(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Withdrawal>, SqliteDatabaseError> {
    let withdrawal = sqlx::query_as::<_, Withdrawal>(
        r#"
            SELECT order_number, -difference AS sum, created_at AS processed_at
            FROM ledger
            WHERE order_number = $1 AND difference < 0;
        "#,
    )
    .bind(number)
    .fetch_optional(conn)
    .await?;
    Ok(withdrawal)
}
