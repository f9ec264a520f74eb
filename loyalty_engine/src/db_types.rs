use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use loyalty_common::Points;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

/// Users are identified by the id assigned by the authentication gateway.
pub type UserId = i64;

//--------------------------------------     OrderNumber      ---------------------------------------------------------
/// The external, customer-facing order number. Always a string of decimal digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(pub String);

#[derive(Debug, Clone, Error)]
#[error("Invalid order number: {0}")]
pub struct InvalidOrderNumber(pub String);

impl OrderNumber {
    /// Parses a raw order number, trimming surrounding whitespace. Only non-empty runs of ASCII digits are accepted.
    pub fn parse(raw: &str) -> Result<Self, InvalidOrderNumber> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidOrderNumber(raw.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderNumber {
    type Err = InvalidOrderNumber;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<&str> for OrderNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatusType {
    /// The order has been submitted, but the accrual service has not been asked about it yet.
    New,
    /// The accrual service knows about the order and is calculating the reward.
    Processing,
    /// The order will never earn a reward.
    Invalid,
    /// The reward has been calculated and credited.
    Processed,
}

impl OrderStatusType {
    /// The statuses that the accrual pipeline still has to resolve.
    pub const UNRESOLVED: [OrderStatusType; 2] = [OrderStatusType::New, OrderStatusType::Processing];

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Invalid | Self::Processed)
    }

    /// Statuses only move forward: nothing leaves a terminal state, and nothing returns to `New`.
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        match (self, next) {
            (s, _) if s.is_terminal() => false,
            (_, Self::New) => false,
            _ => true,
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::New => write!(f, "NEW"),
            OrderStatusType::Processing => write!(f, "PROCESSING"),
            OrderStatusType::Invalid => write!(f, "INVALID"),
            OrderStatusType::Processed => write!(f, "PROCESSED"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "PROCESSING" => Ok(Self::Processing),
            "INVALID" => Ok(Self::Invalid),
            "PROCESSED" => Ok(Self::Processed),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Order {
    pub number: OrderNumber,
    pub user_id: UserId,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// When the accrual service was last asked about this order. `None` until the first poll.
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl Order {
    /// The moment the reconciler measures staleness from.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_checked_at.unwrap_or(self.created_at)
    }
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub number: OrderNumber,
    pub user_id: UserId,
}

impl NewOrder {
    pub fn new(number: OrderNumber, user_id: UserId) -> Self {
        Self { number, user_id }
    }
}

//--------------------------------------     LedgerEntry       ---------------------------------------------------------
/// An immutable, signed movement of points. Positive differences are credits, negative ones are debits.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub user_id: UserId,
    pub difference: Points,
    pub order_number: Option<OrderNumber>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub user_id: UserId,
    pub difference: Points,
    pub order_number: Option<OrderNumber>,
}

impl NewLedgerEntry {
    pub fn credit(user_id: UserId, amount: Points, order: OrderNumber) -> Self {
        Self { user_id, difference: amount.abs(), order_number: Some(order) }
    }

    pub fn debit(user_id: UserId, amount: Points, order: OrderNumber) -> Self {
        Self { user_id, difference: -amount.abs(), order_number: Some(order) }
    }

    pub fn is_credit(&self) -> bool {
        self.difference.is_positive()
    }
}

//--------------------------------------       Balance         ---------------------------------------------------------
/// A user's balance, derived from the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Balance {
    /// The sum of every ledger entry
    pub current: Points,
    /// The sum of the magnitudes of every debit
    pub withdrawn: Points,
}

//--------------------------------------      Withdrawal       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Withdrawal {
    #[serde(rename = "order")]
    pub order_number: OrderNumber,
    pub sum: Points,
    pub processed_at: DateTime<Utc>,
}

//--------------------------------------   OrderWithAccrual    ---------------------------------------------------------
/// An order as its owner sees it: the status, plus the points it earned, if any.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct OrderWithAccrual {
    pub number: OrderNumber,
    pub status: OrderStatusType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Points>,
    pub uploaded_at: DateTime<Utc>,
}
