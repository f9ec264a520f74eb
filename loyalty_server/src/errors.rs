use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use loyalty_engine::{AccountApiError, OrderFlowError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    Unauthenticated(String),
    #[error("Invalid order number. {0}")]
    InvalidOrderNumber(String),
    #[error("Invalid amount. {0}")]
    InvalidAmount(String),
    #[error("{0}")]
    OrderOwnedByAnotherUser(String),
    #[error("{0}")]
    DuplicateWithdrawal(String),
    #[error("{0}")]
    InsufficientFunds(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::InsufficientFunds(_) => StatusCode::PAYMENT_REQUIRED,
            Self::OrderOwnedByAnotherUser(_) => StatusCode::CONFLICT,
            Self::DuplicateWithdrawal(_) => StatusCode::CONFLICT,
            Self::InvalidOrderNumber(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidAmount(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::InvalidOrderNumber(_) => Self::InvalidOrderNumber(e.to_string()),
            OrderFlowError::OwnedByAnotherUser(_) => Self::OrderOwnedByAnotherUser(e.to_string()),
            OrderFlowError::DuplicateWithdrawal(_) => Self::DuplicateWithdrawal(e.to_string()),
            OrderFlowError::InvalidAmount(_) => Self::InvalidAmount(e.to_string()),
            OrderFlowError::InsufficientFunds { .. } => Self::InsufficientFunds(e.to_string()),
            OrderFlowError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
        }
    }
}

impl From<AccountApiError> for ServerError {
    fn from(e: AccountApiError) -> Self {
        match e {
            AccountApiError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
        }
    }
}

#[cfg(test)]
mod test {
    use loyalty_engine::db_types::Points;

    use super::*;

    #[test]
    fn engine_errors_map_to_status_codes() {
        let cases = [
            (OrderFlowError::InvalidOrderNumber("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (OrderFlowError::OwnedByAnotherUser("1".into()), StatusCode::CONFLICT),
            (OrderFlowError::DuplicateWithdrawal("1".into()), StatusCode::CONFLICT),
            (OrderFlowError::InvalidAmount(Points::default()), StatusCode::UNPROCESSABLE_ENTITY),
            (
                OrderFlowError::InsufficientFunds { balance: Points::default(), requested: Points::from(1) },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (OrderFlowError::DatabaseError("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).status_code(), status);
        }
    }
}
