//! API error taxonomy for the reservation and redemption paths.
//!
//! Handlers map store-level failures into these variants at the boundary;
//! the response body is a terse single-line message, never a stack trace.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Client sent missing or malformed parameters.
    #[error("{0}")]
    BadRequest(String),

    /// No sale window is currently open.
    #[error("no sale is active")]
    NoActiveSale,

    /// Global stock or the sale-wide cap is exhausted.
    #[error("stock sold out")]
    SoldOut,

    /// The user already holds the per-sale maximum of reservations.
    #[error("user has already checked out 10 items")]
    UserLimit,

    /// Unknown, already redeemed, or expired checkout code.
    #[error("invalid or expired code")]
    InvalidCode,

    /// A dependency failed; details are logged at the call site.
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::NoActiveSale => StatusCode::BAD_REQUEST,
            ApiError::SoldOut => StatusCode::CONFLICT,
            ApiError::UserLimit => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InvalidCode => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(
            ApiError::BadRequest("user_id and id are required".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NoActiveSale.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::SoldOut.status_code(), StatusCode::CONFLICT);
        assert_eq!(ApiError::UserLimit.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ApiError::InvalidCode.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Internal.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages_are_single_line() {
        let errors = [
            ApiError::BadRequest("invalid item ID".to_string()),
            ApiError::NoActiveSale,
            ApiError::SoldOut,
            ApiError::UserLimit,
            ApiError::InvalidCode,
            ApiError::Internal,
        ];
        for error in errors {
            assert!(!error.to_string().contains('\n'));
        }
    }

    #[test]
    fn test_sold_out_message() {
        assert_eq!(ApiError::SoldOut.to_string(), "stock sold out");
    }
}
