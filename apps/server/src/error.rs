//! # API Error Types
//!
//! The single error type every handler returns, serialized for clients as
//! `{"message": "...", "statusCode": 422}`.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CoreError (domain rule)  ──┐                                           │
//! │  DbError (storage)        ──┼──► ApiError ──► JSON response             │
//! │  Auth failures            ──┘                                           │
//! │                                                                         │
//! │  Mapping:                                                               │
//! │    validation / bad input            → 400                              │
//! │    missing or invalid token          → 401                              │
//! │    not found                         → 404                              │
//! │    duplicate (SKU, number)           → 409                              │
//! │    domain rule says no               → 422                              │
//! │      (overpayment, insufficient funds/stock, refund guards)             │
//! │    everything else                   → 500                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use pharma_core::{CoreError, ValidationError};
use pharma_db::DbError;

/// Error payload returned to API clients.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Human-readable description, safe to show in the UI.
    pub message: String,

    /// HTTP status code, duplicated in the body for client convenience.
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            message: message.into(),
            status_code: status.as_u16(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(status = self.status_code, message = %self.message, "Request failed");
        } else {
            warn!(status = self.status_code, message = %self.message, "Request rejected");
        }

        (status, Json(self)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let status = match &err {
            CoreError::InvalidAmount { .. } | CoreError::TooManyLines { .. } => {
                StatusCode::BAD_REQUEST
            }
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::DrugNotFound { .. } | CoreError::InvoiceNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            CoreError::Overpayment { .. }
            | CoreError::InsufficientFunds { .. }
            | CoreError::InsufficientStock { .. }
            | CoreError::RefundNotAllowed { .. }
            | CoreError::RefundTooLarge { .. }
            | CoreError::InvalidStatus { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        };
        ApiError::new(status, err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => ApiError::not_found(err.to_string()),
            DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. } => {
                ApiError::new(StatusCode::CONFLICT, err.to_string())
            }
            DbError::Domain(core) => ApiError::from(core),
            // Connection/pool/query problems are not the client's fault;
            // details go to the log, not the response body.
            other => {
                error!(error = %other, "Database failure");
                ApiError::internal("Internal server error")
            }
        }
    }
}

/// Result alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pharma_core::CoreError;

    #[test]
    fn test_overpayment_maps_to_422() {
        let api: ApiError = CoreError::Overpayment {
            attempted_cents: 15000,
            outstanding_cents: 10000,
        }
        .into();
        assert_eq!(api.status_code, 422);
        assert!(api.message.contains("150.00") || api.message.contains("15000"));
    }

    #[test]
    fn test_db_not_found_maps_to_404() {
        let api: ApiError = DbError::not_found("Invoice", "abc").into();
        assert_eq!(api.status_code, 404);
    }

    #[test]
    fn test_internal_hides_details() {
        let api: ApiError = DbError::ConnectionFailed("disk on fire".to_string()).into();
        assert_eq!(api.status_code, 500);
        assert!(!api.message.contains("disk"));
    }

    #[test]
    fn test_serialized_shape() {
        let api = ApiError::unprocessable("Overpayment");
        let json = serde_json::to_value(&api).unwrap();
        assert_eq!(json["statusCode"], 422);
        assert_eq!(json["message"], "Overpayment");
    }
}
