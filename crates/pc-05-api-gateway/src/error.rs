//! Gateway errors and their HTTP mapping.
//!
//! Every failure leaves as `{"error": ..., "code": ...}` with a status code
//! chosen from the error variant.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use canvas_telemetry::SUBSYSTEM_ERRORS;
use pc_02_credit_ledger::AdmissionError;
use pc_03_payment_verification::VerificationError;
use shared_types::{ConfigError, ErrorBody, TypeError};
use thiserror::Error;
use tracing::error;

pub(crate) const SUBSYSTEM: &str = "pc-05";

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed body or parameter
    #[error("{message}")]
    BadRequest { code: &'static str, message: String },

    /// Unknown resource
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// Invalid gateway configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Binding or serving failed
    #[error("Server error: {0}")]
    Server(String),
}

impl From<TypeError> for GatewayError {
    fn from(err: TypeError) -> Self {
        let code = match err {
            TypeError::InvalidColor(_) => "INVALID_COLOR",
            TypeError::EmptyIdentity => "INVALID_WALLET",
            TypeError::EmptyTransactionId | TypeError::EmptyWriteId => "INVALID_TRANSACTION_ID",
        };
        GatewayError::BadRequest {
            code,
            message: err.to_string(),
        }
    }
}

impl GatewayError {
    /// Status code and machine-readable code.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            GatewayError::BadRequest { code, .. } => (StatusCode::BAD_REQUEST, *code),
            GatewayError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            GatewayError::Admission(e) => match e {
                AdmissionError::OutOfBounds { .. } => (StatusCode::BAD_REQUEST, "OUT_OF_BOUNDS"),
                AdmissionError::InsufficientCredit { .. } => {
                    (StatusCode::FORBIDDEN, "INSUFFICIENT_CREDIT")
                }
                AdmissionError::WriteInProgress { .. } => (StatusCode::CONFLICT, "WRITE_IN_PROGRESS"),
                AdmissionError::Ledger(_) => (StatusCode::INTERNAL_SERVER_ERROR, "LEDGER_ERROR"),
                AdmissionError::CommitFailed { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "COMMIT_FAILED")
                }
            },
            GatewayError::Verification(e) => match e {
                VerificationError::AmountTooSmall { .. } => {
                    (StatusCode::BAD_REQUEST, "AMOUNT_TOO_SMALL")
                }
                VerificationError::ReceiverNotConfigured => {
                    (StatusCode::SERVICE_UNAVAILABLE, "RECEIVER_NOT_CONFIGURED")
                }
                VerificationError::UnknownTransaction(_) => {
                    (StatusCode::NOT_FOUND, "UNKNOWN_TRANSACTION")
                }
                VerificationError::NotReconcilable { .. } => {
                    (StatusCode::CONFLICT, "NOT_RECONCILABLE")
                }
                VerificationError::Oracle(_) => (StatusCode::BAD_GATEWAY, "ORACLE_UNAVAILABLE"),
                VerificationError::Credit(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CREDIT_FAILED"),
                VerificationError::Storage { .. } | VerificationError::Corrupted { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
                }
            },
            GatewayError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION"),
            GatewayError::Server(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SERVER_ERROR"),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!(subsystem = SUBSYSTEM, code, error = %self, "Request failed");
            SUBSYSTEM_ERRORS.with_label_values(&[SUBSYSTEM, code]).inc();
        }
        let body = ErrorBody {
            error: self.to_string(),
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for gateway handlers
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Identity;

    #[test]
    fn test_admission_mapping() {
        let denied = GatewayError::from(AdmissionError::InsufficientCredit {
            identity: Identity::new("kaspa:a").unwrap(),
            balance: 0,
        });
        assert_eq!(
            denied.status_and_code(),
            (StatusCode::FORBIDDEN, "INSUFFICIENT_CREDIT")
        );

        let outside = GatewayError::from(AdmissionError::OutOfBounds {
            x: 10,
            y: 0,
            width: 10,
            height: 10,
        });
        assert_eq!(
            outside.status_and_code(),
            (StatusCode::BAD_REQUEST, "OUT_OF_BOUNDS")
        );
    }

    #[test]
    fn test_bad_color_mapping() {
        let err = GatewayError::from(TypeError::InvalidColor("red".into()));
        assert_eq!(err.status_and_code(), (StatusCode::BAD_REQUEST, "INVALID_COLOR"));
    }

    #[test]
    fn test_verification_mapping() {
        let err = GatewayError::from(VerificationError::ReceiverNotConfigured);
        assert_eq!(err.status_and_code().0, StatusCode::SERVICE_UNAVAILABLE);
    }
}
