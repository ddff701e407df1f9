//! HTTP-facing errors.
//!
//! `ApiError` wraps allocator failures and the request-level failures the
//! server adds on top (bad input, unknown jobs, shutdown). It implements
//! [`IntoResponse`] so handlers can return `Result<_, ApiError>` and let `?`
//! pick the status code.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

pub type Result<T> = core::result::Result<T, ApiError>;

#[derive(Clone, thiserror::Error, Debug)]
pub enum ApiError {
    /// An allocator or codec failure.
    #[error(transparent)]
    Allocation(#[from] sctid::Error),

    /// The request body or query was invalid or exceeded limits.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// No bulk job with this id exists.
    #[error("Job {id} not found")]
    JobNotFound { id: u64 },

    /// A blocking task panicked or was aborted.
    #[error("Internal error: {context}")]
    Internal { context: String },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl ApiError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Allocation(err) => match err {
                sctid::Error::MalformedIdentifier { .. }
                | sctid::Error::InvalidNamespace { .. }
                | sctid::Error::InvalidItemId { .. } => StatusCode::BAD_REQUEST,
                sctid::Error::InvalidState { .. } | sctid::Error::PartialBulkFailure { .. } => {
                    StatusCode::CONFLICT
                }
                sctid::Error::GenerationExhausted { .. }
                | sctid::Error::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                sctid::Error::Cancelled { .. } => StatusCode::REQUEST_TIMEOUT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Self::JobNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceShutdown => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Stable machine-readable error kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Allocation(err) => match err {
                sctid::Error::MalformedIdentifier { .. } => "malformed_identifier",
                sctid::Error::InvalidNamespace { .. } => "invalid_namespace",
                sctid::Error::InvalidItemId { .. } => "invalid_item_id",
                sctid::Error::GenerationExhausted { .. } => "generation_exhausted",
                sctid::Error::InvalidState { .. } => "invalid_state",
                sctid::Error::PartialBulkFailure { .. } => "partial_bulk_failure",
                sctid::Error::StoreUnavailable { .. } => "store_unavailable",
                sctid::Error::Cancelled { .. } => "cancelled",
                _ => "internal",
            },
            Self::InvalidRequest { .. } => "invalid_request",
            Self::JobNotFound { .. } => "job_not_found",
            Self::Internal { .. } => "internal",
            Self::ServiceShutdown => "service_shutdown",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    offending: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        let offending = match &self {
            Self::Allocation(sctid::Error::PartialBulkFailure { offending, .. }) => {
                Some(offending.clone())
            }
            _ => None,
        };
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
            offending,
        };
        (status, Json(body)).into_response()
    }
}
