//! HTTP error mapping for the webhook endpoints.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use shop_relay_core::WebhookError;
use tracing::{error, warn};

/// Webhook handler errors with HTTP status code mapping.
///
/// The taxonomy follows the sending platform's retry contract:
///
/// - `401 Unauthorized`: signature absent or mismatched; plain-text body.
///   The platform does not retry these.
/// - `400 Bad Request`: malformed payload for the detected transport shape.
///   Permanent, not retryable.
/// - `503 Service Unavailable`: the queue or cache backend is unreachable.
///   The failed acknowledgement is what triggers the platform's redelivery,
///   so this is the only class that may cause an upstream retry.
/// - `500 Internal Server Error`: unexpected failures. Details are logged
///   server-side; the response body stays generic.
#[derive(Debug, thiserror::Error)]
pub enum WebhookHandlerError {
    #[error("Not Authorized")]
    Unauthenticated,

    #[error("{message}")]
    BadRequest { message: String },

    #[error("{message}")]
    Unavailable { message: String },

    #[error("Internal server error")]
    Internal { message: String },
}

impl From<WebhookError> for WebhookHandlerError {
    fn from(error: WebhookError) -> Self {
        match error {
            WebhookError::Unauthenticated => Self::Unauthenticated,
            error @ (WebhookError::MalformedPayload { .. } | WebhookError::JsonParsing(_)) => {
                Self::BadRequest {
                    message: error.to_string(),
                }
            }
            error if error.is_transient() => Self::Unavailable {
                message: error.to_string(),
            },
            error => Self::Internal {
                message: error.to_string(),
            },
        }
    }
}

impl IntoResponse for WebhookHandlerError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Not Authorized").into_response()
            }
            Self::BadRequest { message } => (StatusCode::BAD_REQUEST, message).into_response(),
            Self::Unavailable { message } => {
                warn!(error = %message, "Downstream unavailable; platform will redeliver");
                (StatusCode::SERVICE_UNAVAILABLE, message).into_response()
            }
            Self::Internal { message } => {
                error!(error = %message, "Internal server error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error occurred. Please try again later.",
                )
                    .into_response()
            }
        }
    }
}

/// Server lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
