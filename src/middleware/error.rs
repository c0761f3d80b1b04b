use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::Error;

/// Authentication errors for the HTTP layer.
///
/// Client-side failures answer with their message; server-side failures are
/// logged and answer with a generic body.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing or unparseable request input.
    #[error("{0}")]
    MalformedRequest(String),

    /// No valid session on a protected route.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Credentials or token refused.
    #[error("{0}")]
    Rejected(String),

    /// Provider is missing a required collaborator or setting.
    #[error("Configuration error: {0}")]
    Misconfiguration(String),

    /// Collaborator, signing or upstream failure.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Confirmation message could not be sent.
    #[error("Delivery error: {0}")]
    Delivery(String),
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Rejected(_) => StatusCode::FORBIDDEN,
            Self::Misconfiguration(_) | Self::Internal(_) | Self::Delivery(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Auth internal error");
            return (status, "Internal error").into_response();
        }
        (status, self.to_string()).into_response()
    }
}

impl From<Error> for AuthError {
    fn from(e: Error) -> Self {
        match e {
            Error::Config(_) => Self::Misconfiguration(e.to_string()),
            Error::SecretUnavailable(_)
            | Error::AudienceUnavailable(_)
            | Error::Signing(_)
            | Error::OAuth { .. } => Self::Internal(e.to_string()),
            #[cfg(feature = "oauth")]
            Error::Http(_) => Self::Internal(e.to_string()),
            Error::AudienceRejected(_)
            | Error::Signature
            | Error::Algorithm(_)
            | Error::Malformed(_)
            | Error::Invalid(_)
            | Error::Expired
            | Error::NoToken
            | Error::XsrfMismatch => Self::Rejected(e.to_string()),
        }
    }
}
