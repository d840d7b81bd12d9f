use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::google::GoogleApiError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{message}: {detail}")]
    Upstream {
        message: &'static str,
        detail: anyhow::Error,
    },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Upstream { message, detail } => {
                error!("{}: {:#}", message, detail);
                (StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
            }
        };

        (status, Json(json!({ "error": error_message }))).into_response()
    }
}

/// Converts a client failure into the route's generic 500 message, keeping
/// the full cause for the log.
pub trait UpstreamContext<T> {
    fn or_upstream(self, message: &'static str) -> Result<T, ApiError>;
}

impl<T> UpstreamContext<T> for Result<T, GoogleApiError> {
    fn or_upstream(self, message: &'static str) -> Result<T, ApiError> {
        self.map_err(|err| match err {
            GoogleApiError::Unauthorized(status) => {
                warn!("Google rejected the access token with HTTP {}", status);
                ApiError::Unauthorized
            }
            other => ApiError::Upstream {
                message,
                detail: other.into(),
            },
        })
    }
}

impl<T> UpstreamContext<T> for anyhow::Result<T> {
    fn or_upstream(self, message: &'static str) -> Result<T, ApiError> {
        self.map_err(|detail| ApiError::Upstream { message, detail })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode as UpstreamStatus;

    #[test]
    fn test_google_unauthorized_maps_to_401() {
        let result: Result<(), GoogleApiError> =
            Err(GoogleApiError::Unauthorized(UpstreamStatus::UNAUTHORIZED));
        let err = result.or_upstream("Failed to fetch labels").unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_upstream_failure_uses_generic_message() {
        let result: Result<(), GoogleApiError> = Err(GoogleApiError::Status {
            status: UpstreamStatus::INTERNAL_SERVER_ERROR,
            body: "backend exploded".to_string(),
        });
        let err = result.or_upstream("Failed to fetch labels").unwrap_err();
        match &err {
            ApiError::Upstream { message, detail } => {
                assert_eq!(*message, "Failed to fetch labels");
                assert!(detail.to_string().contains("backend exploded"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_model_failure_is_upstream() {
        let result: anyhow::Result<()> = Err(anyhow::anyhow!("connection refused"));
        let err = result.or_upstream("Failed to summarize email").unwrap_err();
        assert!(matches!(err, ApiError::Upstream { message: "Failed to summarize email", .. }));
    }
}
