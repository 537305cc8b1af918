use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Spotify error: {0}")]
    Spotify(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization was not completed within {0} seconds")]
    AuthorizationTimeout(u64),

    #[error("No authorization code received")]
    MissingAuthorizationCode,

    #[error("Authorization state mismatch")]
    StateMismatch,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Persistence error: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Scrape error: {0}")]
    Scrape(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::MissingAuthorizationCode | AppError::StateMismatch => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::Authentication(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Http(ref e) => {
                tracing::error!("HTTP error: {:?}", e);
                (StatusCode::BAD_GATEWAY, "Upstream request failed".to_string())
            }
            AppError::Spotify(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
