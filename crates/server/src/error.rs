use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Errors the HTTP surface can produce, covering both the engine's own
/// control-plane preconditions and the server's own request handling.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Rule(#[from] policyd_engine::RuleError),

    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        use policyd_engine::RuleError;

        let status = match &self {
            Self::Rule(RuleError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Rule(
                RuleError::AlreadyExists(_)
                | RuleError::AlreadyEnabled(_)
                | RuleError::AlreadyDisabled(_),
            ) => StatusCode::CONFLICT,
            Self::Rule(RuleError::Disabled(_)) => StatusCode::CONFLICT,
            Self::Rule(RuleError::Store(_)) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidBase64(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
