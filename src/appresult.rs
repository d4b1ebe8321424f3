use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

/// Everything a handler can fail with. Each variant carries the message that
/// goes out in the `{success: false, message}` envelope; internal errors are
/// logged and replaced with a generic message instead.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    EmailDispatch(String),
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn not_authenticated() -> Self {
        Self::Unauthorized("Not authenticated".to_owned())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::EmailDispatch(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::EmailDispatch(m) => m,
            Self::Internal(_) => "Internal server error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(err) = &self {
            tracing::error!("internal error: {err:#}");
        }

        (
            self.status(),
            Json(json!({ "success": false, "message": self.message() })),
        )
            .into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}
