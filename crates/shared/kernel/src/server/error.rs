use std::borrow::Cow;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lreg_derive::{api_model, lreg_error};
use tracing::error;

use crate::server::state::ApiStateError;
use crate::validation::ValidationError;

/// Error returned by every HTTP handler.
#[lreg_error]
pub enum ApiError {
    /// 400: the request failed boundary validation.
    #[error("{message}")]
    BadRequest { message: Cow<'static, str> },

    /// 404: the entity does not exist at the requested instant.
    #[error("{message}")]
    NotFound { message: Cow<'static, str> },

    /// 409: reserved; duplicate creates resolve to the existing lineage instead.
    #[error("{message}")]
    Conflict { message: Cow<'static, str> },

    /// 502: an upstream registry failed.
    #[error("{message}")]
    BadGateway { message: Cow<'static, str> },

    /// 500: storage or wiring failures.
    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// JSON body of every error response.
#[api_model]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ApiError {
    pub fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound { message: message.into() }
    }

    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest { message: message.into() }
    }

    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::BadRequest { message: err.to_string().into() }
    }
}

impl From<ApiStateError> for ApiError {
    fn from(err: ApiStateError) -> Self {
        Self::Internal { message: err.to_string().into(), context: Some("Server state".into()) }
    }
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self { error: err.to_string(), code: err.status_code().as_u16() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}
