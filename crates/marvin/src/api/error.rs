use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt::Display;
use tracing::{error, warn};

use super::envelope::ApiResponse;

pub const NOT_AUTHENTICATED: &str = "Nicht authentifiziert";
pub const FORBIDDEN: &str = "Keine Berechtigung";
pub const INVALID_REQUEST: &str = "Ungültige Anfrage";
pub const INTERNAL: &str = "Interner Serverfehler";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    Forbidden,
    NotFound,
    Validation,
    Upstream,
    Internal,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            Self::Auth => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Upstream | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Handler failure carrying the German message shown to the user.
///
/// Causes are logged where the error is built and never reach the client.
#[derive(Debug)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(ErrorKind::Auth, NOT_AUTHENTICATED)
    }

    pub fn forbidden() -> Self {
        Self::new(ErrorKind::Forbidden, FORBIDDEN)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// A call to the backend or the model failed.
    pub fn upstream(message: impl Into<String>, cause: impl Display) -> Self {
        let message = message.into();
        error!("{}: {}", message, cause);
        Self::new(ErrorKind::Upstream, message)
    }

    pub fn internal(cause: impl Display) -> Self {
        error!("Internal error: {}", cause);
        Self::new(ErrorKind::Internal, INTERNAL)
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_client_error() {
            warn!("Request rejected with {}: {}", status.as_u16(), self.message);
        }
        (status, ApiResponse::<()>::failure(self.message)).into_response()
    }
}
