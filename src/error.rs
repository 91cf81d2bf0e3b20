use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Failure returned by every handler; the boundary maps it to a status and a `{"detail": ..}` body.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing, malformed or expired token, or a token for an unknown/inactive user.
    #[error("could not validate credentials")]
    Unauthenticated,
    /// Login with an unknown email or a wrong password. Both look the same.
    #[error("incorrect email or password")]
    InvalidCredentials,
    #[error("insufficient privileges")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    /// Body, query string or path segment that did not deserialize; keeps axum's status.
    #[error("{detail}")]
    Rejected { status: StatusCode, detail: String },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Rejected { status, .. } => *status,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> String {
        match self {
            AppError::Unauthenticated => "Could not validate credentials".into(),
            AppError::InvalidCredentials => "Incorrect email or password".into(),
            AppError::Forbidden => "The user doesn't have enough privileges".into(),
            AppError::NotFound(what) => format!("{what} not found"),
            AppError::Conflict(msg) | AppError::Validation(msg) => msg.clone(),
            AppError::Rejected { detail, .. } => detail.clone(),
            AppError::Internal(_) => "Internal server error".into(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(r: JsonRejection) -> Self {
        AppError::Rejected {
            status: r.status(),
            detail: r.body_text(),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(r: QueryRejection) -> Self {
        AppError::Rejected {
            status: r.status(),
            detail: r.body_text(),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(r: PathRejection) -> Self {
        AppError::Rejected {
            status: r.status(),
            detail: r.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(e) = &self {
            error!(error = ?e, "internal error");
        }

        let status = self.status();
        let body = Json(json!({ "detail": self.detail() }));

        match self {
            AppError::Unauthenticated | AppError::InvalidCredentials => {
                (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}
