use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type AppResult<T> = Result<T, AppError>;

/// Every failure a handler can surface, carrying the exact message and
/// status code the API has always returned.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is locked. Please try again in {0} minutes.")]
    AccountLocked(i64),

    #[error("Account locked due to too many failed login attempts. Please try again in 15 minutes.")]
    TooManyAttempts,

    #[error("Please verify your email first")]
    EmailNotVerified,

    #[error("User already exists")]
    UserExists,

    #[error("Invalid 2FA code")]
    InvalidTwoFaCode,

    #[error("Access token required")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Admin access required")]
    AdminRequired,

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(&'static str),

    #[error("Server error")]
    Database(#[from] mongodb::error::Error),

    #[error("Server error")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Server error")]
    Internal(String),
}

impl AppError {
    pub fn internal(e: impl std::fmt::Display) -> Self {
        Self::Internal(e.to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::EmailNotVerified | Self::InvalidTwoFaCode => {
                StatusCode::UNAUTHORIZED
            }
            Self::MissingToken => StatusCode::UNAUTHORIZED,
            Self::AccountLocked(_) | Self::TooManyAttempts => StatusCode::FORBIDDEN,
            Self::InvalidToken | Self::AdminRequired => StatusCode::FORBIDDEN,
            Self::UserExists | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Jwt(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            match &self {
                AppError::Database(e) => error!("database error: {e}"),
                AppError::Jwt(e) => error!("jwt error: {e}"),
                AppError::Internal(e) => error!("internal error: {e}"),
                _ => {}
            }
        }
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_failures_map_to_original_status_codes() {
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::AccountLocked(7).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::TooManyAttempts.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::UserExists.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::MissingToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InvalidToken.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::AdminRequired.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::NotFound("Portfolio not found").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::BadRequest("Insufficient funds").status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn lockout_message_includes_remaining_minutes() {
        assert_eq!(
            AppError::AccountLocked(12).to_string(),
            "Account is locked. Please try again in 12 minutes."
        );
    }
}
