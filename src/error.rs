//! Error Types
//!
//! Failures of backend calls, board mutations and form validation.

use thiserror::Error;

use crate::models::{DealId, StageId};

/// Errors from talking to the backend.
///
/// `Clone` because one refresh outcome is shared by every request
/// waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("request failed: {0}")]
    Transport(String),

    /// 401 that survived the token refresh, or no token to send.
    #[error("not authenticated")]
    Unauthorized,

    /// The refresh-token exchange failed; the session is gone.
    #[error("session expired: {0}")]
    RefreshFailed(String),

    /// Non-2xx response with the backend's message.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("response decode error: {0}")]
    Decode(String),

    /// Aborted by `ApiClient::cancel_all`.
    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    /// Text suitable for an inline form message
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            Self::Unauthorized | Self::RefreshFailed(_) => "Сессия истекла, войдите снова".to_string(),
            Self::Transport(_) | Self::Cancelled => "Сервер недоступен".to_string(),
            Self::Decode(_) => "Некорректный ответ сервера".to_string(),
        }
    }
}

/// Errors from funnel store operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoardError {
    #[error("deal {0} is not on the board")]
    DealNotFound(DealId),

    #[error("stage {0} is not on the board")]
    StageNotFound(StageId),

    #[error("no shared funnel is configured on the server")]
    NoSharedFunnel,

    #[error("no funnel is loaded")]
    NotLoaded,

    #[error("stage {0} cannot be deleted")]
    ProtectedStage(StageId),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl BoardError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(err) => err.user_message(),
            Self::NoSharedFunnel => "Общая воронка не найдена".to_string(),
            Self::ProtectedStage(_) => "Этот этап нельзя удалить".to_string(),
            Self::DealNotFound(_) | Self::StageNotFound(_) | Self::NotLoaded => {
                "Данные воронки устарели, обновите страницу".to_string()
            }
        }
    }
}

/// Required-field checks run before a form is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Поле «{0}» обязательно")]
    Required(&'static str),

    #[error("Поле «{field}» должно содержать минимум {min} символов")]
    TooShort { field: &'static str, min: usize },
}

/// Login and registration failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SessionError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Form(err) => err.to_string(),
            Self::Api(err) => err.user_message(),
        }
    }
}

/// Require a non-blank value
pub fn require(field: &'static str, value: &str) -> Result<(), FormError> {
    if value.trim().is_empty() {
        Err(FormError::Required(field))
    } else {
        Ok(())
    }
}

/// Require at least `min` characters
pub fn require_len(field: &'static str, value: &str, min: usize) -> Result<(), FormError> {
    if value.chars().count() < min {
        Err(FormError::TooShort { field, min })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_field_checks() {
        assert_eq!(require("Название", "   "), Err(FormError::Required("Название")));
        assert!(require("Название", "Acme").is_ok());
        assert_eq!(
            require_len("Пароль", "12345", 6),
            Err(FormError::TooShort { field: "Пароль", min: 6 })
        );
        assert!(require_len("Пароль", "123456", 6).is_ok());
    }

    #[test]
    fn test_status_error_shows_backend_message() {
        let err = ApiError::Status { status: 400, message: "email must be an email".to_string() };
        assert_eq!(err.user_message(), "email must be an email");
        assert_eq!(err.to_string(), "HTTP 400: email must be an email");
    }
}
