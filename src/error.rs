//! Unified application error model.
//! Every fallible operation in the access layer reports through `AppError`; the
//! rendering layer only ever sees a view, a redirect or a notice built from one.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    Auth { code: String, message: String },
    Storage { code: String, message: String },
    Policy { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Storage { code, .. }
            | AppError::Policy { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Storage { message, .. }
            | AppError::Policy { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn auth<S: Into<String>>(code: S, msg: S) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn storage<S: Into<String>>(code: S, msg: S) -> Self { AppError::Storage { code: code.into(), message: msg.into() } }
    pub fn policy<S: Into<String>>(code: S, msg: S) -> Self { AppError::Policy { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    pub fn is_user_input(&self) -> bool { matches!(self, AppError::UserInput { .. }) }
    pub fn is_auth(&self) -> bool { matches!(self, AppError::Auth { .. }) }

    /// Text suitable for a user-facing notice.
    /// Authentication failures collapse to one generic sentence so callers cannot
    /// tell an unknown identifier from a wrong secret.
    pub fn notice_text(&self) -> String {
        match self {
            AppError::UserInput { message, .. } => message.clone(),
            AppError::Auth { .. } => "Authentication failed.".to_string(),
            AppError::Storage { .. } => "Local storage is unavailable.".to_string(),
            AppError::Policy { .. } | AppError::Internal { .. } => "Something went wrong.".to_string(),
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "internal_error".into(), message: err.to_string() }
    }
}
