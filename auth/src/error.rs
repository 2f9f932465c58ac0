//! Authentication error types.

use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid username or password")]
    BadCredentials,

    #[error("session token required")]
    SessionRequired,

    #[error("session expired or unknown")]
    SessionInvalid,

    #[error("step-up confirmation required")]
    StepUpRequired,

    #[error("step-up token expired or unknown")]
    StepUpInvalid,
}

impl AuthError {
    /// Stable machine-readable code used in error bodies and headers.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::BadCredentials => "bad_credentials",
            AuthError::SessionRequired => "session_required",
            AuthError::SessionInvalid => "session_invalid",
            AuthError::StepUpRequired => "step_up_required",
            AuthError::StepUpInvalid => "step_up_expired",
        }
    }
}
