//! Authentication for the tool crib admin API.
//!
//! This crate provides:
//! - Bearer-token sessions for the admin principal
//! - Step-up password re-confirmation gating mutating operations
//! - Audit logging for step-up decisions
//! - Middleware for securing the admin routes
//!
//! The step-up challenge runs against the signed-in principal's own
//! credential and yields a short-lived token bound to that principal; there
//! is no shared static confirmation secret.

mod audit;
mod config;
mod error;
mod middleware;
mod session;
mod step_up;

pub use audit::{StepUpAudit, StepUpAuditEntry, StepUpOutcome};
pub use config::{AuthConfig, DEFAULT_SESSION_TTL, DEFAULT_STEP_UP_TTL};
pub use error::{AuthError, AuthResult};
pub use middleware::{
    auth_error, session_middleware, step_up_middleware, AuthState, PrincipalExt, HEADER_ERROR_CODE,
    HEADER_STEP_UP,
};
pub use session::{Principal, SessionManager};
pub use step_up::StepUpManager;
