//! Authentication configuration.

use std::time::Duration;

/// Default lifetime of a signed-in session (8 hours).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(8 * 60 * 60);

/// Default lifetime of a step-up token (2 minutes). Long enough to submit the
/// form that triggered the confirmation, short enough not to linger.
pub const DEFAULT_STEP_UP_TTL: Duration = Duration::from_secs(120);

/// Default retained step-up audit entries.
pub const DEFAULT_AUDIT_CAPACITY: usize = 10_000;

/// Configuration for the session and step-up layers.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Admin sign-in name. One principal only; this is a single-operator
    /// admin tool, not a user directory.
    pub admin_username: String,
    /// Admin password, compared in constant time.
    pub admin_password: String,
    pub session_ttl: Duration,
    pub step_up_ttl: Duration,
    pub audit_capacity: usize,
}

impl AuthConfig {
    pub fn new(admin_username: impl Into<String>, admin_password: impl Into<String>) -> Self {
        Self {
            admin_username: admin_username.into(),
            admin_password: admin_password.into(),
            session_ttl: DEFAULT_SESSION_TTL,
            step_up_ttl: DEFAULT_STEP_UP_TTL,
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
        }
    }

    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_step_up_ttl(mut self, ttl: Duration) -> Self {
        self.step_up_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_audit_capacity(mut self, capacity: usize) -> Self {
        self.audit_capacity = capacity;
        self
    }
}
