//! Step-up re-confirmation tokens.
//!
//! Every mutating inventory operation requires the signed-in principal to
//! re-confirm their password first. Confirmation yields a short-lived opaque
//! token presented in the `X-Crib-Step-Up` header; the token is bound to the
//! principal that requested it and dies with its TTL. There is no shared
//! static secret — the challenge runs against the session's own credential.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::{
    audit::{StepUpAudit, StepUpOutcome},
    config::AuthConfig,
    error::{AuthError, AuthResult},
    session::{verify, Principal},
};

#[derive(Debug)]
struct StepUpGrant {
    principal: String,
    issued_at: Instant,
}

/// Issues and checks step-up tokens.
#[derive(Debug)]
pub struct StepUpManager {
    grants: DashMap<String, StepUpGrant>,
    ttl: Duration,
}

impl StepUpManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            grants: DashMap::new(),
            ttl,
        }
    }

    /// Re-confirms the principal's password and issues a token. Denials are
    /// audited with the principal that attempted them.
    pub fn confirm(
        &self,
        config: &AuthConfig,
        principal: &Principal,
        password: &str,
        audit: &StepUpAudit,
    ) -> AuthResult<String> {
        if !verify(password, &config.admin_password) {
            warn!(principal = %principal.username, "step-up confirmation rejected");
            audit.record_outcome(&principal.username, "confirm", StepUpOutcome::Denied);
            return Err(AuthError::BadCredentials);
        }
        let token = uuid::Uuid::new_v4().to_string();
        self.grants.insert(
            token.clone(),
            StepUpGrant {
                principal: principal.username.clone(),
                issued_at: Instant::now(),
            },
        );
        audit.record_outcome(&principal.username, "confirm", StepUpOutcome::Granted);
        debug!(principal = %principal.username, "step-up token issued");
        Ok(token)
    }

    /// Checks a token presented for `action` (the request path). The token
    /// must exist, belong to `principal`, and be within its TTL.
    pub fn check(
        &self,
        token: &str,
        principal: &Principal,
        action: &str,
        audit: &StepUpAudit,
    ) -> AuthResult<()> {
        let outcome = match self.grants.get(token) {
            None => StepUpOutcome::Denied,
            Some(grant) => {
                if grant.principal != principal.username {
                    StepUpOutcome::Denied
                } else if grant.issued_at.elapsed() > self.ttl {
                    StepUpOutcome::Expired
                } else {
                    audit.record_outcome(&principal.username, action, StepUpOutcome::Granted);
                    return Ok(());
                }
            }
        };
        if outcome == StepUpOutcome::Expired {
            self.grants.remove(token);
        }
        audit.record_outcome(&principal.username, action, outcome.clone());
        warn!(principal = %principal.username, action, ?outcome, "step-up check failed");
        Err(AuthError::StepUpInvalid)
    }

    /// Drops expired grants. Called opportunistically from the middleware.
    pub fn sweep(&self) {
        let ttl = self.ttl;
        self.grants.retain(|_, grant| grant.issued_at.elapsed() <= ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (AuthConfig, Principal, StepUpAudit) {
        (
            AuthConfig::new("Admin", "Admin@123"),
            Principal {
                username: "Admin".into(),
            },
            StepUpAudit::with_capacity(100),
        )
    }

    #[test]
    fn confirm_then_check_succeeds_within_ttl() {
        let (config, principal, audit) = setup();
        let step_up = StepUpManager::new(Duration::from_secs(60));

        let token = step_up
            .confirm(&config, &principal, "Admin@123", &audit)
            .unwrap();
        assert!(step_up.check(&token, &principal, "/v1/tools", &audit).is_ok());
        // Tokens are reusable inside the TTL; a form retry should not force a
        // second password prompt.
        assert!(step_up.check(&token, &principal, "/v1/tools", &audit).is_ok());
    }

    #[test]
    fn wrong_password_is_denied_and_audited() {
        let (config, principal, audit) = setup();
        let step_up = StepUpManager::new(Duration::from_secs(60));

        assert_eq!(
            step_up
                .confirm(&config, &principal, "guess", &audit)
                .unwrap_err(),
            AuthError::BadCredentials
        );
        let recent = audit.recent(1);
        assert_eq!(recent[0].outcome, StepUpOutcome::Denied);
    }

    #[test]
    fn expired_token_is_rejected_and_removed() {
        let (config, principal, audit) = setup();
        let step_up = StepUpManager::new(Duration::from_millis(1));

        let token = step_up
            .confirm(&config, &principal, "Admin@123", &audit)
            .unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(
            step_up
                .check(&token, &principal, "/v1/outward", &audit)
                .unwrap_err(),
            AuthError::StepUpInvalid
        );
        assert_eq!(audit.recent(1)[0].outcome, StepUpOutcome::Expired);
    }

    #[test]
    fn token_is_bound_to_its_principal() {
        let (config, principal, audit) = setup();
        let step_up = StepUpManager::new(Duration::from_secs(60));
        let token = step_up
            .confirm(&config, &principal, "Admin@123", &audit)
            .unwrap();

        let other = Principal {
            username: "someone-else".into(),
        };
        assert!(step_up.check(&token, &other, "/v1/inward", &audit).is_err());
    }
}
