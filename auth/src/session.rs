//! Bearer-token sessions for the admin principal.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::{
    config::AuthConfig,
    error::{AuthError, AuthResult},
};

/// The signed-in identity attached to request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
}

#[derive(Debug)]
struct Session {
    username: String,
    issued_at: Instant,
}

/// Issues and validates opaque bearer session tokens.
#[derive(Debug)]
pub struct SessionManager {
    sessions: DashMap<String, Session>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Signs the admin principal in. Credentials are compared in constant
    /// time; a mismatch never reveals which half was wrong.
    pub fn login(&self, config: &AuthConfig, username: &str, password: &str) -> AuthResult<String> {
        if !verify(username, &config.admin_username) || !verify(password, &config.admin_password) {
            warn!(username, "sign-in rejected");
            return Err(AuthError::BadCredentials);
        }
        let token = uuid::Uuid::new_v4().to_string();
        self.sessions.insert(
            token.clone(),
            Session {
                username: username.to_string(),
                issued_at: Instant::now(),
            },
        );
        info!(username, "session issued");
        Ok(token)
    }

    /// Resolves a bearer token to its principal, expiring stale sessions.
    pub fn validate(&self, token: &str) -> AuthResult<Principal> {
        let expired = match self.sessions.get(token) {
            None => return Err(AuthError::SessionInvalid),
            Some(session) => {
                if session.issued_at.elapsed() <= self.ttl {
                    return Ok(Principal {
                        username: session.username.clone(),
                    });
                }
                true
            }
        };
        if expired {
            self.sessions.remove(token);
        }
        Err(AuthError::SessionInvalid)
    }

    pub fn logout(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }
}

/// Constant-time string comparison. Length differences short-circuit inside
/// `subtle` without branching on content.
pub(crate) fn verify(candidate: &str, expected: &str) -> bool {
    candidate.as_bytes().ct_eq(expected.as_bytes()).into()
}
