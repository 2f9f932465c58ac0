//! Process configuration.

use std::{net::SocketAddr, time::Duration};

use clap::Parser;
use crib_auth::AuthConfig;

/// Tool crib inventory service.
#[derive(Debug, Clone, Parser)]
#[command(name = "toolcrib", version, about)]
pub struct Config {
    /// Address to bind the HTTP listener to.
    #[arg(long, env = "TOOLCRIB_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Admin username.
    #[arg(long, env = "TOOLCRIB_ADMIN_USER", default_value = "admin")]
    pub admin_user: String,

    /// Admin password. No default: the service refuses to start without one.
    #[arg(long, env = "TOOLCRIB_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: String,

    /// Session lifetime in seconds.
    #[arg(long, env = "TOOLCRIB_SESSION_TTL_SECS", default_value_t = 8 * 60 * 60)]
    pub session_ttl_secs: u64,

    /// Step-up token lifetime in seconds.
    #[arg(long, env = "TOOLCRIB_STEP_UP_TTL_SECS", default_value_t = 120)]
    pub step_up_ttl_secs: u64,

    /// Retained step-up audit entries; the oldest are evicted beyond this.
    #[arg(long, env = "TOOLCRIB_AUDIT_CAPACITY", default_value_t = 10_000)]
    pub audit_capacity: usize,
}

impl Config {
    pub fn auth(&self) -> AuthConfig {
        AuthConfig::new(self.admin_user.clone(), self.admin_password.clone())
            .with_session_ttl(Duration::from_secs(self.session_ttl_secs))
            .with_step_up_ttl(Duration::from_secs(self.step_up_ttl_secs))
            .with_audit_capacity(self.audit_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_only_the_password_is_given() {
        let config = Config::parse_from(["toolcrib", "--admin-password", "hunter2"]);
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.admin_user, "admin");
        assert_eq!(config.session_ttl_secs, 8 * 60 * 60);

        let auth = config.auth();
        assert_eq!(auth.step_up_ttl, Duration::from_secs(120));
    }

    #[test]
    fn missing_password_is_a_parse_error() {
        assert!(Config::try_parse_from(["toolcrib"]).is_err());
    }
}
