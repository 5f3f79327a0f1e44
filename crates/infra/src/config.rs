//! Configuration loading and representation.

use std::net::SocketAddr;

use thiserror::Error;

use tenantdesk_auth::token::DEFAULT_TTL_SECS;

const DEV_JWT_SECRET: &str = "dev-secret";

/// Upper bound for `TOKEN_TTL_SECS`: 30 days.
pub const MAX_TOKEN_TTL_SECS: i64 = 30 * 86_400;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("{0} and {1} must be set together")]
    Incomplete(&'static str, &'static str),
}

/// Bootstrap super admin credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct SuperAdminSeed {
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for SuperAdminSeed {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SuperAdminSeed")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Process configuration, built once at startup and passed down.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    /// Postgres when set, in-memory store otherwise.
    pub database_url: Option<String>,
    pub seed_demo: bool,
    pub super_admin: Option<SuperAdminSeed>,
    /// Take the client address from `X-Forwarded-For`. Only safe behind a
    /// proxy that overwrites the header; off by default.
    pub trust_proxy: bool,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("database", &self.database_url.as_ref().map(|_| "postgres"))
            .field("seed_demo", &self.seed_demo)
            .field("super_admin", &self.super_admin)
            .field("trust_proxy", &self.trust_proxy)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = match get("BIND_ADDR") {
            Some(v) => v.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                key: "BIND_ADDR",
                reason: e.to_string(),
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let token_ttl_secs = match get("TOKEN_TTL_SECS") {
            Some(v) => match v.parse::<i64>() {
                Ok(n) if n > 0 && n <= MAX_TOKEN_TTL_SECS => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "TOKEN_TTL_SECS",
                        reason: format!("expected an integer in 1..={MAX_TOKEN_TTL_SECS}, got '{v}'"),
                    });
                }
            },
            None => DEFAULT_TTL_SECS,
        };

        let seed_demo = flag("SEED_DEMO", get("SEED_DEMO"))?;
        let trust_proxy = flag("TRUST_PROXY", get("TRUST_PROXY"))?;

        let super_admin = match (get("SUPER_ADMIN_EMAIL"), get("SUPER_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(SuperAdminSeed { email, password }),
            (None, None) => None,
            _ => return Err(ConfigError::Incomplete("SUPER_ADMIN_EMAIL", "SUPER_ADMIN_PASSWORD")),
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            token_ttl_secs,
            database_url: get("DATABASE_URL"),
            seed_demo,
            super_admin,
            trust_proxy,
        })
    }
}

fn flag(key: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    match value.as_deref() {
        None | Some("0") | Some("false") => Ok(false),
        Some("1") | Some("true") => Ok(true),
        Some(other) => Err(ConfigError::Invalid {
            key,
            reason: format!("expected true/false, got '{other}'"),
        }),
    }
}
