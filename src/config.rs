use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use crate::database::connection::RetryPolicy;

pub const MEMORY_DATABASE: &str = "memory";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub max_connections: u32,
    pub db_wait: RetryPolicy,
    /// `None` means a random secret is generated at startup.
    pub jwt_secret: Option<String>,
    pub token_ttl: chrono::Duration,
    pub media_root: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let wait_delay_ms: u64 = try_load(&lookup, "DB_WAIT_DELAY_MS", "1000")?;
        let token_ttl_hours: i64 = try_load(&lookup, "TOKEN_TTL_HOURS", "24")?;
        if token_ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                key: "TOKEN_TTL_HOURS",
                value: token_ttl_hours.to_string(),
                reason: String::from("must be positive"),
            });
        }

        Ok(Self {
            bind_addr: try_load(&lookup, "BIND_ADDR", "0.0.0.0:8000")?,
            database_url: try_load(&lookup, "DATABASE_URL", MEMORY_DATABASE)?,
            max_connections: try_load(&lookup, "DATABASE_MAX_CONNECTIONS", "5")?,
            db_wait: RetryPolicy {
                attempts: try_load(&lookup, "DB_WAIT_ATTEMPTS", "30")?,
                delay: Duration::from_millis(wait_delay_ms),
            },
            jwt_secret: lookup("JWT_SECRET").filter(|s| !s.is_empty()),
            token_ttl: chrono::Duration::hours(token_ttl_hours),
            media_root: try_load(&lookup, "MEDIA_ROOT", "./media")?,
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url == MEMORY_DATABASE
    }
}

fn try_load<F, T>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        log::debug!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8000".parse().unwrap());
        assert!(config.uses_memory_store());
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.db_wait, RetryPolicy::default());
        assert_eq!(config.jwt_secret, None);
        assert_eq!(config.token_ttl, chrono::Duration::hours(24));
        assert_eq!(config.media_root, PathBuf::from("./media"));
    }

    #[test]
    fn values_are_read_from_lookup() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://app@db/app"),
            ("DB_WAIT_ATTEMPTS", "3"),
            ("DB_WAIT_DELAY_MS", "10"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .unwrap();

        assert!(!config.uses_memory_store());
        assert_eq!(config.db_wait.attempts, 3);
        assert_eq!(config.db_wait.delay, Duration::from_millis(10));
        assert_eq!(config.jwt_secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn invalid_value_names_the_variable() {
        let err = Config::from_lookup(lookup(&[("DB_WAIT_ATTEMPTS", "many")])).unwrap_err();
        assert!(err.to_string().contains("DB_WAIT_ATTEMPTS"));
    }
}
