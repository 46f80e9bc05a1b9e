use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use serde::Deserialize;

/// Accepted range for `JWT_TTL_DAYS`.
pub const TTL_DAYS_RANGE: std::ops::RangeInclusive<i64> = 1..=3650;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl DbConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// `None` runs the service on in-memory stores.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub db: DbConfig,
    pub jwt: JwtConfig,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn check_ttl_days(days: i64) -> anyhow::Result<()> {
    if !TTL_DAYS_RANGE.contains(&days) {
        anyhow::bail!(
            "JWT_TTL_DAYS must be between {} and {}, got {days}",
            TTL_DAYS_RANGE.start(),
            TTL_DAYS_RANGE.end()
        );
    }
    Ok(())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let secret = std::env::var("JWT_SECRET").unwrap_or_default();
        if secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must be set to a non-empty value");
        }

        let jwt = JwtConfig {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "inkpost".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "inkpost-users".into()),
            ttl_days: env_or("JWT_TTL_DAYS", 7),
        };
        check_ttl_days(jwt.ttl_days)?;

        let db = DbConfig {
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            acquire_timeout_secs: env_or("DB_ACQUIRE_TIMEOUT_SECS", 5),
        };
        Ok(Self {
            database_url,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 3000),
            db,
            jwt,
        })
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid APP_HOST {:?}", self.host))
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: None,
            host: "127.0.0.1".into(),
            port: 0,
            db: DbConfig {
                max_connections: 1,
                acquire_timeout_secs: 1,
            },
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_days: 7,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_days_outside_range_is_rejected() {
        for days in [i64::MIN, -1, 0, 3651, 10_000_000, i64::MAX / 1000, i64::MAX] {
            assert!(check_ttl_days(days).is_err(), "{days} accepted");
        }
        for days in [1, 7, 3650] {
            assert!(check_ttl_days(days).is_ok(), "{days} rejected");
        }
    }

    #[test]
    fn bind_addr_from_host_and_port() {
        let mut cfg = AppConfig::for_tests();
        cfg.host = "0.0.0.0".into();
        cfg.port = 3000;
        assert_eq!(cfg.bind_addr().unwrap(), "0.0.0.0:3000".parse().unwrap());

        cfg.host = "not a host".into();
        assert!(cfg.bind_addr().is_err());
    }
}
