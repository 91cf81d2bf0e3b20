use std::str::FromStr;

use anyhow::Context;
use jsonwebtoken::Algorithm;

/// One year.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, so tests never touch process env.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL is not set")?;

        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .context("JWT_SECRET is not set")?;

        let algorithm_name = lookup("JWT_ALGORITHM").unwrap_or_else(|| "HS256".into());
        let algorithm = Algorithm::from_str(&algorithm_name)
            .map_err(|_| anyhow::anyhow!("unknown JWT_ALGORITHM {algorithm_name}"))?;
        anyhow::ensure!(
            matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512),
            "JWT_ALGORITHM {algorithm_name} needs key material; only HS256, HS384, HS512 are supported"
        );

        let ttl_minutes = match lookup("JWT_TTL_MINUTES") {
            Some(v) => v
                .parse::<i64>()
                .with_context(|| format!("JWT_TTL_MINUTES is not a number: {v}"))?,
            None => 30,
        };
        anyhow::ensure!(ttl_minutes > 0, "JWT_TTL_MINUTES must be positive");
        anyhow::ensure!(
            ttl_minutes <= MAX_TTL_MINUTES,
            "JWT_TTL_MINUTES must be at most {MAX_TTL_MINUTES}"
        );

        let host = lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match lookup("APP_PORT") {
            Some(v) => v
                .parse::<u16>()
                .with_context(|| format!("APP_PORT is not a port: {v}"))?,
            None => 8080,
        };

        Ok(Self {
            database_url,
            host,
            port,
            jwt: JwtConfig {
                secret,
                algorithm,
                ttl_minutes,
            },
        })
    }
}
