use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    pub environment: String,
    /// Exposes internal error details in failure envelopes.
    pub debug: bool,
    pub url: String,
    pub host: String,
    pub port: u16,
    /// `None` runs against the in-memory credential store.
    pub database_url: Option<String>,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .context("JWT_SECRET must be set")?;

        let jwt = JwtConfig {
            secret,
            ttl_minutes: ttl_or(&lookup, "JWT_TTL_MINUTES", 60)?,
            refresh_ttl_minutes: ttl_or(&lookup, "JWT_REFRESH_TTL_MINUTES", 60 * 24 * 7)?,
        };

        let cors_origins = match lookup("CORS_ALLOWED_ORIGINS") {
            None => Vec::new(),
            Some(raw) if raw.trim() == "*" => Vec::new(),
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        };

        Ok(Self {
            app_name: lookup("APP_NAME").unwrap_or_else(|| "TinCup API".into()),
            environment: lookup("APP_ENV").unwrap_or_else(|| "production".into()),
            debug: lookup("APP_DEBUG").as_deref() == Some("true"),
            url: lookup("APP_URL").unwrap_or_else(|| "http://localhost".into()),
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "APP_PORT", 8080)?,
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
            cors_origins,
            jwt,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}

/// Ten years.
const MAX_TTL_MINUTES: i64 = 60 * 24 * 365 * 10;

fn ttl_or<F>(lookup: &F, key: &str, default: i64) -> anyhow::Result<i64>
where
    F: Fn(&str) -> Option<String>,
{
    let minutes = parse_or(lookup, key, default)?;
    anyhow::ensure!(
        (1..=MAX_TTL_MINUTES).contains(&minutes),
        "{key} must be between 1 and {MAX_TTL_MINUTES} minutes, got {minutes}"
    );
    Ok(minutes)
}
