use std::{env, time::Duration};

use anyhow::{Context, Result};
use axum_extra::extract::cookie::SameSite;

#[derive(Clone, Debug)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub frontend_origins: Vec<String>,
    pub cookie_secure: bool,
    pub cookie_same_site: SameSite,
    pub access_token_ttl: Duration,
    pub reset_token_ttl: Duration,
    pub low_stock_threshold: i32,
    pub expiration_window_days: i64,
    pub alert_interval: Duration,
    pub notification_recipients: Vec<String>,
    pub notification_timeout: Duration,
    pub smtp: Option<SmtpSettings>,
    pub enable_alert_worker: bool,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let access_token_ttl = parse_duration_seconds("ACCESS_TOKEN_TTL_SECS", 86_400)?;
        let reset_token_ttl = parse_duration_seconds("RESET_TOKEN_TTL_SECS", 3_600)?;
        let notification_timeout = parse_duration_seconds("NOTIFY_TIMEOUT_SECS", 5)?;
        let frontend_origins = parse_origins();
        let enable_alert_worker = parse_bool("ENABLE_ALERT_WORKER", true);

        let low_stock_threshold = parse_env_int::<i32>("LOW_STOCK_THRESHOLD", 5)?;
        if low_stock_threshold < 0 {
            anyhow::bail!("LOW_STOCK_THRESHOLD must not be negative");
        }
        let expiration_window_days = parse_env_int::<i64>("EXPIRATION_WINDOW_DAYS", 7)?;
        if expiration_window_days < 0 {
            anyhow::bail!("EXPIRATION_WINDOW_DAYS must not be negative");
        }
        let alert_interval_hours = parse_env_int::<u64>("ALERT_INTERVAL_HOURS", 24)?;
        if alert_interval_hours == 0 {
            anyhow::bail!("ALERT_INTERVAL_HOURS must be at least 1");
        }

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| "dev-secret".to_string());
        let cookie_secure = parse_bool("COOKIE_SECURE", false);

        if is_production_environment() {
            if jwt_secret == "dev-secret" {
                anyhow::bail!(
                    "CRITICAL SECURITY ERROR: JWT_SECRET is using default 'dev-secret' in production!\n\
                    This allows anyone to forge authentication tokens.\n\
                    Set a strong random JWT_SECRET in your .env file immediately."
                );
            }
            if jwt_secret.len() < 32 {
                eprintln!(
                    "WARNING: JWT_SECRET is too short ({} chars). \
                    Recommended: at least 32 characters for production.",
                    jwt_secret.len()
                );
            }
            if !cookie_secure {
                eprintln!(
                    "WARNING: COOKIE_SECURE=false in production. \
                    Set COOKIE_SECURE=true when deploying behind HTTPS."
                );
            }
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set for API server")?,
            jwt_secret,
            jwt_audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| "homestock".to_string()),
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "homestock-api".to_string()),
            frontend_origins,
            cookie_secure,
            cookie_same_site: parse_same_site(&env::var("COOKIE_SAMESITE").ok()),
            access_token_ttl,
            reset_token_ttl,
            low_stock_threshold,
            expiration_window_days,
            alert_interval: Duration::from_secs(alert_interval_hours * 3_600),
            notification_recipients: parse_recipients("ALERT_RECIPIENTS"),
            notification_timeout,
            smtp: parse_smtp()?,
            enable_alert_worker,
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .context("PORT must be a valid u16")?,
        })
    }
}

fn is_production_environment() -> bool {
    env::var("ENVIRONMENT")
        .or_else(|_| env::var("ENV"))
        .map(|e| {
            let lower = e.to_lowercase();
            lower == "production" || lower == "prod"
        })
        .unwrap_or(false)
}

fn parse_origins() -> Vec<String> {
    if let Ok(list) = env::var("FRONTEND_ORIGINS") {
        split_list(&list)
    } else if let Ok(origin) = env::var("FRONTEND_ORIGIN") {
        split_list(&origin)
    } else {
        vec!["http://localhost:3000".to_string()]
    }
}

fn parse_recipients(key: &str) -> Vec<String> {
    env::var(key).map(|raw| split_list(&raw)).unwrap_or_default()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|item| {
            let trimmed = item.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

fn parse_smtp() -> Result<Option<SmtpSettings>> {
    let Ok(host) = env::var("SMTP_HOST") else {
        return Ok(None);
    };
    if host.trim().is_empty() {
        return Ok(None);
    }

    let port = parse_env_int::<u16>("SMTP_PORT", 587)?;
    let from_address = env::var("SMTP_FROM")
        .context("SMTP_FROM must be set when SMTP_HOST is configured")?;

    Ok(Some(SmtpSettings {
        host,
        port,
        username: env::var("SMTP_USERNAME").unwrap_or_default(),
        password: env::var("SMTP_PASSWORD").unwrap_or_default(),
        from_address,
    }))
}

fn parse_duration_seconds(key: &str, default: u64) -> Result<Duration> {
    parse_env_int::<u64>(key, default).map(Duration::from_secs)
}

fn parse_env_int<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|err| anyhow::anyhow!("{key} is not a valid integer: {err}")),
        Err(_) => Ok(default),
    }
}

fn parse_same_site(value: &Option<String>) -> SameSite {
    match value.as_ref().map(|v| v.trim().to_lowercase()).as_deref() {
        Some("strict") => SameSite::Strict,
        Some("none") => SameSite::None,
        _ => SameSite::Lax,
    }
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes" | "on"))
        .unwrap_or(default)
}
