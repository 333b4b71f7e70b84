use anyhow::{Context, Result};
use chrono::Duration;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::auth::governor::LockoutPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Détecte automatiquement l'environnement
    fn detect_from(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        // AWS Lambda injecte toujours cette variable
        if lookup("AWS_LAMBDA_FUNCTION_NAME").is_some() {
            return Self::Production;
        }

        match lookup("APP_ENV").as_deref() {
            Some("production" | "prod") => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

/// What a login does when the attempt store cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFailurePolicy {
    /// Log and let the login proceed without lockout bookkeeping.
    Open,
    /// Reject the login with 503.
    Closed,
}

impl FromStr for StoreFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => anyhow::bail!("STORE_FAILURE_POLICY must be 'open' or 'closed', got '{other}'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub server_host: String,
    pub server_port: u16,
    pub users_file: Option<PathBuf>,
    pub lockout: LockoutPolicy,
    pub store_failure_policy: StoreFailurePolicy,
    pub store_purge_interval: std::time::Duration,
    pub trust_forwarded_for: bool,
}

impl Config {
    /// Charge la configuration depuis les variables d'environnement
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key| env::var(key).ok())
    }

    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let environment = Environment::detect_from(lookup);

        tracing::info!(
            "🌍 Environment detected: {}",
            environment.as_str().to_uppercase()
        );

        let jwt_secret = Self::get_jwt_secret(lookup, environment)?;
        let jwt_expiration_hours = parse_or(lookup, "JWT_EXPIRATION_HOURS", 1_i64)?;
        if jwt_expiration_hours <= 0 {
            anyhow::bail!("JWT_EXPIRATION_HOURS must be positive");
        }
        Duration::try_hours(jwt_expiration_hours)
            .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
            .context("JWT_EXPIRATION_HOURS is out of range")?;
        let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let server_port = parse_or(lookup, "SERVER_PORT", 3000_u16)?;
        let users_file = lookup("USERS_FILE").map(PathBuf::from);
        let lockout = Self::get_lockout_policy(lookup)?;
        let store_failure_policy =
            parse_or(lookup, "STORE_FAILURE_POLICY", StoreFailurePolicy::Open)?;
        let store_purge_interval = std::time::Duration::from_secs(parse_or(
            lookup,
            "STORE_PURGE_INTERVAL_SECONDS",
            60_u64,
        )?);
        let trust_forwarded_for =
            parse_or(lookup, "TRUST_FORWARDED_FOR", environment.is_production())?;

        if users_file.is_none() && environment.is_production() {
            anyhow::bail!("USERS_FILE must be set in production");
        }

        tracing::info!("✅ Configuration loaded successfully");
        tracing::debug!("   Server: {}:{}", server_host, server_port);
        tracing::debug!(
            "   Lockout: {} attempts per identifier, {} per IP, {}s window, {}s lock",
            lockout.max_attempts,
            lockout.ip_max_attempts,
            lockout.window.num_seconds(),
            lockout.lock_duration.num_seconds()
        );
        tracing::debug!("   Store failure policy: {:?}", store_failure_policy);

        Ok(Self {
            environment,
            jwt_secret,
            jwt_expiration_hours,
            server_host,
            server_port,
            users_file,
            lockout,
            store_failure_policy,
            store_purge_interval,
            trust_forwarded_for,
        })
    }

    /// Récupère JWT_SECRET avec validation
    fn get_jwt_secret(
        lookup: &dyn Fn(&str) -> Option<String>,
        environment: Environment,
    ) -> Result<String> {
        let secret = match lookup("JWT_SECRET") {
            Some(s) => s,
            None if environment.is_production() => {
                tracing::error!("❌ JWT_SECRET not set in production!");
                anyhow::bail!("JWT_SECRET is required in production");
            }
            None => {
                tracing::warn!("⚠️  JWT_SECRET not set, using default (DEVELOPMENT ONLY!)");
                "dev_secret_key_change_in_production".to_string()
            }
        };

        if environment.is_production() && secret.len() < 32 {
            anyhow::bail!(
                "JWT_SECRET must be at least 32 characters in production (current: {})",
                secret.len()
            );
        }

        Ok(secret)
    }

    fn get_lockout_policy(lookup: &dyn Fn(&str) -> Option<String>) -> Result<LockoutPolicy> {
        let defaults = LockoutPolicy::default();
        let max_attempts = parse_or(lookup, "LOGIN_MAX_ATTEMPTS", defaults.max_attempts)?;
        let ip_max_attempts = parse_or(lookup, "LOGIN_IP_MAX_ATTEMPTS", defaults.ip_max_attempts)?;
        let window_secs = parse_or(
            lookup,
            "LOGIN_WINDOW_SECONDS",
            defaults.window.num_seconds(),
        )?;
        let lock_secs = parse_or(
            lookup,
            "LOGIN_LOCKOUT_SECONDS",
            defaults.lock_duration.num_seconds(),
        )?;

        if max_attempts == 0 || ip_max_attempts == 0 {
            anyhow::bail!("LOGIN_MAX_ATTEMPTS and LOGIN_IP_MAX_ATTEMPTS must be at least 1");
        }
        if window_secs <= 0 || lock_secs <= 0 {
            anyhow::bail!("LOGIN_WINDOW_SECONDS and LOGIN_LOCKOUT_SECONDS must be positive");
        }

        Ok(LockoutPolicy {
            max_attempts,
            ip_max_attempts,
            window: Duration::try_seconds(window_secs)
                .context("LOGIN_WINDOW_SECONDS is out of range")?,
            lock_duration: Duration::try_seconds(lock_secs)
                .context("LOGIN_LOCKOUT_SECONDS is out of range")?,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.is_production()
    }
}

fn parse_or<T>(lookup: &dyn Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("invalid value for {key}: '{raw}'")),
        None => Ok(default),
    }
}
