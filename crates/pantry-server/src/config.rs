use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use tracing::info;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub redis_url: Option<String>,
    /// `None` means mail is logged instead of sent.
    pub smtp: Option<SmtpConfig>,
    pub email_from: String,
    pub code_ttl: Duration,
    pub verify_base_url: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = get("PANTRY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("PANTRY_JWT_SECRET is unset or still a placeholder");
        }

        let smtp = match non_empty(get("PANTRY_SMTP_HOST")) {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse_or(&get, "PANTRY_SMTP_PORT", 587)?,
                username: non_empty(get("PANTRY_SMTP_USERNAME")),
                password: non_empty(get("PANTRY_SMTP_PASSWORD")),
            }),
            None => None,
        };

        Ok(Self {
            host: get("PANTRY_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&get, "PANTRY_PORT", 3000)?,
            db_path: get("PANTRY_DB_PATH").unwrap_or_else(|| "pantry.db".into()).into(),
            jwt_secret,
            redis_url: non_empty(get("PANTRY_REDIS_URL")),
            smtp,
            email_from: get("PANTRY_EMAIL_FROM").unwrap_or_else(|| "noreply@pantry.local".into()),
            code_ttl: Duration::from_secs(parse_or(&get, "PANTRY_VERIFY_CODE_TTL_SECS", 300)?),
            verify_base_url: get("PANTRY_VERIFY_BASE_URL")
                .unwrap_or_else(|| "http://127.0.0.1:3000/auth/verify-code".into()),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + std::fmt::Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("invalid {key}: {raw}")),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_with_secret_only() {
        let config = load(&[("PANTRY_JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.db_path, PathBuf::from("pantry.db"));
        assert_eq!(config.code_ttl, Duration::from_secs(300));
        assert!(config.redis_url.is_none());
        assert!(config.smtp.is_none());
    }

    #[test]
    fn rejects_missing_or_placeholder_secret() {
        assert!(load(&[]).is_err());
        assert!(load(&[("PANTRY_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn smtp_needs_a_host() {
        let config = load(&[
            ("PANTRY_JWT_SECRET", "s3cret"),
            ("PANTRY_SMTP_HOST", "smtp.example.com"),
            ("PANTRY_SMTP_USERNAME", "mailer"),
        ])
        .unwrap();
        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.username.as_deref(), Some("mailer"));
        assert!(smtp.password.is_none());
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(load(&[("PANTRY_JWT_SECRET", "s3cret"), ("PANTRY_PORT", "http")]).is_err());
    }
}
