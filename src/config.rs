use std::{fmt::Display, path::PathBuf, str::FromStr};

use anyhow::{anyhow, bail};
use tracing::{info, warn};

const DEV_JWT_SECRET: &str = "development-only-secret";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment {other:?}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub data_file: PathBuf,
    pub jwt_secret: String,
    pub token_ttl: time::Duration,
    pub environment: Environment,
    pub cors_origin: Option<String>,
    /// Accounts allowed to read the contact inbox.
    pub admin_emails: Vec<String>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let environment: Environment = try_load("APP_ENV", "development")?;

        let jwt_secret = match dotenv::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if environment.is_development() => {
                warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_owned()
            }
            _ => bail!("JWT_SECRET must be set outside development"),
        };

        let token_ttl_hours: i64 = try_load("TOKEN_TTL_HOURS", "24")?;

        Ok(Self {
            port: try_load("PORT", "8080")?,
            database_url: try_load("DATABASE_URL", "sqlite://marketplace.db?mode=rwc")?,
            data_file: try_load("DATA_FILE", "data.json")?,
            jwt_secret,
            token_ttl: time::Duration::hours(token_ttl_hours),
            environment,
            cors_origin: dotenv::var("CORS_ORIGIN").ok(),
            admin_emails: parse_emails(&dotenv::var("ADMIN_EMAILS").unwrap_or_default()),
        })
    }

    /// Development settings pointing at the given data file.
    pub fn local(data_file: impl Into<PathBuf>) -> Self {
        Self {
            port: 0,
            database_url: "sqlite::memory:".to_owned(),
            data_file: data_file.into(),
            jwt_secret: DEV_JWT_SECRET.to_owned(),
            token_ttl: time::Duration::hours(24),
            environment: Environment::Development,
            cors_origin: None,
            admin_emails: Vec::new(),
        }
    }

    pub fn is_admin(&self, email: &str) -> bool {
        self.admin_emails.iter().any(|admin| admin.eq_ignore_ascii_case(email))
    }
}

fn parse_emails(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = dotenv::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_owned()
    });

    raw.parse()
        .map_err(|e| anyhow!("invalid {key} value {raw:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parses_short_and_long_names() {
        assert_eq!("prod".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!("Development".parse::<Environment>(), Ok(Environment::Development));
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn admin_emails_are_a_trimmed_list() {
        let mut config = Config::local("data.json");
        assert!(!config.is_admin("ops@example.com"));

        config.admin_emails = parse_emails(" Ops@Example.com, ,lead@example.com");
        assert_eq!(config.admin_emails, ["ops@example.com", "lead@example.com"]);
        assert!(config.is_admin("OPS@example.com"));
        assert!(!config.is_admin("someone@example.com"));
    }

    #[test]
    fn local_config_is_development() {
        let config = Config::local("/tmp/data.json");
        assert!(config.environment.is_development());
        assert_eq!(config.data_file, PathBuf::from("/tmp/data.json"));
    }
}
