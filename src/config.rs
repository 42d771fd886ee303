use std::time::Duration;

use anyhow::{Context, Result};

use crate::providers::Service;

/// Application configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // ── Server ──────────────────────────────────────────────────────────
    pub host: String,
    pub port: u16,

    // ── Database ────────────────────────────────────────────────────────
    pub database_url: String,
    pub database_max_connections: u32,

    // ── Delegation ──────────────────────────────────────────────────────
    /// How long an issued `state` stays redeemable.
    pub exchange_ttl: Duration,
    /// Period of the background sweep that drops expired exchanges.
    pub exchange_sweep_interval: Duration,
    /// Request timeout for provider token endpoints.
    pub provider_timeout: Duration,
    /// Providers removed from the registry at startup.
    pub disabled_providers: Vec<Service>,
    /// URL schemes accepted for an app's callback URL.
    pub allowed_callback_schemes: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .context("Invalid PORT")?,

            database_url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL is required (PostgreSQL connection string)")?,
            database_max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".into())
                .parse()
                .context("Invalid DATABASE_MAX_CONNECTIONS")?,

            exchange_ttl: secs_var("EXCHANGE_TTL_SECS", 600)?,
            exchange_sweep_interval: secs_var("EXCHANGE_SWEEP_INTERVAL_SECS", 300)?,
            provider_timeout: secs_var("PROVIDER_TIMEOUT_SECS", 30)?,

            disabled_providers: parse_services(
                &std::env::var("DISABLED_PROVIDERS").unwrap_or_default(),
            )?,
            allowed_callback_schemes: split_list(
                &std::env::var("ALLOWED_CALLBACK_SCHEMES").unwrap_or_else(|_| "https,http".into()),
            ),
        })
    }
}

/// Upper bound for any duration setting (ten years).
const MAX_SECS: u64 = 10 * 365 * 24 * 60 * 60;

fn secs_var(name: &str, default: u64) -> Result<Duration> {
    parse_secs(name, std::env::var(name).ok().as_deref(), default)
}

fn parse_secs(name: &str, raw: Option<&str>, default: u64) -> Result<Duration> {
    let secs: u64 = match raw {
        Some(v) => v.trim().parse().with_context(|| format!("Invalid {name}"))?,
        None => default,
    };
    if secs == 0 || secs > MAX_SECS {
        anyhow::bail!("{name} must be between 1 and {MAX_SECS} seconds, got {secs}");
    }
    Ok(Duration::from_secs(secs))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_services(raw: &str) -> Result<Vec<Service>> {
    split_list(raw)
        .iter()
        .map(|s| {
            s.parse::<Service>()
                .with_context(|| format!("Unknown provider in DISABLED_PROVIDERS: {s}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list_trims_and_drops_empty() {
        assert_eq!(split_list(" https, HTTP ,,"), vec!["https", "http"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_duration_settings_are_bounded() {
        assert_eq!(
            parse_secs("EXCHANGE_TTL_SECS", None, 600).unwrap(),
            Duration::from_secs(600)
        );
        assert_eq!(
            parse_secs("EXCHANGE_SWEEP_INTERVAL_SECS", Some(" 30 "), 300).unwrap(),
            Duration::from_secs(30)
        );

        let zero = parse_secs("EXCHANGE_SWEEP_INTERVAL_SECS", Some("0"), 300).unwrap_err();
        assert!(zero.to_string().contains("EXCHANGE_SWEEP_INTERVAL_SECS"));
        assert!(parse_secs("EXCHANGE_TTL_SECS", Some("10000000000000"), 600).is_err());
        assert!(parse_secs("PROVIDER_TIMEOUT_SECS", Some("-1"), 30).is_err());
    }

    #[test]
    fn test_parse_services() {
        let services = parse_services("vk, mail").unwrap();
        assert_eq!(services, vec![Service::Vk, Service::Mail]);
        assert!(parse_services("vk,github").is_err());
    }
}
