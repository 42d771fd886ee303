use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::ClientConfig;
use crate::error::AuthError;

/// A set of tokens returned from an OAuth provider after code exchange or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, deserialize_with = "lifetime_secs")]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".into()
}

/// Longest token lifetime taken at face value, in seconds.
const MAX_LIFETIME_SECS: i64 = i32::MAX as i64;

/// Some providers send `expires_in` as a quoted number.
fn lifetime_secs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lifetime {
        Secs(i64),
        Text(String),
    }

    match Option::<Lifetime>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Lifetime::Secs(secs)) => Ok(Some(secs)),
        Some(Lifetime::Text(raw)) if raw.trim().is_empty() => Ok(None),
        Some(Lifetime::Text(raw)) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid expires_in: {raw}"))),
    }
}

impl TokenSet {
    /// Absolute expiry, if the provider reported a positive lifetime.
    /// Lifetimes are capped at `MAX_LIFETIME_SECS`.
    pub fn expiry(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let secs = self.expires_in.filter(|secs| *secs > 0)?;
        let lifetime = Duration::try_seconds(secs.min(MAX_LIFETIME_SECS))?;
        now.checked_add_signed(lifetime)
    }
}

/// Performs the token-endpoint half of the authorization code flow.
///
/// Implementations make exactly one round trip per call and never retry.
#[async_trait]
pub trait GrantClient: Send + Sync {
    /// Exchange an authorization code for tokens (`grant_type=authorization_code`).
    async fn exchange_code(&self, config: &ClientConfig, code: &str)
        -> Result<TokenSet, AuthError>;

    /// Obtain fresh tokens with a refresh token (`grant_type=refresh_token`).
    async fn refresh_token(
        &self,
        config: &ClientConfig,
        refresh_token: &str,
    ) -> Result<TokenSet, AuthError>;
}
