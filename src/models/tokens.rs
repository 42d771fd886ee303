//! Token store: per `(user_id, service)` OAuth token material, created by
//! redeeming an exchange and rotated through the refresh grant.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::apps::AppDirectory;
use super::exchanges::ExchangeLedger;
use crate::error::AuthError;
use crate::providers::{GrantClient, Service};
use crate::store::TokenRepository;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub user_id: i64,
    pub service: Service,
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TokenStore {
    repo: Arc<dyn TokenRepository>,
    ledger: ExchangeLedger,
    apps: AppDirectory,
    grants: Arc<dyn GrantClient>,
}

impl TokenStore {
    pub fn new(
        repo: Arc<dyn TokenRepository>,
        ledger: ExchangeLedger,
        apps: AppDirectory,
        grants: Arc<dyn GrantClient>,
    ) -> Self {
        Self {
            repo,
            ledger,
            apps,
            grants,
        }
    }

    pub async fn get(&self, user_id: i64, service: Service) -> Result<Token, AuthError> {
        self.repo
            .token(user_id, service)
            .await?
            .ok_or_else(|| AuthError::NotFound("token".into()))
    }

    /// Redeem `code` for the exchange `exchange_id` and store the grant.
    ///
    /// The exchange is deleted once the provider accepted the code, before the
    /// token write; a failed delete is logged and ignored. A rejected code
    /// leaves the exchange in place.
    pub async fn create(&self, code: &str, exchange_id: &str) -> Result<i64, AuthError> {
        let exchange = self.ledger.get(exchange_id).await?;
        let config = self.apps.resolve_client_config(exchange.service).await?;

        let tokens = self.grants.exchange_code(&config, code).await?;

        let now = Utc::now();
        let token = Token {
            user_id: exchange.user_id,
            service: exchange.service,
            expiry: tokens.expiry(now),
            token_type: tokens.token_type,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            created_at: now,
        };

        if let Err(e) = self.ledger.delete(&exchange.id).await {
            warn!(
                service = %exchange.service,
                user_id = exchange.user_id,
                "failed to delete consumed exchange: {e}"
            );
        }

        self.repo.upsert_token(&token).await?;

        info!(service = %token.service, user_id = token.user_id, "delegation granted");
        Ok(exchange.user_id)
    }

    /// Rotate the stored token through the provider's refresh grant and
    /// return the new values.
    ///
    /// The write only lands if the stored refresh token is still the one read
    /// here. When a concurrent refresh got there first, its token is returned
    /// instead and this call's result is dropped.
    pub async fn refresh(&self, user_id: i64, service: Service) -> Result<Token, AuthError> {
        let current = self.get(user_id, service).await?;
        let refresh_token = current.refresh_token.clone().ok_or_else(|| {
            AuthError::Internal(format!("no refresh token stored for {service}/{user_id}"))
        })?;

        let config = match self.apps.resolve_client_config(service).await {
            Ok(config) => config,
            Err(AuthError::ServiceUnsupported(s)) => {
                return Err(AuthError::Internal(format!(
                    "stored token for unsupported service {s}"
                )))
            }
            Err(e) => return Err(e),
        };

        let tokens = self.grants.refresh_token(&config, &refresh_token).await?;

        let now = Utc::now();
        let rotated = Token {
            user_id,
            service,
            token_type: current.token_type.clone(),
            expiry: tokens.expiry(now),
            access_token: tokens.access_token,
            // Providers that do not rotate omit the refresh token.
            refresh_token: tokens.refresh_token.or(Some(refresh_token)),
            created_at: now,
        };

        let written = self
            .repo
            .replace_rotated_token(&rotated, current.refresh_token.as_deref())
            .await?;

        if written {
            info!(service = %service, user_id, "token refreshed");
            return Ok(rotated);
        }

        warn!(
            service = %service,
            user_id,
            "token was rotated concurrently, returning the stored result"
        );
        self.get(user_id, service).await
    }
}
