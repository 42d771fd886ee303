//! Exchange ledger: single-use records correlating an issued `state` with
//! the `(service, user_id)` that asked for delegation.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::error::AuthError;
use crate::providers::Service;
use crate::store::ExchangeRepository;

/// Length of a generated exchange id. 32 alphanumeric characters give about
/// 190 bits from the thread-local CSPRNG, so collisions are not handled.
pub const EXCHANGE_ID_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exchange {
    pub id: String,
    pub service: Service,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Exchange {
    fn expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.created_at + ttl <= now
    }
}

/// Generate an opaque exchange id (also used as the OAuth `state`).
pub fn generate_exchange_id() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(EXCHANGE_ID_LEN)
        .map(char::from)
        .collect()
}

#[derive(Clone)]
pub struct ExchangeLedger {
    repo: Arc<dyn ExchangeRepository>,
    ttl: Duration,
}

impl ExchangeLedger {
    pub fn new(repo: Arc<dyn ExchangeRepository>, ttl: std::time::Duration) -> Self {
        let ttl = Duration::from_std(ttl).unwrap_or_else(|_| Duration::days(3650));
        Self { repo, ttl }
    }

    /// Mint and persist a new exchange, returning its id.
    pub async fn create(&self, service: Service, user_id: i64) -> Result<String, AuthError> {
        let exchange = Exchange {
            id: generate_exchange_id(),
            service,
            user_id,
            created_at: Utc::now(),
        };
        self.repo.insert_exchange(&exchange).await?;
        Ok(exchange.id)
    }

    /// Look up a live exchange. Expired rows read as absent.
    pub async fn get(&self, id: &str) -> Result<Exchange, AuthError> {
        let exchange = self
            .repo
            .exchange_by_id(id)
            .await?
            .ok_or_else(|| AuthError::NotFound("exchange".into()))?;

        if exchange.expired(self.ttl, Utc::now()) {
            debug!(service = %exchange.service, user_id = exchange.user_id, "exchange expired");
            return Err(AuthError::NotFound("exchange".into()));
        }

        Ok(exchange)
    }

    /// Remove an exchange; a missing id is a no-op.
    pub async fn delete(&self, id: &str) -> Result<(), AuthError> {
        self.repo.delete_exchange(id).await
    }

    /// Delete every expired exchange, returning how many were removed.
    pub async fn sweep(&self) -> Result<u64, AuthError> {
        self.repo
            .delete_exchanges_before(Utc::now() - self.ttl)
            .await
    }
}
