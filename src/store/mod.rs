//! Row storage for apps, exchanges and tokens.
//!
//! The delegation models talk to storage only through the repository traits
//! below. `PgStore` is the PostgreSQL implementation; uniqueness (app ids, one
//! enabled app per service, one token per user and service) is enforced by
//! table constraints, not in process.

pub mod db;
#[cfg(test)]
pub mod memory;
pub mod sweep;

pub use db::PgStore;
pub use sweep::exchange_sweeper;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AuthError;
use crate::models::apps::{App, AppStatus, NewApp};
use crate::models::exchanges::Exchange;
use crate::models::tokens::Token;
use crate::providers::Service;

#[async_trait]
pub trait AppRepository: Send + Sync {
    async fn app_by_id(&self, id: &str) -> Result<Option<App>, AuthError>;

    /// The enabled app for `service`, if any.
    async fn enabled_app_by_service(&self, service: Service) -> Result<Option<App>, AuthError>;

    /// Insert a new app. Uniqueness violations yield `AlreadyExists`.
    async fn insert_app(&self, app: &NewApp) -> Result<(), AuthError>;

    /// Update the status of an app, returning the updated row.
    async fn update_app_status(
        &self,
        id: &str,
        status: AppStatus,
    ) -> Result<Option<App>, AuthError>;
}

#[async_trait]
pub trait ExchangeRepository: Send + Sync {
    async fn insert_exchange(&self, exchange: &Exchange) -> Result<(), AuthError>;

    async fn exchange_by_id(&self, id: &str) -> Result<Option<Exchange>, AuthError>;

    /// Delete by id. Deleting a missing row is not an error.
    async fn delete_exchange(&self, id: &str) -> Result<(), AuthError>;

    /// Delete every exchange created before `cutoff`, returning how many went.
    async fn delete_exchanges_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AuthError>;
}

#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn token(&self, user_id: i64, service: Service) -> Result<Option<Token>, AuthError>;

    /// Insert or overwrite the token for `(user_id, service)`.
    async fn upsert_token(&self, token: &Token) -> Result<(), AuthError>;

    /// Overwrite the rotating fields of an existing token, but only while the
    /// stored refresh token still equals `expected_refresh`. Returns whether
    /// the row was written.
    async fn replace_rotated_token(
        &self,
        token: &Token,
        expected_refresh: Option<&str>,
    ) -> Result<bool, AuthError>;
}
