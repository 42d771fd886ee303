pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod providers;
pub mod store;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use error::AuthError;

use std::sync::Arc;

use models::{AppDirectory, Delegation, ExchangeLedger, TokenStore};
use providers::{GrantClient, ProviderRegistry};
use store::{AppRepository, ExchangeRepository, TokenRepository};
use validation::AppValidator;

/// Shared application state passed to all API handlers.
pub struct AppState {
    pub validator: AppValidator,
    pub delegation: Delegation,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wire the delegation models over one storage backend and grant client.
    pub fn new<S>(config: &Config, store: Arc<S>, grants: Arc<dyn GrantClient>) -> Self
    where
        S: AppRepository + ExchangeRepository + TokenRepository + 'static,
    {
        let registry = ProviderRegistry::builtin().without(&config.disabled_providers);

        let apps = AppDirectory::new(store.clone(), Arc::new(registry));
        let ledger = ExchangeLedger::new(store.clone(), config.exchange_ttl);
        let tokens = TokenStore::new(store, ledger.clone(), apps.clone(), grants);
        let delegation = Delegation::new(apps, ledger, tokens);

        Self {
            validator: AppValidator::from_config(config),
            delegation,
        }
    }
}
