//! The two user-facing delegation flows: issuing an authorization URL and
//! completing (or refreshing) the grant.

use tracing::info;

use super::apps::AppDirectory;
use super::exchanges::ExchangeLedger;
use super::tokens::{Token, TokenStore};
use crate::error::AuthError;
use crate::providers::Service;

#[derive(Clone)]
pub struct Delegation {
    apps: AppDirectory,
    ledger: ExchangeLedger,
    tokens: TokenStore,
}

impl Delegation {
    pub fn new(apps: AppDirectory, ledger: ExchangeLedger, tokens: TokenStore) -> Self {
        Self {
            apps,
            ledger,
            tokens,
        }
    }

    pub fn apps(&self) -> &AppDirectory {
        &self.apps
    }

    pub fn ledger(&self) -> &ExchangeLedger {
        &self.ledger
    }

    /// Issue the provider authorization URL for `user_id`. The URL's `state`
    /// is a fresh exchange id.
    pub async fn start(&self, service: Service, user_id: i64) -> Result<String, AuthError> {
        // Resolve first so an unusable service never leaves an exchange behind.
        let config = self.apps.resolve_client_config(service).await?;
        let exchange_id = self.ledger.create(service, user_id).await?;

        info!(service = %service, user_id, "delegation started");
        config.auth_code_url(&exchange_id)
    }

    /// Complete a delegation from the provider callback, returning the user id.
    pub async fn complete(&self, code: &str, state: &str) -> Result<i64, AuthError> {
        self.tokens.create(code, state).await
    }

    pub async fn token(&self, user_id: i64, service: Service) -> Result<Token, AuthError> {
        self.tokens.get(user_id, service).await
    }

    pub async fn refresh(&self, user_id: i64, service: Service) -> Result<Token, AuthError> {
        self.tokens.refresh(user_id, service).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use url::Url;

    use super::*;
    use crate::store::ExchangeRepository;
    use crate::test_support::{fixture, Fixture};

    fn state_of(url: &str) -> String {
        let query: HashMap<_, _> = Url::parse(url).unwrap().query_pairs().into_owned().collect();
        query["state"].clone()
    }

    #[tokio::test]
    async fn test_start_then_complete_round_trip() {
        let Fixture {
            store, delegation, ..
        } = fixture(&[Service::Yandex]).await;

        let url = delegation.start(Service::Yandex, 42).await.unwrap();
        assert!(url.starts_with("https://oauth.yandex.com/authorize?"));
        let state = state_of(&url);

        let pending = store.exchange_by_id(&state).await.unwrap().unwrap();
        assert_eq!(pending.user_id, 42);
        assert_eq!(pending.service, Service::Yandex);

        let user_id = delegation.complete("valid-code", &state).await.unwrap();
        assert_eq!(user_id, 42);

        let token = delegation.token(42, Service::Yandex).await.unwrap();
        assert_eq!(token.user_id, 42);
        assert_eq!(token.service, Service::Yandex);

        let replay = delegation.complete("valid-code", &state).await.unwrap_err();
        assert!(matches!(replay, AuthError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_start_without_app_mints_no_exchange() {
        let Fixture {
            store, delegation, ..
        } = fixture(&[]).await;

        let err = delegation.start(Service::Google, 1).await.unwrap_err();

        assert!(matches!(err, AuthError::NotFound(_)));
        assert_eq!(store.exchange_count(), 0);
    }

    #[tokio::test]
    async fn test_new_authorization_keeps_existing_grant() {
        let Fixture { delegation, .. } = fixture(&[Service::Vk]).await;
        let first = delegation.start(Service::Vk, 7).await.unwrap();
        delegation.complete("c", &state_of(&first)).await.unwrap();
        let granted = delegation.token(7, Service::Vk).await.unwrap();

        delegation.start(Service::Vk, 7).await.unwrap();

        assert_eq!(delegation.token(7, Service::Vk).await.unwrap(), granted);
    }
}
