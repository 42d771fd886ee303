//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::AuthError;
use crate::models::{AppDirectory, AppDraft, AppStatus, Delegation, ExchangeLedger, NewApp, TokenStore};
use crate::providers::{ClientConfig, GrantClient, ProviderRegistry, Service, TokenSet};
use crate::store::memory::MemoryStore;
use crate::store::AppRepository;
use crate::validation::AppValidator;

/// Grant client answering `access-N` / `refresh-N`, N counting every call.
#[derive(Default)]
pub struct ScriptedGrants {
    calls: Mutex<Vec<String>>,
    issued: AtomicUsize,
    omit_refresh: AtomicBool,
    fail_next: AtomicBool,
    lifetime: Mutex<Option<i64>>,
}

impl ScriptedGrants {
    /// Calls seen so far, as `kind:service:credential`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Stop returning refresh tokens from now on.
    pub fn omit_refresh_token(&self) {
        self.omit_refresh.store(true, Ordering::SeqCst);
    }

    /// Report `secs` as `expires_in` from now on (default 3600).
    pub fn expires_in(&self, secs: i64) {
        *self.lifetime.lock().unwrap() = Some(secs);
    }

    /// Reject the next call as the provider would an invalid grant.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn answer(&self, kind: &str, config: &ClientConfig, credential: &str) -> Result<TokenSet, AuthError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{kind}:{}:{credential}", config.service));

        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(AuthError::Provider("invalid_grant".into()));
        }

        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TokenSet {
            access_token: format!("access-{n}"),
            refresh_token: (!self.omit_refresh.load(Ordering::SeqCst))
                .then(|| format!("refresh-{n}")),
            token_type: "Bearer".into(),
            expires_in: Some(self.lifetime.lock().unwrap().unwrap_or(3600)),
            scope: None,
        })
    }
}

#[async_trait]
impl GrantClient for ScriptedGrants {
    async fn exchange_code(&self, config: &ClientConfig, code: &str) -> Result<TokenSet, AuthError> {
        self.answer("exchange", config, code)
    }

    async fn refresh_token(
        &self,
        config: &ClientConfig,
        refresh_token: &str,
    ) -> Result<TokenSet, AuthError> {
        self.answer("refresh", config, refresh_token)
    }
}

pub fn validator() -> AppValidator {
    AppValidator::new(vec!["https".into(), "http".into()])
}

pub fn draft(id: &str, status: &str) -> AppDraft {
    AppDraft {
        id: id.into(),
        password: "secret".into(),
        callback_url: "https://x/cb".into(),
        expiry: None,
        status: Some(status.into()),
    }
}

pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        database_url: "postgres://unused".into(),
        database_max_connections: 1,
        exchange_ttl: Duration::from_secs(600),
        exchange_sweep_interval: Duration::from_secs(300),
        provider_timeout: Duration::from_secs(5),
        disabled_providers: vec![],
        allowed_callback_schemes: vec!["https".into(), "http".into()],
    }
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub grants: Arc<ScriptedGrants>,
    pub ledger: ExchangeLedger,
    pub tokens: TokenStore,
    pub delegation: Delegation,
}

/// Wire the models over a memory store, with one enabled app per service in
/// `enabled` (id `<service>-app`, secret `secret`, callback `https://x/cb`).
pub async fn fixture(enabled: &[Service]) -> Fixture {
    let store = Arc::new(MemoryStore::default());
    let grants = Arc::new(ScriptedGrants::default());

    for service in enabled {
        store
            .insert_app(&NewApp {
                id: format!("{service}-app"),
                service: *service,
                password: "secret".into(),
                callback_url: "https://x/cb".into(),
                expiry: None,
                status: AppStatus::Enable,
            })
            .await
            .unwrap();
    }

    let apps = AppDirectory::new(store.clone(), Arc::new(ProviderRegistry::builtin()));
    let ledger = ExchangeLedger::new(store.clone(), Duration::from_secs(600));
    let tokens = TokenStore::new(store.clone(), ledger.clone(), apps.clone(), grants.clone());
    let delegation = Delegation::new(apps.clone(), ledger.clone(), tokens.clone());

    Fixture {
        store,
        grants,
        ledger,
        tokens,
        delegation,
    }
}
