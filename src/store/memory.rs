//! In-memory repositories reproducing the PostgreSQL constraint semantics.
//! Test-only.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{AppRepository, ExchangeRepository, TokenRepository};
use crate::error::AuthError;
use crate::models::apps::{App, AppStatus, NewApp};
use crate::models::exchanges::Exchange;
use crate::models::tokens::Token;
use crate::providers::Service;

#[derive(Default)]
pub struct MemoryStore {
    apps: Mutex<HashMap<String, App>>,
    exchanges: Mutex<HashMap<String, Exchange>>,
    tokens: Mutex<HashMap<(i64, Service), Token>>,
    app_writes: AtomicUsize,
    fail_exchange_deletes: AtomicBool,
    interleaved_rotation: Mutex<Option<Token>>,
}

impl MemoryStore {
    /// Number of app insert/update calls that reached storage.
    pub fn app_writes(&self) -> usize {
        self.app_writes.load(Ordering::SeqCst)
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.lock().unwrap().len()
    }

    /// Make every later exchange delete fail.
    pub fn fail_exchange_deletes(&self) {
        self.fail_exchange_deletes.store(true, Ordering::SeqCst);
    }

    /// Simulate a concurrent refresh: `token` is written just before the next
    /// conditional replace runs.
    pub fn rotate_before_next_replace(&self, token: Token) {
        *self.interleaved_rotation.lock().unwrap() = Some(token);
    }

    fn enabled_conflict(apps: &HashMap<String, App>, id: &str, service: Service) -> bool {
        apps.values()
            .any(|a| a.id != id && a.service == service && a.status == AppStatus::Enable)
    }
}

#[async_trait]
impl AppRepository for MemoryStore {
    async fn app_by_id(&self, id: &str) -> Result<Option<App>, AuthError> {
        Ok(self.apps.lock().unwrap().get(id).cloned())
    }

    async fn enabled_app_by_service(&self, service: Service) -> Result<Option<App>, AuthError> {
        Ok(self
            .apps
            .lock()
            .unwrap()
            .values()
            .find(|a| a.service == service && a.status == AppStatus::Enable)
            .cloned())
    }

    async fn insert_app(&self, app: &NewApp) -> Result<(), AuthError> {
        self.app_writes.fetch_add(1, Ordering::SeqCst);
        let mut apps = self.apps.lock().unwrap();

        if apps.contains_key(&app.id)
            || (app.status == AppStatus::Enable
                && Self::enabled_conflict(&apps, &app.id, app.service))
        {
            return Err(AuthError::AlreadyExists(format!("app {}", app.id)));
        }

        apps.insert(
            app.id.clone(),
            App {
                id: app.id.clone(),
                service: app.service,
                password: app.password.clone(),
                callback_url: app.callback_url.clone(),
                expiry: app.expiry,
                created_at: Utc::now(),
                status: app.status,
            },
        );
        Ok(())
    }

    async fn update_app_status(
        &self,
        id: &str,
        status: AppStatus,
    ) -> Result<Option<App>, AuthError> {
        self.app_writes.fetch_add(1, Ordering::SeqCst);
        let mut apps = self.apps.lock().unwrap();

        let Some(service) = apps.get(id).map(|a| a.service) else {
            return Ok(None);
        };
        if status == AppStatus::Enable && Self::enabled_conflict(&apps, id, service) {
            return Err(AuthError::AlreadyExists(
                "enabled app for this service".into(),
            ));
        }

        let app = apps.get_mut(id).map(|a| {
            a.status = status;
            a.clone()
        });
        Ok(app)
    }
}

#[async_trait]
impl ExchangeRepository for MemoryStore {
    async fn insert_exchange(&self, exchange: &Exchange) -> Result<(), AuthError> {
        let mut exchanges = self.exchanges.lock().unwrap();
        if exchanges.contains_key(&exchange.id) {
            return Err(AuthError::Database("duplicate exchange id".into()));
        }
        exchanges.insert(exchange.id.clone(), exchange.clone());
        Ok(())
    }

    async fn exchange_by_id(&self, id: &str) -> Result<Option<Exchange>, AuthError> {
        Ok(self.exchanges.lock().unwrap().get(id).cloned())
    }

    async fn delete_exchange(&self, id: &str) -> Result<(), AuthError> {
        if self.fail_exchange_deletes.load(Ordering::SeqCst) {
            return Err(AuthError::Database("connection reset".into()));
        }
        self.exchanges.lock().unwrap().remove(id);
        Ok(())
    }

    async fn delete_exchanges_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AuthError> {
        let mut exchanges = self.exchanges.lock().unwrap();
        let before = exchanges.len();
        exchanges.retain(|_, e| e.created_at >= cutoff);
        Ok((before - exchanges.len()) as u64)
    }
}

#[async_trait]
impl TokenRepository for MemoryStore {
    async fn token(&self, user_id: i64, service: Service) -> Result<Option<Token>, AuthError> {
        Ok(self.tokens.lock().unwrap().get(&(user_id, service)).cloned())
    }

    async fn upsert_token(&self, token: &Token) -> Result<(), AuthError> {
        self.tokens
            .lock()
            .unwrap()
            .insert((token.user_id, token.service), token.clone());
        Ok(())
    }

    async fn replace_rotated_token(
        &self,
        token: &Token,
        expected_refresh: Option<&str>,
    ) -> Result<bool, AuthError> {
        let interleaved = self.interleaved_rotation.lock().unwrap().take();
        let mut tokens = self.tokens.lock().unwrap();
        if let Some(other) = interleaved {
            tokens.insert((other.user_id, other.service), other);
        }

        let Some(stored) = tokens.get_mut(&(token.user_id, token.service)) else {
            return Ok(false);
        };
        if stored.refresh_token.as_deref() != expected_refresh {
            return Ok(false);
        }

        stored.access_token = token.access_token.clone();
        stored.refresh_token = token.refresh_token.clone();
        stored.expiry = token.expiry;
        stored.created_at = token.created_at;
        Ok(true)
    }
}
