//! PostgreSQL-backed storage. Tables live in the `auth` schema:
//! - `auth.apps`: registered OAuth clients, at most one enabled per service
//! - `auth.exchanges`: pending authorization `state` values
//! - `auth.tokens`: token material per (user_id, service)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use super::{AppRepository, ExchangeRepository, TokenRepository};
use crate::error::AuthError;
use crate::models::apps::{App, AppStatus, NewApp};
use crate::models::exchanges::Exchange;
use crate::models::tokens::Token;
use crate::providers::Service;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn new(db_url: &str, max_connections: u32) -> Result<Self, AuthError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_url)
            .await
            .map_err(|e| AuthError::Database(format!("Failed to connect to PostgreSQL: {e}")))?;

        Ok(Self { pool })
    }

    /// Run schema migrations.
    pub async fn migrate(&self) -> Result<(), AuthError> {
        sqlx::query("CREATE SCHEMA IF NOT EXISTS auth")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS auth.apps (
                id              TEXT PRIMARY KEY,
                service         TEXT NOT NULL,
                password        TEXT NOT NULL,
                callback_url    TEXT NOT NULL,
                expiry          TIMESTAMPTZ,
                created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                status          TEXT NOT NULL DEFAULT 'disable'
                                CHECK (status IN ('enable', 'disable'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // One enabled app per service; lookups by service rely on it.
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_apps_enabled_service ON auth.apps(service) WHERE status = 'enable'",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS auth.exchanges (
                id          TEXT PRIMARY KEY,
                service     TEXT NOT NULL,
                user_id     BIGINT NOT NULL,
                created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_exchanges_created ON auth.exchanges(created_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS auth.tokens (
                user_id         BIGINT NOT NULL,
                service         TEXT NOT NULL,
                token_type      TEXT NOT NULL DEFAULT 'Bearer',
                access_token    TEXT NOT NULL,
                refresh_token   TEXT,
                expiry          TIMESTAMPTZ,
                created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (user_id, service)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Map a unique-constraint violation to `AlreadyExists`, anything else through
/// the generic database conversion.
fn conflict_or_db(e: sqlx::Error, what: impl FnOnce() -> String) -> AuthError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return AuthError::AlreadyExists(what());
        }
    }
    e.into()
}

fn service_col(row: &PgRow, col: &str) -> Result<Service, AuthError> {
    let raw: String = row.try_get(col)?;
    raw.parse()
}

fn app_from_row(row: &PgRow) -> Result<App, AuthError> {
    let status: String = row.try_get("status")?;
    Ok(App {
        id: row.try_get("id")?,
        service: service_col(row, "service")?,
        password: row.try_get("password")?,
        callback_url: row.try_get("callback_url")?,
        expiry: row.try_get("expiry")?,
        created_at: row.try_get("created_at")?,
        status: status
            .parse()
            .map_err(|_| AuthError::Internal(format!("stored app status {status} is unknown")))?,
    })
}

fn exchange_from_row(row: &PgRow) -> Result<Exchange, AuthError> {
    Ok(Exchange {
        id: row.try_get("id")?,
        service: service_col(row, "service")?,
        user_id: row.try_get("user_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn token_from_row(row: &PgRow) -> Result<Token, AuthError> {
    Ok(Token {
        user_id: row.try_get("user_id")?,
        service: service_col(row, "service")?,
        token_type: row.try_get("token_type")?,
        access_token: row.try_get("access_token")?,
        refresh_token: row.try_get("refresh_token")?,
        expiry: row.try_get("expiry")?,
        created_at: row.try_get("created_at")?,
    })
}

const APP_COLUMNS: &str = "id, service, password, callback_url, expiry, created_at, status";

#[async_trait]
impl AppRepository for PgStore {
    async fn app_by_id(&self, id: &str) -> Result<Option<App>, AuthError> {
        let row = sqlx::query(&format!("SELECT {APP_COLUMNS} FROM auth.apps WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(app_from_row).transpose()
    }

    async fn enabled_app_by_service(&self, service: Service) -> Result<Option<App>, AuthError> {
        let row = sqlx::query(&format!(
            "SELECT {APP_COLUMNS} FROM auth.apps WHERE service = $1 AND status = $2"
        ))
        .bind(service.as_str())
        .bind(AppStatus::Enable.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(app_from_row).transpose()
    }

    async fn insert_app(&self, app: &NewApp) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            INSERT INTO auth.apps (id, service, password, callback_url, expiry, created_at, status)
            VALUES ($1, $2, $3, $4, $5, NOW(), $6)
            "#,
        )
        .bind(&app.id)
        .bind(app.service.as_str())
        .bind(&app.password)
        .bind(&app.callback_url)
        .bind(app.expiry)
        .bind(app.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, || format!("app {}", app.id)))?;

        Ok(())
    }

    async fn update_app_status(
        &self,
        id: &str,
        status: AppStatus,
    ) -> Result<Option<App>, AuthError> {
        let row = sqlx::query(&format!(
            "UPDATE auth.apps SET status = $2 WHERE id = $1 RETURNING {APP_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, || "enabled app for this service".to_string()))?;

        row.as_ref().map(app_from_row).transpose()
    }
}

#[async_trait]
impl ExchangeRepository for PgStore {
    async fn insert_exchange(&self, exchange: &Exchange) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO auth.exchanges (id, service, user_id, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&exchange.id)
        .bind(exchange.service.as_str())
        .bind(exchange.user_id)
        .bind(exchange.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn exchange_by_id(&self, id: &str) -> Result<Option<Exchange>, AuthError> {
        let row = sqlx::query(
            "SELECT id, service, user_id, created_at FROM auth.exchanges WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(exchange_from_row).transpose()
    }

    async fn delete_exchange(&self, id: &str) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM auth.exchanges WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_exchanges_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AuthError> {
        let affected = sqlx::query("DELETE FROM auth.exchanges WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(affected)
    }
}

#[async_trait]
impl TokenRepository for PgStore {
    async fn token(&self, user_id: i64, service: Service) -> Result<Option<Token>, AuthError> {
        let row = sqlx::query(
            r#"
            SELECT user_id, service, token_type, access_token, refresh_token, expiry, created_at
            FROM auth.tokens
            WHERE user_id = $1 AND service = $2
            "#,
        )
        .bind(user_id)
        .bind(service.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(token_from_row).transpose()
    }

    async fn upsert_token(&self, token: &Token) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            INSERT INTO auth.tokens
                (user_id, service, token_type, access_token, refresh_token, expiry, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, service)
            DO UPDATE SET
                token_type = EXCLUDED.token_type,
                access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                expiry = EXCLUDED.expiry,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(token.user_id)
        .bind(token.service.as_str())
        .bind(&token.token_type)
        .bind(&token.access_token)
        .bind(&token.refresh_token)
        .bind(token.expiry)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn replace_rotated_token(
        &self,
        token: &Token,
        expected_refresh: Option<&str>,
    ) -> Result<bool, AuthError> {
        let affected = sqlx::query(
            r#"
            UPDATE auth.tokens
            SET access_token = $3,
                refresh_token = $4,
                expiry = $5,
                created_at = $6
            WHERE user_id = $1
              AND service = $2
              AND refresh_token IS NOT DISTINCT FROM $7
            "#,
        )
        .bind(token.user_id)
        .bind(token.service.as_str())
        .bind(&token.access_token)
        .bind(&token.refresh_token)
        .bind(token.expiry)
        .bind(token.created_at)
        .bind(expected_refresh)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected == 1)
    }
}
