//! App directory: registered OAuth clients, one enabled per service.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AuthError;
use crate::providers::{ClientConfig, ProviderRegistry, Service};
use crate::store::AppRepository;
use crate::validation::AppValidator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppStatus {
    Enable,
    Disable,
}

impl AppStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppStatus::Enable => "enable",
            AppStatus::Disable => "disable",
        }
    }
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppStatus {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enable" => Ok(AppStatus::Enable),
            "disable" => Ok(AppStatus::Disable),
            other => Err(AuthError::InvalidStatus(other.to_string())),
        }
    }
}

/// A registered OAuth client for one provider. `id` is the provider-issued
/// client id and the primary key.
#[derive(Debug, Clone, Serialize)]
pub struct App {
    pub id: String,
    pub service: Service,
    #[serde(skip_serializing)]
    pub password: String,
    pub callback_url: String,
    pub expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub status: AppStatus,
}

/// Client-supplied registration, before conforming and validation.
#[derive(Debug, Clone, Deserialize)]
pub struct AppDraft {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub callback_url: String,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A validated registration, ready to insert.
#[derive(Debug, Clone)]
pub struct NewApp {
    pub id: String,
    pub service: Service,
    pub password: String,
    pub callback_url: String,
    pub expiry: Option<DateTime<Utc>>,
    pub status: AppStatus,
}

/// Resolves apps and the OAuth client configuration built from them.
///
/// Nothing is cached: every call reads storage, so status changes apply to
/// the next request.
#[derive(Clone)]
pub struct AppDirectory {
    repo: Arc<dyn AppRepository>,
    registry: Arc<ProviderRegistry>,
}

impl AppDirectory {
    pub fn new(repo: Arc<dyn AppRepository>, registry: Arc<ProviderRegistry>) -> Self {
        Self { repo, registry }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Exact lookup by id, whatever the status.
    pub async fn resolve_by_id(&self, id: &str) -> Result<App, AuthError> {
        self.repo
            .app_by_id(id)
            .await?
            .ok_or_else(|| AuthError::NotFound("app".into()))
    }

    /// The enabled app serving `service`.
    pub async fn resolve_by_service(&self, service: Service) -> Result<App, AuthError> {
        self.repo
            .enabled_app_by_service(service)
            .await?
            .ok_or_else(|| AuthError::NotFound("app".into()))
    }

    /// Join the enabled app for `service` with its registry entry.
    ///
    /// An app whose service has no registry entry is `ServiceUnsupported`,
    /// which callers must keep distinct from a missing app.
    pub async fn resolve_client_config(&self, service: Service) -> Result<ClientConfig, AuthError> {
        let app = self.resolve_by_service(service).await?;
        let provider = self.registry.get(app.service)?;

        Ok(ClientConfig {
            service: app.service,
            client_id: app.id,
            client_secret: app.password,
            scopes: provider.scopes.clone(),
            redirect_url: app.callback_url,
            endpoint: provider.endpoint.clone(),
        })
    }

    /// Register a new app, returning its id.
    pub async fn create(
        &self,
        validator: &AppValidator,
        service: Service,
        draft: AppDraft,
    ) -> Result<String, AuthError> {
        let app = validator.validate(service, draft)?;
        self.repo.insert_app(&app).await?;

        info!(app_id = %app.id, service = %app.service, status = %app.status, "app registered");
        Ok(app.id)
    }

    /// Enable or disable an app. The status is checked before storage is touched.
    pub async fn set_status(&self, id: &str, status: &str) -> Result<App, AuthError> {
        let status: AppStatus = status.parse()?;

        let app = self
            .repo
            .update_app_status(id, status)
            .await?
            .ok_or_else(|| AuthError::NotFound("app".into()))?;

        info!(app_id = %app.id, service = %app.service, status = %app.status, "app status changed");
        Ok(app)
    }
}
