use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::traits::{GrantClient, TokenSet};
use super::{Endpoint, Service};
use crate::error::AuthError;

/// Ready-to-use OAuth2 client configuration for one service: the registered
/// app's credentials joined with the provider's endpoint and scopes.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub service: Service,
    pub client_id: String,
    pub client_secret: String,
    pub scopes: Vec<String>,
    pub redirect_url: String,
    pub endpoint: Endpoint,
}

impl ClientConfig {
    /// Build the URL the user is sent to, carrying `state` for correlation.
    pub fn auth_code_url(&self, state: &str) -> Result<String, AuthError> {
        let mut url = Url::parse(&self.endpoint.auth_url).map_err(|e| {
            AuthError::Internal(format!("invalid {} auth URL: {e}", self.service))
        })?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.client_id);
            if !self.redirect_url.is_empty() {
                query.append_pair("redirect_uri", &self.redirect_url);
            }
            query.append_pair("response_type", "code");
            if !self.scopes.is_empty() {
                query.append_pair("scope", &self.scopes.join(" "));
            }
            query.append_pair("state", state);
        }

        Ok(url.into())
    }
}

/// `GrantClient` talking to real provider token endpoints over HTTPS.
pub struct HttpGrantClient {
    http: reqwest::Client,
}

impl HttpGrantClient {
    pub fn new(timeout: Duration) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { http })
    }

    async fn request_token(
        &self,
        config: &ClientConfig,
        form: &[(&str, &str)],
    ) -> Result<TokenSet, AuthError> {
        let resp = self
            .http
            .post(&config.endpoint.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(form)
            .send()
            .await
            .map_err(|e| {
                AuthError::Provider(format!("{} token request failed: {e}", config.service))
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Provider(format!(
                "{} token endpoint returned {status}: {body}",
                config.service
            )));
        }

        resp.json::<TokenSet>().await.map_err(|e| {
            AuthError::Provider(format!(
                "Failed to parse {} token response: {e}",
                config.service
            ))
        })
    }
}

#[async_trait]
impl GrantClient for HttpGrantClient {
    async fn exchange_code(
        &self,
        config: &ClientConfig,
        code: &str,
    ) -> Result<TokenSet, AuthError> {
        self.request_token(
            config,
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", config.redirect_url.as_str()),
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
            ],
        )
        .await
    }

    async fn refresh_token(
        &self,
        config: &ClientConfig,
        refresh_token: &str,
    ) -> Result<TokenSet, AuthError> {
        self.request_token(
            config,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
            ],
        )
        .await
    }
}
