//! Conforming and validation of app registrations.
//!
//! An `AppValidator` is built once from `Config` and handed to the operations
//! that accept client input; there is no process-wide validator state.

use std::collections::BTreeMap;

use url::Url;

use crate::config::Config;
use crate::error::AuthError;
use crate::models::apps::{AppDraft, AppStatus, NewApp};
use crate::providers::Service;

const REQUIRED: &str = "value is required";
const INVALID: &str = "invalid value";

#[derive(Debug, Clone)]
pub struct AppValidator {
    callback_schemes: Vec<String>,
}

impl AppValidator {
    pub fn new(callback_schemes: Vec<String>) -> Self {
        Self { callback_schemes }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.allowed_callback_schemes.clone())
    }

    /// Trim, check and type a draft registration for `service`.
    ///
    /// Field errors are collected and reported together. A missing status
    /// defaults to `disable`; an unknown one is `InvalidStatus`.
    pub fn validate(&self, service: Service, draft: AppDraft) -> Result<NewApp, AuthError> {
        let id = draft.id.trim().to_string();
        let password = draft.password.trim().to_string();
        let callback_url = draft.callback_url.trim().to_string();

        let mut errors = BTreeMap::new();
        if id.is_empty() {
            errors.insert("id".to_string(), REQUIRED.to_string());
        }
        if password.is_empty() {
            errors.insert("password".to_string(), REQUIRED.to_string());
        }
        if callback_url.is_empty() {
            errors.insert("callback_url".to_string(), REQUIRED.to_string());
        } else if !self.callback_allowed(&callback_url) {
            errors.insert("callback_url".to_string(), INVALID.to_string());
        }

        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }

        let status = match draft.status.as_deref().map(str::trim) {
            None | Some("") => AppStatus::Disable,
            Some(raw) => raw.parse()?,
        };

        Ok(NewApp {
            id,
            service,
            password,
            callback_url,
            expiry: draft.expiry,
            status,
        })
    }

    fn callback_allowed(&self, raw: &str) -> bool {
        match Url::parse(raw) {
            Ok(url) => url.has_host() && self.callback_schemes.iter().any(|s| s == url.scheme()),
            Err(_) => false,
        }
    }
}
