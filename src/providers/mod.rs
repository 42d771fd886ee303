//! OAuth2 providers: the closed set of supported services, their fixed
//! endpoints, and the HTTP client that talks to their token endpoints.

mod client;
mod registry;
mod traits;

pub use client::{ClientConfig, HttpGrantClient};
pub use registry::{Endpoint, Provider, ProviderRegistry};
pub use traits::{GrantClient, TokenSet};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// A supported third-party identity provider.
///
/// The string form (`google`, `yandex`, `mail`, `vk`) is what gets stored in
/// the `service` columns and appears in URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Google,
    Yandex,
    Mail,
    Vk,
}

impl Service {
    pub const ALL: [Service; 4] = [Service::Google, Service::Yandex, Service::Mail, Service::Vk];

    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Google => "google",
            Service::Yandex => "yandex",
            Service::Mail => "mail",
            Service::Vk => "vk",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Service {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Service::Google),
            "yandex" => Ok(Service::Yandex),
            "mail" => Ok(Service::Mail),
            "vk" => Ok(Service::Vk),
            other => Err(AuthError::ServiceUnsupported(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_string_form_roundtrips() {
        for service in Service::ALL {
            assert_eq!(service.as_str().parse::<Service>().unwrap(), service);
        }
    }

    #[test]
    fn test_unknown_service_is_unsupported() {
        let err = "github".parse::<Service>().unwrap_err();
        assert!(matches!(err, AuthError::ServiceUnsupported(s) if s == "github"));
        // Case matters: stored values are lowercase.
        assert!("Yandex".parse::<Service>().is_err());
    }
}
