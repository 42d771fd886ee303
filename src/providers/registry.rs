use std::collections::HashMap;

use super::Service;
use crate::error::AuthError;

/// Authorization and token endpoint pair of a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub auth_url: String,
    pub token_url: String,
}

/// Static description of one supported provider.
#[derive(Debug, Clone)]
pub struct Provider {
    pub service: Service,
    pub endpoint: Endpoint,
    pub scopes: Vec<String>,
}

impl Provider {
    fn builtin(service: Service) -> Self {
        let (auth_url, token_url, scopes): (&str, &str, &[&str]) = match service {
            Service::Google => (
                "https://accounts.google.com/o/oauth2/auth",
                "https://oauth2.googleapis.com/token",
                &["https://www.googleapis.com/auth/gmail.addons.current.message.readonly"],
            ),
            Service::Yandex => (
                "https://oauth.yandex.com/authorize",
                "https://oauth.yandex.com/token",
                &["mail:imap_ro"],
            ),
            Service::Mail => (
                "https://o2.mail.ru/login",
                "https://o2.mail.ru/token",
                &[],
            ),
            Service::Vk => (
                "https://oauth.vk.com/authorize",
                "https://oauth.vk.com/access_token",
                &[],
            ),
        };

        Self {
            service,
            endpoint: Endpoint {
                auth_url: auth_url.into(),
                token_url: token_url.into(),
            },
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Registry of supported OAuth providers, keyed by service.
pub struct ProviderRegistry {
    providers: HashMap<Service, Provider>,
}

impl ProviderRegistry {
    /// Registry holding every built-in provider.
    pub fn builtin() -> Self {
        let mut registry = Self {
            providers: HashMap::new(),
        };
        for service in Service::ALL {
            registry.register(Provider::builtin(service));
        }
        registry
    }

    /// Drop the given services; apps for them resolve as unsupported.
    pub fn without(mut self, services: &[Service]) -> Self {
        for service in services {
            self.providers.remove(service);
        }
        self
    }

    /// Register (or replace) a provider.
    pub fn register(&mut self, provider: Provider) {
        self.providers.insert(provider.service, provider);
    }

    pub fn get(&self, service: Service) -> Result<&Provider, AuthError> {
        self.providers
            .get(&service)
            .ok_or_else(|| AuthError::ServiceUnsupported(service.to_string()))
    }

    /// List registered services in a stable order.
    pub fn list(&self) -> Vec<Service> {
        let mut services: Vec<Service> = self.providers.keys().copied().collect();
        services.sort();
        services
    }

    /// Number of registered providers.
    pub fn count(&self) -> usize {
        self.providers.len()
    }
}
