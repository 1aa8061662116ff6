//! Shared application state injected into every handler.

use std::sync::Arc;
use std::time::Duration;

use crate::application::services::{RedirectService, ServiceSettings, ShortenerService};
use crate::domain::identity::IdentityProvider;
use crate::domain::repositories::UrlRepository;
use crate::infrastructure::cache::CacheService;
use crate::infrastructure::messaging::{EventEmitter, EventPublisher, Topics};

/// Collaborators the services are built from.
pub struct Backends {
    pub repository: Arc<dyn UrlRepository>,
    pub cache: Arc<dyn CacheService>,
    pub publisher: Arc<dyn EventPublisher>,
    pub identity: Arc<dyn IdentityProvider>,
}

/// Request-path tunables.
#[derive(Debug, Clone)]
pub struct StateOptions {
    pub settings: ServiceSettings,
    pub topics: Topics,
    pub publish_timeout: Duration,
    /// Read click IPs from forwarding headers.
    pub behind_proxy: bool,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            settings: ServiceSettings::default(),
            topics: Topics::default(),
            publish_timeout: Duration::from_millis(1000),
            behind_proxy: false,
        }
    }
}

/// Cheap to clone: every field is reference-counted.
#[derive(Clone)]
pub struct AppState {
    pub shortener: Arc<ShortenerService<dyn UrlRepository>>,
    pub redirect: Arc<RedirectService<dyn UrlRepository>>,
    pub repository: Arc<dyn UrlRepository>,
    pub cache: Arc<dyn CacheService>,
    pub publisher: Arc<dyn EventPublisher>,
    pub identity: Arc<dyn IdentityProvider>,
    pub behind_proxy: bool,
}

impl AppState {
    pub fn new(backends: Backends, options: StateOptions) -> Self {
        let emitter = EventEmitter::new(
            backends.publisher.clone(),
            options.topics,
            options.publish_timeout,
        );

        let shortener = ShortenerService::new(
            backends.repository.clone(),
            backends.cache.clone(),
            emitter.clone(),
            options.settings,
        );
        let redirect = RedirectService::new(
            backends.repository.clone(),
            backends.cache.clone(),
            emitter,
            options.settings,
        );

        Self {
            shortener: Arc::new(shortener),
            redirect: Arc::new(redirect),
            repository: backends.repository,
            cache: backends.cache,
            publisher: backends.publisher,
            identity: backends.identity,
            behind_proxy: options.behind_proxy,
        }
    }
}
