/// Application context and dependency injection
use crate::{
    cache::{CachedLookup, RedisStore},
    config::ServerConfig,
    directory::{DirectoryResolver, DirectorySchema, LdapConnector, LdapSettings},
    error::LookupResult,
    lookup::{GroupLookup, LookupContext},
    refresh::BulkRefresher,
};
use std::sync::Arc;
use tracing::info;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    /// Directory resolver, wrapped by the cache when enabled
    pub lookup: Arc<dyn GroupLookup>,
    pub refresher: BulkRefresher,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> LookupResult<Self> {
        // Validate configuration
        config.validate()?;

        let directory = &config.directory;
        let connector = LdapConnector::new(LdapSettings {
            url: directory.url.clone(),
            bind_dn: directory.bind_dn.clone(),
            bind_password: directory.bind_password.clone(),
            page_size: directory.page_size,
            timeout: directory.timeout(),
        });
        let schema = DirectorySchema::new(&directory.base_dn, &directory.account_type_attribute);
        info!("Directory {} under {}", directory.url, directory.base_dn);

        let resolver: Arc<dyn GroupLookup> =
            Arc::new(DirectoryResolver::new(Arc::new(connector), schema));

        let lookup: Arc<dyn GroupLookup> = if config.cache.enabled {
            info!(
                "Connecting to Redis at {}:{}/{}",
                config.cache.redis_hostname, config.cache.redis_port, config.cache.redis_database
            );
            let store = RedisStore::connect(&config.cache).await?;
            store.ping().await?;
            info!("✓ Redis connection established (TTL {}s)", config.cache.ttl_secs);

            Arc::new(CachedLookup::new(
                resolver,
                Arc::new(store),
                config.cache.ttl(),
                config.cache.key_prefix.clone(),
            ))
        } else {
            info!("Membership cache disabled, every lookup hits the directory");
            resolver
        };

        Ok(Self::with_lookup(config, lookup))
    }

    /// Build a context around an already assembled lookup
    pub fn with_lookup(config: ServerConfig, lookup: Arc<dyn GroupLookup>) -> Self {
        let refresher = BulkRefresher::new(lookup.clone(), config.refresh.max_concurrency);
        Self {
            config: Arc::new(config),
            lookup,
            refresher,
        }
    }

    /// Context for lookups issued while serving one request
    pub fn request_context(&self) -> LookupContext {
        LookupContext::background().with_timeout(self.config.service.request_timeout())
    }
}
