/// Configuration management for the membership service
use crate::error::{LookupError, LookupResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub authentication: AuthConfig,
    pub directory: DirectoryConfig,
    pub cache: CacheConfig,
    pub refresh: RefreshConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Deadline applied to every lookup issued by a request
    pub request_timeout_secs: u64,
    /// Expose the computing-group routes
    pub computing_groups_enabled: bool,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Bearer secret shared with API clients
    #[serde(skip_serializing)]
    pub shared_secret: String,
}

/// Directory server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    pub url: String,
    pub bind_dn: Option<String>,
    #[serde(skip_serializing)]
    pub bind_password: Option<String>,
    pub base_dn: String,
    pub page_size: i32,
    pub timeout_secs: u64,
    pub account_type_attribute: String,
}

/// Membership cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Wrap the directory resolver with the Redis cache
    pub enabled: bool,
    pub redis_hostname: String,
    pub redis_port: u16,
    pub redis_database: i64,
    #[serde(skip_serializing)]
    pub redis_password: Option<String>,
    /// Lifetime of a cached member set in seconds
    pub ttl_secs: u64,
    /// Prepended to every key, before the namespace prefix
    pub key_prefix: String,
}

/// Bulk refresh configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    pub max_concurrency: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl CacheConfig {
    /// Connection URL, password percent-encoded
    pub fn redis_url(&self) -> String {
        match &self.redis_password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                urlencoding::encode(password),
                self.redis_hostname,
                self.redis_port,
                self.redis_database
            ),
            None => format!(
                "redis://{}:{}/{}",
                self.redis_hostname, self.redis_port, self.redis_database
            ),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl DirectoryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ServiceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Variable lookup, `std::env` in production and a map in tests
trait Source {
    fn get(&self, key: &str) -> Option<String>;

    fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse `key`, falling back to `default` when unset
    fn parse_or<T: FromStr>(&self, key: &str, default: T) -> LookupResult<T> {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| LookupError::Validation(format!("Invalid value for {}: {}", key, raw))),
            None => Ok(default),
        }
    }
}

struct Env;

impl Source for Env {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> LookupResult<Self> {
        dotenv::dotenv().ok();
        Self::from_source(&Env)
    }

    fn from_source(source: &impl Source) -> LookupResult<Self> {
        let hostname = source.get_or("MEMBERD_HOSTNAME", "0.0.0.0");
        let port = source
            .parse_or("MEMBERD_PORT", 2002u16)
            .map_err(|_| LookupError::Validation("Invalid port number".to_string()))?;
        let request_timeout_secs = source.parse_or("MEMBERD_REQUEST_TIMEOUT_SECS", 30)?;
        let computing_groups_enabled =
            source.parse_or("MEMBERD_COMPUTING_GROUPS_ENABLED", false)?;

        let shared_secret = source
            .get("MEMBERD_SHARED_SECRET")
            .ok_or_else(|| LookupError::Validation("Shared secret required".to_string()))?;

        let directory = DirectoryConfig {
            url: source.get_or("MEMBERD_LDAP_URL", "ldap://localhost:389"),
            bind_dn: source.get("MEMBERD_LDAP_BIND_DN"),
            bind_password: source.get("MEMBERD_LDAP_BIND_PASSWORD"),
            base_dn: source.get_or("MEMBERD_LDAP_BASE_DN", "DC=example,DC=com"),
            page_size: source.parse_or("MEMBERD_LDAP_PAGE_SIZE", 1000)?,
            timeout_secs: source.parse_or("MEMBERD_LDAP_TIMEOUT_SECS", 10)?,
            account_type_attribute: source
                .get_or("MEMBERD_LDAP_ACCOUNT_TYPE_ATTRIBUTE", "cernAccountType"),
        };

        let cache = CacheConfig {
            enabled: source.parse_or("MEMBERD_CACHE_ENABLED", true)?,
            redis_hostname: source.get_or("MEMBERD_REDIS_HOSTNAME", "localhost"),
            redis_port: source.parse_or("MEMBERD_REDIS_PORT", 6379)?,
            redis_database: source.parse_or("MEMBERD_REDIS_DATABASE", 0)?,
            redis_password: source.get("MEMBERD_REDIS_PASSWORD"),
            ttl_secs: source.parse_or("MEMBERD_CACHE_TTL_SECS", 86400)?,
            key_prefix: source.get_or("MEMBERD_CACHE_KEY_PREFIX", ""),
        };

        let refresh = RefreshConfig {
            max_concurrency: source.parse_or("MEMBERD_REFRESH_MAX_CONCURRENCY", 5)?,
        };

        let log_level = source.get_or("RUST_LOG", "memberd=debug,tower_http=debug");
        let log_format = match source.get_or("MEMBERD_LOG_FORMAT", "text").as_str() {
            "json" => LogFormat::Json,
            "text" => LogFormat::Text,
            other => {
                return Err(LookupError::Validation(format!(
                    "Unknown log format: {}",
                    other
                )))
            }
        };

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                request_timeout_secs,
                computing_groups_enabled,
            },
            authentication: AuthConfig { shared_secret },
            directory,
            cache,
            refresh,
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> LookupResult<()> {
        if self.service.hostname.is_empty() {
            return Err(LookupError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.shared_secret.trim().is_empty() {
            return Err(LookupError::Validation(
                "Shared secret cannot be empty".to_string(),
            ));
        }

        if self.directory.base_dn.is_empty() {
            return Err(LookupError::Validation("Base DN cannot be empty".to_string()));
        }

        if self.directory.page_size <= 0 {
            return Err(LookupError::Validation(
                "LDAP page size must be positive".to_string(),
            ));
        }

        if self.directory.timeout_secs == 0 || self.service.request_timeout_secs == 0 {
            return Err(LookupError::Validation(
                "Timeouts must be at least one second".to_string(),
            ));
        }

        if self.cache.enabled && self.cache.ttl_secs == 0 {
            return Err(LookupError::Validation(
                "Cache TTL must be at least one second".to_string(),
            ));
        }

        if self.refresh.max_concurrency == 0 {
            return Err(LookupError::Validation(
                "Refresh concurrency must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
