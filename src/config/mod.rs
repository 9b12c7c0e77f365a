use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub members: MembersConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub site_url: String,
    pub session_cookie: String,
    /// Where callers without any organization are sent
    pub no_organization_url: String,
    /// Where callers with several organizations and none active are sent
    pub select_organization_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembersConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid SITE_URL '{0}'")]
    InvalidSiteUrl(String),

    #[error("Invalid redirect path '{0}': must start with '/'")]
    InvalidRedirectPath(String),

    #[error("Invalid page sizes: default {default} exceeds max {max}")]
    InvalidPageSize { default: u32, max: u32 },
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(port) = env::var("PORT").ok().and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Auth overrides
        if let Ok(v) = env::var("SITE_URL") {
            self.auth.site_url = v;
        }
        if let Ok(v) = env::var("AUTH_SESSION_COOKIE") {
            self.auth.session_cookie = v;
        }
        if let Ok(v) = env::var("AUTH_NO_ORGANIZATION_URL") {
            self.auth.no_organization_url = v;
        }
        if let Ok(v) = env::var("AUTH_SELECT_ORGANIZATION_URL") {
            self.auth.select_organization_url = v;
        }

        // Members overrides
        if let Ok(v) = env::var("MEMBERS_DEFAULT_PAGE_SIZE") {
            self.members.default_page_size = v.parse().unwrap_or(self.members.default_page_size);
        }
        if let Ok(v) = env::var("MEMBERS_MAX_PAGE_SIZE") {
            self.members.max_page_size = v.parse().unwrap_or(self.members.max_page_size);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self
    }

    /// Reject settings that would only fail later, at request time
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.auth.site_url)
            .map_err(|_| ConfigError::InvalidSiteUrl(self.auth.site_url.clone()))?;

        for path in [&self.auth.no_organization_url, &self.auth.select_organization_url] {
            if !path.starts_with('/') {
                return Err(ConfigError::InvalidRedirectPath(path.clone()));
            }
        }

        if self.members.default_page_size == 0
            || self.members.default_page_size > self.members.max_page_size
        {
            return Err(ConfigError::InvalidPageSize {
                default: self.members.default_page_size,
                max: self.members.max_page_size,
            });
        }

        Ok(())
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 3000 },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            auth: AuthConfig::default(),
            members: MembersConfig::default(),
            security: SecurityConfig {
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig { port: 3000 },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            auth: AuthConfig {
                site_url: "https://staging.example.com".to_string(),
                ..AuthConfig::default()
            },
            members: MembersConfig {
                default_page_size: 10,
                max_page_size: 50,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig { port: 3000 },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            auth: AuthConfig {
                site_url: "https://app.example.com".to_string(),
                ..AuthConfig::default()
            },
            members: MembersConfig {
                default_page_size: 10,
                max_page_size: 50,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }
}

impl MembersConfig {
    /// Requested page size, defaulted and clamped to `1..=max_page_size`
    pub fn page_size(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}

impl Default for MembersConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            site_url: "http://localhost:5173".to_string(),
            session_cookie: "church.session_token".to_string(),
            no_organization_url: "/ob/no-church".to_string(),
            select_organization_url: "/ob/select-church".to_string(),
        }
    }
}

// Global singleton config - read once by main, then passed down explicitly
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
