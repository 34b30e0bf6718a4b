use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub filter: FilterConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub uploads: UploadConfig,
    pub geocoder: GeocoderConfig,
    pub mail: MailConfig,
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
    /// Base for links sent to users (password reset)
    pub public_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub max_limit: Option<u32>,
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Absent means the in-memory store
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expire_days: i64,
    pub jwt_cookie_expire_days: i64,
    pub reset_token_expire_minutes: i64,
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub path: PathBuf,
    /// Bytes
    pub max_file_upload: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    pub url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Absent means messages are only logged
    pub api_url: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set in {0:?}")]
    MissingJwtSecret(Environment),
}

const DEV_JWT_SECRET: &str = "dev-only-secret-change-me";

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key source; `from_env` passes the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(lookup);

        if config.security.jwt_secret.is_empty() {
            return Err(ConfigError::MissingJwtSecret(config.environment));
        }
        Ok(config)
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Server
        if let Some(v) = lookup("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Some(v) = lookup("PUBLIC_BASE_URL") {
            self.server.public_base_url = v.trim_end_matches('/').to_string();
        }

        // Filter
        if let Some(v) = lookup("FILTER_MAX_LIMIT") {
            self.filter.max_limit = v.parse().ok().filter(|n| *n > 0);
        }
        if let Some(v) = lookup("FILTER_DEBUG_LOGGING") {
            self.filter.debug_logging = v.parse().unwrap_or(self.filter.debug_logging);
        }

        // Database
        if let Some(v) = lookup("DATABASE_URL") {
            self.database.url = Some(v).filter(|s| !s.is_empty());
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security
        if let Some(v) = lookup("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Some(v) = lookup("JWT_EXPIRE") {
            self.security.jwt_expire_days = parse_days(&v).unwrap_or(self.security.jwt_expire_days);
        }
        if let Some(v) = lookup("JWT_COOKIE_EXPIRE") {
            self.security.jwt_cookie_expire_days = parse_days(&v).unwrap_or(self.security.jwt_cookie_expire_days);
        }
        if let Some(v) = lookup("RESET_TOKEN_EXPIRE_MINUTES") {
            self.security.reset_token_expire_minutes =
                v.parse().unwrap_or(self.security.reset_token_expire_minutes);
        }

        // Uploads
        if let Some(v) = lookup("FILE_UPLOAD_PATH") {
            self.uploads.path = PathBuf::from(v);
        }
        if let Some(v) = lookup("MAX_FILE_UPLOAD") {
            self.uploads.max_file_upload = v.parse().unwrap_or(self.uploads.max_file_upload);
        }

        // Geocoder
        if let Some(v) = lookup("GEOCODER_URL") {
            self.geocoder.url = v;
        }
        if let Some(v) = lookup("GEOCODER_API_KEY") {
            self.geocoder.api_key = Some(v).filter(|s| !s.is_empty());
        }

        // Mail
        if let Some(v) = lookup("MAIL_API_URL") {
            self.mail.api_url = Some(v).filter(|s| !s.is_empty());
        }
        if let Some(v) = lookup("MAIL_API_KEY") {
            self.mail.api_key = Some(v).filter(|s| !s.is_empty());
        }
        if let Some(v) = lookup("FROM_EMAIL") {
            self.mail.from_email = v;
        }
        if let Some(v) = lookup("FROM_NAME") {
            self.mail.from_name = v;
        }

        self
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 5000,
                public_base_url: "http://localhost:5000".to_string(),
            },
            filter: FilterConfig {
                max_limit: Some(1000),
                debug_logging: true,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                jwt_secret: DEV_JWT_SECRET.to_string(),
                jwt_expire_days: 30,
                jwt_cookie_expire_days: 30,
                reset_token_expire_minutes: 10,
                secure_cookies: false,
            },
            uploads: UploadConfig {
                path: PathBuf::from("./public/uploads"),
                max_file_upload: 1_000_000,
            },
            geocoder: GeocoderConfig {
                url: "http://www.mapquestapi.com/geocoding/v1/address".to_string(),
                api_key: None,
            },
            mail: MailConfig {
                api_url: None,
                api_key: None,
                from_email: "noreply@devcamper.io".to_string(),
                from_name: "DevCamper".to_string(),
            },
        }
    }

    pub fn staging() -> Self {
        let dev = Self::development();
        Self {
            environment: Environment::Staging,
            filter: FilterConfig {
                max_limit: Some(500),
                debug_logging: false,
            },
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
                ..dev.database
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                secure_cookies: true,
                ..dev.security
            },
            ..dev
        }
    }

    pub fn production() -> Self {
        let dev = Self::development();
        Self {
            environment: Environment::Production,
            filter: FilterConfig {
                max_limit: Some(100),
                debug_logging: false,
            },
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
                ..dev.database
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                secure_cookies: true,
                ..dev.security
            },
            ..dev
        }
    }
}

/// Accepts `30` or the `30d` form
fn parse_days(value: &str) -> Option<i64> {
    value.trim().trim_end_matches('d').parse().ok()
}
