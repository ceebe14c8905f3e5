use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the admission service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub notifications: NotificationConfig,
    pub uploads: UploadConfig,
    pub auth: AuthConfig,
    pub bootstrap: BootstrapAdminConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let max_file_size = env::var("APP_MAX_FILE_SIZE")
            .unwrap_or_else(|_| UploadConfig::DEFAULT_MAX_FILE_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidFileSize)?;

        let token_ttl_hours = env::var("APP_TOKEN_TTL_HOURS")
            .unwrap_or_else(|_| AuthConfig::DEFAULT_TOKEN_TTL_HOURS.to_string())
            .parse::<i64>()
            .map_err(|_| ConfigError::InvalidTokenTtl)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            notifications: NotificationConfig {
                message: ChannelConfig {
                    enabled: env_flag("NOTIFY_MESSAGE_ENABLED"),
                },
                text: ChannelConfig {
                    enabled: env_flag("NOTIFY_TEXT_ENABLED"),
                },
            },
            uploads: UploadConfig {
                max_file_size,
                max_files_per_request: UploadConfig::DEFAULT_MAX_FILES,
            },
            auth: AuthConfig { token_ttl_hours },
            bootstrap: BootstrapAdminConfig {
                username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
                email: env::var("ADMIN_EMAIL")
                    .unwrap_or_else(|_| "admin@example.org".to_string()),
                password: env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string()),
                full_name: env::var("ADMIN_FULL_NAME")
                    .unwrap_or_else(|_| "Super Administrator".to_string()),
            },
        })
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Outbound notification channels, each enabled explicitly at startup
/// rather than inferred from ambient transport credentials.
#[derive(Debug, Clone, Default)]
pub struct NotificationConfig {
    pub message: ChannelConfig,
    pub text: ChannelConfig,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelConfig {
    pub enabled: bool,
}

/// Limits applied to document upload requests.
#[derive(Debug, Clone, Copy)]
pub struct UploadConfig {
    pub max_file_size: usize,
    pub max_files_per_request: usize,
}

impl UploadConfig {
    pub const DEFAULT_MAX_FILE_SIZE: usize = 5 * 1024 * 1024;
    pub const DEFAULT_MAX_FILES: usize = 5;
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
            max_files_per_request: Self::DEFAULT_MAX_FILES,
        }
    }
}

/// Bearer-token issuance settings for the admin surface.
#[derive(Debug, Clone, Copy)]
pub struct AuthConfig {
    pub token_ttl_hours: i64,
}

impl AuthConfig {
    pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24 * 7;
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_hours: Self::DEFAULT_TOKEN_TTL_HOURS,
        }
    }
}

/// Credentials for the super admin seeded on first start.
#[derive(Debug, Clone)]
pub struct BootstrapAdminConfig {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidFileSize,
    InvalidTokenTtl,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidFileSize => {
                write!(f, "APP_MAX_FILE_SIZE must be a byte count")
            }
            ConfigError::InvalidTokenTtl => {
                write!(f, "APP_TOKEN_TTL_HOURS must be a whole number of hours")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
