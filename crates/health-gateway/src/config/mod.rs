use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::immunization::VaccineProofTemplate;

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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub phsa: PhsaConfig,
    pub bc_mail_plus: BcMailPlusConfig,
    pub vaccine_card: VaccineCardConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            phsa: PhsaConfig::from_env()?,
            bc_mail_plus: BcMailPlusConfig::from_env()?,
            vaccine_card: VaccineCardConfig::from_env()?,
        })
    }
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

/// Connection and refresh-retry settings for the PHSA vaccine status registry.
#[derive(Debug, Clone)]
pub struct PhsaConfig {
    pub base_url: String,
    pub vaccine_status_endpoint: String,
    pub public_vaccine_status_endpoint: String,
    pub access_token: Option<String>,
    /// Minimum wait before re-querying while the registry is refreshing.
    pub backoff_milliseconds: u64,
    pub max_retries: u32,
}

impl PhsaConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: env::var("PHSA_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:5010".to_string()),
            vaccine_status_endpoint: env::var("PHSA_VACCINE_STATUS_ENDPOINT")
                .unwrap_or_else(|_| "/api/v1/Immunizations/VaccineStatus".to_string()),
            public_vaccine_status_endpoint: env::var("PHSA_PUBLIC_VACCINE_STATUS_ENDPOINT")
                .unwrap_or_else(|_| "/api/v1/Public/Immunizations/VaccineStatus".to_string()),
            access_token: env::var("PHSA_ACCESS_TOKEN").ok(),
            backoff_milliseconds: parse_var("PHSA_BACKOFF_MS", 500)?,
            max_retries: parse_var("PHSA_MAX_RETRIES", 3)?,
        })
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_milliseconds)
    }
}

/// Settings for the BC Mail Plus document generation service.
#[derive(Debug, Clone)]
pub struct BcMailPlusConfig {
    /// Endpoint template; `${HOST}`, `${ENV}` and `${TOKEN}` are substituted.
    pub endpoint: String,
    pub host: String,
    pub job_environment: String,
    pub auth_token: String,
    pub job_class: String,
    pub schema_version: String,
    pub backoff_milliseconds: u64,
    pub max_retries: u32,
}

impl BcMailPlusConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: env::var("BCMP_ENDPOINT")
                .unwrap_or_else(|_| "https://${HOST}/${ENV}/auth=${TOKEN}/JSON/".to_string()),
            host: env::var("BCMP_HOST").unwrap_or_else(|_| "127.0.0.1:5020".to_string()),
            job_environment: env::var("BCMP_JOB_ENVIRONMENT")
                .unwrap_or_else(|_| "dev".to_string()),
            auth_token: env::var("BCMP_TOKEN").unwrap_or_default(),
            job_class: env::var("BCMP_JOB_CLASS").unwrap_or_else(|_| "HLTH-SHC".to_string()),
            schema_version: env::var("BCMP_SCHEMA_VERSION")
                .unwrap_or_else(|_| "HG02".to_string()),
            backoff_milliseconds: parse_var("BCMP_BACKOFF_MS", 1000)?,
            max_retries: parse_var("BCMP_MAX_RETRIES", 7)?,
        })
    }

    /// Endpoint with host, environment and token placeholders filled in.
    pub fn resolved_endpoint(&self) -> String {
        self.endpoint
            .replace("${HOST}", &self.host)
            .replace("${ENV}", &self.job_environment)
            .replace("${TOKEN}", &self.auth_token)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_milliseconds)
    }
}

/// Templates used when generating or mailing vaccine cards.
#[derive(Debug, Clone)]
pub struct VaccineCardConfig {
    pub print_template: VaccineProofTemplate,
    pub mail_template: VaccineProofTemplate,
}

impl VaccineCardConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            print_template: parse_template("VACCINE_CARD_PRINT_TEMPLATE")?,
            mail_template: parse_template("VACCINE_CARD_MAIL_TEMPLATE")?,
        })
    }
}

impl Default for VaccineCardConfig {
    fn default() -> Self {
        Self {
            print_template: VaccineProofTemplate::Provincial,
            mail_template: VaccineProofTemplate::Provincial,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { name }),
        Err(_) => Ok(default),
    }
}

fn parse_template(name: &'static str) -> Result<VaccineProofTemplate, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<VaccineProofTemplate>()
            .map_err(|_| ConfigError::InvalidTemplate { name }),
        Err(_) => Ok(VaccineProofTemplate::Provincial),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { name: &'static str },
    InvalidTemplate { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { name } => {
                write!(f, "{name} must be a non-negative integer")
            }
            ConfigError::InvalidTemplate { name } => {
                write!(f, "{name} must be one of: provincial, federal")
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
