use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::workflows::decisioning::DecisionPolicy;
use crate::workflows::lifecycle::{ApplicationState, DEFAULT_MAX_ATTEMPTS};

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
    pub decision: DecisionPolicy,
    pub lifecycle: LifecycleConfig,
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

        let defaults = DecisionPolicy::default();
        let decision = DecisionPolicy {
            min_credit_score: parse_var("DECISION_MIN_CREDIT_SCORE", defaults.min_credit_score)?,
            max_dti_ratio: parse_var("DECISION_MAX_DTI_RATIO", defaults.max_dti_ratio)?,
            min_annual_income: parse_var(
                "DECISION_MIN_ANNUAL_INCOME",
                defaults.min_annual_income,
            )?,
            approval_validity_days: parse_var(
                "DECISION_APPROVAL_VALIDITY_DAYS",
                defaults.approval_validity_days,
            )?,
            ..defaults
        };

        let lifecycle = LifecycleConfig {
            max_attempts: parse_var("LIFECYCLE_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
            persistence: PersistenceMode::from_var(
                env::var("LIFECYCLE_PERSISTENCE").ok().as_deref(),
            )?,
            simulated_from_state: ApplicationState::Initiated,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            decision,
            lifecycle,
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        Err(_) => Ok(default),
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

/// Where lifecycle transitions are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceMode {
    /// Backed by the in-process loan repository.
    Memory,
    /// No repository; transitions are validated and reported only.
    Simulated,
}

impl PersistenceMode {
    fn from_var(value: Option<&str>) -> Result<Self, ConfigError> {
        match value.map(|raw| raw.trim().to_ascii_lowercase()) {
            None => Ok(Self::Memory),
            Some(mode) if mode.is_empty() || mode == "memory" => Ok(Self::Memory),
            Some(mode) if mode == "simulated" || mode == "mock" => Ok(Self::Simulated),
            Some(mode) => Err(ConfigError::InvalidValue {
                name: "LIFECYCLE_PERSISTENCE",
                value: mode,
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub max_attempts: u32,
    pub persistence: PersistenceMode,
    /// Assumed current state in simulated mode when the caller does not supply one.
    pub simulated_from_state: ApplicationState,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { name, value } => {
                write!(f, "{name} has an invalid value '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidValue { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
