use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEV_DEFAULT_JWT_SECRET: &str =
    "development_only_mill_floor_secret_key_not_for_production_use_4f9c2e7a_xyz";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL (postgres:// or sqlite://)
    #[validate(length(min = 1))]
    pub database_url: String,

    /// JWT secret key (minimum 64 characters)
    #[validate(length(min = 64), custom = "validate_jwt_secret")]
    pub jwt_secret: String,

    /// Access token lifetime in seconds (5min - 24h)
    pub jwt_expiration: usize,

    /// Refresh token lifetime in seconds (1h - 30d)
    pub refresh_token_expiration: usize,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment ("development", "staging", "production")
    #[validate(length(min = 1))]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// CORS: allow credentials
    #[serde(default)]
    pub cors_allow_credentials: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Capacity of the domain event channel
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Pagination: default page size
    #[serde(default = "default_api_page_size")]
    pub api_default_page_size: u64,

    /// Pagination: hard upper bound for `limit`
    #[serde(default = "default_api_max_page_size")]
    pub api_max_page_size: u64,

    /// Maximum accepted request body in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// Production entries below this efficiency (percent) raise an alert event
    #[serde(default = "default_low_efficiency_threshold")]
    pub low_efficiency_threshold: f64,

    /// JWT issuer claim
    #[serde(default = "default_auth_issuer")]
    pub auth_issuer: String,

    /// JWT audience claim
    #[serde(default = "default_auth_audience")]
    pub auth_audience: String,
}

impl AppConfig {
    /// Creates a new configuration with defaults for every optional setting
    pub fn new(
        database_url: String,
        jwt_secret: String,
        jwt_expiration: usize,
        refresh_token_expiration: usize,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            refresh_token_expiration,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            api_default_page_size: default_api_page_size(),
            api_max_page_size: default_api_max_page_size(),
            max_body_size: default_max_body_size(),
            low_efficiency_threshold: default_low_efficiency_threshold(),
            auth_issuer: default_auth_issuer(),
            auth_audience: default_auth_audience(),
        }
    }

    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if !self.is_development() && self.jwt_secret.trim() == DEV_DEFAULT_JWT_SECRET {
            let mut err = ValidationError::new("jwt_secret_default_dev");
            err.message = Some(
                "The bundled development JWT secret must not be used outside development. Set APP__JWT_SECRET to a unique, secure value."
                    .into(),
            );
            errors.add("jwt_secret", err);
        }

        if !(300..=86_400).contains(&self.jwt_expiration) {
            let mut err = ValidationError::new("jwt_expiration");
            err.message = Some("jwt_expiration must be between 300 and 86400 seconds".into());
            errors.add("jwt_expiration", err);
        }

        if !(3_600..=2_592_000).contains(&self.refresh_token_expiration) {
            let mut err = ValidationError::new("refresh_token_expiration");
            err.message =
                Some("refresh_token_expiration must be between 3600 and 2592000 seconds".into());
            errors.add("refresh_token_expiration", err);
        }

        if self.event_channel_capacity == 0 {
            let mut err = ValidationError::new("event_channel_capacity");
            err.message = Some("event_channel_capacity must be greater than 0".into());
            errors.add("event_channel_capacity", err);
        }

        if !(0.0..=100.0).contains(&self.low_efficiency_threshold) {
            let mut err = ValidationError::new("low_efficiency_threshold");
            err.message = Some("low_efficiency_threshold must be a percentage (0-100)".into());
            errors.add("low_efficiency_threshold", err);
        }

        if self.api_default_page_size == 0 || self.api_default_page_size > self.api_max_page_size {
            let mut err = ValidationError::new("api_default_page_size");
            err.message = Some("api_default_page_size must be between 1 and api_max_page_size".into());
            errors.add("api_default_page_size", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    20
}
fn default_db_min_connections() -> u32 {
    2
}
fn default_db_connect_timeout_secs() -> u64 {
    10
}
fn default_db_idle_timeout_secs() -> u64 {
    300
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_api_page_size() -> u64 {
    20
}

fn default_api_max_page_size() -> u64 {
    100
}

fn default_max_body_size() -> usize {
    1024 * 1024
}

fn default_low_efficiency_threshold() -> f64 {
    75.0
}

fn default_auth_issuer() -> String {
    "textile-erp".to_string()
}

fn default_auth_audience() -> String {
    "textile-erp-clients".to_string()
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_jwt_secret(secret: &str) -> Result<(), ValidationError> {
    let trimmed = secret.trim();

    if trimmed.len() < 64 {
        let mut err = ValidationError::new("jwt_secret");
        err.message =
            Some("JWT secret must be at least 64 characters for adequate security".into());
        return Err(err);
    }

    if let Some(first) = trimmed.chars().next() {
        if trimmed.chars().all(|c| c == first) {
            let mut err = ValidationError::new("jwt_secret");
            err.message = Some("JWT secret cannot be a repeated character sequence".into());
            return Err(err);
        }
    }

    let lower = trimmed.to_ascii_lowercase();
    let weak_fragments = ["changeme", "password", "12345678", "abcdefgh"];
    if weak_fragments.iter().any(|pattern| lower.contains(pattern)) {
        let mut err = ValidationError::new("jwt_secret");
        err.message = Some(
            "JWT secret appears to be weak; use a cryptographically strong random string".into(),
        );
        return Err(err);
    }

    let unique_chars: std::collections::HashSet<char> = trimmed.chars().collect();
    if unique_chars.len() < 10 {
        let mut err = ValidationError::new("jwt_secret");
        err.message =
            Some("JWT secret must have at least 10 unique characters for adequate entropy".into());
        return Err(err);
    }

    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("textile_erp={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    // jwt_secret deliberately has no default.
    let config = Config::builder()
        .set_default("database_url", "sqlite://textile_erp.db?mode=rwc")?
        .set_default("jwt_expiration", 3600)?
        .set_default("refresh_token_expiration", 604800)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT)?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("jwt_secret").is_err() {
        error!("JWT secret is not configured. Set APP__JWT_SECRET environment variable with a secure random string (minimum 64 characters).");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret is required but not configured. Set APP__JWT_SECRET environment variable."
                .into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;
    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod cors_validation_tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            "spindle_frame_rotor_count_shift_ledger_secret_for_config_tests_0987654321".into(),
            3600,
            86_400,
            "127.0.0.1".into(),
            8080,
            "production".into(),
        )
    }

    #[test]
    fn non_dev_requires_cors_origins() {
        let cfg = base_config();
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn non_dev_allows_override_flag() {
        let mut cfg = base_config();
        cfg.cors_allow_any_origin = true;
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn non_dev_with_origins_passes() {
        let mut cfg = base_config();
        cfg.cors_allowed_origins = Some("https://mill.example.com".into());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn development_allows_permissive_by_default() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn dev_secret_rejected_outside_development() {
        let mut cfg = base_config();
        cfg.cors_allow_any_origin = true;
        cfg.jwt_secret = DEV_DEFAULT_JWT_SECRET.into();
        let errors = cfg.validate_additional_constraints().unwrap_err();
        assert!(errors.field_errors().contains_key("jwt_secret"));
    }

    #[test]
    fn default_page_size_must_fit_max() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        cfg.api_default_page_size = 500;
        assert!(cfg.validate_additional_constraints().is_err());
    }
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[test]
    fn weak_jwt_secrets_are_rejected() {
        assert!(validate_jwt_secret("short").is_err());
        assert!(validate_jwt_secret(&"a".repeat(80)).is_err());
        assert!(validate_jwt_secret(&format!("{}password", "x1y2z3".repeat(12))).is_err());
        assert!(validate_jwt_secret(
            "spindle_frame_rotor_count_shift_ledger_secret_for_config_tests_0987654321"
        )
        .is_ok());
    }

    #[test]
    fn log_levels_are_checked() {
        assert!(validate_log_level("INFO").is_ok());
        assert!(validate_log_level("verbose").is_err());
    }

    #[test]
    fn full_config_validates() {
        let cfg = AppConfig::new(
            "sqlite::memory:".into(),
            "spindle_frame_rotor_count_shift_ledger_secret_for_config_tests_0987654321".into(),
            3600,
            86_400,
            "127.0.0.1".into(),
            8080,
            "development".into(),
        );
        assert!(cfg.validate().is_ok());
    }
}
