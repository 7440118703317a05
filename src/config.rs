use chrono::NaiveTime;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_SESSION_COOKIE: &str = "vetclinic_session";
const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60 * 24 * 14;

/// Clinic calendar and stock-level settings
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ClinicConfig {
    /// First bookable time of day
    #[serde(default = "default_opens_at")]
    pub opens_at: NaiveTime,

    /// Last bookable time of day (inclusive)
    #[serde(default = "default_closes_at")]
    pub closes_at: NaiveTime,

    /// Granularity of the available-hours listing
    #[serde(default = "default_slot_minutes")]
    #[validate(range(min = 5, max = 240))]
    pub slot_minutes: u32,

    /// Products below this stock count are reported as critical
    #[serde(default = "default_critical_stock")]
    pub critical_stock_below: i32,

    /// Products below this stock count are reported as low
    #[serde(default = "default_low_stock")]
    pub low_stock_below: i32,

    /// How many days past the selected day the vet agenda looks ahead
    #[serde(default = "default_agenda_days")]
    pub agenda_upcoming_days: i64,

    /// Maximum number of upcoming appointments on the vet agenda
    #[serde(default = "default_agenda_limit")]
    pub agenda_upcoming_limit: u64,

    /// Number of recent entries shown per section on a patient's detail view
    #[serde(default = "default_patient_history_limit")]
    pub patient_history_limit: u64,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            opens_at: default_opens_at(),
            closes_at: default_closes_at(),
            slot_minutes: default_slot_minutes(),
            critical_stock_below: default_critical_stock(),
            low_stock_below: default_low_stock(),
            agenda_upcoming_days: default_agenda_days(),
            agenda_upcoming_limit: default_agenda_limit(),
            patient_history_limit: default_patient_history_limit(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    #[validate(length(min = 1))]
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
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

    /// CORS: allow credentials (needed for the session cookie cross-origin)
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

    /// Name of the session cookie
    #[serde(default = "default_session_cookie_name")]
    #[validate(length(min = 1, max = 64))]
    pub session_cookie_name: String,

    /// Idle lifetime of a session in seconds
    #[serde(default = "default_session_ttl_secs")]
    #[validate(range(min = 60))]
    pub session_ttl_secs: u64,

    /// Mark the session cookie `Secure`
    #[serde(default)]
    pub session_cookie_secure: bool,

    /// Default page size for paginated API responses
    #[serde(default = "default_api_page_size")]
    pub api_default_page_size: u64,

    /// Maximum page size allowed for paginated API responses
    #[serde(default = "default_api_max_page_size")]
    pub api_max_page_size: u64,

    /// Clinic calendar and stock settings
    #[serde(default)]
    #[validate]
    pub clinic: ClinicConfig,
}

impl AppConfig {
    /// Creates a configuration with defaults for everything but the
    /// connection and listener settings.
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
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
            session_cookie_name: default_session_cookie_name(),
            session_ttl_secs: default_session_ttl_secs(),
            session_cookie_secure: false,
            api_default_page_size: default_api_page_size(),
            api_max_page_size: default_api_max_page_size(),
            clinic: ClinicConfig::default(),
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

    pub fn session_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.session_ttl_secs)
    }

    /// Clamps a requested page size into the configured bounds.
    pub fn page_size(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.api_default_page_size)
            .clamp(1, self.api_max_page_size)
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

        if self.clinic.opens_at >= self.clinic.closes_at {
            let mut err = ValidationError::new("clinic_hours");
            err.message = Some("clinic.opens_at must be earlier than clinic.closes_at".into());
            errors.add("clinic", err);
        }

        if self.clinic.critical_stock_below > self.clinic.low_stock_below {
            let mut err = ValidationError::new("stock_thresholds");
            err.message =
                Some("clinic.critical_stock_below must not exceed clinic.low_stock_below".into());
            errors.add("clinic", err);
        }

        if self.api_default_page_size == 0 || self.api_default_page_size > self.api_max_page_size
        {
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

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    16
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_session_cookie_name() -> String {
    DEFAULT_SESSION_COOKIE.to_string()
}

fn default_session_ttl_secs() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_api_page_size() -> u64 {
    20
}

fn default_api_max_page_size() -> u64 {
    100
}

fn default_opens_at() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default()
}

fn default_closes_at() -> NaiveTime {
    NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default()
}

fn default_slot_minutes() -> u32 {
    30
}

fn default_critical_stock() -> i32 {
    10
}

fn default_low_stock() -> i32 {
    20
}

fn default_agenda_days() -> i64 {
    7
}

fn default_agenda_limit() -> u64 {
    10
}

fn default_patient_history_limit() -> u64 {
    10
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

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("vetclinic_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration from `./config` and the environment.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(Path::new(CONFIG_DIR))
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (`{dir}/default.toml`)
/// 3. Environment-specific config (`{dir}/{env}.toml`)
/// 4. Environment variables (`APP__*`)
pub fn load_config_from(config_dir: &Path) -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://vetclinic.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&config_dir.join("default").to_string_lossy()).required(false))
        .add_source(File::with_name(&config_dir.join(&run_env).to_string_lossy()).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration constraint validation failed: {:?}", e);
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
            "sqlite://vetclinic.db?mode=memory".into(),
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
        cfg.cors_allowed_origins = Some("https://clinic.example".into());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn development_allows_permissive_by_default() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn inverted_clinic_hours_are_rejected() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        cfg.clinic.opens_at = NaiveTime::from_hms_opt(19, 0, 0).unwrap();
        let errors = cfg.validate_additional_constraints().unwrap_err();
        assert!(errors.errors().contains_key("clinic"));
    }

    #[test]
    fn page_size_is_clamped() {
        let cfg = base_config();
        assert_eq!(cfg.page_size(None), 20);
        assert_eq!(cfg.page_size(Some(0)), 1);
        assert_eq!(cfg.page_size(Some(5_000)), 100);
    }
}

#[cfg(test)]
mod file_loading_tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, name: &str, content: &str) {
        let mut file = std::fs::File::create(dir.path().join(name)).unwrap();
        writeln!(file, "{}", content).unwrap();
    }

    #[test]
    fn default_file_is_layered_over_builtins() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "default.toml",
            r#"
            database_url = "sqlite::memory:"
            port = 9191
            session_ttl_secs = 3600

            [clinic]
            slot_minutes = 15
            "#,
        );

        let config = load_config_from(dir.path()).unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.port, 9191);
        assert_eq!(config.session_ttl_secs, 3600);
        assert_eq!(config.clinic.slot_minutes, 15);
        assert_eq!(config.clinic.opens_at, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(config.session_cookie_name, DEFAULT_SESSION_COOKIE);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "default.toml", "redis_url = \"redis://localhost\"");

        let result = load_config_from(dir.path());
        assert!(matches!(result, Err(AppConfigError::Load(_))));
    }

    #[test]
    fn invalid_log_level_fails_validation() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "default.toml", "log_level = \"loud\"");

        let result = load_config_from(dir.path());
        assert!(matches!(result, Err(AppConfigError::Validation(_))));
    }
}
