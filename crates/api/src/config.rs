use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub reminders: RemindersConfig,
    /// Email channel configuration
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: config.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Periodic scan driver.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Whether the periodic scan runs in this process.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Wall-clock budget of one scan; must be shorter than the interval.
    #[serde(default = "default_scan_timeout_secs")]
    pub scan_timeout_secs: u64,

    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    /// Bearer token required by `POST /internal/reminders/run`. Empty disables the check.
    #[serde(default)]
    pub trigger_token: String,
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
            scan_timeout_secs: default_scan_timeout_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            trigger_token: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemindersConfig {
    /// Insert the system default rules at startup when missing.
    #[serde(default = "default_true")]
    pub seed_defaults: bool,

    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: u32,

    /// Maximum candidates fetched per rule per scan.
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: i64,
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            seed_defaults: true,
            log_retention_days: default_log_retention_days(),
            candidate_limit: default_candidate_limit(),
        }
    }
}

/// Email channel configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Whether email reminders are sent at all
    #[serde(default)]
    pub enabled: bool,

    /// Email provider: sendgrid, or console (for development)
    #[serde(default = "default_email_provider")]
    pub provider: String,

    /// SendGrid API key (for sendgrid provider)
    #[serde(default)]
    pub sendgrid_api_key: String,

    /// Sender email address (From header)
    #[serde(default = "default_sender_email")]
    pub sender_email: String,

    /// Sender name (From header)
    #[serde(default = "default_sender_name")]
    pub sender_name: String,

    /// Prefix for relative action URLs (e.g., https://crm.example.com)
    #[serde(default)]
    pub base_url: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_email_provider(),
            sendgrid_api_key: String::new(),
            sender_email: default_sender_email(),
            sender_name: default_sender_name(),
            base_url: String::new(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_connections() -> u32 {
    10
}
fn default_min_connections() -> u32 {
    2
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_true() -> bool {
    true
}
fn default_interval_secs() -> u64 {
    300
}
fn default_scan_timeout_secs() -> u64 {
    240
}
fn default_shutdown_timeout_secs() -> u64 {
    30
}
fn default_log_retention_days() -> u32 {
    90
}
fn default_candidate_limit() -> i64 {
    500
}
fn default_email_provider() -> String {
    "console".to_string()
}
fn default_sender_email() -> String {
    "noreply@crm.example.com".to_string()
}
fn default_sender_name() -> String {
    "CRM Reminders".to_string()
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with CRM__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("CRM").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;

        Ok(cfg)
    }

    /// Load configuration from embedded defaults plus overrides.
    ///
    /// Skips validation so tests can build partial configs.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30

            [database]
            url = ""
            max_connections = 10
            min_connections = 2
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [scheduler]
            enabled = false
            interval_secs = 300
            scan_timeout_secs = 240
            shutdown_timeout_secs = 5
            trigger_token = ""

            [reminders]
            seed_defaults = false
            log_retention_days = 90
            candidate_limit = 500

            [email]
            enabled = false
            provider = "console"
            sender_email = "test@example.com"
            sender_name = "Test"
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "CRM__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.scheduler.interval_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "scheduler.interval_secs must be positive".to_string(),
            ));
        }

        if self.scheduler.scan_timeout_secs == 0
            || self.scheduler.scan_timeout_secs >= self.scheduler.interval_secs
        {
            return Err(ConfigValidationError::InvalidValue(
                "scheduler.scan_timeout_secs must be positive and shorter than scheduler.interval_secs"
                    .to_string(),
            ));
        }

        if self.reminders.candidate_limit <= 0 {
            return Err(ConfigValidationError::InvalidValue(
                "reminders.candidate_limit must be positive".to_string(),
            ));
        }

        if self.email.enabled
            && self.email.provider == "sendgrid"
            && self.email.sendgrid_api_key.is_empty()
        {
            return Err(ConfigValidationError::MissingRequired(
                "email.sendgrid_api_key is required for the sendgrid provider".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
