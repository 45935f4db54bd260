use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Compose project
    pub project_dir: PathBuf,
    pub data_dir: PathBuf,
    pub archivebox_service: String,
    pub archivebox_timeout: Duration,

    // Database
    pub database_path: PathBuf,

    // Web Server
    pub web_host: String,
    pub web_port: u16,
    pub static_url_prefix: String,

    // Index normalization
    pub display_utc_offset_hours: i32,

    // Bootstrap (only read by /init)
    pub docker_compose_url: String,
    pub archivebox_version: Option<String>,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub proxy: Option<String>,
    pub deployment_ports: Option<String>,
    pub time_zones: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let project_dir = PathBuf::from(required_env("PROJECT_DIR")?);
        let data_dir = optional_env("DATA_DIR")
            .map_or_else(|| project_dir.join("data"), PathBuf::from);

        Ok(Self {
            project_dir,
            data_dir,
            archivebox_service: env_or_default("ARCHIVEBOX_SERVICE", "archivebox"),
            archivebox_timeout: Duration::from_secs(parse_env_u64(
                "ARCHIVEBOX_TIMEOUT_SECS",
                1800,
            )?),

            database_path: PathBuf::from(env_or_default(
                "DATABASE_PATH",
                "./data/archivebox-api.sqlite",
            )),

            web_host: env_or_default("WEB_HOST", "0.0.0.0"),
            web_port: parse_env_u16("WEB_PORT", 8000)?,
            static_url_prefix: env_or_default("STATIC_URL_PREFIX", "/static"),

            display_utc_offset_hours: parse_env_i32("DISPLAY_UTC_OFFSET_HOURS", 8)?,

            docker_compose_url: env_or_default(
                "DOCKER_COMPOSE_URL",
                "https://docker-compose.archivebox.io",
            ),
            archivebox_version: optional_env("ARCHIVEBOX_VERSION"),
            admin_username: optional_env("ADMIN_USERNAME"),
            admin_password: optional_env("ADMIN_PASSWORD"),
            proxy: optional_env("PROXY"),
            deployment_ports: optional_env("DEPLOYMENT_PORTS"),
            time_zones: optional_env("TIME_ZONES"),
        })
    }

    /// Build a configuration rooted at `project_dir` with defaults for everything else.
    #[must_use]
    pub fn for_project(project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        Self {
            data_dir: project_dir.join("data"),
            database_path: project_dir.join("archivebox-api.sqlite"),
            project_dir,
            archivebox_service: "archivebox".to_string(),
            archivebox_timeout: Duration::from_secs(1800),
            web_host: "127.0.0.1".to_string(),
            web_port: 8000,
            static_url_prefix: "/static".to_string(),
            display_utc_offset_hours: 8,
            docker_compose_url: "https://docker-compose.archivebox.io".to_string(),
            archivebox_version: None,
            admin_username: None,
            admin_password: None,
            proxy: None,
            deployment_ports: None,
            time_zones: None,
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "PROJECT_DIR".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.archivebox_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "ARCHIVEBOX_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if !(-23..=23).contains(&self.display_utc_offset_hours) {
            return Err(ConfigError::InvalidValue {
                name: "DISPLAY_UTC_OFFSET_HOURS".to_string(),
                message: format!("must be within -23..=23, got {}", self.display_utc_offset_hours),
            });
        }
        if !self.static_url_prefix.starts_with('/') || self.static_url_prefix.trim_end_matches('/').is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "STATIC_URL_PREFIX".to_string(),
                message: "must start with '/' and name a sub-path".to_string(),
            });
        }
        Ok(())
    }

    /// Path to the compose file managed by `/init`.
    #[must_use]
    pub fn compose_file(&self) -> PathBuf {
        self.project_dir.join("docker-compose.yml")
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_i32(name: &str, default: i32) -> Result<i32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}
