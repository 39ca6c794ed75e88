use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use chrono::Weekday;
use serde::Deserialize;

use crate::theme::ThemeKind;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "LECTERN_ENV";
const CONFIG_DIR_ENV: &str = "LECTERN_CONFIG_DIR";

/// Minutes per page assumed for sessions logged without a time.
pub const DEFAULT_MINUTES_PER_PAGE: f64 = 2.0;

/// Daily reading goal, in pages.
pub const DEFAULT_DAILY_GOAL_PAGES: u32 = 100;

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub reading: ReadingSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub theme: ThemeSettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, and environment overlay.
    ///
    /// Environment variables use the `LECTERN_` prefix and `__` between
    /// nested keys, e.g. `LECTERN_SEARCH__QUIET_PERIOD_MS=500`.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .with_context(|| "unable to resolve current directory")?
                .join("config"),
        };

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{environment}.toml"));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix("LECTERN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = match environment.as_str() {
            "local" => Environment::Local,
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            other => {
                return Err(anyhow!(
                    "unsupported environment '{}'; expected local/staging/production",
                    other
                ));
            }
        };

        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "127.0.0.1".to_string()
    }

    fn default_port() -> u16 {
        8383
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// JSON file backing the store; in-memory when absent.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "DatabaseSettings::default_event_capacity")]
    pub event_capacity: usize,
}

impl DatabaseSettings {
    fn default_event_capacity() -> usize {
        256
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: None,
            event_capacity: Self::default_event_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "SearchSettings::default_base_url")]
    pub base_url: String,
    #[serde(default = "SearchSettings::default_max_results")]
    pub max_results: u32,
    #[serde(default = "SearchSettings::default_quiet_period_ms")]
    pub quiet_period_ms: u64,
    #[serde(default = "SearchSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "SearchSettings::default_user_agent")]
    pub user_agent: String,
}

impl SearchSettings {
    fn default_base_url() -> String {
        "https://www.googleapis.com/books/v1/volumes".to_string()
    }

    fn default_max_results() -> u32 {
        10
    }

    fn default_quiet_period_ms() -> u64 {
        300
    }

    fn default_request_timeout_ms() -> u64 {
        10000
    }

    fn default_user_agent() -> String {
        concat!("Lectern/", env!("CARGO_PKG_VERSION")).to_string()
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            max_results: Self::default_max_results(),
            quiet_period_ms: Self::default_quiet_period_ms(),
            request_timeout_ms: Self::default_request_timeout_ms(),
            user_agent: Self::default_user_agent(),
        }
    }
}

/// First day of the calendar week used by weekly aggregates.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
    Saturday,
}

impl WeekStart {
    pub fn weekday(self) -> Weekday {
        match self {
            WeekStart::Monday => Weekday::Mon,
            WeekStart::Sunday => Weekday::Sun,
            WeekStart::Saturday => Weekday::Sat,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadingSettings {
    #[serde(default = "ReadingSettings::default_daily_goal_pages")]
    pub daily_goal_pages: u32,
    #[serde(default = "ReadingSettings::default_minutes_per_page")]
    pub default_minutes_per_page: f64,
    #[serde(default = "ReadingSettings::default_recent_books_limit")]
    pub recent_books_limit: usize,
    #[serde(default)]
    pub week_start: WeekStart,
}

impl ReadingSettings {
    fn default_daily_goal_pages() -> u32 {
        DEFAULT_DAILY_GOAL_PAGES
    }

    fn default_minutes_per_page() -> f64 {
        DEFAULT_MINUTES_PER_PAGE
    }

    fn default_recent_books_limit() -> usize {
        3
    }
}

impl Default for ReadingSettings {
    fn default() -> Self {
        Self {
            daily_goal_pages: Self::default_daily_goal_pages(),
            default_minutes_per_page: Self::default_minutes_per_page(),
            recent_books_limit: Self::default_recent_books_limit(),
            week_start: WeekStart::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default = "TelemetrySettings::default_log_filter")]
    pub log_filter: String,
}

impl TelemetrySettings {
    fn default_log_filter() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            log_filter: Self::default_log_filter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ThemeSettings {
    #[serde(default)]
    pub active: ThemeKind,
}
