//! Layered server configuration.
//!
//! Built-in defaults, then an optional TOML file (`carebase.toml` unless a
//! path is given), then `CAREBASE__SECTION__KEY` environment variables, then
//! command-line overrides.

use std::path::Path;

use anyhow::{Context, Result};
use carebase_core::CoreSettings;
use chrono::NaiveTime;
use config::{Config, Environment, File};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "carebase.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// File path, or `:memory:`
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoutingSettings {
    /// `HH:MM`
    pub default_start_time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingSettings {
    pub cents_per_minute: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiSettings {
    pub endpoint: String,
    /// No key means the assistant is disabled
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub routing: RoutingSettings,
    pub billing: BillingSettings,
    pub ai: AiSettings,
    pub log: LogSettings,
}

/// Values given on the command line; they win over every other source.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
}

impl Settings {
    /// Load settings. An explicitly named file must exist; the default file
    /// is optional.
    pub fn load(file: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let (path, required) = match file {
            Some(path) => (path.to_path_buf(), true),
            None => (Path::new(DEFAULT_CONFIG_FILE).to_path_buf(), false),
        };

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.path", "carebase.db")?
            .set_default("routing.default_start_time", "08:00")?
            .set_default("billing.cents_per_minute", 50)?
            .set_default("ai.endpoint", "https://api.openai.com/v1")?
            .set_default("ai.model", "gpt-4o-mini")?
            .set_default("ai.timeout_secs", 30)?
            .set_default("log.filter", "info,carebase_core=info,carebase_server=info")?
            .add_source(File::from(path.clone()).required(required))
            .add_source(
                Environment::with_prefix("CAREBASE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.host", overrides.host)?
            .set_override_option("server.port", overrides.port.map(i64::from))?
            .set_override_option("database.path", overrides.database)?
            .build()
            .with_context(|| format!("Failed to load configuration (file: {})", path.display()))?;

        let settings: Settings = config
            .try_deserialize()
            .context("Failed to parse configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        self.default_start_time()?;
        if self.billing.cents_per_minute < 0 {
            anyhow::bail!("billing.cents_per_minute must not be negative");
        }
        Ok(())
    }

    fn default_start_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.routing.default_start_time, "%H:%M").with_context(|| {
            format!(
                "routing.default_start_time must be HH:MM, got {:?}",
                self.routing.default_start_time
            )
        })
    }

    pub fn core_settings(&self) -> Result<CoreSettings> {
        Ok(CoreSettings {
            default_start_time: self.default_start_time()?,
            cents_per_minute: self.billing.cents_per_minute,
        })
    }

    /// Key for the AI provider, if one is configured and non-empty.
    pub fn ai_key(&self) -> Option<&str> {
        self.ai
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
