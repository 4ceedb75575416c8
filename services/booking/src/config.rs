//! Configuration types for the booking client

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub booking: BookingConfig,
}

/// Appointment API connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Bearer token sent with every request
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Environment variable to read the bearer token from when `auth_token` is unset
    #[serde(default)]
    pub auth_token_env: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_seconds: default_request_timeout(),
            auth_token: None,
            auth_token_env: None,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Booking flow settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Time budget for the whole booking process, from first selection to submission
    #[serde(default = "default_process_budget")]
    pub process_budget_seconds: u32,
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            process_budget_seconds: default_process_budget(),
            tick_interval_ms: default_tick_interval(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl BookingConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Config {
    /// Fill in secrets that are referenced indirectly through the environment
    pub fn resolve_secrets(&mut self) -> crate::Result<()> {
        if self.api.auth_token.is_some() {
            return Ok(());
        }
        if let Some(var) = &self.api.auth_token_env {
            let token = std::env::var(var).map_err(|_| {
                crate::BookingError::Config(format!(
                    "Environment variable {} for the API token is not set",
                    var
                ))
            })?;
            self.api.auth_token = Some(token);
        }
        Ok(())
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.booking.process_budget_seconds == 0 {
            return Err(crate::BookingError::Config(
                "process_budget_seconds must be greater than zero".to_string(),
            ));
        }
        if self.booking.tick_interval_ms == 0 {
            return Err(crate::BookingError::Config(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.booking.event_capacity == 0 {
            return Err(crate::BookingError::Config(
                "event_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_process_budget() -> u32 {
    300
}

fn default_tick_interval() -> u64 {
    1000
}

fn default_event_capacity() -> usize {
    64
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::BookingError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}
