use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub reminder: ReminderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Absent url selects the in-memory store.
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReminderConfig {
    pub enabled: bool,
    pub window_minutes: u32,
    pub one_hour_enabled: bool,
    pub sweep_interval_secs: u64,
    pub notify_timeout_secs: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_minutes: 15,
            one_hour_enabled: true,
            sweep_interval_secs: 60,
            notify_timeout_secs: 5,
        }
    }
}

impl ReminderConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Server configuration
        let host = env::var("SERVER_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string())
            .parse::<IpAddr>()
            .context("Failed to parse SERVER_HOST")?;

        let port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .context("Failed to parse SERVER_PORT")?;

        // Database configuration
        let db_url = env::var("DATABASE_URL").ok();
        let db_max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(val) => Some(val.parse().context("Failed to parse DATABASE_MAX_CONNECTIONS")?),
            Err(_) => Some(10),
        };
        let db_min_connections = match env::var("DATABASE_MIN_CONNECTIONS") {
            Ok(val) => Some(val.parse().context("Failed to parse DATABASE_MIN_CONNECTIONS")?),
            Err(_) => Some(1),
        };

        // Reminder sweep configuration
        let reminder_enabled = match env::var("REMINDER_ENABLED") {
            Ok(val) => val.parse().context("Failed to parse REMINDER_ENABLED")?,
            Err(_) => true,
        };
        let window_minutes = match env::var("REMINDER_WINDOW_MINUTES") {
            Ok(val) => val.parse().context("Failed to parse REMINDER_WINDOW_MINUTES")?,
            Err(_) => 15,
        };
        let one_hour_enabled = match env::var("REMINDER_ONE_HOUR_ENABLED") {
            Ok(val) => val.parse().context("Failed to parse REMINDER_ONE_HOUR_ENABLED")?,
            Err(_) => true,
        };
        let sweep_interval_secs = match env::var("REMINDER_SWEEP_INTERVAL_SECONDS") {
            Ok(val) => val
                .parse()
                .context("Failed to parse REMINDER_SWEEP_INTERVAL_SECONDS")?,
            Err(_) => 60,
        };
        let notify_timeout_secs = match env::var("REMINDER_NOTIFY_TIMEOUT_SECONDS") {
            Ok(val) => val
                .parse()
                .context("Failed to parse REMINDER_NOTIFY_TIMEOUT_SECONDS")?,
            Err(_) => 5,
        };

        Ok(Config {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: db_url,
                max_connections: db_max_connections,
                min_connections: db_min_connections,
            },
            reminder: ReminderConfig {
                enabled: reminder_enabled,
                window_minutes,
                one_hour_enabled,
                sweep_interval_secs,
                notify_timeout_secs,
            },
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }
}

// Use once_cell for a global config instance that's initialized once
use once_cell::sync::OnceCell;

static CONFIG: OnceCell<Config> = OnceCell::new();

pub fn init() -> Result<&'static Config> {
    CONFIG.get_or_try_init(Config::from_env)
}

pub fn get() -> &'static Config {
    CONFIG.get().expect("Config is not initialized")
}
