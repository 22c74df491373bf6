//! Configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Agency identity and server connection
    #[serde(default)]
    pub client: ClientConfig,
    /// Batch sizing
    #[serde(default)]
    pub batch: BatchConfig,
    /// Where the agency's bets are read from
    #[serde(default)]
    pub data: DataConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

/// Agency client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Agency identifier sent with every batch
    #[serde(default = "default_agency_id")]
    pub id: u32,
    /// Lottery server address (`host:port`)
    #[serde(default = "default_server_address")]
    pub server_address: String,
    /// Maximum number of batch-sending iterations
    #[serde(default = "default_loop_amount")]
    pub loop_amount: u32,
    /// Pause between iterations in milliseconds
    #[serde(default = "default_loop_period")]
    pub loop_period_ms: u64,
}

impl ClientConfig {
    pub fn loop_period(&self) -> Duration {
        Duration::from_millis(self.loop_period_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            id: default_agency_id(),
            server_address: default_server_address(),
            loop_amount: default_loop_amount(),
            loop_period_ms: default_loop_period(),
        }
    }
}

fn default_agency_id() -> u32 {
    1
}

fn default_server_address() -> String {
    "server:12345".to_string()
}

fn default_loop_amount() -> u32 {
    u32::MAX
}

fn default_loop_period() -> u64 {
    0
}

/// Batch sizing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Bets per batch, between 1 and 255
    #[serde(default = "default_max_amount")]
    pub max_amount: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_amount: default_max_amount(),
        }
    }
}

fn default_max_amount() -> usize {
    100
}

/// Bet data location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Path of the agency bet file
    #[serde(default = "default_data_path")]
    pub path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: default_data_path(),
        }
    }
}

fn default_data_path() -> String {
    "./agency.csv".to_string()
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Delay between winners polls in milliseconds
    #[serde(default = "default_winners_backoff")]
    pub winners_backoff_ms: u64,
}

impl AppSettings {
    pub fn winners_backoff(&self) -> Duration {
        Duration::from_millis(self.winners_backoff_ms)
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            winners_backoff_ms: default_winners_backoff(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_winners_backoff() -> u64 {
    100
}
