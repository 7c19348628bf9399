//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the
//! bay-conditions.toml file. It provides a centralized way to configure the
//! cache, the upstream weather and tide providers, the vessel hull-speed table
//! and the harbor catalog.
//!
//! Every section is optional; anything left out takes its default. Entries
//! under `[vessels.hull_speed_kts]` are merged over the built-in classes, so
//! a file only needs to list the classes it adds or overrides.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::harbors::{default_harbors, Harbor, HarborCatalog};
use crate::route::{default_hull_speeds, HullSpeedTable};
use crate::ServiceError;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "bay-conditions.toml";

/// San Francisco (Presidio) NOAA station.
pub const DEFAULT_STATION: &str = "9414290";

/// Application configuration loaded from bay-conditions.toml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Expiring cache limits
    pub cache: CacheConfig,
    /// Open-Meteo forecast provider
    pub weather: WeatherConfig,
    /// NOAA CO-OPS tide provider and default query parameters
    pub tides: TideConfig,
    /// Vessel class → hull speed in knots
    pub vessels: VesselConfig,
    /// Named harbors
    pub harbors: Vec<Harbor>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry time-to-live in milliseconds
    pub ttl_ms: u64,
    /// Maximum number of entries before LRU eviction
    pub max_items: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            ttl_ms: 60_000,
            max_items: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        WeatherConfig {
            base_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Tide provider settings. The query defaults are forwarded to NOAA verbatim
/// whenever a request leaves the matching parameter out.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TideConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub station: String,
    pub product: String,
    pub time_zone: String,
    pub units: String,
    /// Vertical reference; MLLW is the chart datum for US tide tables
    pub datum: String,
    pub interval: String,
    pub range: String,
}

impl Default for TideConfig {
    fn default() -> Self {
        TideConfig {
            base_url: "https://api.tidesandcurrents.noaa.gov/api/prod/datagetter".to_string(),
            timeout_secs: 10,
            station: DEFAULT_STATION.to_string(),
            product: "predictions".to_string(),
            time_zone: "lst_ldt".to_string(),
            units: "english".to_string(),
            datum: "MLLW".to_string(),
            interval: "hilo".to_string(),
            range: "24".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VesselConfig {
    pub hull_speed_kts: BTreeMap<String, f64>,
}

impl Default for VesselConfig {
    fn default() -> Self {
        VesselConfig {
            hull_speed_kts: default_hull_speeds(),
        }
    }
}

impl Config {
    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(mut config) => {
                    let mut hull_speeds = default_hull_speeds();
                    hull_speeds.append(&mut config.vessels.hull_speed_kts);
                    config.vessels.hull_speed_kts = hull_speeds;
                    if config.harbors.is_empty() {
                        config.harbors = default_harbors();
                    }
                    if let Err(e) = config.validate() {
                        tracing::warn!("Invalid configuration in {}: {}", path.display(), e);
                        tracing::warn!("Using default configuration");
                        return Self::with_default_harbors();
                    }
                    tracing::info!(
                        "Loaded configuration from {} ({} harbors, {} vessel classes)",
                        path.display(),
                        config.harbors.len(),
                        config.vessels.hull_speed_kts.len()
                    );
                    config
                }
                Err(e) => {
                    tracing::warn!("Invalid config file format: {}", e);
                    tracing::warn!("Using default configuration");
                    Self::with_default_harbors()
                }
            },
            Err(_) => {
                tracing::info!(
                    "No config file found at {}, using default configuration",
                    path.display()
                );
                Self::with_default_harbors()
            }
        }
    }

    /// Defaults including the built-in harbor list.
    pub fn with_default_harbors() -> Self {
        Config {
            harbors: default_harbors(),
            ..Self::default()
        }
    }

    /// Check the invariants the rest of the crate relies on.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.cache.max_items == 0 {
            return Err(ServiceError::Domain(
                "cache.max_items must be at least 1".to_string(),
            ));
        }
        self.hull_speed_table()?;
        for harbor in &self.harbors {
            harbor.coordinate()?;
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache.ttl_ms)
    }

    pub fn hull_speed_table(&self) -> Result<HullSpeedTable, ServiceError> {
        HullSpeedTable::new(self.vessels.hull_speed_kts.clone())
    }

    pub fn harbor_catalog(&self) -> HarborCatalog {
        HarborCatalog::new(self.harbors.clone())
    }

    /// Save current configuration to `path`
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        tracing::info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }
}
