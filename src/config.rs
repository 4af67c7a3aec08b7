//! Configuration management for the segment server

use crate::error::{Result, ServeError};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Configuration for the segment server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (default: "0.0.0.0:8080")
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Directory to serve files from (default: "./data")
    #[serde(default = "default_serve_dir")]
    pub serve_dir: String,

    /// Maximum memory cache size in bytes (default: 1GB)
    #[serde(default = "default_cache_size")]
    pub cache_size_bytes: usize,

    /// Measurement window before the read speed is first judged,
    /// in milliseconds (default: 1000)
    #[serde(default = "default_speed_check_ms")]
    pub speed_check_ms: u64,

    /// Minimum acceptable read speed in Mbps before aborting (default: 5.0)
    #[serde(default = "default_min_speed_mbps")]
    pub min_speed_mbps: f64,

    /// Pause before the second (hedged) read attempt, in milliseconds
    /// (default: 100)
    #[serde(default = "default_hedge_delay_ms")]
    pub hedge_delay_ms: u64,

    /// Read chunk size in bytes (default: 1MB)
    #[serde(default = "default_read_chunk_bytes")]
    pub read_chunk_bytes: usize,
}

// Default value functions for serde
fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_serve_dir() -> String {
    "./data".to_string()
}

fn default_cache_size() -> usize {
    1024 * 1024 * 1024 // 1GB
}

fn default_speed_check_ms() -> u64 {
    1000
}

fn default_min_speed_mbps() -> f64 {
    5.0
}

fn default_hedge_delay_ms() -> u64 {
    100
}

fn default_read_chunk_bytes() -> usize {
    1024 * 1024 // 1MB
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen_address: default_listen_address(),
            serve_dir: default_serve_dir(),
            cache_size_bytes: default_cache_size(),
            speed_check_ms: default_speed_check_ms(),
            min_speed_mbps: default_min_speed_mbps(),
            hedge_delay_ms: default_hedge_delay_ms(),
            read_chunk_bytes: default_read_chunk_bytes(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file
    ///
    /// # Arguments
    /// * `path` - Path to the YAML configuration file
    ///
    /// # Returns
    /// * `Ok(ServerConfig)` if loading and validation succeed
    /// * `Err(ServeError)` if the file cannot be read or the config is invalid
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ServeError::Config(format!("Failed to read config file: {}", e)))?;

        let config: ServerConfig = serde_yaml::from_str(&content)
            .map_err(|e| ServeError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// `SERVE_DIR` replaces the serve directory, `PORT` replaces the port of
    /// the listen address, and `CACHE_SIZE_BYTES` replaces the cache budget.
    /// Unparsable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = env::var("SERVE_DIR") {
            if !dir.is_empty() {
                self.serve_dir = dir;
            }
        }
        if let Ok(port) = env::var("PORT") {
            if let Ok(port) = port.parse::<u16>() {
                let host = self
                    .listen_address
                    .rsplit_once(':')
                    .map(|(host, _)| host)
                    .unwrap_or("0.0.0.0");
                self.listen_address = format!("{}:{}", host, port);
            }
        }
        if let Ok(size) = env::var("CACHE_SIZE_BYTES") {
            if let Ok(size) = size.parse::<usize>() {
                self.cache_size_bytes = size;
            }
        }
    }

    /// Validate the configuration
    ///
    /// # Validation Rules
    /// - listen_address and serve_dir must not be empty
    /// - cache_size_bytes, speed_check_ms and read_chunk_bytes must be > 0
    /// - min_speed_mbps must be a finite positive number
    pub fn validate(&self) -> Result<()> {
        if self.listen_address.is_empty() {
            return Err(ServeError::Config(
                "listen_address must not be empty".to_string(),
            ));
        }

        if self.serve_dir.is_empty() {
            return Err(ServeError::Config("serve_dir must not be empty".to_string()));
        }

        if self.cache_size_bytes == 0 {
            return Err(ServeError::Config(
                "cache_size_bytes must be greater than 0".to_string(),
            ));
        }

        if self.speed_check_ms == 0 {
            return Err(ServeError::Config(
                "speed_check_ms must be greater than 0".to_string(),
            ));
        }

        if !self.min_speed_mbps.is_finite() || self.min_speed_mbps <= 0.0 {
            return Err(ServeError::Config(format!(
                "min_speed_mbps must be a positive number, got {}",
                self.min_speed_mbps
            )));
        }

        if self.read_chunk_bytes == 0 {
            return Err(ServeError::Config(
                "read_chunk_bytes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Measurement window as a [`Duration`]
    pub fn speed_check_window(&self) -> Duration {
        Duration::from_millis(self.speed_check_ms)
    }

    /// Hedge delay as a [`Duration`]
    pub fn hedge_delay(&self) -> Duration {
        Duration::from_millis(self.hedge_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_address, "0.0.0.0:8080");
        assert_eq!(config.serve_dir, "./data");
        assert_eq!(config.cache_size_bytes, 1024 * 1024 * 1024);
        assert_eq!(config.speed_check_ms, 1000);
        assert_eq!(config.min_speed_mbps, 5.0);
        assert_eq!(config.hedge_delay_ms, 100);
        assert_eq!(config.read_chunk_bytes, 1024 * 1024);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_cache_size() {
        let mut config = ServerConfig::default();
        config.cache_size_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_speed_window() {
        let mut config = ServerConfig::default();
        config.speed_check_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_non_positive_min_speed() {
        let mut config = ServerConfig::default();
        config.min_speed_mbps = 0.0;
        assert!(config.validate().is_err());

        config.min_speed_mbps = -3.0;
        assert!(config.validate().is_err());

        config.min_speed_mbps = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_serve_dir() {
        let mut config = ServerConfig::default();
        config.serve_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_partial_yaml_uses_defaults() {
        let yaml = "serve_dir: /srv/media\ncache_size_bytes: 4096\n";
        let config: ServerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.serve_dir, "/srv/media");
        assert_eq!(config.cache_size_bytes, 4096);
        assert_eq!(config.speed_check_ms, 1000);
        assert_eq!(config.hedge_delay_ms, 100);
    }

    #[test]
    fn test_duration_accessors() {
        let config = ServerConfig::default();
        assert_eq!(config.speed_check_window(), Duration::from_secs(1));
        assert_eq!(config.hedge_delay(), Duration::from_millis(100));
    }
}
