use crate::bus::{i2c_sysfs::DEFAULT_DEVICE_ROOT, AddressingMode, BusConfig, MAX_7BIT_ADDRESS};
use crate::cw2015::{CW2015_BUS_SPEED_HZ, CW2015_DEVICE_ADDRESS};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::Display;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const CONFIG_ENV_VAR: &str = "CW2015_TEST_CONFIG";

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    SerializeError(String),
    InvalidEntry(String),
    MissingEntry(String),
    Other(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&match self {
            ConfigError::SerializeError(msg) => format!("serialize/parse error: {}", msg),
            ConfigError::InvalidEntry(msg) => format!("invalid config entry: {}", msg),
            ConfigError::MissingEntry(msg) => format!("missing config entry: {}", msg),
            ConfigError::Other(msg) => format!("config error: {}", msg),
        })
    }
}

impl std::error::Error for ConfigError {}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct Configuration {
    pub bus_speed_hz: u32,
    pub addressing_mode: AddressingMode,
    pub device_address: u8,
    pub device_root: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            bus_speed_hz: CW2015_BUS_SPEED_HZ,
            addressing_mode: AddressingMode::Bit8,
            device_address: CW2015_DEVICE_ADDRESS,
            device_root: DEFAULT_DEVICE_ROOT.to_string(),
        }
    }
}

impl Configuration {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bus_speed_hz == 0 {
            return Err(ConfigError::InvalidEntry("bus_speed_hz must be greater than zero".to_string()));
        }

        if self.device_address > MAX_7BIT_ADDRESS {
            return Err(ConfigError::InvalidEntry(format!(
                "device_address 0x{:02x} is not a 7-bit slave address",
                self.device_address
            )));
        }

        if self.device_root.trim().is_empty() {
            return Err(ConfigError::MissingEntry("device_root cannot be empty".to_string()));
        }

        Ok(())
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Configuration, ConfigError> {
        let config: Configuration = match serde_json::from_reader(reader) {
            Ok(c) => c,
            Err(e) => {
                return Err(ConfigError::SerializeError(format!(
                    "failed to deserialize config file: {}",
                    e
                )));
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_str(json_str: &str) -> Result<Configuration, ConfigError> {
        Self::from_reader(json_str.as_bytes())
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Configuration, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| ConfigError::Other(format!("failed to open {}: {}", path.display(), e)))?;
        Self::from_reader(file)
    }

    /// Reads the file named by `CW2015_TEST_CONFIG`, or falls back to the defaults.
    pub fn load() -> Result<Configuration, ConfigError> {
        match env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::from_path(path),
            None => {
                let config = Configuration::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn bus_config(&self, bus_id: u8) -> BusConfig {
        BusConfig {
            bus_id,
            bus_speed_hz: self.bus_speed_hz,
            addressing_mode: self.addressing_mode,
            device_address: self.device_address,
        }
    }
}
