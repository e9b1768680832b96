use log::debug;
use std::{fs, path::PathBuf};
use strum::{Display, EnumIter, IntoEnumIterator};

const DEVICE_TREE_MODEL_PATH: &str = "/proc/device-tree/model";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum Platform {
    #[strum(serialize = "ARTIK520")]
    Artik520,
    #[strum(serialize = "ARTIK1020")]
    Artik1020,
    #[strum(serialize = "ARTIK710")]
    Artik710,
    #[strum(serialize = "unknown")]
    Unknown,
}

impl Platform {
    /// Bus the CW2015 gauge sits on, `None` when the board does not carry one.
    pub fn bus_id(self) -> Option<u8> {
        match self {
            Platform::Artik520 => Some(1),
            Platform::Artik1020 => Some(0),
            Platform::Artik710 => Some(8),
            Platform::Unknown => None,
        }
    }

    /// Matches whole words only, "artik530" is not an ARTIK5 board.
    pub fn from_model(model: &str) -> Self {
        model
            .split(|c: char| !c.is_ascii_alphanumeric())
            .find_map(|token| match token.to_ascii_lowercase().as_str() {
                "artik5" | "artik520" => Some(Platform::Artik520),
                "artik10" | "artik1020" => Some(Platform::Artik1020),
                "artik7" | "artik710" => Some(Platform::Artik710),
                _ => None,
            })
            .unwrap_or(Platform::Unknown)
    }

    pub fn known() -> Vec<Platform> {
        Platform::iter().filter(|p| p.bus_id().is_some()).collect()
    }
}

pub trait PlatformSource {
    fn get_current_platform(&self) -> Platform;
}

/// Identifies the board from the model string in the device tree.
pub struct DeviceTreePlatform {
    model_path: PathBuf,
}

impl DeviceTreePlatform {
    pub fn new() -> Self {
        Self::with_path(DEVICE_TREE_MODEL_PATH)
    }

    pub fn with_path<P: Into<PathBuf>>(model_path: P) -> Self {
        DeviceTreePlatform { model_path: model_path.into() }
    }
}

impl Default for DeviceTreePlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformSource for DeviceTreePlatform {
    fn get_current_platform(&self) -> Platform {
        let raw = match fs::read(&self.model_path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("Failed to read {}: {}", self.model_path.display(), e);
                return Platform::Unknown;
            }
        };

        let model = String::from_utf8_lossy(&raw);
        let model = model.trim_end_matches('\0').trim();
        let platform = Platform::from_model(model);
        debug!("Device tree model \"{}\" detected as {}", model, platform);
        platform
    }
}
