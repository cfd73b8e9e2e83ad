use std::fmt;
use std::fs;
use std::path::Path;

use layers::MarkersConfig;
use serde::{Deserialize, Serialize};
use spatial::IndexOptions;

use crate::camera::CameraSettings;
use crate::zoom::ZoomMapper;

/// Every tunable of the globe view. Missing keys take their defaults, so an
/// empty JSON object is a valid config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobeConfig {
    pub zoom: ZoomMapper,
    pub camera: CameraSettings,
    pub index: IndexOptions,
    pub markers: MarkersConfig,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "I/O error: {err}"),
            ConfigError::Parse(err) => write!(f, "Config parse error: {err}"),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl GlobeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let payload = fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&payload)
    }

    pub fn from_json_str(payload: &str) -> Result<Self, ConfigError> {
        let config: GlobeConfig = serde_json::from_str(payload).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let zoom = &self.zoom;
        if !(zoom.reference_altitude.is_finite() && zoom.reference_altitude > 0.0) {
            return Err(ConfigError::Invalid(
                "zoom.reference_altitude must be positive".to_string(),
            ));
        }
        if !(zoom.min_altitude.is_finite() && zoom.min_altitude > 0.0) {
            return Err(ConfigError::Invalid(
                "zoom.min_altitude must be positive".to_string(),
            ));
        }
        if !zoom.cluster_disable_altitude.is_finite() {
            return Err(ConfigError::Invalid(
                "zoom.cluster_disable_altitude must be finite".to_string(),
            ));
        }
        if !(self.index.radius > 0.0 && self.index.extent > 0.0) {
            return Err(ConfigError::Invalid(
                "index.radius and index.extent must be positive".to_string(),
            ));
        }
        let cluster = &self.markers.cluster;
        if cluster.min_size_px > cluster.max_size_px {
            return Err(ConfigError::Invalid(
                "markers.cluster.min_size_px exceeds max_size_px".to_string(),
            ));
        }
        Ok(())
    }
}
