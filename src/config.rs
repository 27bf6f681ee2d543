//! Viewer configuration
//!
//! Optional YAML file under the user config directory. Every field has a
//! default, so an absent or partial file always yields a usable config.

use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::scale::ZoomPolicy;

const CONFIG_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "docpane";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default = "default_min_zoom")]
    pub min_zoom: f32,

    #[serde(default = "default_max_zoom")]
    pub max_zoom: f32,

    #[serde(default = "default_zoom_step")]
    pub zoom_step: f32,

    #[serde(default = "default_initial_zoom")]
    pub initial_zoom: f32,

    /// Carry the zoom factor across document swaps within a session
    #[serde(default = "default_true")]
    pub remember_zoom: bool,

    /// Where downloads land; defaults to the platform download directory
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
}

fn default_min_zoom() -> f32 {
    0.25
}

fn default_max_zoom() -> f32 {
    3.0
}

fn default_zoom_step() -> f32 {
    0.25
}

fn default_initial_zoom() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            min_zoom: default_min_zoom(),
            max_zoom: default_max_zoom(),
            zoom_step: default_zoom_step(),
            initial_zoom: default_initial_zoom(),
            remember_zoom: true,
            download_dir: None,
        }
    }
}

fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(CONFIG_FILENAME))
}

impl ViewerConfig {
    /// Load from the user config directory, defaulting when the file is
    /// missing or unreadable
    pub fn load() -> Self {
        let Some(path) = preferred_config_path() else {
            warn!("could not determine config directory, using defaults");
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(&path) {
            Ok(content) => match serde_yaml::from_str::<Self>(&content) {
                Ok(config) => {
                    debug!("loaded config from {path:?}");
                    config.normalized()
                }
                Err(e) => {
                    error!("failed to parse config file {path:?}: {e}");
                    Self::default()
                }
            },
            Err(e) => {
                error!("failed to read config file {path:?}: {e}");
                Self::default()
            }
        }
    }

    /// Repair inconsistent values instead of failing the load
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        if !self.min_zoom.is_finite() || self.min_zoom <= 0.0 {
            warn!("invalid min_zoom {}, using default", self.min_zoom);
            self.min_zoom = defaults.min_zoom;
        }
        if !self.max_zoom.is_finite() || self.max_zoom < self.min_zoom {
            warn!("invalid max_zoom {}, using default", self.max_zoom);
            self.max_zoom = defaults.max_zoom.max(self.min_zoom);
        }
        if !self.zoom_step.is_finite() || self.zoom_step <= 0.0 {
            warn!("invalid zoom_step {}, using default", self.zoom_step);
            self.zoom_step = defaults.zoom_step;
        }
        if !self.initial_zoom.is_finite() {
            self.initial_zoom = defaults.initial_zoom;
        }
        self.initial_zoom = self.initial_zoom.clamp(self.min_zoom, self.max_zoom);
        self
    }

    /// Zoom policy derived from the configured bounds
    pub fn zoom_policy(&self) -> ZoomPolicy {
        ZoomPolicy {
            min_factor: self.min_zoom,
            max_factor: self.max_zoom,
            step: self.zoom_step,
            initial: self.initial_zoom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_zoom_policy_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.zoom_policy(), ZoomPolicy::default());
        assert!(config.remember_zoom);
        assert!(config.download_dir.is_none());
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let config: ViewerConfig = serde_yaml::from_str("max_zoom: 4.0\n").unwrap();
        assert_eq!(config.max_zoom, 4.0);
        assert_eq!(config.min_zoom, 0.25);
        assert_eq!(config.zoom_step, 0.25);
        assert!(config.remember_zoom);
    }

    #[test]
    fn normalization_repairs_inverted_bounds() {
        let config = ViewerConfig {
            min_zoom: 2.0,
            max_zoom: 0.5,
            ..ViewerConfig::default()
        }
        .normalized();
        assert!(config.max_zoom >= config.min_zoom);
        assert!(config.initial_zoom >= config.min_zoom);
        assert!(config.initial_zoom <= config.max_zoom);
    }

    #[test]
    fn normalization_repairs_nonsense_step() {
        let config = ViewerConfig {
            zoom_step: -1.0,
            ..ViewerConfig::default()
        }
        .normalized();
        assert_eq!(config.zoom_step, 0.25);
    }

    #[test]
    fn config_round_trips_through_yaml() {
        let config = ViewerConfig {
            download_dir: Some(PathBuf::from("/tmp/docs")),
            ..ViewerConfig::default()
        };
        let text = serde_yaml::to_string(&config).unwrap();
        let back: ViewerConfig = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back.download_dir, config.download_dir);
        assert_eq!(back.max_zoom, config.max_zoom);
    }
}
