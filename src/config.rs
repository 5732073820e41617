//! Engine configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! canvas_scale = 0.8
//! field_of_view_degrees = 45.0
//! poll_interval_ms = 3
//! asset_root = "assets"
//! ```

use std::{path::{Path, PathBuf}, time::Duration};

use serde::Deserialize;

use crate::{camera::Projection, error::ConfigError};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Fraction of the narrower viewport side used for the square drawable.
    pub canvas_scale: f32,
    pub field_of_view_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
    /// Recheck interval while shaders load.
    pub poll_interval_ms: u64,
    /// Abort loading when shaders are still pending after this long. Off when unset.
    pub shader_load_timeout_ms: Option<u64>,
    pub asset_root: PathBuf,
    pub window_width: u32,
    pub window_height: u32,
    pub log_filter: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            canvas_scale: 0.8,
            field_of_view_degrees: 45.0,
            z_near: 0.5,
            z_far: 100.0,
            poll_interval_ms: 3,
            shader_load_timeout_ms: None,
            asset_root: PathBuf::from("assets"),
            window_width: 1024,
            window_height: 768,
            log_filter: None,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn shader_load_timeout(&self) -> Option<Duration> {
        self.shader_load_timeout_ms.map(Duration::from_millis)
    }

    pub fn projection(&self) -> Projection {
        Projection::new(
            cgmath::Deg(self.field_of_view_degrees),
            self.z_near,
            self.z_far,
        )
    }

    /// `asset_root` if it exists, otherwise the copy bundled at build time.
    pub fn resolved_asset_root(&self) -> PathBuf {
        if self.asset_root.is_dir() {
            self.asset_root.clone()
        } else {
            PathBuf::from(env!("SCENE_NGIN_BUNDLED_ASSETS"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.poll_interval(), Duration::from_millis(3));
        assert_eq!(config.shader_load_timeout(), None);
    }

    #[test]
    fn partial_document_overrides_fields() {
        let config = EngineConfig::from_toml_str(
            "canvas_scale = 0.5\nshader_load_timeout_ms = 2000\nasset_root = \"/srv/assets\"",
        )
        .unwrap();
        assert_eq!(config.canvas_scale, 0.5);
        assert_eq!(config.shader_load_timeout(), Some(Duration::from_secs(2)));
        assert_eq!(config.asset_root, PathBuf::from("/srv/assets"));
        assert_eq!(config.z_far, 100.0);
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(EngineConfig::from_toml_str("canvas_scael = 0.5").is_err());
    }
}
