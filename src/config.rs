//! Runtime configuration.
//!
//! All scene constants live in [`Config`]. There is no command line surface;
//! [`Config::from_env`] only lets the asset root and the frame cap be moved
//! without recompiling.

use std::path::PathBuf;

/// Environment variable overriding [`Config::asset_root`].
pub const ASSETS_ENV: &str = "SHADOWBOX_ASSETS";
/// Environment variable overriding [`Config::target_fps`].
pub const FPS_ENV: &str = "SHADOWBOX_FPS";
/// Copy of `assets/` made by the build script, used when `./assets` is missing.
pub const BUILD_ASSETS: &str = concat!(env!("OUT_DIR"), "/assets");

#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub yaw_deg: f32,
    pub pitch_deg: f32,
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    /// World units per second.
    pub speed: f32,
    /// Degrees per pixel of mouse motion.
    pub sensitivity: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LightConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub colour: [f32; 3],
    /// Half width/height of the orthographic shadow frustum.
    pub shadow_half_extent: f32,
    pub shadow_near: f32,
    pub shadow_far: f32,
    pub shadow_map_size: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub title: String,
    pub window_size: [u32; 2],
    pub target_fps: u32,
    pub asset_root: PathBuf,
    pub clear_colour: [f64; 3],
    pub camera: CameraConfig,
    pub light: LightConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "shadowbox".to_string(),
            window_size: [1600, 900],
            target_fps: 60,
            asset_root: PathBuf::from("./assets"),
            clear_colour: [0.08, 0.16, 0.18],
            camera: CameraConfig {
                position: [0.0, 4.0, 14.0],
                yaw_deg: -90.0,
                pitch_deg: -15.0,
                fov_deg: 50.0,
                near: 0.1,
                far: 100.0,
                speed: 8.0,
                sensitivity: 0.08,
            },
            light: LightConfig {
                position: [20.0, 30.0, -20.0],
                target: [0.0, 0.0, 0.0],
                colour: [1.0, 1.0, 1.0],
                shadow_half_extent: 45.0,
                shadow_near: 1.0,
                shadow_far: 120.0,
                shadow_map_size: 2048,
            },
        }
    }
}

impl Config {
    /// Defaults with overrides read from the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if !config.asset_root.is_dir() {
            config.asset_root = PathBuf::from(BUILD_ASSETS);
        }
        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup. Invalid values are
    /// logged and ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(root) = lookup(ASSETS_ENV) {
            if root.trim().is_empty() {
                log::warn!("{ASSETS_ENV} is set but empty, keeping {:?}", self.asset_root);
            } else {
                self.asset_root = PathBuf::from(root);
            }
        }
        if let Some(fps) = lookup(FPS_ENV) {
            match fps.trim().parse::<u32>() {
                Ok(fps) if fps > 0 => self.target_fps = fps,
                _ => log::warn!(
                    "ignoring {FPS_ENV}={fps:?}, keeping {} frames per second",
                    self.target_fps
                ),
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_asset_root_and_fps() {
        let config = Config::default().with_overrides(|key| match key {
            ASSETS_ENV => Some("/tmp/assets".to_string()),
            FPS_ENV => Some("30".to_string()),
            _ => None,
        });
        assert_eq!(config.asset_root, PathBuf::from("/tmp/assets"));
        assert_eq!(config.target_fps, 30);
    }

    #[test]
    fn build_copy_holds_the_shaders() {
        let shader = PathBuf::from(BUILD_ASSETS).join("shaders/default.vert");
        assert!(shader.is_file(), "{}", shader.display());
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let config = Config::default().with_overrides(|key| match key {
            ASSETS_ENV => Some("  ".to_string()),
            FPS_ENV => Some("0".to_string()),
            _ => None,
        });
        assert_eq!(config, Config::default());
    }
}
