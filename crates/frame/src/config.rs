use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;
use voxtrace_common::Extent;
use voxtrace_grid::{MAX_RESOLUTION, RESOLUTION_ALIGNMENT};

/// Errors from loading or validating a scene configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid scene config: {0}")]
    Invalid(String),
}

/// Initial camera pose and motion parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    /// Point the camera keeps facing while it moves.
    pub focus: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    /// Units per second per held movement key.
    pub move_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(50.0, 50.0, 1.0),
            focus: Vec3::ZERO,
            fov: 70.0,
            move_speed: 5.0,
        }
    }
}

/// Initial window geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "VoxelTracer".into(),
            width: 1280,
            height: 720,
        }
    }
}

impl WindowConfig {
    pub fn extent(&self) -> Extent {
        Extent::new(self.width, self.height)
    }
}

/// Everything fixed at scene setup.
///
/// Missing fields in a config file fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Side length of the cubic voxel volume.
    pub voxel_resolution: u32,
    /// Opaque selector forwarded to the kernel.
    pub render_mode: u32,
    pub camera: CameraConfig,
    pub window: WindowConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            voxel_resolution: 24,
            render_mode: 0,
            camera: CameraConfig::default(),
            window: WindowConfig::default(),
        }
    }
}

impl SceneConfig {
    /// Read and validate a JSON scene config.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let config: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;
        tracing::info!(path = %path.display(), "scene config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.voxel_resolution == 0 {
            return Err(ConfigError::Invalid("voxel_resolution must be positive".into()));
        }
        if self.voxel_resolution > MAX_RESOLUTION {
            return Err(ConfigError::Invalid(format!(
                "voxel_resolution {} exceeds the maximum of {MAX_RESOLUTION}",
                self.voxel_resolution
            )));
        }
        if self.voxel_resolution % RESOLUTION_ALIGNMENT != 0 {
            return Err(ConfigError::Invalid(format!(
                "voxel_resolution {} must be a multiple of {RESOLUTION_ALIGNMENT}",
                self.voxel_resolution
            )));
        }
        let fov = self.camera.fov;
        if !(fov.is_finite() && fov > 0.0 && fov < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "camera.fov must be within (0, 180) degrees, got {fov}"
            )));
        }
        if !(self.camera.move_speed.is_finite() && self.camera.move_speed >= 0.0) {
            return Err(ConfigError::Invalid(
                "camera.move_speed must be finite and non-negative".into(),
            ));
        }
        if self.camera.position == self.camera.focus {
            return Err(ConfigError::Invalid(
                "camera.position and camera.focus must differ".into(),
            ));
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid("window size must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_describe_placeholder_scene() {
        let config = SceneConfig::default();
        assert_eq!(config.voxel_resolution, 24);
        assert_eq!(config.render_mode, 0);
        assert_eq!(config.camera.position, Vec3::new(50.0, 50.0, 1.0));
        assert_eq!(config.camera.focus, Vec3::ZERO);
        assert_eq!(config.camera.fov, 70.0);
        assert_eq!(config.window.extent(), Extent::new(1280, 720));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "voxel_resolution": 32, "camera": {{ "fov": 90.0 }} }}"#
        )
        .unwrap();

        let config = SceneConfig::load(file.path()).unwrap();
        assert_eq!(config.voxel_resolution, 32);
        assert_eq!(config.camera.fov, 90.0);
        assert_eq!(config.camera.position, Vec3::new(50.0, 50.0, 1.0));
        assert_eq!(config.window, WindowConfig::default());
    }

    #[test]
    fn roundtrips_through_json() {
        let config = SceneConfig {
            render_mode: 2,
            ..SceneConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: SceneConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = SceneConfig::default();
        config.camera.fov = 180.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = SceneConfig::default();
        config.voxel_resolution = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = SceneConfig::default();
        config.camera.focus = config.camera.position;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = SceneConfig::default();
        config.window.height = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn resolution_must_pack_into_texels() {
        let mut config = SceneConfig::default();
        config.voxel_resolution = 20;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("multiple of 8"), "{err}");

        config.voxel_resolution = MAX_RESOLUTION + 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds the maximum"), "{err}");

        config.voxel_resolution = 1624;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_rejects_unaligned_resolution() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "voxel_resolution": 10 }}"#).unwrap();
        assert!(matches!(
            SceneConfig::load(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn load_reports_io_and_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(SceneConfig::load(&missing), Err(ConfigError::Io(_))));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(SceneConfig::load(&bad), Err(ConfigError::Json(_))));
    }
}
