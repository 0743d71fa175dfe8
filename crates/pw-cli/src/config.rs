//! Configuration loading and management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use pw_core::{Capabilities, ControllerConfig, DetectionConfig, SessionConfig};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Step delta between two pedometer samples that suggests walking.
    pub step_threshold: u64,
    /// Acceleration magnitude that suggests walking.
    pub acceleration_threshold: f64,
    pub motion_sample_interval_secs: u64,
    /// Location jitter ignored by the distance counter, in metres.
    pub distance_noise_floor_m: f64,
    pub tick_interval_secs: u64,
    pub background_restart_delay_secs: u64,
    /// Simulated device capabilities.
    pub step_counting_available: bool,
    pub motion_available: bool,
    /// Whether the user granted notification permission.
    pub notifications_authorized: bool,
    /// Send diagnostic action logs over HTTP.
    pub diagnostics_enabled: bool,
    pub diagnostics_endpoint: String,
}

impl Default for Config {
    fn default() -> Self {
        let controller = ControllerConfig::default();
        Self {
            step_threshold: controller.detection.step_threshold,
            acceleration_threshold: controller.detection.acceleration_threshold,
            motion_sample_interval_secs: controller.motion_sample_interval.as_secs(),
            distance_noise_floor_m: controller.session.distance_noise_floor_m,
            tick_interval_secs: controller.tick_interval.as_secs(),
            background_restart_delay_secs: controller.background_restart_delay.as_secs(),
            step_counting_available: true,
            motion_available: true,
            notifications_authorized: true,
            diagnostics_enabled: false,
            diagnostics_endpoint: pw_diag::DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (PW_*)
        figment = figment.merge(Env::prefixed("PW_"));

        figment.extract()
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            detection: DetectionConfig {
                step_threshold: self.step_threshold,
                acceleration_threshold: self.acceleration_threshold,
            },
            session: SessionConfig {
                distance_noise_floor_m: self.distance_noise_floor_m,
            },
            motion_sample_interval: Duration::from_secs(self.motion_sample_interval_secs.max(1)),
            tick_interval: Duration::from_secs(self.tick_interval_secs.max(1)),
            background_restart_delay: Duration::from_secs(self.background_restart_delay_secs),
        }
    }

    pub const fn capabilities(&self) -> Capabilities {
        Capabilities {
            step_counting: self.step_counting_available,
            motion: self.motion_available,
        }
    }
}

/// Returns the platform-specific config directory for plastiwatch.
///
/// On Linux: `~/.config/plastiwatch`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("plastiwatch"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_config_path_ends_with_plastiwatch() {
        let path = dirs_config_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "plastiwatch");
    }

    #[test]
    fn test_default_config_matches_controller_defaults() {
        let config = Config::default();
        assert_eq!(config.step_threshold, 10);
        assert!((config.acceleration_threshold - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.motion_sample_interval_secs, 30);
        assert!((config.distance_noise_floor_m - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.tick_interval_secs, 1);
        assert!(!config.diagnostics_enabled);
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "step_threshold = 25\nmotion_available = false\ndistance_noise_floor_m = 2.5\n",
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert_eq!(config.step_threshold, 25);
        assert!(!config.motion_available);
        assert!(config.step_counting_available);

        let controller = config.controller_config();
        assert_eq!(controller.detection.step_threshold, 25);
        assert!((controller.session.distance_noise_floor_m - 2.5).abs() < f64::EPSILON);
        assert!(!config.capabilities().motion);
    }

    #[test]
    fn test_zero_intervals_are_clamped() {
        let config = Config {
            tick_interval_secs: 0,
            motion_sample_interval_secs: 0,
            ..Config::default()
        };
        let controller = config.controller_config();
        assert_eq!(controller.tick_interval, Duration::from_secs(1));
        assert_eq!(controller.motion_sample_interval, Duration::from_secs(1));
    }
}
