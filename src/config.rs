//! Settings for the rig: axis limits, homing back-off and the position file
//! location. Pulse timing belongs to the `ActuationDriver` implementation,
//! not to this layer.
//!
//! Layered the usual way: hard defaults (matching the physical rig the
//! software ships on), then an optional TOML file, then `BLOCKLAB_*`
//! environment variables. `BLOCKLAB_POSITION_FILE=/tmp/pos.json` overrides
//! `position_file`, nested keys use `__` (`BLOCKLAB_AXES__Z__BACKOFF_STEPS`).

use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Per-axis physical constants.
#[derive(Debug, Clone, Deserialize)]
pub struct AxisSettings {
    /// Lowest reachable position (inclusive).
    pub min: i64,
    /// Highest reachable position (inclusive).
    pub max: i64,
    /// Wiring-dependent direction inversion.
    pub invert_dir: bool,
    /// Steps to back off after the endstop trips during homing.
    pub backoff_steps: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AxesSettings {
    pub x: AxisSettings,
    pub y: AxisSettings,
    pub z: AxisSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Durable record of the absolute axis positions.
    pub position_file: PathBuf,
    pub axes: AxesSettings,
}

impl Settings {
    /// Load settings from defaults, an optional TOML file and the
    /// environment.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("position_file", "position.json")?
            .set_default("axes.x.min", -80_000)?
            .set_default("axes.x.max", 0)?
            .set_default("axes.x.invert_dir", false)?
            .set_default("axes.x.backoff_steps", 800)?
            .set_default("axes.y.min", -800_000)?
            .set_default("axes.y.max", 0)?
            .set_default("axes.y.invert_dir", true)?
            .set_default("axes.y.backoff_steps", 800)?
            .set_default("axes.z.min", -100_000)?
            .set_default("axes.z.max", 0)?
            .set_default("axes.z.invert_dir", false)?
            .set_default("axes.z.backoff_steps", 30_000)?;

        builder = match config_path {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name("blocklab").required(false)),
        };

        builder
            .add_source(Environment::with_prefix("BLOCKLAB").separator("__"))
            .build()?
            .try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            position_file: PathBuf::from("position.json"),
            axes: AxesSettings {
                x: AxisSettings {
                    min: -80_000,
                    max: 0,
                    invert_dir: false,
                    backoff_steps: 800,
                },
                y: AxisSettings {
                    min: -800_000,
                    max: 0,
                    invert_dir: true,
                    backoff_steps: 800,
                },
                z: AxisSettings {
                    min: -100_000,
                    max: 0,
                    invert_dir: false,
                    backoff_steps: 30_000,
                },
            },
        }
    }
}
