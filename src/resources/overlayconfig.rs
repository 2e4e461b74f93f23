//! Overlay configuration resource.
//!
//! Manages overlay settings loaded from an INI configuration file. Provides
//! defaults for safe startup and methods to load/save configuration.
//!
//! # Configuration File Format
//!
//! ```ini
//! [radiation]
//! max_distance = 15.0
//! distortion = true
//! distortion_size_div = 4.0
//!
//! [salvage_beam]
//! width = 1.0
//!
//! [viewport]
//! width = 1280
//! height = 720
//! pixels_per_unit = 32.0
//!
//! [shaders]
//! manifest = ./assets/shaders/shaders.json
//! ```

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::info;
use std::fmt;
use std::path::PathBuf;

/// Default safe values for startup
const DEFAULT_RADIATION_MAX_DISTANCE: f32 = 15.0;
const DEFAULT_DISTORTION: bool = true;
const DEFAULT_DISTORTION_SIZE_DIV: f32 = 4.0;
const DEFAULT_BEAM_WIDTH: f32 = 1.0;
const DEFAULT_VIEWPORT_WIDTH: u32 = 1280;
const DEFAULT_VIEWPORT_HEIGHT: u32 = 720;
const DEFAULT_PIXELS_PER_UNIT: f32 = 32.0;
const DEFAULT_CONFIG_PATH: &str = "./config.ini";

/// Error raised while loading or saving the configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The file could not be read or written.
    Io(String),
    /// The file is not valid INI.
    Parse(String),
    /// A key holds a value of the wrong type.
    Value {
        section: &'static str,
        key: &'static str,
        details: String,
    },
    /// A key holds a value outside its allowed range.
    Invalid {
        section: &'static str,
        key: &'static str,
        reason: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(details) => write!(f, "Config I/O error: {details}"),
            ConfigError::Parse(details) => write!(f, "Failed to parse config: {details}"),
            ConfigError::Value {
                section,
                key,
                details,
            } => write!(f, "Bad value for [{section}] {key}: {details}"),
            ConfigError::Invalid {
                section,
                key,
                reason,
            } => write!(f, "Invalid [{section}] {key}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Overlay configuration resource.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct OverlayConfig {
    /// Largest eye distance at which radiation pulses are drawn (inclusive).
    pub radiation_max_distance: f32,
    /// Whether pulses also render into the distortion map.
    pub distortion: bool,
    /// Scale factor between the viewport and the distortion map.
    pub distortion_size_div: f32,
    /// Thickness of salvage beams in world units.
    pub beam_width: f32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub pixels_per_unit: f32,
    /// Shader manifest to load prototypes from. `None` uses the built-in shaders.
    pub shader_manifest: Option<PathBuf>,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        Self {
            radiation_max_distance: DEFAULT_RADIATION_MAX_DISTANCE,
            distortion: DEFAULT_DISTORTION,
            distortion_size_div: DEFAULT_DISTORTION_SIZE_DIV,
            beam_width: DEFAULT_BEAM_WIDTH,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            pixels_per_unit: DEFAULT_PIXELS_PER_UNIT,
            shader_manifest: None,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current (default) values.
    pub fn load_from_file(&mut self) -> Result<(), ConfigError> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", self.config_path.display(), e)))?;
        self.apply(&config)?;
        info!("Loaded config from {:?}", self.config_path);
        Ok(())
    }

    /// Load configuration from INI text.
    pub fn load_from_str(&mut self, text: &str) -> Result<(), ConfigError> {
        let mut config = Ini::new();
        config.read(text.to_string()).map_err(ConfigError::Parse)?;
        self.apply(&config)
    }

    fn apply(&mut self, config: &Ini) -> Result<(), ConfigError> {
        // Work on a copy so a bad value leaves the current settings untouched.
        let mut next = self.clone();

        // [radiation] section
        if let Some(dist) = float(config, "radiation", "max_distance")? {
            next.radiation_max_distance = dist;
        }
        if let Some(distortion) = boolean(config, "radiation", "distortion")? {
            next.distortion = distortion;
        }
        if let Some(div) = float(config, "radiation", "distortion_size_div")? {
            next.distortion_size_div = div;
        }

        // [salvage_beam] section
        if let Some(width) = float(config, "salvage_beam", "width")? {
            next.beam_width = width;
        }

        // [viewport] section
        if let Some(width) = uint(config, "viewport", "width")? {
            next.viewport_width = width;
        }
        if let Some(height) = uint(config, "viewport", "height")? {
            next.viewport_height = height;
        }
        if let Some(ppu) = float(config, "viewport", "pixels_per_unit")? {
            next.pixels_per_unit = ppu;
        }

        // [shaders] section
        if let Some(manifest) = config.get("shaders", "manifest") {
            next.shader_manifest = Some(PathBuf::from(manifest));
        }

        next.validate()?;
        *self = next;

        info!(
            "Overlay config: max_distance={}, distortion={} (div {}), beam_width={}, viewport {}x{} @ {} px/unit",
            self.radiation_max_distance,
            self.distortion,
            self.distortion_size_div,
            self.beam_width,
            self.viewport_width,
            self.viewport_height,
            self.pixels_per_unit
        );
        Ok(())
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("radiation", "max_distance", self.radiation_max_distance),
            ("radiation", "distortion_size_div", self.distortion_size_div),
            ("salvage_beam", "width", self.beam_width),
            ("viewport", "pixels_per_unit", self.pixels_per_unit),
        ];
        for (section, key, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid {
                    section,
                    key,
                    reason: "must be a positive number",
                });
            }
        }
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(ConfigError::Invalid {
                section: "viewport",
                key: if self.viewport_width == 0 { "width" } else { "height" },
                reason: "must be non-zero",
            });
        }
        Ok(())
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<(), ConfigError> {
        let mut config = Ini::new();

        // [radiation] section
        config.set("radiation", "max_distance", Some(self.radiation_max_distance.to_string()));
        config.set("radiation", "distortion", Some(self.distortion.to_string()));
        config.set(
            "radiation",
            "distortion_size_div",
            Some(self.distortion_size_div.to_string()),
        );

        // [salvage_beam] section
        config.set("salvage_beam", "width", Some(self.beam_width.to_string()));

        // [viewport] section
        config.set("viewport", "width", Some(self.viewport_width.to_string()));
        config.set("viewport", "height", Some(self.viewport_height.to_string()));
        config.set("viewport", "pixels_per_unit", Some(self.pixels_per_unit.to_string()));

        if let Some(manifest) = &self.shader_manifest {
            config.set("shaders", "manifest", Some(manifest.display().to_string()));
        }

        config
            .write(&self.config_path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", self.config_path.display(), e)))?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }
}

fn float(config: &Ini, section: &'static str, key: &'static str) -> Result<Option<f32>, ConfigError> {
    config
        .getfloat(section, key)
        .map(|v| v.map(|f| f as f32))
        .map_err(|details| ConfigError::Value {
            section,
            key,
            details,
        })
}

fn uint(config: &Ini, section: &'static str, key: &'static str) -> Result<Option<u32>, ConfigError> {
    config
        .getuint(section, key)
        .map_err(|details| ConfigError::Value {
            section,
            key,
            details,
        })?
        .map(|v| {
            u32::try_from(v).map_err(|_| ConfigError::Invalid {
                section,
                key,
                reason: "out of range",
            })
        })
        .transpose()
}

fn boolean(config: &Ini, section: &'static str, key: &'static str) -> Result<Option<bool>, ConfigError> {
    config
        .getbool(section, key)
        .map_err(|details| ConfigError::Value {
            section,
            key,
            details,
        })
}
