//! Tunable constants for the scene. Every number the gameplay systems depend on lives in
//! `GameTuning`, so designers can tweak feel without recompiling.
//!
//! Native builds read `assets/config/tuning.json` once at startup. Each section is
//! `#[serde(default)]`, so a file only needs the values it overrides. The browser build has no
//! filesystem access and runs on the compiled-in defaults.

use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TUNING_PATH: &str = "assets/config/tuning.json";

/// Inserts `GameTuning` before any other plugin reads it.
pub struct TuningPlugin;

impl Plugin for TuningPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(GameTuning::load_or_default(TUNING_PATH));
    }
}

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse tuning file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid tuning value: {0}")]
    Invalid(String),
}

#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameTuning {
    pub movement: MovementTuning,
    pub input: InputTuning,
    pub zones: ZoneTuning,
    pub parallax: ParallaxTuning,
    pub minimap: MinimapTuning,
    pub audio: AudioTuning,
    pub deep_link: DeepLinkTuning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementTuning {
    pub run_speed: f32,
    pub gravity: f32,
    pub terminal_velocity: f32,
    pub jump_velocity: f32,
    pub double_jump_velocity: f32,
    pub double_jump_boost: f32,
    /// Tallest ledge the character climbs without jumping. Ramp steps must stay below it.
    pub max_step_height: f32,
}

impl Default for MovementTuning {
    fn default() -> Self {
        Self {
            run_speed: 200.0,
            gravity: 600.0,
            terminal_velocity: 900.0,
            jump_velocity: 300.0,
            double_jump_velocity: 200.0,
            double_jump_boost: 250.0,
            max_step_height: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputTuning {
    pub joystick_radius: f32,
    /// Fraction of the joystick radius treated as zero.
    pub joystick_dead_zone: f32,
    pub jump_button_radius: f32,
    pub jump_cooldown_ms: u64,
    /// Distance from the bottom-left / bottom-right viewport corners to the control centers.
    pub control_inset: f32,
}

impl Default for InputTuning {
    fn default() -> Self {
        Self {
            joystick_radius: 50.0,
            joystick_dead_zone: 0.1,
            jump_button_radius: 40.0,
            jump_cooldown_ms: 200,
            control_inset: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneTuning {
    pub threshold: f32,
    pub prompt_height: f32,
}

impl Default for ZoneTuning {
    fn default() -> Self {
        Self {
            threshold: 150.0,
            prompt_height: 96.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallaxTuning {
    pub tile_width: f32,
    /// Back-to-front scroll factors, one per background layer.
    pub speeds: Vec<f32>,
}

impl Default for ParallaxTuning {
    fn default() -> Self {
        Self {
            tile_width: 1280.0,
            speeds: vec![0.1, 0.3, 0.6],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimapTuning {
    pub scale: f32,
    pub start_left: f32,
    pub start_top: f32,
}

impl Default for MinimapTuning {
    fn default() -> Self {
        Self {
            scale: 0.08,
            start_left: 16.0,
            start_top: 16.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioTuning {
    pub music_volume: f32,
    pub retry_delay_secs: f32,
}

impl Default for AudioTuning {
    fn default() -> Self {
        Self {
            music_volume: 0.5,
            retry_delay_secs: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeepLinkTuning {
    pub delay_secs: f32,
}

impl Default for DeepLinkTuning {
    fn default() -> Self {
        Self { delay_secs: 1.0 }
    }
}

impl GameTuning {
    pub fn from_json(path: &str, text: &str) -> Result<Self, TuningError> {
        let tuning: GameTuning = serde_json::from_str(text).map_err(|source| TuningError::Parse {
            path: path.to_owned(),
            source,
        })?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| TuningError::Io {
            path: display.clone(),
            source,
        })?;
        Self::from_json(&display, &text)
    }

    /// Loads the tuning file, logging and falling back to defaults on any failure.
    pub fn load_or_default(path: &str) -> Self {
        if cfg!(target_arch = "wasm32") {
            return Self::default();
        }

        match Self::load(path) {
            Ok(tuning) => {
                info!("Loaded tuning from '{}'.", path);
                tuning
            }
            Err(TuningError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                info!("No tuning file at '{}'; using defaults.", path);
                Self::default()
            }
            Err(err) => {
                warn!("{err}; using default tuning.");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        if self.zones.threshold <= 0.0 {
            return Err(TuningError::Invalid(
                "zones.threshold must be positive".to_owned(),
            ));
        }
        if self.input.joystick_radius <= 0.0 || self.input.jump_button_radius <= 0.0 {
            return Err(TuningError::Invalid(
                "joystick and jump button radii must be positive".to_owned(),
            ));
        }
        if !(0.0..1.0).contains(&self.input.joystick_dead_zone) {
            return Err(TuningError::Invalid(
                "input.joystick_dead_zone must be in [0, 1)".to_owned(),
            ));
        }
        if self.parallax.tile_width <= 0.0 {
            return Err(TuningError::Invalid(
                "parallax.tile_width must be positive".to_owned(),
            ));
        }
        if self.minimap.scale <= 0.0 {
            return Err(TuningError::Invalid(
                "minimap.scale must be positive".to_owned(),
            ));
        }
        non_negative("movement.gravity", self.movement.gravity)?;
        non_negative("movement.terminal_velocity", self.movement.terminal_velocity)?;
        non_negative("movement.max_step_height", self.movement.max_step_height)?;
        // Both end up in `Duration::from_secs_f32`, which panics on negative or NaN input.
        non_negative("audio.retry_delay_secs", self.audio.retry_delay_secs)?;
        non_negative("deep_link.delay_secs", self.deep_link.delay_secs)?;
        Ok(())
    }
}

fn non_negative(field: &str, value: f32) -> Result<(), TuningError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(TuningError::Invalid(format!(
            "{field} must be a finite, non-negative number (got {value})"
        )))
    }
}
