//! Simulation tuning loaded from JSON.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TumbleError};

/// Default distance between cell centres, in pixels.
pub const DEFAULT_SPACING: f32 = 68.0;

/// Physical and timing parameters of a simulation.
///
/// Every field has a default, so a partial JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Rendered part size in pixels. Shape polygons are scaled to this.
    pub part_size: f32,
    /// Distance between cell centres in pixels.
    pub spacing: f32,
    /// Gravity in pixels/s², +y is down.
    pub gravity: [f32; 2],
    /// Nominal ticks per second, used to convert animation durations.
    pub tick_rate: f32,
    pub ball_radius: f32,
    pub ball_density: f32,
    pub ball_friction: f32,
    pub counterweight_stiffness: f32,
    pub counterweight_damping: f32,
    pub bias_stiffness: f32,
    pub bias_damping: f32,
    /// Seconds a released part takes to return to its resting rotation.
    pub settle_duration: f32,
    pub wall_thickness: f32,
    /// Recycle released part bodies instead of destroying them.
    pub reuse_bodies: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            part_size: 64.0,
            spacing: DEFAULT_SPACING,
            gravity: [0.0, 981.0],
            tick_rate: 60.0,
            ball_radius: 14.0,
            ball_density: 1.5,
            ball_friction: 0.05,
            counterweight_stiffness: 400.0,
            counterweight_damping: 20.0,
            bias_stiffness: 120.0,
            bias_damping: 8.0,
            settle_duration: 0.25,
            wall_thickness: 32.0,
            reuse_bodies: false,
        }
    }
}

impl SimConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects values the physics setup cannot work with.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("part_size", self.part_size),
            ("spacing", self.spacing),
            ("tick_rate", self.tick_rate),
            ("ball_radius", self.ball_radius),
            ("ball_density", self.ball_density),
            ("wall_thickness", self.wall_thickness),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(TumbleError::InvalidConfig {
                    field,
                    reason: format!("must be positive, got {value}"),
                });
            }
        }
        if self.ball_radius * 2.0 >= self.spacing {
            return Err(TumbleError::InvalidConfig {
                field: "ball_radius",
                reason: format!("ball of radius {} does not fit a cell", self.ball_radius),
            });
        }
        Ok(())
    }
}
