//! Controller configuration components.
//!
//! This module defines the tuning for the platformer controller: speeds,
//! jump timing windows, the slope angle thresholds that classify surfaces,
//! the gravity model, query masks and how results are written back to physics.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::collision::CollisionMask;
use crate::error::ConfigError;

/// How the controller hands its result to the physics backend.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputMode {
    /// Set the body's velocity and translate it down by the wall-follow distance.
    #[default]
    Velocity,
    /// Move a kinematic body to `position + snap + velocity * dt`.
    Kinematic,
}

/// Which layers block standing up from a crouch.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CeilingMask {
    /// Reuse [`ControllerConfig::ground_mask`].
    SameAsGround,
    /// Use a dedicated mask for ceilings.
    Dedicated(CollisionMask),
}

impl Default for CeilingMask {
    fn default() -> Self {
        Self::SameAsGround
    }
}

/// Angle thresholds (degrees between a surface normal and up) used to
/// classify surfaces and to blend speed on slopes.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlopeAngles {
    /// Above this, running downhill speeds the character up.
    pub speed_up: f32,
    /// Above this, running uphill slows the character down.
    pub steep: f32,
    /// Above this, the surface cannot be stood on.
    pub slip: f32,
    /// Above this, the surface is a wall that allows wall jumps.
    pub wall: f32,
    /// Above this, the surface is a wall that does not allow wall jumps.
    pub no_jump_wall: f32,
    /// Above this, the surface is a ceiling.
    pub ceiling: f32,
}

impl Default for SlopeAngles {
    fn default() -> Self {
        Self {
            speed_up: 15.0,
            steep: 30.0,
            slip: 60.0,
            wall: 80.0,
            no_jump_wall: 100.0,
            ceiling: 135.0,
        }
    }
}

impl SlopeAngles {
    /// Minimum normal `y` component for a standable surface.
    #[inline]
    pub fn slip_cos(&self) -> f32 {
        self.slip.to_radians().cos()
    }

    /// Normal `y` component below which a slope counts as steep.
    #[inline]
    pub fn steep_cos(&self) -> f32 {
        self.steep.to_radians().cos()
    }

    /// Normal `y` component below which a slope speeds up descents.
    #[inline]
    pub fn speed_up_cos(&self) -> f32 {
        self.speed_up.to_radians().cos()
    }

    fn as_array(&self) -> [f32; 6] {
        [
            self.speed_up,
            self.steep,
            self.slip,
            self.wall,
            self.no_jump_wall,
            self.ceiling,
        ]
    }
}

/// Hand-tuned gravity model.
///
/// Gravity is not constant: falling characters fall faster, and releasing
/// jump early cuts the ascent short.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GravityConfig {
    /// Base gravity magnitude (units/second^2, applied downward).
    pub magnitude: f32,
    /// Multiplier while falling.
    pub fall_multiplier: f32,
    /// Multiplier while rising with jump released.
    pub low_jump_multiplier: f32,
    /// Multiplier while rising with jump held.
    pub hold_jump_fall_multiplier: f32,
}

impl Default for GravityConfig {
    fn default() -> Self {
        Self {
            magnitude: 9.81,
            fall_multiplier: 2.5,
            low_jump_multiplier: 5.0,
            hold_jump_fall_multiplier: 2.5,
        }
    }
}

impl GravityConfig {
    /// Vertical acceleration for the current state.
    pub fn acceleration(&self, grounded: bool, vertical_velocity: f32, jump_held: bool) -> f32 {
        if grounded {
            return 0.0;
        }

        let multiplier = if vertical_velocity < 0.0 {
            self.fall_multiplier
        } else if jump_held {
            self.hold_jump_fall_multiplier
        } else {
            self.low_jump_multiplier
        };

        -self.magnitude * multiplier
    }
}

/// Configuration parameters for the platformer controller.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct ControllerConfig {
    // === Movement Settings ===
    /// Base maximum horizontal speed (units/second).
    pub max_speed: f32,

    /// Vertical speed set when a jump is consumed.
    pub jump_speed: f32,

    /// Fraction of input applied while crouching (0.0-1.0).
    pub crouch_speed: f32,

    /// Whether horizontal input steers the character while airborne.
    pub air_control: bool,

    // === Jump Timing (fixed ticks) ===
    /// Ticks after leaving the ground during which a jump is still honored.
    pub airborne_grace_period: u32,

    /// Ticks a jump press is remembered before it is dropped.
    pub jump_buffer_reset: u32,

    // === Slope & Gravity ===
    /// Surface classification thresholds.
    pub angles: SlopeAngles,

    /// Gravity model.
    pub gravity: GravityConfig,

    // === Queries ===
    /// Layers that count as ground.
    pub ground_mask: CollisionMask,

    /// Layers that keep the character crouched.
    pub ceiling_mask: CeilingMask,

    /// How far below the collider the ground cast reaches.
    pub ground_cast_distance: f32,

    /// Maximum number of ground-cast hits considered per tick.
    pub max_ground_hits: usize,

    /// Hits reporting a distance at or below `-degenerate_contact_epsilon`
    /// are treated as degenerate overlaps and ignored.
    pub degenerate_contact_epsilon: f32,

    /// Wall-follow distances below this are snapped to zero.
    pub wall_follow_snap: f32,

    // === Output ===
    /// How velocity and the ground snap are written back to physics.
    pub output_mode: OutputMode,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Movement settings
            max_speed: 10.0,
            jump_speed: 20.0,
            crouch_speed: 0.36,
            air_control: false,

            // Jump timing
            airborne_grace_period: 4,
            jump_buffer_reset: 4,

            // Slope & gravity
            angles: SlopeAngles::default(),
            gravity: GravityConfig::default(),

            // Queries
            ground_mask: CollisionMask::ALL,
            ceiling_mask: CeilingMask::default(),
            ground_cast_distance: 0.5,
            max_ground_hits: 16,
            degenerate_contact_epsilon: 0.1,
            wall_follow_snap: 0.015,

            output_mode: OutputMode::Velocity,
        }
    }
}

impl ControllerConfig {
    /// Create a config with the standard tuning.
    pub fn player() -> Self {
        Self::default()
    }

    /// Create a snappier config with air control and wider timing windows.
    pub fn arcade() -> Self {
        Self {
            max_speed: 12.0,
            jump_speed: 18.0,
            air_control: true,
            airborne_grace_period: 6,
            jump_buffer_reset: 6,
            gravity: GravityConfig {
                fall_multiplier: 3.0,
                ..default()
            },
            ..default()
        }
    }

    /// The mask used by the crouch probe.
    pub fn resolved_ceiling_mask(&self) -> CollisionMask {
        match self.ceiling_mask {
            CeilingMask::SameAsGround => self.ground_mask,
            CeilingMask::Dedicated(mask) => mask,
        }
    }

    /// Check the configuration for values the controller cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("max_speed", self.max_speed),
            ("jump_speed", self.jump_speed),
            ("degenerate_contact_epsilon", self.degenerate_contact_epsilon),
            ("wall_follow_snap", self.wall_follow_snap),
            ("gravity.fall_multiplier", self.gravity.fall_multiplier),
            ("gravity.low_jump_multiplier", self.gravity.low_jump_multiplier),
            (
                "gravity.hold_jump_fall_multiplier",
                self.gravity.hold_jump_fall_multiplier,
            ),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Negative { field, value });
            }
        }

        for (field, value) in [
            ("gravity.magnitude", self.gravity.magnitude),
            ("ground_cast_distance", self.ground_cast_distance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }

        if !(0.0..=1.0).contains(&self.crouch_speed) {
            return Err(ConfigError::CrouchSpeedOutOfRange(self.crouch_speed));
        }

        let angles = self.angles.as_array();
        let ordered = angles.windows(2).all(|pair| pair[0] <= pair[1])
            && self.angles.steep < self.angles.slip
            && angles[0] >= 0.0
            && angles[5] <= 180.0;
        if !ordered {
            return Err(ConfigError::UnorderedAngles(angles));
        }

        if self.max_ground_hits == 0 {
            return Err(ConfigError::ZeroHitCap);
        }

        Ok(())
    }

    /// Parse a config from RON. Missing fields take their default values.
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::Options::default()
            .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
            .from_str(source)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Builder: set max speed.
    pub fn with_max_speed(mut self, max_speed: f32) -> Self {
        self.max_speed = max_speed;
        self
    }

    /// Builder: set jump speed.
    pub fn with_jump_speed(mut self, speed: f32) -> Self {
        self.jump_speed = speed;
        self
    }

    /// Builder: set crouch speed factor.
    pub fn with_crouch_speed(mut self, factor: f32) -> Self {
        self.crouch_speed = factor;
        self
    }

    /// Builder: enable or disable air control.
    pub fn with_air_control(mut self, enabled: bool) -> Self {
        self.air_control = enabled;
        self
    }

    /// Builder: set the coyote window in ticks.
    pub fn with_airborne_grace_period(mut self, ticks: u32) -> Self {
        self.airborne_grace_period = ticks;
        self
    }

    /// Builder: set the jump buffer window in ticks.
    pub fn with_jump_buffer_reset(mut self, ticks: u32) -> Self {
        self.jump_buffer_reset = ticks;
        self
    }

    /// Builder: set slope angle thresholds.
    pub fn with_angles(mut self, angles: SlopeAngles) -> Self {
        self.angles = angles;
        self
    }

    /// Builder: set the gravity model.
    pub fn with_gravity(mut self, gravity: GravityConfig) -> Self {
        self.gravity = gravity;
        self
    }

    /// Builder: set the ground mask.
    pub fn with_ground_mask(mut self, mask: CollisionMask) -> Self {
        self.ground_mask = mask;
        self
    }

    /// Builder: set the ceiling mask.
    pub fn with_ceiling_mask(mut self, mask: CeilingMask) -> Self {
        self.ceiling_mask = mask;
        self
    }

    /// Builder: set the output mode.
    pub fn with_output_mode(mut self, mode: OutputMode) -> Self {
        self.output_mode = mode;
        self
    }
}
