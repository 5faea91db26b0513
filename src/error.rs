//! Configuration errors.
//!
//! The per-tick controller logic has no error path: missing ground is simply
//! "airborne" and stale jump requests are dropped. The only fallible surface
//! is configuration, which hosts validate before spawning a character.

/// Reasons a [`ControllerConfig`](crate::config::ControllerConfig) is rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be a finite, non-negative number (got {value})")]
    Negative { field: &'static str, value: f32 },

    #[error("{field} must be greater than zero (got {value})")]
    NotPositive { field: &'static str, value: f32 },

    #[error("crouch_speed must lie in [0, 1] (got {0})")]
    CrouchSpeedOutOfRange(f32),

    #[error("slope angles must satisfy speed_up <= steep < slip <= wall <= no_jump_wall <= ceiling <= 180 (got {0:?})")]
    UnorderedAngles([f32; 6]),

    #[error("max_ground_hits must be at least 1")]
    ZeroHitCap,

    #[error("failed to parse controller config: {0}")]
    Parse(String),
}
