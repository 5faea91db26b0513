//! Character state and state marker components.
//!
//! [`CharacterState`] is the data the controller mutates once per fixed tick.
//! The marker components mirror it for ECS queries and are added/removed
//! automatically by the controller systems.

use bevy::prelude::*;

/// What the character is doing while on the ground.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroundedMotion {
    #[default]
    Idle,
    Run,
}

/// What the character is doing while in the air.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AerialMotion {
    /// Not airborne (or not steering while airborne).
    #[default]
    None,
    /// Moving upward.
    Rising,
    /// Moving downward.
    Falling,
}

/// A wall touched by the ground probe.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct WallContact {
    /// Outward normal of the wall.
    pub normal: Vec2,
    /// Whether the wall is steep enough to allow wall jumps.
    pub jumpable: bool,
}

/// Per-character movement state.
///
/// Owned by exactly one [`CharacterController`](crate::controller::CharacterController)
/// and only written by its tick.
#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct CharacterState {
    pub(crate) velocity: Vec2,
    pub(crate) grounded: bool,
    pub(crate) ground_angle: f32,
    pub(crate) wall_follow_distance: f32,
    pub(crate) facing_right: bool,
    pub(crate) airborne_frames: u32,
    pub(crate) jump_buffered: bool,
    pub(crate) jump_buffer_frames: u32,
    pub(crate) max_speed_current: f32,
    pub(crate) crouching: bool,
    pub(crate) grounded_motion: GroundedMotion,
    pub(crate) aerial_motion: AerialMotion,
    pub(crate) wall_contact: Option<WallContact>,
    pub(crate) touching_ceiling: bool,
}

impl Default for CharacterState {
    fn default() -> Self {
        Self {
            velocity: Vec2::ZERO,
            grounded: false,
            ground_angle: 0.0,
            wall_follow_distance: 0.0,
            facing_right: true,
            airborne_frames: 0,
            jump_buffered: false,
            jump_buffer_frames: 0,
            max_speed_current: 0.0,
            crouching: false,
            grounded_motion: GroundedMotion::Idle,
            aerial_motion: AerialMotion::None,
            wall_contact: None,
            touching_ceiling: false,
        }
    }
}

impl CharacterState {
    /// Create a state with the given base max speed.
    pub fn new(max_speed: f32) -> Self {
        Self {
            max_speed_current: max_speed,
            ..default()
        }
    }

    /// Current velocity.
    #[inline]
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Whether the last ground evaluation accepted at least one contact.
    #[inline]
    pub fn grounded(&self) -> bool {
        self.grounded
    }

    /// Slope of the averaged ground normal, in radians (0 = flat, positive = uphill to the right).
    #[inline]
    pub fn ground_angle(&self) -> f32 {
        self.ground_angle
    }

    /// Downward correction that keeps the character on the detected surface.
    #[inline]
    pub fn wall_follow_distance(&self) -> f32 {
        self.wall_follow_distance
    }

    #[inline]
    pub fn facing_right(&self) -> bool {
        self.facing_right
    }

    /// Consecutive ticks spent ungrounded.
    #[inline]
    pub fn airborne_frames(&self) -> u32 {
        self.airborne_frames
    }

    /// Whether a jump request is waiting to be consumed.
    #[inline]
    pub fn jump_buffered(&self) -> bool {
        self.jump_buffered
    }

    /// Ticks the pending jump request has waited.
    #[inline]
    pub fn jump_buffer_frames(&self) -> u32 {
        self.jump_buffer_frames
    }

    /// Max speed after slope adjustment.
    #[inline]
    pub fn max_speed_current(&self) -> f32 {
        self.max_speed_current
    }

    #[inline]
    pub fn crouching(&self) -> bool {
        self.crouching
    }

    #[inline]
    pub fn grounded_motion(&self) -> GroundedMotion {
        self.grounded_motion
    }

    #[inline]
    pub fn aerial_motion(&self) -> AerialMotion {
        self.aerial_motion
    }

    /// Wall touched by the ground probe this tick, if any.
    #[inline]
    pub fn wall_contact(&self) -> Option<WallContact> {
        self.wall_contact
    }

    #[inline]
    pub fn touching_ceiling(&self) -> bool {
        self.touching_ceiling
    }
}

/// Marker component indicating the character is grounded.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use slope_platformer_controller::prelude::*;
///
/// // Grounded is a marker component - just use it in queries
/// fn check_grounded(grounded: Option<&Grounded>) -> bool {
///     grounded.is_some()
/// }
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the character is airborne.
///
/// Mutually exclusive with [`Grounded`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// Marker component indicating the character is crouching, either by input
/// or because a low ceiling keeps it down.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Crouching;

/// Marker component indicating the character is under a low ceiling.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct TouchingCeiling;

/// Marker component indicating the character is touching a wall.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct TouchingWall {
    /// Normal of the wall surface.
    pub normal: Vec2,
    /// Whether the wall allows wall jumps.
    pub jumpable: bool,
}

impl Default for TouchingWall {
    fn default() -> Self {
        Self {
            normal: Vec2::NEG_X,
            jumpable: true,
        }
    }
}

impl TouchingWall {
    /// Create a new wall touch state.
    pub fn new(normal: Vec2, jumpable: bool) -> Self {
        Self { normal, jumpable }
    }

    /// Check if the wall is on the left side.
    pub fn is_left(&self) -> bool {
        self.normal.x > 0.0
    }

    /// Check if the wall is on the right side.
    pub fn is_right(&self) -> bool {
        self.normal.x < 0.0
    }
}

impl From<WallContact> for TouchingWall {
    fn from(contact: WallContact) -> Self {
        Self::new(contact.normal, contact.jumpable)
    }
}
