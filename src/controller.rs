//! The platformer character controller.
//!
//! [`CharacterController`] owns a [`CharacterState`] and advances it by one
//! fixed tick in [`CharacterController::step`]. The tick is pure: physics
//! query results come in as [`SensorReadings`], the new velocity and snap come
//! out as a [`StepOutput`], and the plugin's systems move data between the two
//! and the physics backend.
//!
//! A tick runs in this order:
//!
//! 1. Ground detection from the ground-cast hits.
//! 2. Timers: the airborne counter and the jump buffer age.
//! 3. Crouch resolution, gravity and horizontal movement.
//! 4. Jump buffering and consumption.

use bevy::prelude::*;

use crate::animation::{param, AnimationSink, AnimatorParameters};
use crate::collision::CollisionData;
use crate::config::ControllerConfig;
use crate::detection::{scan_ground, slope_max_speed, ColliderFootprint, ProbeGeometry, SensorReadings};
use crate::events::ContactEventSink;
use crate::input::{ControllerInput, TickInput};
use crate::state::{AerialMotion, CharacterState, GroundedMotion};

/// Result of one controller tick, handed to the physics backend.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Default)]
pub struct StepOutput {
    /// New velocity of the body.
    pub velocity: Vec2,
    /// Downward correction keeping the body on the ground.
    pub snap: Vec2,
    /// `position + snap + velocity * dt`, for kinematic bodies.
    pub target: Vec2,
    pub facing_right: bool,
    /// A jump was consumed this tick.
    pub jumped: bool,
}

/// Slope-following platformer controller.
///
/// Spawning it also inserts a default [`ControllerConfig`], [`ControllerInput`],
/// [`SensorReadings`] and [`AnimatorParameters`] unless the entity already has
/// them.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use slope_platformer_controller::prelude::*;
///
/// let mut controller = CharacterController::new();
/// let config = ControllerConfig::default();
///
/// // Fall for one tick with no ground below
/// let output = controller.step(
///     TickInput::default(),
///     &SensorReadings::airborne(),
///     Vec2::ZERO,
///     &config,
///     &mut NullAnimationSink,
///     1.0 / 50.0,
/// );
///
/// assert!(output.velocity.y < 0.0);
/// assert_eq!(controller.state().airborne_frames(), 1);
/// ```
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
#[require(ControllerConfig, ControllerInput, SensorReadings, AnimatorParameters)]
pub struct CharacterController {
    pub(crate) state: CharacterState,
    pub(crate) geometry: Option<ProbeGeometry>,
    #[reflect(ignore)]
    pub(crate) ground_contacts: Vec<CollisionData>,
    pub(crate) last_output: Option<StepOutput>,
}

impl Default for CharacterController {
    fn default() -> Self {
        Self {
            state: CharacterState::new(ControllerConfig::default().max_speed),
            geometry: None,
            ground_contacts: Vec::new(),
            last_output: None,
        }
    }
}

impl CharacterController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current movement state.
    #[inline]
    pub fn state(&self) -> &CharacterState {
        &self.state
    }

    /// Probe regions, once bound to a collider.
    #[inline]
    pub fn geometry(&self) -> Option<&ProbeGeometry> {
        self.geometry.as_ref()
    }

    /// Whether the probe geometry has been computed.
    #[inline]
    pub fn is_bound(&self) -> bool {
        self.geometry.is_some()
    }

    /// Ground hits accepted on the last tick.
    pub fn ground_contacts(&self) -> &[CollisionData] {
        &self.ground_contacts
    }

    /// Output of the last tick.
    pub fn last_output(&self) -> Option<&StepOutput> {
        self.last_output.as_ref()
    }

    /// Precompute the probe regions from the collider and the entity scale.
    pub fn bind(&mut self, footprint: &ColliderFootprint, scale: Vec2, config: &ControllerConfig) {
        self.geometry = Some(ProbeGeometry::new(footprint, scale));
        self.state.max_speed_current = config.max_speed;
    }

    /// Advance the character by one fixed tick.
    pub fn step(
        &mut self,
        input: TickInput,
        readings: &SensorReadings,
        position: Vec2,
        config: &ControllerConfig,
        anim: &mut dyn AnimationSink,
        dt: f32,
    ) -> StepOutput {
        self.detect_ground(readings.ground_hits.as_deref(), config);
        anim.set_bool(param::GROUND, self.state.grounded);

        self.advance_timers(config);
        anim.set_float(param::V_SPEED, self.state.velocity.y);

        let jumped = self.apply_input(input, readings.ceiling_blocked, config, anim, dt);

        let state = &self.state;
        let snap = Vec2::new(0.0, -state.wall_follow_distance);
        let output = StepOutput {
            velocity: state.velocity,
            snap,
            target: position + snap + state.velocity * dt,
            facing_right: state.facing_right,
            jumped,
        };
        self.last_output = Some(output);
        output
    }

    fn detect_ground(&mut self, hits: Option<&[CollisionData]>, config: &ControllerConfig) {
        let state = &mut self.state;
        let was_grounded = state.grounded;

        // The cast only runs while grounded
        let hits = if was_grounded { hits.unwrap_or_default() } else { &[] };
        if was_grounded {
            state.max_speed_current = config.max_speed;
        }

        let scan = scan_ground(hits, config);
        state.wall_contact = scan.wall;
        state.touching_ceiling = scan.ceiling;

        if !scan.is_grounded() {
            if was_grounded {
                state.velocity.y = 0.0;
                debug!("Left the ground");
            }
            state.grounded = false;
            state.wall_follow_distance = 0.0;
            self.ground_contacts.clear();
            return;
        }

        state.grounded = true;
        state.ground_angle = scan.ground_angle();
        state.wall_follow_distance = scan.wall_follow_distance(config.wall_follow_snap);
        state.max_speed_current = slope_max_speed(
            config.max_speed,
            scan.mean_normal(),
            state.ground_angle,
            state.velocity.y,
            &config.angles,
        );

        trace!(
            "Ground angle {:.1} deg from {} contacts, max speed {:.2}",
            state.ground_angle.to_degrees(),
            scan.accepted.len(),
            state.max_speed_current
        );

        self.ground_contacts = scan.accepted;
    }

    fn advance_timers(&mut self, config: &ControllerConfig) {
        let state = &mut self.state;

        if state.grounded {
            state.airborne_frames = 0;
        } else {
            state.airborne_frames = state.airborne_frames.saturating_add(1);
        }

        if state.jump_buffered {
            state.jump_buffer_frames += 1;
        }
        if state.jump_buffer_frames > config.jump_buffer_reset {
            debug!(
                "Dropped jump request after {} ticks",
                state.jump_buffer_frames
            );
            state.jump_buffered = false;
            state.jump_buffer_frames = 0;
        }
    }

    /// Returns whether a jump was consumed.
    fn apply_input(
        &mut self,
        input: TickInput,
        ceiling_blocked: bool,
        config: &ControllerConfig,
        anim: &mut dyn AnimationSink,
        dt: f32,
    ) -> bool {
        let state = &mut self.state;

        let ceiling_blocked = ceiling_blocked && state.grounded;
        let crouch = input.crouch || ceiling_blocked;
        state.touching_ceiling |= ceiling_blocked;

        // Gravity follows the state before this tick's movement
        let gravity = config
            .gravity
            .acceleration(state.grounded, state.velocity.y, input.jump_held);

        state.crouching = crouch;
        anim.set_bool(param::CROUCH, crouch);

        let mut horizontal = input.horizontal.clamp(-1.0, 1.0);
        if crouch {
            horizontal *= config.crouch_speed;
        }

        if state.grounded || config.air_control {
            anim.set_float(param::SPEED, horizontal.abs());

            if state.grounded {
                let (sin, cos) = state.ground_angle.sin_cos();
                state.velocity = Vec2::new(cos, sin) * horizontal * state.max_speed_current;
            } else {
                state.velocity.x = horizontal * state.max_speed_current;
            }

            if (horizontal > 0.0 && !state.facing_right) || (horizontal < 0.0 && state.facing_right) {
                state.facing_right = !state.facing_right;
            }
        }

        state.velocity.y += gravity * dt;

        if input.jump && !crouch {
            state.jump_buffered = true;
        }

        let mut jumped = false;
        if state.jump_buffered && !crouch {
            if state.grounded || state.airborne_frames <= config.airborne_grace_period {
                debug!(
                    "Jump after {} airborne ticks, buffered for {}",
                    state.airborne_frames, state.jump_buffer_frames
                );
                state.wall_follow_distance = 0.0;
                state.jump_buffered = false;
                state.jump_buffer_frames = 0;
                state.grounded = false;
                state.velocity.y = config.jump_speed;
                anim.set_bool(param::GROUND, false);
                jumped = true;
            } else if input.jump {
                debug!(
                    "Jump pressed {} ticks after leaving the ground, buffering",
                    state.airborne_frames
                );
            }
        }

        if state.grounded {
            state.aerial_motion = AerialMotion::None;
            state.grounded_motion = if horizontal != 0.0 {
                GroundedMotion::Run
            } else {
                GroundedMotion::Idle
            };
        } else if state.velocity.y > 0.0 {
            state.aerial_motion = AerialMotion::Rising;
        } else {
            state.aerial_motion = AerialMotion::Falling;
        }

        jumped
    }
}

impl ContactEventSink for CharacterController {
    /// Land on a standable surface the collider is resting on.
    fn on_contact_stay(&mut self, contacts: &[CollisionData], config: &ControllerConfig) {
        let state = &mut self.state;
        if state.grounded || state.airborne_frames <= 1 || contacts.is_empty() {
            return;
        }

        let mean = (contacts.iter().map(|contact| contact.normal).sum::<Vec2>()
            / contacts.len() as f32)
            .normalize_or_zero();

        if mean.y > config.angles.slip_cos() {
            debug!("Landed after {} airborne ticks", state.airborne_frames);
            state.grounded = true;
            state.airborne_frames = 0;
        }
    }
}
