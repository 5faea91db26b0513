//! # `slope_platformer_controller`
//!
//! A slope-following 2D platformer character controller with physics backend abstraction.
//!
//! This crate provides a tight, arcade-style character controller that:
//! - Detects ground with a short downward capsule cast and averages the
//!   normals of every standable hit
//! - Runs along slopes, slowing down uphill and speeding up downhill
//! - Snaps down onto the ground so it does not bounce off slopes
//! - Buffers jump presses and honors them shortly after leaving a ledge
//! - Forces a crouch under low ceilings
//! - Abstracts the physics backend for easy swapping (Rapier2D included)
//!
//! ## Architecture
//!
//! The controller owns its velocity. Every fixed tick:
//! 1. Input latched at the frame rate is handed to the tick
//! 2. Contact reports let airborne characters land
//! 3. The backend runs the ground cast and the crouch probe
//! 4. [`CharacterController::step`](controller::CharacterController::step)
//!    computes the new velocity and ground snap
//! 5. The result is written back to the physics body
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use slope_platformer_controller::prelude::*;
//!
//! // Create controller components for a player character
//! let controller = CharacterController::new();
//! let config = ControllerConfig::player();
//! let bindings = InputBindings::default();
//!
//! // These can be spawned with physics components
//! ```

use bevy::prelude::*;

pub mod animation;
pub mod backend;
pub mod collision;
pub mod config;
pub mod controller;
pub mod detection;
pub mod error;
pub mod events;
pub mod input;
pub mod state;
pub mod systems;

#[cfg(feature = "rapier2d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::animation::{param, AnimationSink, AnimatorParameters, NullAnimationSink};
    pub use crate::backend::{PlatformerPhysicsBackend, ShapeCastRequest, SurfaceQueries};
    pub use crate::collision::{CollisionData, CollisionMask};
    pub use crate::config::{CeilingMask, ControllerConfig, GravityConfig, OutputMode, SlopeAngles};
    pub use crate::controller::{CharacterController, StepOutput};
    pub use crate::detection::{ColliderFootprint, SensorReadings, SurfaceKind};
    pub use crate::error::ConfigError;
    pub use crate::events::{ContactEvent, ContactEventSink, ContactPhase};
    pub use crate::input::{ControllerInput, InputBindings, InputSampler, TickInput};
    pub use crate::state::{
        AerialMotion, Airborne, CharacterState, Crouching, Grounded, GroundedMotion,
        TouchingCeiling, TouchingWall,
    };
    pub use crate::{ControllerSet, PlatformerControllerPlugin};

    #[cfg(feature = "rapier2d")]
    pub use crate::rapier::{Rapier2dBackend, Rapier2dCharacterBundle};
}

/// Ordering of the controller's work within `FixedUpdate`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerSet {
    /// Latched input is handed to the tick and new controllers are bound.
    Input,
    /// Backends write [`ContactEvent`](events::ContactEvent)s.
    Contacts,
    /// Backends fill [`SensorReadings`](detection::SensorReadings).
    Sensors,
    /// Controllers step.
    Movement,
    /// Results are written back to physics and the ECS.
    Output,
}

/// Main plugin for the platformer controller.
///
/// This plugin is generic over a physics backend `B` which provides the actual
/// physics operations (shape casts, velocity write-back, etc.).
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., `Rapier2dBackend`)
///
/// # Examples
///
/// With Rapier2D backend:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier2d::prelude::*;
/// use slope_platformer_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(PlatformerControllerPlugin::<Rapier2dBackend>::default())
///     .run();
/// ```
pub struct PlatformerControllerPlugin<B: backend::PlatformerPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::PlatformerPhysicsBackend> Default for PlatformerControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::PlatformerPhysicsBackend> Plugin for PlatformerControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<controller::CharacterController>();
        app.register_type::<config::ControllerConfig>();
        app.register_type::<input::ControllerInput>();
        app.register_type::<input::InputSampler>();
        app.register_type::<input::InputBindings>();
        app.register_type::<detection::SensorReadings>();
        app.register_type::<animation::AnimatorParameters>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<state::Crouching>();
        app.register_type::<state::TouchingWall>();
        app.register_type::<state::TouchingCeiling>();

        app.add_event::<events::ContactEvent>();

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.configure_sets(
            FixedUpdate,
            (
                ControllerSet::Input,
                ControllerSet::Contacts,
                ControllerSet::Sensors,
                ControllerSet::Movement,
                ControllerSet::Output,
            )
                .chain(),
        );

        // Input is sampled at the frame rate, everything else at the fixed rate
        app.add_systems(Update, systems::poll_keyboard_input);

        app.add_systems(
            FixedUpdate,
            (
                (
                    systems::warn_invalid_configs,
                    systems::bind_controllers::<B>,
                    systems::consume_sampled_input,
                )
                    .chain()
                    .in_set(ControllerSet::Input),
                systems::apply_contact_events
                    .after(ControllerSet::Contacts)
                    .before(ControllerSet::Sensors),
                systems::step_controllers::<B>.in_set(ControllerSet::Movement),
                (
                    systems::write_physics_output::<B>,
                    systems::sync_facing,
                    systems::sync_state_markers,
                )
                    .chain()
                    .in_set(ControllerSet::Output),
            ),
        );
    }
}
