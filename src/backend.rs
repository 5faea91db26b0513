//! Physics backend abstraction.
//!
//! This module defines the traits that physics backends must implement
//! to work with the platformer controller. The controller itself never talks
//! to a physics engine: it reads [`SensorReadings`](crate::detection::SensorReadings)
//! filled through [`SurfaceQueries`] and hands its result back through
//! [`PlatformerPhysicsBackend`].

use bevy::prelude::*;

use crate::collision::{CollisionData, CollisionMask};
use crate::detection::{CapsuleDirection, ColliderFootprint, ProbeRegion};

/// Trait for physics backend implementations.
///
/// Implement this trait to integrate a physics engine with the controller.
/// The backend writes velocities and positions back to the engine and
/// describes each character's collider.
///
/// The backend's [`plugin`](Self::plugin) is responsible for filling
/// [`SensorReadings`](crate::detection::SensorReadings) in
/// [`ControllerSet::Sensors`](crate::ControllerSet::Sensors) and for writing
/// [`ContactEvent`](crate::events::ContactEvent)s in
/// [`ControllerSet::Contacts`](crate::ControllerSet::Contacts).
///
/// See the `rapier` module's `Rapier2dBackend` for a full implementation.
pub trait PlatformerPhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Set the velocity of an entity.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec2);

    /// Move an entity by `delta` without affecting its velocity.
    fn translate(world: &mut World, entity: Entity, delta: Vec2);

    /// Move a kinematic body to `target` over the next physics step.
    fn move_kinematic(world: &mut World, entity: Entity, target: Vec2);

    /// Get the current position of an entity.
    fn get_position(world: &World, entity: Entity) -> Vec2;

    /// Get the fixed timestep delta time.
    fn get_fixed_timestep(world: &World) -> f32;

    /// Describe the entity's collider, or `None` if it has none (yet).
    fn collider_footprint(world: &World, entity: Entity) -> Option<ColliderFootprint>;
}

/// Physics queries the controller needs each tick.
///
/// Backends wrap their query pipeline in a type implementing this trait;
/// tests implement it with scripted results.
pub trait SurfaceQueries {
    /// Sweep a capsule and return every hit along the way, nearest first,
    /// at most `request.max_hits` of them.
    fn shape_cast_all(&mut self, request: &ShapeCastRequest) -> Vec<CollisionData>;

    /// Check whether `region`, placed at `center`, overlaps anything in `mask`.
    fn overlap(&mut self, region: &ProbeRegion, center: Vec2, mask: CollisionMask) -> bool;
}

/// Helper struct for building capsule casts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeCastRequest {
    /// World-space center of the capsule at the start of the cast.
    pub origin: Vec2,
    /// Full width and height of the capsule.
    pub size: Vec2,
    /// Long axis of the capsule.
    pub capsule: CapsuleDirection,
    /// Direction of the cast (normalized).
    pub direction: Vec2,
    /// Maximum distance to cast.
    pub max_distance: f32,
    /// Layers the cast can hit.
    pub mask: CollisionMask,
    /// Maximum number of hits to report.
    pub max_hits: usize,
    /// Entity to exclude from results.
    pub exclude: Option<Entity>,
}

impl ShapeCastRequest {
    /// Create a new cast request for a vertical capsule.
    pub fn new(origin: Vec2, size: Vec2, direction: Vec2, max_distance: f32) -> Self {
        Self {
            origin,
            size,
            capsule: CapsuleDirection::Vertical,
            direction: direction.normalize_or_zero(),
            max_distance,
            mask: CollisionMask::ALL,
            max_hits: usize::MAX,
            exclude: None,
        }
    }

    /// Set the capsule's long axis.
    pub fn with_direction(mut self, capsule: CapsuleDirection) -> Self {
        self.capsule = capsule;
        self
    }

    /// Restrict the cast to the given layers.
    pub fn with_mask(mut self, mask: CollisionMask) -> Self {
        self.mask = mask;
        self
    }

    /// Cap the number of hits.
    pub fn with_max_hits(mut self, max_hits: usize) -> Self {
        self.max_hits = max_hits;
        self
    }

    /// Exclude an entity from the cast.
    pub fn excluding(mut self, entity: Entity) -> Self {
        self.exclude = Some(entity);
        self
    }

    /// World position of a hit `distance` along the cast.
    pub fn point_at(&self, distance: f32) -> Vec2 {
        self.origin + self.direction * distance
    }
}
