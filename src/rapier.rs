//! Rapier2D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier2D.
//! Enable with the `rapier2d` feature.

use std::collections::HashSet;

use bevy::ecs::system::SystemState;
use bevy::prelude::*;
use bevy_rapier2d::geometry::Group;
use bevy_rapier2d::parry::shape::Capsule;
use bevy_rapier2d::prelude::*;

use crate::backend::{PlatformerPhysicsBackend, ShapeCastRequest, SurfaceQueries};
use crate::collision::{CollisionData, CollisionMask};
use crate::config::ControllerConfig;
use crate::controller::CharacterController;
use crate::detection::{CapsuleDirection, ColliderFootprint, ProbeRegion, SensorReadings};
use crate::events::{ContactEvent, ContactPhase};
use crate::ControllerSet;

/// How far below an airborne character's collider a surface still counts
/// as touching it.
pub const CONTACT_SKIN: f32 = 0.05;

/// Gap a kinematic body keeps from the surface it is moved against. Smaller
/// than [`CONTACT_SKIN`] so contact reports still see that surface.
pub const KINEMATIC_GAP: f32 = 0.01;

const KINEMATIC_SLIDES: usize = 3;

/// Rapier2D physics backend for the platformer controller.
///
/// Velocities are written to [`Velocity`], snaps and kinematic moves to the
/// [`Transform`]. Kinematic moves sweep the collider first so the body stops
/// at the ground instead of passing through it. Ground casts, the crouch probe and contact reports are run
/// by dedicated Rapier systems that receive `RapierContext` as a system
/// parameter.
pub struct Rapier2dBackend;

impl PlatformerPhysicsBackend for Rapier2dBackend {
    fn plugin() -> impl Plugin {
        Rapier2dBackendPlugin
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec2) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity;
        }
    }

    fn translate(world: &mut World, entity: Entity, delta: Vec2) {
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.translation += delta.extend(0.0);
        }
    }

    fn move_kinematic(world: &mut World, entity: Entity, target: Vec2) {
        let target = sweep_kinematic(world, entity, target).unwrap_or(target);
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.translation.x = target.x;
            transform.translation.y = target.y;
        }
    }

    fn get_position(world: &World, entity: Entity) -> Vec2 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation.xy())
            .or_else(|| {
                world
                    .get::<GlobalTransform>(entity)
                    .map(|t| t.translation().xy())
            })
            .unwrap_or(Vec2::ZERO)
    }

    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.delta_secs())
            .filter(|&d| d > 0.0)
            .unwrap_or(1.0 / 60.0)
    }

    fn collider_footprint(world: &World, entity: Entity) -> Option<ColliderFootprint> {
        world.get::<Collider>(entity).and_then(collider_footprint)
    }
}

/// Plugin that sets up Rapier2D-specific systems for the platformer controller.
pub struct Rapier2dBackendPlugin;

impl Plugin for Rapier2dBackendPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            rapier_contact_reports.in_set(ControllerSet::Contacts),
        );
        app.add_systems(
            FixedUpdate,
            rapier_sensor_readings.in_set(ControllerSet::Sensors),
        );
    }
}

/// Describe a Rapier collider as a capsule footprint.
///
/// Capsules keep their orientation; balls and cuboids are treated as
/// vertical capsules of the same bounds.
pub fn collider_footprint(collider: &Collider) -> Option<ColliderFootprint> {
    if let Some(capsule) = collider.as_capsule() {
        let segment = capsule.segment();
        let (a, b) = (segment.a(), segment.b());
        let radius = capsule.radius();
        let length = a.distance(b);
        let (size, direction) = if (a.x - b.x).abs() > (a.y - b.y).abs() {
            (
                Vec2::new(length + radius * 2.0, radius * 2.0),
                CapsuleDirection::Horizontal,
            )
        } else {
            (
                Vec2::new(radius * 2.0, length + radius * 2.0),
                CapsuleDirection::Vertical,
            )
        };
        Some(ColliderFootprint {
            offset: (a + b) / 2.0,
            size,
            direction,
        })
    } else if let Some(ball) = collider.as_ball() {
        Some(ColliderFootprint::capsule(Vec2::splat(ball.radius() * 2.0)))
    } else {
        collider
            .as_cuboid()
            .map(|cuboid| ColliderFootprint::capsule(cuboid.half_extents() * 2.0))
    }
}

/// Sweep the entity's collider from its current position toward `target`,
/// stopping short of anything in its ground mask and sliding along it.
///
/// Returns `None` when the entity has no collider or no Rapier context exists
/// yet, in which case the body moves straight to `target`.
fn sweep_kinematic(world: &mut World, entity: Entity, target: Vec2) -> Option<Vec2> {
    let transform = world.get::<Transform>(entity)?;
    let start = transform.translation.xy();
    let scale = transform.scale.truncate();
    let footprint = world.get::<Collider>(entity).and_then(collider_footprint)?;
    let mask = world
        .get::<ControllerConfig>(entity)
        .map_or(CollisionMask::ALL, |config| config.ground_mask);

    let region = footprint.ground_probe(scale);
    let shape = probe_capsule(region.size, region.direction);

    let mut state = SystemState::<ReadRapierContext>::new(world);
    let rapier_context = state.get(world);
    let context = rapier_context.single().ok()?;

    let mut position = start;
    let mut remaining = target - start;
    for _ in 0..KINEMATIC_SLIDES {
        let distance = remaining.length();
        if distance <= f32::EPSILON {
            break;
        }
        let direction = remaining / distance;

        let filter = QueryFilter::default()
            .exclude_rigid_body(entity)
            .exclude_collider(entity)
            .exclude_sensors()
            .groups(mask_groups(mask));

        let Some((_, hit)) = context.cast_shape(
            region.center(position),
            0.0,
            direction,
            &shape,
            ShapeCastOptions {
                max_time_of_impact: distance,
                stop_at_penetration: false,
                ..default()
            },
            filter,
        ) else {
            position += remaining;
            break;
        };

        let travel = (hit.time_of_impact - KINEMATIC_GAP).max(0.0);
        position += direction * travel;

        let normal = hit.details.map(|d| d.normal1).unwrap_or(-direction);
        remaining = clip_to_surface(remaining - direction * travel, normal);
    }

    if position != target {
        trace!("Kinematic move of {:?} blocked at {:?}", entity, position);
    }
    Some(position)
}

/// Drop the part of `motion` that pushes into a surface with outward `normal`.
fn clip_to_surface(motion: Vec2, normal: Vec2) -> Vec2 {
    let into = motion.dot(normal);
    if into < 0.0 {
        motion - normal * into
    } else {
        motion
    }
}

/// Build a parry capsule of the given full size.
fn probe_capsule(size: Vec2, direction: CapsuleDirection) -> Capsule {
    match direction {
        CapsuleDirection::Vertical => {
            let radius = size.x / 2.0;
            Capsule::new_y((size.y / 2.0 - radius).max(0.0), radius)
        }
        CapsuleDirection::Horizontal => {
            let radius = size.y / 2.0;
            Capsule::new_x((size.x / 2.0 - radius).max(0.0), radius)
        }
    }
}

fn mask_groups(mask: CollisionMask) -> CollisionGroups {
    CollisionGroups::new(Group::ALL, Group::from_bits_truncate(mask.bits()))
}

/// [`SurfaceQueries`] over a Rapier query pipeline, ignoring one character's
/// own body.
pub struct RapierSurfaceQueries<'c, 'w> {
    context: &'c RapierContext<'w>,
    exclude: Entity,
}

impl<'c, 'w> RapierSurfaceQueries<'c, 'w> {
    pub fn new(context: &'c RapierContext<'w>, exclude: Entity) -> Self {
        Self { context, exclude }
    }
}

impl SurfaceQueries for RapierSurfaceQueries<'_, '_> {
    fn shape_cast_all(&mut self, request: &ShapeCastRequest) -> Vec<CollisionData> {
        let shape = probe_capsule(request.size, request.capsule);
        let exclude = request.exclude.unwrap_or(self.exclude);
        let mut seen: Vec<Entity> = Vec::new();
        let mut hits = Vec::new();

        // Rapier reports the first hit only; exclude each hit collider and cast again
        while hits.len() < request.max_hits {
            let not_seen = |entity: Entity| !seen.contains(&entity);
            let filter = QueryFilter::default()
                .exclude_rigid_body(exclude)
                .exclude_collider(exclude)
                .exclude_sensors()
                .groups(mask_groups(request.mask))
                .predicate(&not_seen);

            let Some((entity, hit)) = self.context.cast_shape(
                request.origin,
                0.0,
                request.direction,
                &shape,
                ShapeCastOptions {
                    max_time_of_impact: request.max_distance,
                    stop_at_penetration: false,
                    ..default()
                },
                filter,
            ) else {
                break;
            };

            let normal = hit.details.map(|d| d.normal1).unwrap_or(-request.direction);
            hits.push(CollisionData::new(
                hit.time_of_impact,
                normal,
                request.point_at(hit.time_of_impact),
                Some(entity),
            ));
            seen.push(entity);
        }

        hits
    }

    fn overlap(&mut self, region: &ProbeRegion, center: Vec2, mask: CollisionMask) -> bool {
        let shape = probe_capsule(region.size, region.direction);
        let filter = QueryFilter::default()
            .exclude_rigid_body(self.exclude)
            .exclude_collider(self.exclude)
            .exclude_sensors()
            .groups(mask_groups(mask));

        self.context
            .intersection_with_shape(center, 0.0, &shape, filter)
            .is_some()
    }
}

/// Fill [`SensorReadings`] from the Rapier query pipeline.
fn rapier_sensor_readings(
    rapier_context: ReadRapierContext,
    mut q_controllers: Query<(
        Entity,
        &GlobalTransform,
        &CharacterController,
        &ControllerConfig,
        &mut SensorReadings,
    )>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, transform, controller, config, mut readings) in &mut q_controllers {
        let mut queries = RapierSurfaceQueries::new(&context, entity);
        *readings = SensorReadings::gather(
            controller,
            transform.translation().xy(),
            &mut queries,
            config,
        );
    }
}

/// Report surfaces just below airborne characters as contacts.
///
/// Grounded characters are skipped: their ground cast already covers what
/// they stand on.
fn rapier_contact_reports(
    rapier_context: ReadRapierContext,
    q_controllers: Query<(
        Entity,
        &GlobalTransform,
        &CharacterController,
        &ControllerConfig,
    )>,
    mut touching: Local<HashSet<Entity>>,
    mut events: EventWriter<ContactEvent>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, transform, controller, config) in &q_controllers {
        let Some(geometry) = controller.geometry() else {
            continue;
        };
        if controller.state().grounded() {
            touching.remove(&entity);
            continue;
        }

        let request = ShapeCastRequest::new(
            geometry.ground.center(transform.translation().xy()),
            geometry.ground.size,
            Vec2::NEG_Y,
            CONTACT_SKIN,
        )
        .with_direction(geometry.ground.direction)
        .with_mask(config.ground_mask)
        .with_max_hits(config.max_ground_hits)
        .excluding(entity);

        let contacts = RapierSurfaceQueries::new(&context, entity).shape_cast_all(&request);
        if contacts.is_empty() {
            touching.remove(&entity);
            continue;
        }

        if touching.insert(entity) {
            events.write(ContactEvent::new(
                entity,
                ContactPhase::Enter,
                contacts.clone(),
            ));
        }
        events.write(ContactEvent::new(entity, ContactPhase::Stay, contacts));
    }
}

/// Bundle for creating a character with Rapier2D physics.
///
/// The controller owns the character's velocity, so the body ignores Rapier's
/// gravity and never rotates.
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_rapier2d::prelude::*;
/// use slope_platformer_controller::prelude::*;
///
/// fn spawn_player(mut commands: Commands) {
///     commands.spawn((
///         Transform::from_xyz(0.0, 100.0, 0.0),
///         CharacterController::new(),
///         ControllerConfig::player(),
///         InputBindings::default(),
///         Rapier2dCharacterBundle::new(),
///         Collider::capsule_y(8.0, 4.0),
///     ));
/// }
/// ```
///
/// # Defaults
///
/// - `rigid_body`: [`RigidBody::Dynamic`]
/// - `velocity`: Zero velocity (overwritten by the controller every tick)
/// - `locked_axes`: [`LockedAxes::ROTATION_LOCKED`]
/// - `gravity_scale`: 0.0 (gravity is applied by the controller)
/// - `damping`: none
#[derive(Bundle)]
pub struct Rapier2dCharacterBundle {
    pub rigid_body: RigidBody,
    pub velocity: Velocity,
    pub locked_axes: LockedAxes,
    pub gravity_scale: GravityScale,
    pub damping: Damping,
}

impl Default for Rapier2dCharacterBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Rapier2dCharacterBundle {
    /// Create a dynamic character body for [`OutputMode::Velocity`](crate::config::OutputMode::Velocity).
    pub fn new() -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            locked_axes: LockedAxes::ROTATION_LOCKED,
            gravity_scale: GravityScale(0.0),
            damping: Damping {
                linear_damping: 0.0,
                angular_damping: 0.0,
            },
        }
    }

    /// Create a position-based kinematic body for
    /// [`OutputMode::Kinematic`](crate::config::OutputMode::Kinematic).
    pub fn kinematic() -> Self {
        Self {
            rigid_body: RigidBody::KinematicPositionBased,
            ..Self::new()
        }
    }

    /// Set the rigid body type for the character.
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.rigid_body = body;
        self
    }

    /// Set which axes should be locked for the rigid body.
    pub fn with_locked_axes(mut self, axes: LockedAxes) -> Self {
        self.locked_axes = axes;
        self
    }
}
