//! Ground detection, surface classification and probe geometry.
//!
//! The ground cast is a capsule the size of the character's collider swept a
//! short distance downward. Every hit is either accepted as ground (its normal
//! is flat enough to stand on) or classified as a wall, slip slope or ceiling.
//! Accepted hits are averaged into a single ground normal, which drives the
//! slope angle, the snap-down distance and the slope speed blend.

use bevy::prelude::*;

use crate::backend::{ShapeCastRequest, SurfaceQueries};
use crate::collision::CollisionData;
use crate::config::{ControllerConfig, SlopeAngles};
use crate::controller::CharacterController;
use crate::state::WallContact;

/// Surface category by the angle between its outward normal and world up.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Flat enough to run on at full speed.
    Walkable,
    /// Standable, but climbing it slows the character down.
    Steep,
    /// Too steep to stand on.
    Slip,
    /// A wall that allows wall jumps.
    Wall,
    /// An overhanging wall that does not allow wall jumps.
    NoJumpWall,
    /// Faces downward.
    Ceiling,
}

impl SurfaceKind {
    /// Classify a surface normal.
    pub fn classify(normal: Vec2, angles: &SlopeAngles) -> Self {
        let incline = CollisionData::from_normal(normal, 0.0).incline_degrees();

        if incline < angles.steep {
            Self::Walkable
        } else if incline < angles.slip {
            Self::Steep
        } else if incline < angles.wall {
            Self::Slip
        } else if incline < angles.no_jump_wall {
            Self::Wall
        } else if incline < angles.ceiling {
            Self::NoJumpWall
        } else {
            Self::Ceiling
        }
    }

    /// Whether a character can stand on this surface.
    pub fn is_standable(&self) -> bool {
        matches!(self, Self::Walkable | Self::Steep)
    }
}

/// Result of evaluating one tick's ground-cast hits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroundScan {
    /// Hits accepted as ground.
    pub accepted: Vec<CollisionData>,
    /// Sum of accepted normals.
    pub normal_sum: Vec2,
    /// Smallest accepted hit distance.
    pub min_distance: f32,
    /// First wall among the rejected hits.
    pub wall: Option<WallContact>,
    /// Whether any rejected hit faced downward.
    pub ceiling: bool,
    /// Hits dropped by the hit cap.
    pub overflow: usize,
}

impl GroundScan {
    /// At least one hit was accepted.
    #[inline]
    pub fn is_grounded(&self) -> bool {
        !self.accepted.is_empty()
    }

    /// Mean of the accepted normals.
    pub fn mean_normal(&self) -> Vec2 {
        if self.accepted.is_empty() {
            return Vec2::Y;
        }
        self.normal_sum / self.accepted.len() as f32
    }

    /// Tangent angle of the mean normal in radians.
    ///
    /// Zero on flat ground, positive when the ground rises to the right
    /// (the normal leans left).
    pub fn ground_angle(&self) -> f32 {
        let mean = self.mean_normal();
        mean.y.atan2(mean.x) - std::f32::consts::FRAC_PI_2
    }

    /// Snap-down distance, zeroed below `snap`.
    pub fn wall_follow_distance(&self, snap: f32) -> f32 {
        if !self.is_grounded() || self.min_distance <= snap {
            0.0
        } else {
            self.min_distance
        }
    }
}

/// Split ground-cast hits into accepted ground and classified obstacles.
///
/// Hits past `config.max_ground_hits` are ignored.
pub fn scan_ground(hits: &[CollisionData], config: &ControllerConfig) -> GroundScan {
    let cap = config.max_ground_hits.min(hits.len());
    let mut scan = GroundScan {
        min_distance: f32::INFINITY,
        overflow: hits.len() - cap,
        ..default()
    };

    if scan.overflow > 0 {
        debug!(
            "Ground cast returned {} hits, ignoring {} past the cap",
            hits.len(),
            scan.overflow
        );
    }

    let slip_cos = config.angles.slip_cos();
    for hit in &hits[..cap] {
        let degenerate = hit.distance <= -config.degenerate_contact_epsilon;
        if hit.normal.y < slip_cos || degenerate {
            if !degenerate {
                match SurfaceKind::classify(hit.normal, &config.angles) {
                    kind @ (SurfaceKind::Wall | SurfaceKind::NoJumpWall) if scan.wall.is_none() => {
                        scan.wall = Some(WallContact {
                            normal: hit.normal,
                            jumpable: kind == SurfaceKind::Wall,
                        });
                    }
                    SurfaceKind::Ceiling => scan.ceiling = true,
                    _ => {}
                }
            }
            continue;
        }

        scan.normal_sum += hit.normal;
        scan.min_distance = scan.min_distance.min(hit.distance);
        scan.accepted.push(*hit);
    }

    if scan.accepted.is_empty() {
        scan.min_distance = 0.0;
    }

    scan
}

/// Where `value` falls between `a` and `b`, clamped to [0, 1].
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if a == b {
        return 0.0;
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}

/// Max horizontal speed on a slope.
///
/// Climbing a steep slope blends the speed from `base` down to half of it as
/// the slope approaches the slip angle. Descending past the speed-up angle
/// blends it up to a third above `base`.
pub fn slope_max_speed(
    base: f32,
    mean_normal: Vec2,
    ground_angle: f32,
    vertical_velocity: f32,
    angles: &SlopeAngles,
) -> f32 {
    let degrees = ground_angle.abs().to_degrees();

    if mean_normal.y < angles.steep_cos() && vertical_velocity > 0.0 {
        base / 2.0 + base * (1.0 - inverse_lerp(angles.steep, angles.slip, degrees)) / 2.0
    } else if mean_normal.y <= angles.speed_up_cos() && vertical_velocity < 0.0 {
        base + base * inverse_lerp(angles.speed_up, angles.slip, degrees) / 3.0
    } else {
        base
    }
}

/// Long axis of a capsule.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapsuleDirection {
    #[default]
    Vertical,
    Horizontal,
}

/// Unscaled collider shape, relative to the body origin.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct ColliderFootprint {
    /// Collider center relative to the body.
    pub offset: Vec2,
    /// Full width and height.
    pub size: Vec2,
    pub direction: CapsuleDirection,
}

impl ColliderFootprint {
    /// A vertical capsule centered on the body.
    pub fn capsule(size: Vec2) -> Self {
        Self {
            offset: Vec2::ZERO,
            size,
            direction: CapsuleDirection::Vertical,
        }
    }

    /// Builder: set the collider offset.
    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    /// The ground-cast shape: the collider itself under `scale`.
    pub fn ground_probe(&self, scale: Vec2) -> ProbeRegion {
        ProbeRegion {
            offset: Vec2::new(self.offset.x * scale.x.abs(), self.offset.y * scale.y),
            size: self.size * scale.abs(),
            direction: self.direction,
        }
    }

    /// The crouch probe: slightly narrower than the collider, shortened from
    /// the bottom so it does not touch the ground the character stands on.
    pub fn crouch_probe(&self, scale: Vec2) -> ProbeRegion {
        let h = self.size.y;
        ProbeRegion {
            offset: Vec2::new(
                self.offset.x * scale.x.abs(),
                (self.offset.y + h * 0.0125) * scale.y,
            ),
            size: Vec2::new(
                self.size.x * 0.95 * scale.x.abs(),
                (h * 0.975 * scale.y).abs(),
            ),
            direction: self.direction,
        }
    }
}

/// A capsule relative to the character's position.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct ProbeRegion {
    pub offset: Vec2,
    pub size: Vec2,
    pub direction: CapsuleDirection,
}

impl ProbeRegion {
    /// World-space center of the region for a body at `position`.
    #[inline]
    pub fn center(&self, position: Vec2) -> Vec2 {
        position + self.offset
    }
}

/// Probe regions precomputed when the controller is bound to its collider.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct ProbeGeometry {
    pub ground: ProbeRegion,
    pub crouch: ProbeRegion,
}

impl ProbeGeometry {
    pub fn new(footprint: &ColliderFootprint, scale: Vec2) -> Self {
        Self {
            ground: footprint.ground_probe(scale),
            crouch: footprint.crouch_probe(scale),
        }
    }
}

/// Physics query results for one tick.
///
/// Filled by the backend's sensor system before the controller steps.
#[derive(Component, Reflect, Debug, Clone, Default, PartialEq)]
#[reflect(Component)]
pub struct SensorReadings {
    /// Ground-cast hits, or `None` when the cast was skipped because the
    /// character was airborne.
    #[reflect(ignore)]
    pub ground_hits: Option<Vec<CollisionData>>,
    /// The crouch probe overlaps a ceiling.
    pub ceiling_blocked: bool,
}

impl SensorReadings {
    /// Readings for an airborne character.
    pub fn airborne() -> Self {
        Self::default()
    }

    /// Readings for a grounded character.
    pub fn grounded(hits: Vec<CollisionData>) -> Self {
        Self {
            ground_hits: Some(hits),
            ceiling_blocked: false,
        }
    }

    /// Builder: set whether the crouch probe is blocked.
    pub fn with_ceiling_blocked(mut self, blocked: bool) -> Self {
        self.ceiling_blocked = blocked;
        self
    }

    /// Run this tick's physics queries for a character at `position`.
    ///
    /// The ground cast and the crouch probe only run while the character is
    /// grounded, and only once its probe geometry is known.
    pub fn gather<Q: SurfaceQueries + ?Sized>(
        controller: &CharacterController,
        position: Vec2,
        queries: &mut Q,
        config: &ControllerConfig,
    ) -> Self {
        let Some(geometry) = controller.geometry() else {
            return Self::airborne();
        };
        if !controller.state().grounded() {
            return Self::airborne();
        }

        let request = ShapeCastRequest::new(
            geometry.ground.center(position),
            geometry.ground.size,
            Vec2::NEG_Y,
            config.ground_cast_distance,
        )
        .with_direction(geometry.ground.direction)
        .with_mask(config.ground_mask)
        .with_max_hits(config.max_ground_hits);

        let ground_hits = queries.shape_cast_all(&request);
        let ceiling_blocked = queries.overlap(
            &geometry.crouch,
            geometry.crouch.center(position),
            config.resolved_ceiling_mask(),
        );

        Self {
            ground_hits: Some(ground_hits),
            ceiling_blocked,
        }
    }
}
