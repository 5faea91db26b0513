//! Collision query results.
//!
//! These structures carry the results of the physics queries the controller
//! consumes: shape-cast hits for ground detection and contact points for the
//! contact event sink.

use bevy::prelude::*;

/// A single hit reported by a shape cast or a contact manifold.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CollisionData {
    /// Distance travelled by the cast shape before the hit.
    ///
    /// Zero for shapes that were already touching, and may be slightly
    /// negative for overlapping contacts.
    pub distance: f32,
    /// Outward normal of the surface that was hit.
    pub normal: Vec2,
    /// World position of the hit point.
    pub point: Vec2,
    /// Entity that was hit (if any).
    pub entity: Option<Entity>,
}

impl CollisionData {
    /// Create a collision result.
    pub fn new(distance: f32, normal: Vec2, point: Vec2, entity: Option<Entity>) -> Self {
        Self {
            distance,
            normal,
            point,
            entity,
        }
    }

    /// Create a hit with only a normal and a distance.
    pub fn from_normal(normal: Vec2, distance: f32) -> Self {
        Self {
            distance,
            normal,
            ..default()
        }
    }

    /// Angle between the surface normal and world up, in degrees.
    pub fn incline_degrees(&self) -> f32 {
        let normal = self.normal.normalize_or_zero();
        normal.y.clamp(-1.0, 1.0).acos().to_degrees()
    }
}

/// Bit mask selecting which collision layers a query can hit.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CollisionMask(pub u32);

impl CollisionMask {
    /// Matches every layer.
    pub const ALL: Self = Self(u32::MAX);
    /// Matches no layer.
    pub const NONE: Self = Self(0);

    /// Create a mask from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits of the mask.
    #[inline]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Check whether this mask shares any layer with `other`.
    pub const fn intersects(&self, other: CollisionMask) -> bool {
        self.0 & other.0 != 0
    }
}

impl Default for CollisionMask {
    fn default() -> Self {
        Self::ALL
    }
}
