//! Contact callbacks from the physics engine.
//!
//! The ground cast only runs while a character is grounded, so an airborne
//! character lands through contact reports: the backend tells the controller
//! which surfaces its collider is touching and the controller decides whether
//! one of them is ground.

use bevy::prelude::*;

use crate::collision::CollisionData;
use crate::config::ControllerConfig;

/// Whether a contact just began or is ongoing.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPhase {
    Enter,
    Stay,
}

/// Contacts reported by the backend for one character during one tick.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct ContactEvent {
    pub entity: Entity,
    pub phase: ContactPhase,
    pub contacts: Vec<CollisionData>,
}

impl ContactEvent {
    pub fn new(entity: Entity, phase: ContactPhase, contacts: Vec<CollisionData>) -> Self {
        Self {
            entity,
            phase,
            contacts,
        }
    }

    /// An ongoing contact with a single surface.
    pub fn stay(entity: Entity, normal: Vec2) -> Self {
        Self::new(
            entity,
            ContactPhase::Stay,
            vec![CollisionData::from_normal(normal, 0.0)],
        )
    }
}

/// Receives contact callbacks. Both callbacks default to doing nothing.
pub trait ContactEventSink {
    fn on_contact_enter(&mut self, _contacts: &[CollisionData], _config: &ControllerConfig) {}

    fn on_contact_stay(&mut self, _contacts: &[CollisionData], _config: &ControllerConfig) {}

    /// Dispatch by phase.
    fn on_contact(
        &mut self,
        phase: ContactPhase,
        contacts: &[CollisionData],
        config: &ControllerConfig,
    ) {
        match phase {
            ContactPhase::Enter => self.on_contact_enter(contacts, config),
            ContactPhase::Stay => self.on_contact_stay(contacts, config),
        }
    }
}

/// A sink that ignores all contacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpContactSink;

impl ContactEventSink for NoOpContactSink {}
