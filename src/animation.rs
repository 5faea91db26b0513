//! Animator parameters written by the controller.

use std::collections::HashMap;

use bevy::prelude::*;

/// Parameter names the controller writes.
pub mod param {
    /// Bool: grounded after ground detection, cleared on jump.
    pub const GROUND: &str = "Ground";
    /// Bool: crouching this tick.
    pub const CROUCH: &str = "Crouch";
    /// Float: absolute horizontal input, written only when movement applies.
    pub const SPEED: &str = "Speed";
    /// Float: vertical velocity at the start of the tick.
    pub const V_SPEED: &str = "vSpeed";
}

/// Receives named animation parameters.
pub trait AnimationSink {
    fn set_bool(&mut self, name: &str, value: bool);
    fn set_float(&mut self, name: &str, value: f32);
}

/// Discards every parameter.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAnimationSink;

impl AnimationSink for NullAnimationSink {
    fn set_bool(&mut self, _name: &str, _value: bool) {}
    fn set_float(&mut self, _name: &str, _value: f32) {}
}

/// Last value of each animation parameter, for animation systems to read.
#[derive(Component, Reflect, Debug, Clone, Default, PartialEq)]
#[reflect(Component)]
pub struct AnimatorParameters {
    #[reflect(ignore)]
    bools: HashMap<String, bool>,
    #[reflect(ignore)]
    floats: HashMap<String, f32>,
}

impl AnimatorParameters {
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.bools.get(name).copied()
    }

    pub fn get_float(&self, name: &str) -> Option<f32> {
        self.floats.get(name).copied()
    }
}

impl AnimationSink for AnimatorParameters {
    fn set_bool(&mut self, name: &str, value: bool) {
        if let Some(slot) = self.bools.get_mut(name) {
            *slot = value;
        } else {
            self.bools.insert(name.to_owned(), value);
        }
    }

    fn set_float(&mut self, name: &str, value: f32) {
        if let Some(slot) = self.floats.get_mut(name) {
            *slot = value;
        } else {
            self.floats.insert(name.to_owned(), value);
        }
    }
}
