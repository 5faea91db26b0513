//! Input sampling.
//!
//! Input is read at the render frame rate but the controller steps at the
//! fixed rate. A button pressed and released between two fixed ticks would
//! be missed by reading it directly from the fixed tick, so jump presses are
//! latched by [`InputSampler::poll`] and handed over once by
//! [`InputSampler::consume`].

use bevy::prelude::*;

/// Input for one fixed tick.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Default)]
pub struct TickInput {
    /// Horizontal axis (-1.0 = left, 1.0 = right).
    pub horizontal: f32,
    /// Crouch key held.
    pub crouch: bool,
    /// Jump pressed since the previous tick.
    pub jump: bool,
    /// Jump held since the previous tick.
    pub jump_held: bool,
}

impl TickInput {
    /// Input moving along `horizontal`, clamped to [-1, 1].
    pub fn moving(horizontal: f32) -> Self {
        Self {
            horizontal: horizontal.clamp(-1.0, 1.0),
            ..default()
        }
    }

    /// Builder: press and hold jump.
    pub fn with_jump(mut self) -> Self {
        self.jump = true;
        self.jump_held = true;
        self
    }

    /// Builder: hold jump without a new press.
    pub fn with_jump_held(mut self, held: bool) -> Self {
        self.jump_held = held;
        self
    }

    /// Builder: hold crouch.
    pub fn with_crouch(mut self, crouch: bool) -> Self {
        self.crouch = crouch;
        self
    }
}

/// The input the controller uses on its next tick.
///
/// Filled from [`InputSampler`] when the entity has one. Hosts driving a
/// character from AI can write it directly instead. The jump press is
/// cleared after every tick.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct ControllerInput(pub TickInput);

impl ControllerInput {
    /// Take this tick's input, clearing the jump press.
    pub(crate) fn take(&mut self) -> TickInput {
        let input = self.0;
        self.0.jump = false;
        input
    }
}

/// Bridges frame-rate input to the fixed tick.
///
/// # Example
///
/// ```rust
/// use slope_platformer_controller::prelude::*;
///
/// let mut sampler = InputSampler::default();
///
/// // Two render frames between fixed ticks: the press on the first frame
/// // survives the release on the second.
/// sampler.poll(1.0, false, true, true);
/// sampler.poll(0.5, false, false, false);
///
/// let input = sampler.consume();
/// assert!(input.jump);
/// assert_eq!(input.horizontal, 0.5);
///
/// // Consumed exactly once
/// assert!(!sampler.consume().jump);
/// ```
#[derive(Component, Reflect, Debug, Clone, Default, PartialEq)]
#[reflect(Component)]
pub struct InputSampler {
    horizontal: f32,
    crouch: bool,
    jump: bool,
    jump_held: bool,
}

impl InputSampler {
    /// Record one frame of input. Jump presses latch until consumed; the axis
    /// and crouch key keep their latest value.
    pub fn poll(&mut self, horizontal: f32, crouch: bool, jump_pressed: bool, jump_held: bool) {
        self.horizontal = horizontal.clamp(-1.0, 1.0);
        self.crouch = crouch;
        self.jump |= jump_pressed;
        self.jump_held |= jump_held;
    }

    /// Hand the latched input to a fixed tick and clear the latches.
    pub fn consume(&mut self) -> TickInput {
        let input = TickInput {
            horizontal: self.horizontal,
            crouch: self.crouch,
            jump: self.jump,
            jump_held: self.jump_held,
        };
        self.jump = false;
        self.jump_held = false;
        input
    }

    /// Whether a jump press is waiting for the next tick.
    pub fn has_pending_jump(&self) -> bool {
        self.jump
    }
}

/// Keyboard bindings polled into the entity's [`InputSampler`] every frame.
#[derive(Component, Reflect, Debug, Clone, PartialEq)]
#[reflect(Component)]
#[require(InputSampler)]
pub struct InputBindings {
    pub left: Vec<KeyCode>,
    pub right: Vec<KeyCode>,
    pub jump: Vec<KeyCode>,
    pub crouch: Vec<KeyCode>,
}

impl Default for InputBindings {
    fn default() -> Self {
        Self {
            left: vec![KeyCode::KeyA, KeyCode::ArrowLeft],
            right: vec![KeyCode::KeyD, KeyCode::ArrowRight],
            jump: vec![KeyCode::Space, KeyCode::KeyW, KeyCode::ArrowUp],
            crouch: vec![KeyCode::ControlLeft, KeyCode::KeyS, KeyCode::ArrowDown],
        }
    }
}

impl InputBindings {
    /// Feed the current keyboard state into `sampler`.
    pub fn poll_into(&self, keys: &ButtonInput<KeyCode>, sampler: &mut InputSampler) {
        let mut horizontal = 0.0;
        if keys.any_pressed(self.left.iter().copied()) {
            horizontal -= 1.0;
        }
        if keys.any_pressed(self.right.iter().copied()) {
            horizontal += 1.0;
        }

        sampler.poll(
            horizontal,
            keys.any_pressed(self.crouch.iter().copied()),
            keys.any_just_pressed(self.jump.iter().copied()),
            keys.any_pressed(self.jump.iter().copied()),
        );
    }
}
