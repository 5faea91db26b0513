//! Core controller systems.
//!
//! These systems move data between the ECS, the physics backend and
//! [`CharacterController::step`]. They are generic over the physics backend
//! to allow different physics engines to be used.

use bevy::prelude::*;

use crate::animation::{AnimatorParameters, NullAnimationSink};
use crate::backend::PlatformerPhysicsBackend;
use crate::config::{ControllerConfig, OutputMode};
use crate::controller::{CharacterController, StepOutput};
use crate::detection::SensorReadings;
use crate::events::{ContactEvent, ContactEventSink};
use crate::input::{ControllerInput, InputBindings, InputSampler};
use crate::state::{Airborne, Crouching, Grounded, TouchingCeiling, TouchingWall};

/// Poll keyboard bindings into input samplers.
///
/// Runs every render frame; does nothing without a keyboard resource.
pub fn poll_keyboard_input(
    keys: Option<Res<ButtonInput<KeyCode>>>,
    mut q_samplers: Query<(&InputBindings, &mut InputSampler)>,
) {
    let Some(keys) = keys else {
        return;
    };

    for (bindings, mut sampler) in &mut q_samplers {
        bindings.poll_into(&keys, &mut sampler);
    }
}

/// Hand latched input to this tick.
pub fn consume_sampled_input(mut q_samplers: Query<(&mut InputSampler, &mut ControllerInput)>) {
    for (mut sampler, mut input) in &mut q_samplers {
        input.0 = sampler.consume();
    }
}

/// Compute probe geometry for controllers whose collider is now known.
pub fn bind_controllers<B: PlatformerPhysicsBackend>(world: &mut World) {
    let pending: Vec<(Entity, Vec2)> = world
        .query::<(Entity, &CharacterController, Option<&Transform>)>()
        .iter(world)
        .filter(|(_, controller, _)| !controller.is_bound())
        .map(|(entity, _, transform)| {
            let scale = transform.map_or(Vec2::ONE, |t| t.scale.truncate());
            (entity, scale)
        })
        .collect();

    let mut query = world.query::<(&mut CharacterController, &ControllerConfig)>();
    for (entity, scale) in pending {
        let Some(footprint) = B::collider_footprint(world, entity) else {
            continue;
        };
        if let Ok((mut controller, config)) = query.get_mut(world, entity) {
            controller.bind(&footprint, scale, config);
            debug!(
                "Bound controller {:?} to a {:?} collider footprint",
                entity, footprint.size
            );
        }
    }
}

/// Log configs that fail validation. The controller keeps running with them.
pub fn warn_invalid_configs(
    q_configs: Query<(Entity, &ControllerConfig), Changed<ControllerConfig>>,
) {
    for (entity, config) in &q_configs {
        if let Err(err) = config.validate() {
            warn!("Invalid controller config on {:?}: {}", entity, err);
        }
    }
}

/// Deliver contact reports to their controllers.
pub fn apply_contact_events(
    mut events: EventReader<ContactEvent>,
    mut q_controllers: Query<(&mut CharacterController, &ControllerConfig)>,
) {
    for event in events.read() {
        let Ok((mut controller, config)) = q_controllers.get_mut(event.entity) else {
            continue;
        };
        controller.on_contact(event.phase, &event.contacts, config);
    }
}

/// Step every controller by one fixed tick.
pub fn step_controllers<B: PlatformerPhysicsBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world);

    let entities: Vec<Entity> = world
        .query_filtered::<Entity, With<CharacterController>>()
        .iter(world)
        .collect();
    let positions: Vec<(Entity, Vec2)> = entities
        .into_iter()
        .map(|entity| (entity, B::get_position(world, entity)))
        .collect();

    let mut query = world.query::<(
        &mut CharacterController,
        &ControllerConfig,
        &mut ControllerInput,
        &SensorReadings,
        Option<&mut AnimatorParameters>,
    )>();

    for (entity, position) in positions {
        let Ok((mut controller, config, mut input, readings, params)) = query.get_mut(world, entity)
        else {
            continue;
        };

        let input = input.take();
        match params {
            Some(mut params) => {
                controller.step(input, readings, position, config, &mut *params, dt);
            }
            None => {
                controller.step(input, readings, position, config, &mut NullAnimationSink, dt);
            }
        }
    }
}

/// Write the last tick's result back to physics.
pub fn write_physics_output<B: PlatformerPhysicsBackend>(world: &mut World) {
    let outputs: Vec<(Entity, StepOutput, OutputMode)> = world
        .query::<(Entity, &CharacterController, &ControllerConfig)>()
        .iter(world)
        .filter_map(|(entity, controller, config)| {
            controller
                .last_output()
                .map(|output| (entity, *output, config.output_mode))
        })
        .collect();

    for (entity, output, mode) in outputs {
        match mode {
            OutputMode::Velocity => {
                B::set_velocity(world, entity, output.velocity);
                if output.snap != Vec2::ZERO {
                    B::translate(world, entity, output.snap);
                }
            }
            OutputMode::Kinematic => B::move_kinematic(world, entity, output.target),
        }
    }
}

/// Mirror facing into the sign of `scale.x`.
pub fn sync_facing(
    mut q_controllers: Query<(&CharacterController, &mut Transform), Changed<CharacterController>>,
) {
    for (controller, mut transform) in &mut q_controllers {
        let sign = if controller.state().facing_right() {
            1.0
        } else {
            -1.0
        };
        let scale_x = transform.scale.x.abs() * sign;
        if transform.scale.x != scale_x {
            transform.scale.x = scale_x;
        }
    }
}

/// Sync state marker components based on the controller state.
pub fn sync_state_markers(
    mut commands: Commands,
    q_controllers: Query<(
        Entity,
        &CharacterController,
        Has<Grounded>,
        Has<Airborne>,
        Has<Crouching>,
        Has<TouchingWall>,
        Has<TouchingCeiling>,
    )>,
) {
    for (entity, controller, has_grounded, has_airborne, has_crouching, has_wall, has_ceiling) in
        &q_controllers
    {
        let state = controller.state();

        // Sync Grounded/Airborne
        if state.grounded() && !has_grounded {
            commands.entity(entity).insert(Grounded);
            commands.entity(entity).remove::<Airborne>();
        } else if !state.grounded() && has_grounded {
            commands.entity(entity).remove::<Grounded>();
            commands.entity(entity).insert(Airborne);
        } else if !state.grounded() && !has_airborne && !has_grounded {
            commands.entity(entity).insert(Airborne);
        }

        // Sync Crouching
        if state.crouching() && !has_crouching {
            commands.entity(entity).insert(Crouching);
        } else if !state.crouching() && has_crouching {
            commands.entity(entity).remove::<Crouching>();
        }

        // Sync TouchingWall
        match state.wall_contact() {
            Some(contact) => {
                commands.entity(entity).insert(TouchingWall::from(contact));
            }
            None if has_wall => {
                commands.entity(entity).remove::<TouchingWall>();
            }
            None => {}
        }

        // Sync TouchingCeiling
        if state.touching_ceiling() && !has_ceiling {
            commands.entity(entity).insert(TouchingCeiling);
        } else if !state.touching_ceiling() && has_ceiling {
            commands.entity(entity).remove::<TouchingCeiling>();
        }
    }
}
