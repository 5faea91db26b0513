//! Integration tests for the platformer controller.
//!
//! These tests run the full plugin schedule against a scripted physics
//! backend: the ground cast, crouch probe and contact reports return exactly
//! what each test sets up, so every tick is deterministic.
//! Each test produces PROOF through explicit velocity/state checks.

use bevy::prelude::*;
use slope_platformer_controller::detection::ProbeRegion;
use slope_platformer_controller::prelude::*;

const DT: f32 = 1.0 / 50.0;

// ==================== Scripted Backend ====================

/// Physics body driven by the scripted backend.
#[derive(Component, Default)]
struct ScriptedBody {
    velocity: Vec2,
}

/// What the scripted physics world reports to every character.
#[derive(Resource)]
struct ScriptedSurfaces {
    ground_hits: Vec<CollisionData>,
    ceiling_blocked: bool,
    casts: usize,
    dt: f32,
}

impl Default for ScriptedSurfaces {
    fn default() -> Self {
        Self {
            ground_hits: vec![CollisionData::from_normal(Vec2::Y, 0.0)],
            ceiling_blocked: false,
            casts: 0,
            dt: DT,
        }
    }
}

impl SurfaceQueries for ScriptedSurfaces {
    fn shape_cast_all(&mut self, request: &ShapeCastRequest) -> Vec<CollisionData> {
        self.casts += 1;
        self.ground_hits
            .iter()
            .take(request.max_hits)
            .copied()
            .collect()
    }

    fn overlap(&mut self, _region: &ProbeRegion, _center: Vec2, _mask: CollisionMask) -> bool {
        self.ceiling_blocked
    }
}

fn scripted_sensors(
    mut surfaces: ResMut<ScriptedSurfaces>,
    mut q_controllers: Query<(
        &Transform,
        &CharacterController,
        &ControllerConfig,
        &mut SensorReadings,
    )>,
) {
    for (transform, controller, config, mut readings) in &mut q_controllers {
        *readings = SensorReadings::gather(
            controller,
            transform.translation.xy(),
            &mut *surfaces,
            config,
        );
    }
}

struct ScriptedBackendPlugin;

impl Plugin for ScriptedBackendPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ScriptedSurfaces>();
        app.add_systems(
            FixedUpdate,
            scripted_sensors.in_set(ControllerSet::Sensors),
        );
    }
}

struct ScriptedBackend;

impl PlatformerPhysicsBackend for ScriptedBackend {
    fn plugin() -> impl Plugin {
        ScriptedBackendPlugin
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec2) {
        if let Some(mut body) = world.get_mut::<ScriptedBody>(entity) {
            body.velocity = velocity;
        }
    }

    fn translate(world: &mut World, entity: Entity, delta: Vec2) {
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.translation += delta.extend(0.0);
        }
    }

    fn move_kinematic(world: &mut World, entity: Entity, target: Vec2) {
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.translation = target.extend(transform.translation.z);
        }
    }

    fn get_position(world: &World, entity: Entity) -> Vec2 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation.xy())
            .unwrap_or(Vec2::ZERO)
    }

    fn get_fixed_timestep(world: &World) -> f32 {
        world.resource::<ScriptedSurfaces>().dt
    }

    fn collider_footprint(world: &World, entity: Entity) -> Option<ColliderFootprint> {
        world
            .get::<ScriptedBody>(entity)
            .map(|_| ColliderFootprint::capsule(Vec2::new(1.0, 2.0)))
    }
}

// ==================== Helpers ====================

/// Create a minimal test app with the scripted backend.
fn create_test_app() -> App {
    let mut app = App::new();

    app.add_plugins(MinimalPlugins);
    app.add_plugins(PlatformerControllerPlugin::<ScriptedBackend>::default());

    app.finish();
    app.cleanup();
    app
}

/// Spawn a character with default config.
fn spawn_character(app: &mut App) -> Entity {
    spawn_character_with_config(app, ControllerConfig::default())
}

/// Spawn a character with custom config.
fn spawn_character_with_config(app: &mut App, config: ControllerConfig) -> Entity {
    app.world_mut()
        .spawn((
            Transform::default(),
            CharacterController::new(),
            config,
            InputSampler::default(),
            ScriptedBody::default(),
        ))
        .id()
}

/// Run one fixed tick.
fn tick(app: &mut App) {
    app.world_mut().run_schedule(FixedUpdate);
}

fn run_ticks(app: &mut App, ticks: usize) {
    for _ in 0..ticks {
        tick(app);
    }
}

fn surfaces(app: &mut App) -> Mut<'_, ScriptedSurfaces> {
    app.world_mut().resource_mut::<ScriptedSurfaces>()
}

fn state(app: &App, entity: Entity) -> CharacterState {
    app.world()
        .get::<CharacterController>(entity)
        .expect("character should exist")
        .state()
        .clone()
}

fn body_velocity(app: &App, entity: Entity) -> Vec2 {
    app.world().get::<ScriptedBody>(entity).unwrap().velocity
}

fn poll(app: &mut App, entity: Entity, horizontal: f32, jump: bool) {
    app.world_mut()
        .get_mut::<InputSampler>(entity)
        .unwrap()
        .poll(horizontal, false, jump, jump);
}

fn send_ground_contact(app: &mut App, entity: Entity) {
    app.world_mut()
        .send_event(ContactEvent::stay(entity, Vec2::Y));
}

/// Fall for two ticks, then touch flat ground.
fn land(app: &mut App, entity: Entity) {
    run_ticks(app, 2);
    send_ground_contact(app, entity);
    tick(app);
    assert!(state(app, entity).grounded(), "character should have landed");
}

fn slope_normal(degrees: f32) -> Vec2 {
    let radians = degrees.to_radians();
    Vec2::new(-radians.sin(), radians.cos())
}

// ==================== Setup Tests ====================

mod setup {
    use super::*;

    #[test]
    fn spawn_inserts_required_components() {
        let mut app = create_test_app();
        let entity = app
            .world_mut()
            .spawn((CharacterController::new(), ScriptedBody::default()))
            .id();

        let world = app.world();
        assert!(world.get::<ControllerConfig>(entity).is_some());
        assert!(world.get::<ControllerInput>(entity).is_some());
        assert!(world.get::<SensorReadings>(entity).is_some());
        assert!(world.get::<AnimatorParameters>(entity).is_some());
    }

    #[test]
    fn controller_binds_to_collider() {
        let mut app = create_test_app();
        let entity = spawn_character(&mut app);

        tick(&mut app);

        let controller = app.world().get::<CharacterController>(entity).unwrap();
        assert!(controller.is_bound());
        println!("PROOF: probe geometry {:?}", controller.geometry());
    }

    #[test]
    fn invalid_config_still_runs() {
        let mut app = create_test_app();
        let entity = spawn_character_with_config(
            &mut app,
            ControllerConfig::default().with_crouch_speed(2.0),
        );

        run_ticks(&mut app, 3);

        assert_eq!(state(&app, entity).airborne_frames(), 3);
    }
}

// ==================== Ground Detection Tests ====================

mod ground_detection {
    use super::*;

    #[test]
    fn spawned_character_starts_airborne() {
        let mut app = create_test_app();
        let entity = spawn_character(&mut app);

        tick(&mut app);

        assert!(!state(&app, entity).grounded());
        assert!(app.world().get::<Airborne>(entity).is_some());
        assert!(app.world().get::<Grounded>(entity).is_none());
    }

    #[test]
    fn airborne_character_does_not_cast() {
        let mut app = create_test_app();
        let entity = spawn_character(&mut app);

        run_ticks(&mut app, 5);
        assert_eq!(surfaces(&mut app).casts, 0);

        land(&mut app, entity);
        assert!(surfaces(&mut app).casts > 0);
    }

    #[test]
    fn contact_event_lands_character() {
        let mut app = create_test_app();
        let entity = spawn_character(&mut app);

        land(&mut app, entity);

        let state = state(&app, entity);
        println!("PROOF: velocity after landing {:?}", state.velocity());
        assert_eq!(state.airborne_frames(), 0);
        assert_eq!(state.velocity(), Vec2::ZERO);
        assert!(app.world().get::<Grounded>(entity).is_some());
        assert!(app.world().get::<Airborne>(entity).is_none());
    }

    #[test]
    fn walking_off_a_ledge_starts_from_zero_vertical_speed() {
        let mut app = create_test_app();
        let entity = spawn_character(&mut app);
        land(&mut app, entity);

        surfaces(&mut app).ground_hits.clear();
        tick(&mut app);

        let state = state(&app, entity);
        println!("PROOF: velocity after leaving ground {:?}", state.velocity());
        assert!(!state.grounded());
        assert_eq!(state.wall_follow_distance(), 0.0);
        assert!((state.velocity().y - (-9.81 * 5.0 * DT)).abs() < 1e-5);
        assert!(app.world().get::<Airborne>(entity).is_some());
    }

    #[test]
    fn grounded_implies_accepted_contacts() {
        let mut app = create_test_app();
        let entity = spawn_character(&mut app);
        land(&mut app, entity);

        let script = [true, true, false, false, false];
        for has_ground in script {
            if has_ground {
                surfaces(&mut app).ground_hits = vec![CollisionData::from_normal(Vec2::Y, 0.1)];
            } else {
                surfaces(&mut app).ground_hits.clear();
            }
            tick(&mut app);

            let controller = app.world().get::<CharacterController>(entity).unwrap();
            if controller.state().grounded() {
                assert!(!controller.ground_contacts().is_empty());
            }
        }
    }

    #[test]
    fn ground_hits_are_capped() {
        let mut app = create_test_app();
        let entity = spawn_character(&mut app);
        surfaces(&mut app).ground_hits = vec![CollisionData::from_normal(Vec2::Y, 0.0); 40];

        land(&mut app, entity);

        let controller = app.world().get::<CharacterController>(entity).unwrap();
        assert_eq!(controller.ground_contacts().len(), 16);
    }

    #[test]
    fn airborne_counter_is_monotonic() {
        let mut app = create_test_app();
        let entity = spawn_character(&mut app);

        for expected in 1..=10 {
            tick(&mut app);
            assert_eq!(state(&app, entity).airborne_frames(), expected);
        }
    }
}

// ==================== Movement Tests ====================

mod movement {
    use super::*;

    #[test]
    fn runs_at_max_speed_on_flat_ground() {
        let mut app = create_test_app();
        let entity = spawn_character(&mut app);
        land(&mut app, entity);

        poll(&mut app, entity, 1.0, false);
        tick(&mut app);

        let velocity = body_velocity(&app, entity);
        println!("PROOF: running velocity {:?}", velocity);
        assert!((velocity - Vec2::new(10.0, 0.0)).length() < 1e-4);
        assert!(state(&app, entity).facing_right());
    }

    #[test]
    fn facing_is_mirrored_into_scale() {
        let mut app = create_test_app();
        let entity = spawn_character(&mut app);
        app.world_mut()
            .get_mut::<Transform>(entity)
            .unwrap()
            .scale = Vec3::new(2.0, 2.0, 1.0);
        land(&mut app, entity);

        poll(&mut app, entity, -1.0, false);
        tick(&mut app);
        assert_eq!(app.world().get::<Transform>(entity).unwrap().scale.x, -2.0);

        // Same direction again leaves facing alone
        tick(&mut app);
        assert_eq!(app.world().get::<Transform>(entity).unwrap().scale.x, -2.0);
        assert!(!state(&app, entity).facing_right());

        poll(&mut app, entity, 1.0, false);
        tick(&mut app);
        assert_eq!(app.world().get::<Transform>(entity).unwrap().scale.x, 2.0);
    }

    #[test]
    fn velocity_follows_slope() {
        let mut app = create_test_app();
        let entity = spawn_character(&mut app);
        land(&mut app, entity);

        surfaces(&mut app).ground_hits = vec![CollisionData::from_normal(slope_normal(20.0), 0.0)];
        poll(&mut app, entity, 1.0, false);
        tick(&mut app);

        let expected = Vec2::new(20f32.to_radians().cos(), 20f32.to_radians().sin()) * 10.0;
        let velocity = body_velocity(&app, entity);
        println!("PROOF: slope velocity {:?}, expected {:?}", velocity, expected);
        assert!((velocity - expected).length() < 1e-3);
    }

    #[test]
    fn climbing_steep_slope_slows_down() {
        let mut app = create_test_app();
        let entity = spawn_character(&mut app);
        land(&mut app, entity);

        surfaces(&mut app).ground_hits = vec![CollisionData::from_normal(slope_normal(45.0), 0.0)];
        poll(&mut app, entity, 1.0, false);

        // First tick starts from rest, so no climb is detected yet
        tick(&mut app);
        assert!((body_velocity(&app, entity).length() - 10.0).abs() < 1e-3);

        tick(&mut app);
        let speed = body_velocity(&app, entity).length();
        println!("PROOF: climbing speed {}", speed);
        assert!((speed - 7.5).abs() < 1e-2);
    }

    #[test]
    fn snaps_down_to_ground() {
        let mut app = create_test_app();
        let entity = spawn_character(&mut app);
        land(&mut app, entity);

        surfaces(&mut app).ground_hits = vec![CollisionData::from_normal(Vec2::Y, 0.3)];
        let before = app.world().get::<Transform>(entity).unwrap().translation.y;
        tick(&mut app);

        let after = app.world().get::<Transform>(entity).unwrap().translation.y;
        println!("PROOF: snapped from {} to {}", before, after);
        assert!((after - (before - 0.3)).abs() < 1e-5);
    }

    #[test]
    fn kinematic_output_moves_transform() {
        let mut app = create_test_app();
        let entity = spawn_character_with_config(
            &mut app,
            ControllerConfig::default().with_output_mode(OutputMode::Kinematic),
        );
        land(&mut app, entity);

        let before = app.world().get::<Transform>(entity).unwrap().translation.xy();
        poll(&mut app, entity, 1.0, false);
        tick(&mut app);

        let after = app.world().get::<Transform>(entity).unwrap().translation.xy();
        assert!((after - (before + Vec2::new(10.0 * DT, 0.0))).length() < 1e-4);
        // Kinematic mode leaves the body velocity alone
        assert_eq!(body_velocity(&app, entity), Vec2::ZERO);
    }

    #[test]
    fn animator_parameters_follow_state() {
        let mut app = create_test_app();
        let entity = spawn_character(&mut app);
        land(&mut app, entity);

        poll(&mut app, entity, 0.5, false);
        tick(&mut app);

        let params = app.world().get::<AnimatorParameters>(entity).unwrap();
        assert_eq!(params.get_bool(param::GROUND), Some(true));
        assert_eq!(params.get_bool(param::CROUCH), Some(false));
        assert_eq!(params.get_float(param::SPEED), Some(0.5));
    }
}

// ==================== Jump Tests ====================

mod jumping {
    use super::*;

    #[test]
    fn jumps_from_ground() {
        let mut app = create_test_app();
        let entity = spawn_character(&mut app);
        land(&mut app, entity);

        poll(&mut app, entity, 0.0, true);
        tick(&mut app);

        let state = state(&app, entity);
        println!("PROOF: jump velocity {:?}", state.velocity());
        assert_eq!(body_velocity(&app, entity).y, 20.0);
        assert!(!state.grounded());
        assert!(!state.jump_buffered());
        assert!(app.world().get::<Airborne>(entity).is_some());
    }

    #[test]
    fn press_and_release_between_ticks_still_jumps() {
        let mut app = create_test_app();
        let entity = spawn_character(&mut app);
        land(&mut app, entity);

        poll(&mut app, entity, 0.0, true);
        poll(&mut app, entity, 0.0, false);
        tick(&mut app);

        assert_eq!(body_velocity(&app, entity).y, 20.0);

        // The press is not replayed on the next tick
        tick(&mut app);
        assert!(body_velocity(&app, entity).y < 20.0);
    }

    #[test]
    fn coyote_jump_after_leaving_ledge() {
        let mut app = create_test_app();
        let entity = spawn_character(&mut app);
        land(&mut app, entity);

        surfaces(&mut app).ground_hits.clear();
        run_ticks(&mut app, 2);
        assert_eq!(state(&app, entity).airborne_frames(), 2);

        poll(&mut app, entity, 0.0, true);
        tick(&mut app);

        println!("PROOF: coyote jump velocity {:?}", body_velocity(&app, entity));
        assert_eq!(body_velocity(&app, entity).y, 20.0);
    }

    #[test]
    fn coyote_window_edges() {
        let grace = ControllerConfig::default().airborne_grace_period as usize;

        // Pressed on the last tick of the window
        let mut app = create_test_app();
        let entity = spawn_character(&mut app);
        land(&mut app, entity);
        surfaces(&mut app).ground_hits.clear();
        run_ticks(&mut app, grace - 1);
        poll(&mut app, entity, 0.0, true);
        tick(&mut app);

        assert_eq!(state(&app, entity).airborne_frames() as usize, grace);
        assert_eq!(body_velocity(&app, entity).y, 20.0);

        // Pressed one tick later
        let mut app = create_test_app();
        let entity = spawn_character(&mut app);
        land(&mut app, entity);
        surfaces(&mut app).ground_hits.clear();
        run_ticks(&mut app, grace);
        poll(&mut app, entity, 0.0, true);
        tick(&mut app);

        let state = state(&app, entity);
        println!("PROOF: press after {} airborne ticks buffered", state.airborne_frames());
        assert_eq!(state.airborne_frames() as usize, grace + 1);
        assert!(state.jump_buffered());
        assert!(body_velocity(&app, entity).y < 0.0);
    }

    #[test]
    fn late_press_is_buffered_not_consumed() {
        let mut app = create_test_app();
        let entity = spawn_character(&mut app);
        run_ticks(&mut app, 6);

        poll(&mut app, entity, 0.0, true);
        tick(&mut app);

        let state = state(&app, entity);
        assert!(state.velocity().y < 0.0);
        assert!(state.jump_buffered());
    }

    #[test]
    fn buffered_jump_fires_on_landing() {
        let mut app = create_test_app();
        let entity = spawn_character(&mut app);
        run_ticks(&mut app, 6);

        poll(&mut app, entity, 0.0, true);
        tick(&mut app);

        send_ground_contact(&mut app, entity);
        tick(&mut app);

        println!("PROOF: buffered jump velocity {:?}", body_velocity(&app, entity));
        assert_eq!(body_velocity(&app, entity).y, 20.0);
    }

    #[test]
    fn buffered_jump_expires_before_landing() {
        let mut app = create_test_app();
        let entity = spawn_character(&mut app);
        run_ticks(&mut app, 6);

        poll(&mut app, entity, 0.0, true);
        tick(&mut app);

        run_ticks(&mut app, 4);
        assert!(state(&app, entity).jump_buffered());
        tick(&mut app);
        assert!(!state(&app, entity).jump_buffered());

        send_ground_contact(&mut app, entity);
        tick(&mut app);

        let state = state(&app, entity);
        assert!(state.grounded());
        assert_eq!(state.velocity(), Vec2::ZERO);
    }

    #[test]
    fn low_ceiling_forces_crouch_and_blocks_jump() {
        let mut app = create_test_app();
        let entity = spawn_character(&mut app);
        land(&mut app, entity);

        surfaces(&mut app).ceiling_blocked = true;
        poll(&mut app, entity, 1.0, true);
        tick(&mut app);

        let state = state(&app, entity);
        let velocity = body_velocity(&app, entity);
        println!("PROOF: crouched velocity {:?}", velocity);
        assert!(state.crouching());
        assert!(!state.jump_buffered());
        assert!((velocity.x - 3.6).abs() < 1e-4);
        assert_eq!(velocity.y, 0.0);
        assert!(app.world().get::<Crouching>(entity).is_some());
        assert!(app.world().get::<TouchingCeiling>(entity).is_some());

        surfaces(&mut app).ceiling_blocked = false;
        tick(&mut app);
        assert!(app.world().get::<Crouching>(entity).is_none());
    }
}
