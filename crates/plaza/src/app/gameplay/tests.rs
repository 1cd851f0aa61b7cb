    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;

    use engine::{
        AssetCatalog, DrawCommand, DrawList, EntityId, InputAction, InputSnapshot, Scene, TileMap,
        Vec2,
    };
    use serde_json::json;

    use super::actor::AnimState;
    use super::config::PlazaConfig;
    use super::player::MoveMode;
    use super::tile_world::{FALLBACK_BOUNDS, FALLBACK_SPAWN};
    use super::wander::{CritterVariant, WanderState};

    const MAP_TILES_W: usize = 25;
    const MAP_TILES_H: usize = 20;
    const WALL_ROW: usize = 18;
    const ALL_LAYERS: [&str; 3] = ["Below Player", "World", "Above Player"];
    const SPAWN: Vec2 = Vec2::new(320.0, 320.0);
    const DT: f32 = 1.0 / 60.0;

    fn layer_data(name: &str) -> Vec<u32> {
        let count = MAP_TILES_W * MAP_TILES_H;
        match name {
            "Below Player" => vec![1; count],
            "World" => (0..count)
                .map(|index| if index / MAP_TILES_W == WALL_ROW { 2 } else { 0 })
                .collect(),
            _ => vec![0; count],
        }
    }

    fn plaza_map_json(tile_layers: &[&str], spawn_point: Option<Vec2>) -> String {
        let mut layers = tile_layers
            .iter()
            .map(|name| json!({"type": "tilelayer", "name": name, "data": layer_data(name)}))
            .collect::<Vec<_>>();
        if let Some(point) = spawn_point {
            layers.push(json!({
                "type": "objectgroup",
                "name": "Objects",
                "objects": [{"name": "Spawn Point", "x": point.x, "y": point.y}]
            }));
        }
        json!({
            "width": MAP_TILES_W, "height": MAP_TILES_H, "tilewidth": 32, "tileheight": 32,
            "layers": layers,
            "tilesets": [{
                "firstgid": 1, "name": "plaza", "tilewidth": 32, "tileheight": 32,
                "columns": 2, "tilecount": 4,
                "tiles": [{"id": 1, "properties": [
                    {"name": "collides", "type": "bool", "value": true}
                ]}]
            }]
        })
        .to_string()
    }

    fn catalog_with_map(tile_layers: &[&str], spawn_point: Option<Vec2>) -> AssetCatalog {
        let map = TileMap::from_json_str(&plaza_map_json(tile_layers, spawn_point)).expect("map");
        let mut assets = AssetCatalog::new(PathBuf::from("assets"));
        assets.insert_map("plaza", map);
        assets
    }

    fn config_with_spawns(count: u32) -> PlazaConfig {
        let mut config = PlazaConfig::default();
        config.spawn.count = count;
        config.seed = Some(7);
        config
    }

    fn created_orchestrator(config: PlazaConfig) -> WorldOrchestrator {
        let assets = catalog_with_map(&ALL_LAYERS, Some(SPAWN));
        let mut orchestrator = WorldOrchestrator::new(config);
        assert!(orchestrator.create(&assets));
        orchestrator
    }

    fn advance(orchestrator: &mut WorldOrchestrator, seconds: f32, dt: f32) {
        let steps = (seconds / dt).round() as u32;
        for _ in 0..steps {
            orchestrator.update(dt, &InputSnapshot::empty());
        }
    }

    fn snapshot_from_actions(actions: &[InputAction]) -> InputSnapshot {
        let mut snapshot = InputSnapshot::empty();
        for action in actions {
            snapshot = snapshot.with_action_down(*action, true);
        }
        snapshot
    }

    fn click_snapshot(cursor_px: Vec2, window_size: (u32, u32)) -> InputSnapshot {
        InputSnapshot::empty()
            .with_left_click_pressed(true)
            .with_cursor_position_px(Some(cursor_px))
            .with_window_size(window_size)
    }

    fn assert_vec2_close(actual: Vec2, expected: Vec2, epsilon: f32) {
        assert!(
            (actual.x - expected.x).abs() <= epsilon,
            "x {} vs {}",
            actual.x,
            expected.x
        );
        assert!(
            (actual.y - expected.y).abs() <= epsilon,
            "y {} vs {}",
            actual.y,
            expected.y
        );
    }

    fn player_position(orchestrator: &WorldOrchestrator) -> Vec2 {
        orchestrator.player().expect("player").actor().position()
    }

    fn critter_gap(orchestrator: &WorldOrchestrator, a: EntityId, b: EntityId) -> f32 {
        let first = orchestrator.critter(a).expect("first").actor().position();
        let second = orchestrator.critter(b).expect("second").actor().position();
        first.distance(second)
    }

    #[test]
    fn create_places_player_at_declared_spawn_point() {
        let orchestrator = created_orchestrator(config_with_spawns(0));
        assert!(orchestrator.is_created());
        assert_eq!(player_position(&orchestrator), SPAWN);
        assert_eq!(orchestrator.world().bounds(), (800.0, 640.0));
        let player_id = orchestrator.player().expect("player").actor().id();
        assert_eq!(orchestrator.camera_rig().target(), Some(player_id));
        assert_eq!(
            orchestrator.animation().current_clip(player_id),
            Some("player-idle")
        );
    }

    #[test]
    fn diagonal_keyboard_speed_matches_axis_speed() {
        let mut orchestrator = created_orchestrator(config_with_spawns(0));
        orchestrator.update(
            DT,
            &snapshot_from_actions(&[InputAction::MoveUp, InputAction::MoveRight]),
        );
        let velocity = orchestrator.player().expect("player").actor().velocity();
        assert!((velocity.length() - 160.0).abs() < 1e-3, "{velocity:?}");
        assert!(velocity.x > 0.0 && velocity.y < 0.0);

        orchestrator.update(DT, &snapshot_from_actions(&[InputAction::MoveLeft]));
        let velocity = orchestrator.player().expect("player").actor().velocity();
        assert_vec2_close(velocity, Vec2::new(-160.0, 0.0), 1e-3);
    }

    #[test]
    fn seek_arrives_within_tick_budget_without_overshoot() {
        let mut orchestrator = created_orchestrator(config_with_spawns(0));
        let target = Vec2::new(520.0, 420.0);
        orchestrator
            .player_mut()
            .expect("player")
            .set_seek_target(target);

        let distance = SPAWN.distance(target);
        let budget = (distance / (160.0 * DT)).ceil() as u32;
        let heading = (target - SPAWN).normalized().expect("heading");
        let mut arrived_at = None;
        for tick in 1..=budget + 1 {
            orchestrator.update(DT, &InputSnapshot::empty());
            let position = player_position(&orchestrator);
            let progress = (position - SPAWN).dot(heading);
            assert!(
                progress <= distance + 5.0,
                "overshoot at tick {tick}: {progress} > {distance}"
            );
            if arrived_at.is_none() && position.distance(target) < 5.0 {
                arrived_at = Some(tick);
            }
        }

        let arrived_at = arrived_at.expect("player should arrive");
        assert!(arrived_at <= budget, "arrived at {arrived_at}, budget {budget}");
        let player = orchestrator.player().expect("player");
        assert_eq!(player.mode(), MoveMode::Idle);
        assert_eq!(player.seek_target(), None);
        assert_eq!(player.actor().velocity(), Vec2::ZERO);
        assert_eq!(player.actor().anim_state(), AnimState::Idle);
    }

    #[test]
    fn keyboard_preempts_seek_on_the_same_tick() {
        let mut orchestrator = created_orchestrator(config_with_spawns(0));
        orchestrator
            .player_mut()
            .expect("player")
            .set_seek_target(Vec2::new(600.0, 320.0));
        orchestrator.update(DT, &snapshot_from_actions(&[InputAction::MoveLeft]));

        let player = orchestrator.player().expect("player");
        assert_eq!(player.seek_target(), None);
        assert!(matches!(player.mode(), MoveMode::KeyboardMove { .. }));
        assert_vec2_close(player.actor().velocity(), Vec2::new(-160.0, 0.0), 1e-3);

        // Releasing the keys does not resume the discarded target.
        orchestrator.update(DT, &InputSnapshot::empty());
        let player = orchestrator.player().expect("player");
        assert_eq!(player.mode(), MoveMode::Idle);
        assert_eq!(player.actor().velocity(), Vec2::ZERO);
    }

    #[test]
    fn click_and_key_on_same_tick_resolve_to_keyboard() {
        let mut orchestrator = created_orchestrator(config_with_spawns(0));
        let input = click_snapshot(Vec2::new(700.0, 300.0), (800, 600))
            .with_action_down(InputAction::MoveDown, true);
        orchestrator.update(DT, &input);

        let player = orchestrator.player().expect("player");
        assert_eq!(player.seek_target(), None);
        assert_vec2_close(player.actor().velocity(), Vec2::new(0.0, 160.0), 1e-3);
    }

    #[test]
    fn unbound_keyboard_degrades_to_seek_only() {
        let mut orchestrator = created_orchestrator(config_with_spawns(0));
        let phantom = snapshot_from_actions(&[InputAction::MoveRight]).with_keyboard_bound(false);
        orchestrator.update(DT, &phantom);
        let player = orchestrator.player().expect("player");
        assert_eq!(player.mode(), MoveMode::Idle);
        assert_eq!(player.actor().velocity(), Vec2::ZERO);

        let target = Vec2::new(320.0, 500.0);
        orchestrator
            .player_mut()
            .expect("player")
            .set_seek_target(target);
        orchestrator.update(DT, &phantom);
        let player = orchestrator.player().expect("player");
        assert_eq!(player.seek_target(), Some(target));
        assert_vec2_close(player.actor().velocity(), Vec2::new(0.0, 160.0), 1e-3);
    }

    #[test]
    fn click_sets_world_space_seek_target() {
        let mut orchestrator = created_orchestrator(config_with_spawns(0));
        assert_eq!(
            orchestrator.camera_rig().camera().position,
            Vec2::new(400.0, 320.0)
        );
        orchestrator.update(DT, &click_snapshot(Vec2::new(500.0, 350.0), (800, 600)));

        let target = orchestrator
            .player()
            .expect("player")
            .seek_target()
            .expect("target");
        assert_vec2_close(target, Vec2::new(500.0, 370.0), 1e-3);
    }

    #[test]
    fn click_outside_the_world_is_clamped_to_reachable_area() {
        let mut orchestrator = created_orchestrator(config_with_spawns(0));
        orchestrator.update(DT, &click_snapshot(Vec2::new(-500.0, 2000.0), (800, 600)));
        let target = orchestrator
            .player()
            .expect("player")
            .seek_target()
            .expect("target");
        assert_vec2_close(target, Vec2::new(32.0, 608.0), 1e-3);
    }

    #[test]
    fn solid_tiles_block_the_player() {
        let mut orchestrator = created_orchestrator(config_with_spawns(0));
        let down = snapshot_from_actions(&[InputAction::MoveDown]);
        for _ in 0..180 {
            orchestrator.update(DT, &down);
        }
        let wall_top = (WALL_ROW * 32) as f32;
        let position = player_position(&orchestrator);
        assert!(position.y <= wall_top - 32.0 + 0.01, "{position:?}");
        assert!(position.y > wall_top - 40.0, "{position:?}");
        assert!(orchestrator.world().is_solid_at(Vec2::new(10.0, wall_top + 1.0)));
    }

    #[test]
    fn wander_cycle_walks_then_returns_to_idle() {
        let mut orchestrator = created_orchestrator(config_with_spawns(0));
        let id = orchestrator
            .spawn_critter_at(Vec2::new(600.0, 400.0), CritterVariant::Slate, Duration::ZERO)
            .expect("critter");
        let dt = 0.05;

        advance(&mut orchestrator, 1.5, dt);
        let critter = orchestrator.critter(id).expect("critter");
        assert_eq!(critter.state(), WanderState::Idle);
        assert_eq!(critter.actor().velocity(), Vec2::ZERO);

        advance(&mut orchestrator, 1.0, dt);
        let critter = orchestrator.critter(id).expect("critter");
        let WanderState::Walking { speed, .. } = critter.state() else {
            panic!("expected walking at 2.5s, got {:?}", critter.state());
        };
        assert!((20.0..=50.0).contains(&speed));
        assert!((critter.actor().velocity().length() - speed).abs() < 1e-3);
        assert_eq!(
            orchestrator.animation().current_clip(id),
            Some("critter-slate-walk")
        );

        advance(&mut orchestrator, 1.0, dt);
        let critter = orchestrator.critter(id).expect("critter");
        assert_eq!(critter.state(), WanderState::Idle);
        assert_eq!(critter.actor().velocity(), Vec2::ZERO);
        assert_eq!(
            orchestrator.animation().current_clip(id),
            Some("critter-slate-idle")
        );

        advance(&mut orchestrator, 1.0, dt);
        let critter = orchestrator.critter(id).expect("critter");
        assert!(matches!(critter.state(), WanderState::Walking { .. }));
    }

    #[test]
    fn critter_spawned_on_the_margin_stays_where_it_was_placed() {
        let mut orchestrator = created_orchestrator(config_with_spawns(0));
        let corner = Vec2::new(100.0, 100.0);
        let id = orchestrator
            .spawn_critter_at(corner, CritterVariant::Amber, Duration::ZERO)
            .expect("critter");

        orchestrator.update(DT, &InputSnapshot::empty());
        let critter = orchestrator.critter(id).expect("critter");
        assert_eq!(critter.state(), WanderState::Idle);
        assert_eq!(critter.actor().position(), corner);
    }

    #[test]
    fn walking_critter_resumes_walk_after_hurt_window() {
        let mut orchestrator = created_orchestrator(config_with_spawns(0));
        let walker = orchestrator
            .spawn_critter_at(Vec2::new(600.0, 200.0), CritterVariant::Amber, Duration::ZERO)
            .expect("walker");
        advance(&mut orchestrator, 2.05, DT);

        let critter = orchestrator.critter(walker).expect("walker");
        assert!(matches!(critter.state(), WanderState::Walking { .. }));
        let heading = critter
            .committed_velocity()
            .normalized()
            .expect("walking heading");
        // Place a bystander just behind the walker so the knockback carries it
        // further along its heading.
        let behind = critter.actor().position() - heading * 20.0;
        let elapsed = orchestrator.elapsed();
        orchestrator
            .spawn_critter_at(behind, CritterVariant::Moss, elapsed)
            .expect("bystander");

        orchestrator.update(DT, &InputSnapshot::empty());
        let critter = orchestrator.critter(walker).expect("walker");
        assert_eq!(critter.actor().anim_state(), AnimState::Hurt);
        assert!(matches!(critter.state(), WanderState::Walking { .. }));

        // Past the 500ms hurt window, still inside the 1s walk window.
        advance(&mut orchestrator, 0.6, DT);
        let critter = orchestrator.critter(walker).expect("walker");
        assert!(matches!(critter.state(), WanderState::Walking { .. }));
        assert_eq!(critter.actor().anim_state(), AnimState::Walk);
        assert_eq!(
            orchestrator.animation().current_clip(walker),
            Some("critter-amber-walk")
        );
        assert_vec2_close(
            critter.actor().velocity(),
            critter.committed_velocity(),
            1e-3,
        );
    }

    #[test]
    fn seeking_player_keeps_target_through_contact() {
        let mut orchestrator = created_orchestrator(config_with_spawns(0));
        orchestrator
            .spawn_critter_at(Vec2::new(420.0, 320.0), CritterVariant::Slate, Duration::ZERO)
            .expect("critter");
        let target = Vec2::new(600.0, 320.0);
        orchestrator
            .player_mut()
            .expect("player")
            .set_seek_target(target);

        let mut contact_x = None;
        for _ in 0..60 {
            orchestrator.update(DT, &InputSnapshot::empty());
            let player = orchestrator.player().expect("player");
            if player.actor().anim_state() == AnimState::Hurt {
                contact_x = Some(player.actor().position().x);
                break;
            }
        }
        let contact_x = contact_x.expect("player should reach the critter");
        let player = orchestrator.player().expect("player");
        assert_eq!(player.mode(), MoveMode::SeekMove { target });

        advance(&mut orchestrator, 0.8, DT);
        let player = orchestrator.player().expect("player");
        assert_eq!(player.seek_target(), Some(target));
        assert!(player.actor().position().x > contact_x);
        assert!(player.actor().velocity().x > 0.0);
    }

    #[test]
    fn critter_collision_hurts_knocks_back_then_reverts_to_idle() {
        let mut orchestrator = created_orchestrator(config_with_spawns(0));
        let a = orchestrator
            .spawn_critter_at(Vec2::new(500.0, 200.0), CritterVariant::Amber, Duration::ZERO)
            .expect("a");
        let b = orchestrator
            .spawn_critter_at(Vec2::new(520.0, 200.0), CritterVariant::Moss, Duration::ZERO)
            .expect("b");
        assert!(orchestrator.broker().is_paired(a, b));

        orchestrator.update(DT, &InputSnapshot::empty());
        for (id, clip) in [(a, "critter-amber-hurt"), (b, "critter-moss-hurt")] {
            let critter = orchestrator.critter(id).expect("critter");
            assert_eq!(critter.actor().anim_state(), AnimState::Hurt);
            assert_eq!(orchestrator.animation().current_clip(id), Some(clip));
            assert!(critter.actor().has_pending_knockback());
        }
        assert!((critter_gap(&orchestrator, a, b) - 64.0).abs() < 1e-3);

        orchestrator.update(DT, &InputSnapshot::empty());
        assert!(critter_gap(&orchestrator, a, b) > 66.0);
        for id in [a, b] {
            let critter = orchestrator.critter(id).expect("critter");
            assert_eq!(critter.actor().velocity(), Vec2::ZERO);
            assert_eq!(critter.actor().anim_state(), AnimState::Hurt);
        }

        advance(&mut orchestrator, 0.8, DT);
        for (id, clip) in [(a, "critter-amber-idle"), (b, "critter-moss-idle")] {
            let critter = orchestrator.critter(id).expect("critter");
            assert_eq!(critter.actor().anim_state(), AnimState::Idle);
            assert!(!critter.actor().is_hurt());
            assert_eq!(orchestrator.animation().current_clip(id), Some(clip));
        }
    }

    #[test]
    fn player_contact_hurts_both_without_knockback() {
        let mut orchestrator = created_orchestrator(config_with_spawns(0));
        let id = orchestrator
            .spawn_critter_at(Vec2::new(350.0, 320.0), CritterVariant::Rose, Duration::ZERO)
            .expect("critter");

        orchestrator.update(DT, &InputSnapshot::empty());
        let player = orchestrator.player().expect("player");
        let critter = orchestrator.critter(id).expect("critter");
        assert_eq!(player.actor().anim_state(), AnimState::Hurt);
        assert_eq!(critter.actor().anim_state(), AnimState::Hurt);
        assert!(!player.actor().has_pending_knockback());
        assert!(!critter.actor().has_pending_knockback());
        assert_eq!(player.mode(), MoveMode::Idle);

        advance(&mut orchestrator, 0.1, DT);
        let gap = player_position(&orchestrator).distance(
            orchestrator
                .critter(id)
                .expect("critter")
                .actor()
                .position(),
        );
        assert!((gap - 64.0).abs() < 1e-3, "gap {gap}");
    }

    #[test]
    fn spawns_are_staggered_from_batch_start() {
        let mut orchestrator = created_orchestrator(config_with_spawns(15));
        assert_eq!(orchestrator.scheduled_task_count(), 15);
        assert!(orchestrator.critters().is_empty());

        advance(&mut orchestrator, 7.5, 0.05);
        let stamps = orchestrator
            .critters()
            .iter()
            .map(|critter| critter.spawned_at().as_millis() as u64)
            .collect::<Vec<_>>();
        let expected = (0..15).map(|index| index * 500).collect::<Vec<u64>>();
        assert_eq!(stamps, expected);
    }

    #[test]
    fn spawned_critters_are_wired_against_player_and_earlier_critters() {
        let mut orchestrator = created_orchestrator(config_with_spawns(3));
        advance(&mut orchestrator, 1.1, 0.05);
        assert_eq!(orchestrator.critters().len(), 3);
        // player x 3 critters, plus 3 critter pairs
        assert_eq!(orchestrator.broker().pair_count(), 6);
        for critter in orchestrator.critters() {
            assert!(orchestrator
                .broker()
                .collides_with_static(critter.actor().id()));
        }
    }

    #[test]
    fn critters_stay_inside_spawn_margin_for_a_minute() {
        let mut orchestrator = created_orchestrator(config_with_spawns(15));
        let margin = 100.0;
        let (width, height) = orchestrator.world().bounds();
        for _ in 0..60 {
            advance(&mut orchestrator, 1.0, 1.0 / 30.0);
            for critter in orchestrator.critters() {
                let position = critter.actor().position();
                assert!(
                    position.x >= margin && position.x <= width - margin,
                    "{position:?}"
                );
                assert!(
                    position.y >= margin && position.y <= height - margin,
                    "{position:?}"
                );
            }
        }
        assert_eq!(orchestrator.critters().len(), 15);
    }

    #[test]
    fn despawned_critter_never_resurrects() {
        let mut orchestrator = created_orchestrator(config_with_spawns(0));
        let a = orchestrator
            .spawn_critter_at(Vec2::new(500.0, 200.0), CritterVariant::Amber, Duration::ZERO)
            .expect("a");
        let b = orchestrator
            .spawn_critter_at(Vec2::new(520.0, 200.0), CritterVariant::Moss, Duration::ZERO)
            .expect("b");
        orchestrator.update(DT, &InputSnapshot::empty());
        assert!(orchestrator.pending_tasks_for(a) >= 2);

        assert!(orchestrator.despawn_critter(a));
        assert_eq!(orchestrator.pending_tasks_for(a), 0);
        assert!(orchestrator.critter(a).is_none());
        assert!(!orchestrator.broker().is_paired(a, b));
        assert_eq!(orchestrator.animation().current_clip(a), None);

        advance(&mut orchestrator, 3.0, DT);
        assert!(orchestrator.critter(a).is_none());
        assert_eq!(orchestrator.critters().len(), 1);
        assert!(!orchestrator.despawn_critter(a));
        assert_ne!(
            orchestrator.critter(b).expect("b").actor().anim_state(),
            AnimState::Hurt
        );
    }

    #[test]
    fn teardown_cancels_tasks_and_unbinds_camera() {
        let mut orchestrator = created_orchestrator(config_with_spawns(15));
        advance(&mut orchestrator, 1.2, 0.05);
        assert_eq!(orchestrator.critters().len(), 3);

        orchestrator.teardown();
        assert!(!orchestrator.is_created());
        assert!(orchestrator.player().is_none());
        assert!(orchestrator.critters().is_empty());
        assert_eq!(orchestrator.scheduled_task_count(), 0);
        assert_eq!(orchestrator.camera_rig().target(), None);
        assert_eq!(orchestrator.broker().pair_count(), 0);

        let elapsed = orchestrator.elapsed();
        orchestrator.update(0.5, &InputSnapshot::empty());
        assert_eq!(orchestrator.elapsed(), elapsed);
        assert!(orchestrator.critters().is_empty());
    }

    #[test]
    fn missing_spawn_point_falls_back_with_world_still_created() {
        let assets = catalog_with_map(&ALL_LAYERS, None);
        let mut orchestrator = WorldOrchestrator::new(config_with_spawns(0));
        assert!(orchestrator.create(&assets));
        assert_eq!(player_position(&orchestrator), FALLBACK_SPAWN);
    }

    #[test]
    fn create_fails_without_map() {
        let assets = AssetCatalog::new(PathBuf::from("assets"));
        let mut orchestrator = WorldOrchestrator::new(config_with_spawns(15));
        assert!(!orchestrator.create(&assets));
        assert!(orchestrator.player().is_none());
        assert_eq!(orchestrator.scheduled_task_count(), 0);
        assert_eq!(orchestrator.camera_rig().target(), None);
        assert_eq!(orchestrator.world().bounds(), FALLBACK_BOUNDS);

        advance(&mut orchestrator, 1.0, 0.05);
        assert!(orchestrator.critters().is_empty());
    }

    #[test]
    fn create_fails_when_collision_layer_is_missing() {
        let assets = catalog_with_map(&["Below Player", "Above Player"], Some(SPAWN));
        let mut orchestrator = WorldOrchestrator::new(config_with_spawns(15));
        assert!(!orchestrator.create(&assets));
        assert!(orchestrator.player().is_none());
        assert_eq!(orchestrator.scheduled_task_count(), 0);
    }

    #[test]
    fn camera_zoom_steps_are_clamped() {
        let mut orchestrator = created_orchestrator(config_with_spawns(0));
        orchestrator.update(DT, &InputSnapshot::empty().with_zoom_delta_steps(-10));
        assert_eq!(orchestrator.camera_rig().zoom_level(), 0.5);
        assert_eq!(
            orchestrator.camera_rig().camera().position,
            Vec2::new(400.0, 320.0)
        );

        orchestrator.update(DT, &InputSnapshot::empty().with_zoom_delta_steps(20));
        assert_eq!(orchestrator.camera_rig().zoom_level(), 1.0);
    }

    #[test]
    fn camera_follows_player_movement() {
        let mut orchestrator = created_orchestrator(config_with_spawns(0));
        let down = snapshot_from_actions(&[InputAction::MoveDown]).with_window_size((400, 300));
        for _ in 0..30 {
            orchestrator.update(DT, &down);
        }
        let camera = orchestrator.camera_rig().camera();
        assert_vec2_close(camera.position, player_position(&orchestrator), 1e-3);
    }

    #[test]
    fn draw_orders_tiles_then_actors() {
        let mut orchestrator = created_orchestrator(config_with_spawns(0));
        orchestrator
            .spawn_critter_at(Vec2::new(400.0, 250.0), CritterVariant::Moss, Duration::ZERO)
            .expect("critter");
        let mut draw_list = DrawList::default();
        orchestrator.draw(&mut draw_list);

        let commands = draw_list.commands();
        let first_circle = commands
            .iter()
            .position(|command| matches!(command, DrawCommand::Circle { .. }))
            .expect("circle");
        assert!(first_circle > 0);
        assert!(commands[..first_circle]
            .iter()
            .all(|command| matches!(command, DrawCommand::Tile { .. })));
        let circles = commands
            .iter()
            .filter(|command| matches!(command, DrawCommand::Circle { .. }))
            .count();
        assert_eq!(circles, 2);
        // Sorted by y: the critter above the player is drawn first.
        match &commands[first_circle] {
            DrawCommand::Circle { rgba, .. } => {
                assert_eq!(*rgba, CritterVariant::Moss.body_rgba())
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn debug_title_reports_critter_count() {
        let mut orchestrator = created_orchestrator(config_with_spawns(2));
        assert_eq!(
            Scene::debug_title(&orchestrator).as_deref(),
            Some("Plaza | critters: 0")
        );
        advance(&mut orchestrator, 0.6, 0.05);
        assert_eq!(
            Scene::debug_title(&orchestrator).as_deref(),
            Some("Plaza | critters: 2")
        );
    }

    #[test]
    fn preload_reads_map_from_asset_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("maps")).expect("maps dir");
        fs::write(
            dir.path().join("maps/plaza.json"),
            plaza_map_json(&ALL_LAYERS, Some(SPAWN)),
        )
        .expect("write map");

        let mut assets = AssetCatalog::new(dir.path().to_path_buf());
        let mut orchestrator = WorldOrchestrator::new(config_with_spawns(0));
        orchestrator.preload_assets(&mut assets);
        assert!(orchestrator.create(&assets));
        assert_eq!(player_position(&orchestrator), SPAWN);
    }

    #[test]
    fn build_scene_surfaces_config_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(build_scene(dir.path(), None).is_ok());
        assert!(matches!(
            build_scene(dir.path(), Some("not-a-seed")),
            Err(ConfigError::Seed { .. })
        ));

        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{"wander": {"decide_ms": 500, "walk_ms": 900}}"#,
        )
        .expect("write config");
        assert!(matches!(
            build_scene(dir.path(), None),
            Err(ConfigError::Invalid { .. })
        ));
    }
