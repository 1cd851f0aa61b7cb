use std::collections::HashMap;
use std::time::Duration;

use engine::{
    screen_to_world_px, AnimationPlayer, AnimationStage, ArcadePhysics, AssetCatalog,
    DrawCommand, DrawList, EntityId, EntityIdAllocator, FiredTask, InputSnapshot, PhysicsWorld,
    TaskOwner, TimerId, TimerQueue, Vec2,
};
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use tracing::{debug, error, info, warn};

use super::actor::{Actor, AnimState};
use super::camera_rig::CameraRig;
use super::collision::{CollisionBroker, Contact, ContactKind};
use super::config::PlazaConfig;
use super::player::PlayerController;
use super::spawn::SpawnDirector;
use super::tile_world::{LayerSlot, TileWorld};
use super::wander::{CritterVariant, WanderAi};

pub(crate) const PLAYER_SHEET: &str = "player";
const PLAYER_RGBA: [u8; 4] = [70, 160, 255, 255];
const HURT_RGBA: [u8; 4] = [230, 40, 40, 255];
const FACING_NOTCH_RGBA: [u8; 4] = [20, 20, 24, 255];
const CLEAR_RGBA: [u8; 4] = [24, 28, 32, 255];
const DEFAULT_WINDOW_SIZE: (u32, u32) = (800, 600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorldTask {
    Spawn { index: u32 },
    WanderDecide,
    WanderStop,
    HurtRevert,
}

/// Owns the world and every entity in it. Drives one simulation tick per
/// `update` and is the only place entities are created or destroyed.
pub(crate) struct WorldOrchestrator {
    config: PlazaConfig,
    physics: Box<dyn PhysicsWorld>,
    animation: Box<dyn AnimationPlayer>,
    rng: XorShiftRng,
    ids: EntityIdAllocator,
    timers: TimerQueue<WorldTask>,
    world: TileWorld,
    player: Option<PlayerController>,
    critters: Vec<WanderAi>,
    broker: CollisionBroker,
    camera_rig: CameraRig,
    spawner: SpawnDirector,
    hurt_timers: HashMap<EntityId, TimerId>,
    window_size: (u32, u32),
    created: bool,
}

impl WorldOrchestrator {
    pub(crate) fn new(config: PlazaConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => XorShiftRng::seed_from_u64(seed),
            None => XorShiftRng::from_entropy(),
        };
        Self::with_capabilities(
            config,
            Box::new(ArcadePhysics),
            Box::new(AnimationStage::default()),
            rng,
        )
    }

    pub(crate) fn with_capabilities(
        config: PlazaConfig,
        physics: Box<dyn PhysicsWorld>,
        animation: Box<dyn AnimationPlayer>,
        rng: XorShiftRng,
    ) -> Self {
        Self {
            world: TileWorld::new(config.world.clone()),
            camera_rig: CameraRig::new(&config.camera),
            spawner: SpawnDirector::new(&config.spawn),
            config,
            physics,
            animation,
            rng,
            ids: EntityIdAllocator::default(),
            timers: TimerQueue::default(),
            player: None,
            critters: Vec::new(),
            broker: CollisionBroker::default(),
            hurt_timers: HashMap::new(),
            window_size: DEFAULT_WINDOW_SIZE,
            created: false,
        }
    }

    pub(crate) fn preload_assets(&mut self, assets: &mut AssetCatalog) {
        let world = &self.config.world;
        if !assets.load_map(&world.map_key, &world.map_path) {
            warn!(map = %world.map_key, path = %world.map_path, "map_preload_failed");
        }
    }

    /// Builds the world and its population. Returns false, with nothing
    /// spawned and the camera unbound, when the map is unusable.
    pub(crate) fn create(&mut self, assets: &AssetCatalog) -> bool {
        if self.created {
            warn!("world_already_created");
            return true;
        }
        if let Err(err) = self.world.load(assets) {
            error!(error = %err, "world_create_failed");
            return false;
        }

        let bounds = self.world.bounds_rect();
        let spawn = self.world.find_spawn_point(&self.config.world.spawn_point);
        let id = self.ids.allocate();
        let mut body = self
            .physics
            .create_body(spawn, self.config.collision.actor_radius);
        body.set_bounds(Some(bounds));
        body.set_restitution(0.0);
        let actor = Actor::new(id, PLAYER_SHEET, body, self.animation.as_mut());
        self.broker.wire_static(id);
        self.player = Some(PlayerController::new(actor, &self.config.player));

        self.camera_rig.follow(id, bounds);
        self.camera_rig.update(spawn, self.window_size);
        self.spawner
            .spawn_batch(self.config.spawn.count, &mut self.timers);
        self.created = true;
        info!(
            player = id.0,
            spawn_x = spawn.x,
            spawn_y = spawn.y,
            world_w = bounds.width(),
            world_h = bounds.height(),
            "world_created"
        );
        true
    }

    pub(crate) fn update(&mut self, dt_seconds: f32, input: &InputSnapshot) {
        if !self.created {
            return;
        }
        let dt = sanitize_dt(dt_seconds);
        let (width, height) = input.window_size();
        if width > 0 && height > 0 {
            self.window_size = (width, height);
        }

        self.timers
            .advance(Duration::try_from_secs_f32(dt).unwrap_or(Duration::ZERO));
        while let Some(task) = self.timers.pop_due() {
            self.dispatch(task);
        }

        self.apply_pointer_and_zoom(input);

        if let Some(player) = self.player.as_mut() {
            player.update(input, dt, self.animation.as_mut());
        }
        for critter in &mut self.critters {
            critter.apply_motion(self.animation.as_mut());
        }

        self.step_bodies(dt);
        self.resolve_contacts();
        self.animation.tick(dt);

        if let Some(position) = self.player.as_ref().map(|p| p.actor().position()) {
            self.camera_rig.update(position, self.window_size);
        }
    }

    pub(crate) fn teardown(&mut self) {
        let cancelled = self.timers.len();
        self.timers.clear();
        self.hurt_timers.clear();
        let removed = self.critters.len();
        for critter in self.critters.drain(..) {
            self.animation.forget(critter.actor().id());
        }
        if let Some(player) = self.player.take() {
            self.animation.forget(player.actor().id());
        }
        self.broker.clear();
        self.camera_rig.unbind();
        self.created = false;
        info!(
            cancelled_tasks = cancelled,
            critters = removed,
            "world_torn_down"
        );
    }

    /// Removes one critter together with its tasks, pairs and playhead.
    pub(crate) fn despawn_critter(&mut self, id: EntityId) -> bool {
        let Some(slot) = self
            .critters
            .iter()
            .position(|critter| critter.actor().id() == id)
        else {
            return false;
        };
        let critter = self.critters.remove(slot);
        let lifetime = self.timers.now().saturating_sub(critter.spawned_at());
        let cancelled = self.timers.cancel_owner(TaskOwner::Entity(id));
        self.hurt_timers.remove(&id);
        self.broker.forget(id);
        self.animation.forget(id);
        info!(
            entity = id.0,
            cancelled_tasks = cancelled,
            lifetime_ms = lifetime.as_millis() as u64,
            "critter_despawned"
        );
        true
    }

    pub(crate) fn spawn_critter_at(
        &mut self,
        position: Vec2,
        variant: CritterVariant,
        spawned_at: Duration,
    ) -> Option<EntityId> {
        let player_id = self.player.as_ref()?.actor().id();
        let id = self.ids.allocate();
        let mut body = self
            .physics
            .create_body(position, self.config.collision.actor_radius);
        body.set_bounds(Some(self.spawner.body_bounds(
            self.world.bounds_rect(),
            self.config.collision.actor_radius,
        )));
        body.set_restitution(0.0);
        let actor = Actor::new(id, variant.sheet(), body, self.animation.as_mut());

        self.broker.wire_static(id);
        self.broker.wire_pair(player_id, id);
        for other in &self.critters {
            self.broker.wire_pair(other.actor().id(), id);
        }
        self.timers.every(
            TaskOwner::Entity(id),
            self.config.wander.decide_interval(),
            WorldTask::WanderDecide,
        );
        self.critters.push(WanderAi::new(actor, variant, spawned_at));
        info!(
            entity = id.0,
            variant = ?variant,
            x = position.x,
            y = position.y,
            spawned_at_ms = spawned_at.as_millis() as u64,
            "critter_spawned"
        );
        Some(id)
    }

    pub(crate) fn is_created(&self) -> bool {
        self.created
    }

    pub(crate) fn player(&self) -> Option<&PlayerController> {
        self.player.as_ref()
    }

    pub(crate) fn player_mut(&mut self) -> Option<&mut PlayerController> {
        self.player.as_mut()
    }

    pub(crate) fn critters(&self) -> &[WanderAi] {
        &self.critters
    }

    pub(crate) fn critter(&self, id: EntityId) -> Option<&WanderAi> {
        self.critters
            .iter()
            .find(|critter| critter.actor().id() == id)
    }

    pub(crate) fn world(&self) -> &TileWorld {
        &self.world
    }

    pub(crate) fn camera_rig(&self) -> &CameraRig {
        &self.camera_rig
    }

    pub(crate) fn broker(&self) -> &CollisionBroker {
        &self.broker
    }

    pub(crate) fn animation(&self) -> &dyn AnimationPlayer {
        self.animation.as_ref()
    }

    /// Simulation time, advanced only by `update`.
    pub(crate) fn elapsed(&self) -> Duration {
        self.timers.now()
    }

    pub(crate) fn pending_tasks_for(&self, id: EntityId) -> usize {
        self.timers.pending_for(TaskOwner::Entity(id))
    }

    pub(crate) fn scheduled_task_count(&self) -> usize {
        self.timers.len()
    }

    pub(crate) fn draw(&self, draw_list: &mut DrawList) {
        draw_list.reset();
        draw_list.camera = *self.camera_rig.camera();
        draw_list.clear_rgba = CLEAR_RGBA;
        if !self.created {
            return;
        }
        let visible = self.camera_rig.camera().visible_rect(self.window_size);
        self.world.draw_layer(LayerSlot::Below, visible, draw_list);
        self.world.draw_layer(LayerSlot::World, visible, draw_list);

        let mut actors: Vec<(&Actor, [u8; 4])> = self
            .critters
            .iter()
            .map(|critter| (critter.actor(), critter.variant().body_rgba()))
            .collect();
        if let Some(player) = self.player.as_ref() {
            actors.push((player.actor(), PLAYER_RGBA));
        }
        actors.sort_by(|(a, _), (b, _)| a.position().y.total_cmp(&b.position().y));
        for (actor, rgba) in actors {
            self.draw_actor(actor, rgba, draw_list);
        }

        self.world.draw_layer(LayerSlot::Above, visible, draw_list);
    }

    fn draw_actor(&self, actor: &Actor, base_rgba: [u8; 4], draw_list: &mut DrawList) {
        let rgba = if actor.anim_state() == AnimState::Hurt {
            blend_rgba(base_rgba, HURT_RGBA, 0.6)
        } else {
            base_rgba
        };
        let frame = self.animation.current_frame(actor.id()).unwrap_or(0);
        let radius = if frame % 2 == 1 {
            actor.radius() * 0.94
        } else {
            actor.radius()
        };
        let center = actor.position();
        draw_list.push(DrawCommand::Circle {
            center,
            radius,
            rgba,
        });
        draw_list.push(DrawCommand::Line {
            from: center,
            to: center + Vec2::new(actor.facing().sign() * radius, 0.0),
            rgba: FACING_NOTCH_RGBA,
        });
    }

    fn dispatch(&mut self, task: FiredTask<WorldTask>) {
        if let WorldTask::Spawn { index } = task.payload {
            self.spawn_next(index, task.fired_at);
            return;
        }
        let TaskOwner::Entity(id) = task.owner else {
            return;
        };
        match task.payload {
            WorldTask::WanderDecide => {
                let Some(critter) = self
                    .critters
                    .iter_mut()
                    .find(|critter| critter.actor().id() == id)
                else {
                    debug!(entity = id.0, "stale_task_ignored");
                    return;
                };
                let state = critter.decide(&mut self.rng, &self.config.wander);
                self.timers.after(
                    task.owner,
                    self.config.wander.walk_duration(),
                    WorldTask::WanderStop,
                );
                debug!(entity = id.0, state = ?state, "wander_decided");
            }
            WorldTask::WanderStop => {
                match self
                    .critters
                    .iter_mut()
                    .find(|critter| critter.actor().id() == id)
                {
                    Some(critter) => critter.stop(),
                    None => debug!(entity = id.0, "stale_task_ignored"),
                }
            }
            WorldTask::HurtRevert => {
                if self.hurt_timers.get(&id) == Some(&task.id) {
                    self.hurt_timers.remove(&id);
                }
                match find_actor(&mut self.player, &mut self.critters, id) {
                    Some(actor) => actor.clear_hurt(self.animation.as_mut()),
                    None => debug!(entity = id.0, "stale_task_ignored"),
                }
            }
            WorldTask::Spawn { .. } => {}
        }
    }

    fn spawn_next(&mut self, index: u32, fired_at: Duration) {
        let bounds = self.world.bounds_rect();
        let position = self.spawner.sample_position(&mut self.rng, bounds);
        let variant = self.spawner.sample_variant(&mut self.rng);
        if self.spawn_critter_at(position, variant, fired_at).is_none() {
            warn!(index, "spawn_skipped_without_player");
        }
    }

    fn apply_pointer_and_zoom(&mut self, input: &InputSnapshot) {
        if input.left_click_pressed() {
            if let (Some(cursor), Some(player)) =
                (input.cursor_position_px(), self.player.as_mut())
            {
                let world_point =
                    screen_to_world_px(self.camera_rig.camera(), self.window_size, cursor);
                let reachable = self
                    .world
                    .bounds_rect()
                    .inset(player.actor().radius());
                let target = reachable.clamp(world_point);
                player.set_seek_target(target);
                debug!(x = target.x, y = target.y, "seek_target_set");
            }
        }
        self.camera_rig.apply_zoom_steps(input.zoom_delta_steps());
    }

    fn step_bodies(&mut self, dt: f32) {
        let solids = self.world.solids();
        if let Some(player) = self.player.as_mut() {
            let actor = player.actor_mut();
            let mask = solids.filter(|_| self.broker.collides_with_static(actor.id()));
            actor.step(self.physics.as_mut(), dt, mask);
        }
        for critter in &mut self.critters {
            let actor = critter.actor_mut();
            let mask = solids.filter(|_| self.broker.collides_with_static(actor.id()));
            actor.step(self.physics.as_mut(), dt, mask);
        }
    }

    fn resolve_contacts(&mut self) {
        let Some(player) = self.player.as_mut() else {
            return;
        };
        let contacts = self.broker.detect(
            self.physics.as_mut(),
            player.actor_mut(),
            &mut self.critters,
        );
        for contact in contacts {
            self.handle_contact(contact);
        }
    }

    fn handle_contact(&mut self, contact: Contact) {
        for id in [contact.a, contact.b] {
            self.show_hurt(id);
        }
        if contact.kind != ContactKind::CritterCritter {
            return;
        }
        let impulse = contact.axis * self.config.collision.knockback_speed;
        if let Some(actor) = find_actor(&mut self.player, &mut self.critters, contact.a) {
            actor.queue_knockback(impulse * -1.0);
        }
        if let Some(actor) = find_actor(&mut self.player, &mut self.critters, contact.b) {
            actor.queue_knockback(impulse);
        }
    }

    fn show_hurt(&mut self, id: EntityId) {
        let Some(actor) = find_actor(&mut self.player, &mut self.critters, id) else {
            return;
        };
        actor.show_hurt(self.animation.as_mut());
        let revert = self.timers.after(
            TaskOwner::Entity(id),
            self.config.collision.hurt_duration(),
            WorldTask::HurtRevert,
        );
        if let Some(previous) = self.hurt_timers.insert(id, revert) {
            self.timers.cancel(previous);
        }
        debug!(entity = id.0, "contact_hurt");
    }
}

fn find_actor<'a>(
    player: &'a mut Option<PlayerController>,
    critters: &'a mut [WanderAi],
    id: EntityId,
) -> Option<&'a mut Actor> {
    if let Some(player) = player.as_mut().filter(|player| player.actor().id() == id) {
        return Some(player.actor_mut());
    }
    critters
        .iter_mut()
        .find(|critter| critter.actor().id() == id)
        .map(WanderAi::actor_mut)
}

fn sanitize_dt(dt_seconds: f32) -> f32 {
    if dt_seconds.is_finite() && dt_seconds > 0.0 {
        dt_seconds
    } else {
        0.0
    }
}

fn blend_rgba(base: [u8; 4], tint: [u8; 4], amount: f32) -> [u8; 4] {
    let amount = amount.clamp(0.0, 1.0);
    let mut out = base;
    for channel in 0..3 {
        let mixed = base[channel] as f32 + (tint[channel] as f32 - base[channel] as f32) * amount;
        out[channel] = mixed.round().clamp(0.0, 255.0) as u8;
    }
    out
}
