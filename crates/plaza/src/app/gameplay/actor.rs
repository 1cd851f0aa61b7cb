use engine::{
    AnimationPlayer, ClipDef, EntityId, PhysicsBody, PhysicsWorld, Playback, SolidMask, Vec2,
};

pub(crate) const ACTOR_RADIUS: f32 = 32.0;
const CLIP_FRAME_RATE: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Facing {
    Left,
    Right,
}

impl Facing {
    pub(crate) fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AnimState {
    Idle,
    Walk,
    Hurt,
}

impl AnimState {
    fn suffix(self) -> &'static str {
        match self {
            AnimState::Idle => "idle",
            AnimState::Walk => "walk",
            AnimState::Hurt => "hurt",
        }
    }

    fn clip_def(self, sheet: &str) -> ClipDef {
        let (frames, playback) = match self {
            AnimState::Idle => (vec![0, 1], Playback::Loop),
            AnimState::Walk => (vec![2, 3, 4, 5], Playback::Loop),
            AnimState::Hurt => (vec![6, 7], Playback::Once),
        };
        ClipDef {
            sheet: sheet.to_string(),
            frames,
            frame_rate: CLIP_FRAME_RATE,
            playback,
        }
    }
}

pub(crate) fn clip_key(sheet: &str, state: AnimState) -> String {
    format!("{sheet}-{}", state.suffix())
}

/// Shared entity state: one physics body, facing and the animation state
/// derived from motion unless `hurt` is pinned.
pub(crate) struct Actor {
    id: EntityId,
    sheet: String,
    body: Box<dyn PhysicsBody>,
    facing: Facing,
    anim: AnimState,
    hurt_pinned: bool,
    knockback: Option<Vec2>,
}

impl Actor {
    pub(crate) fn new(
        id: EntityId,
        sheet: &str,
        body: Box<dyn PhysicsBody>,
        animation: &mut dyn AnimationPlayer,
    ) -> Self {
        for state in [AnimState::Idle, AnimState::Walk, AnimState::Hurt] {
            animation.ensure_clip(&clip_key(sheet, state), state.clip_def(sheet));
        }
        animation.play(id, &clip_key(sheet, AnimState::Idle));
        Self {
            id,
            sheet: sheet.to_string(),
            body,
            facing: Facing::Right,
            anim: AnimState::Idle,
            hurt_pinned: false,
            knockback: None,
        }
    }

    pub(crate) fn id(&self) -> EntityId {
        self.id
    }

    pub(crate) fn sheet(&self) -> &str {
        &self.sheet
    }

    pub(crate) fn position(&self) -> Vec2 {
        self.body.position()
    }

    pub(crate) fn velocity(&self) -> Vec2 {
        self.body.velocity()
    }

    pub(crate) fn radius(&self) -> f32 {
        self.body.radius()
    }

    pub(crate) fn facing(&self) -> Facing {
        self.facing
    }

    pub(crate) fn anim_state(&self) -> AnimState {
        self.anim
    }

    pub(crate) fn is_hurt(&self) -> bool {
        self.hurt_pinned
    }

    #[cfg(test)]
    pub(crate) fn has_pending_knockback(&self) -> bool {
        self.knockback.is_some()
    }

    pub(crate) fn body_mut(&mut self) -> &mut dyn PhysicsBody {
        &mut *self.body
    }

    /// Applies this tick's desired velocity, then facing and clip.
    pub(crate) fn apply_motion(&mut self, desired: Vec2, animation: &mut dyn AnimationPlayer) {
        self.body.set_velocity(desired);
        if desired.x < 0.0 {
            self.facing = Facing::Left;
        } else if desired.x > 0.0 {
            self.facing = Facing::Right;
        }
        if !self.hurt_pinned {
            self.select_clip(animation);
        }
    }

    pub(crate) fn show_hurt(&mut self, animation: &mut dyn AnimationPlayer) {
        self.hurt_pinned = true;
        self.anim = AnimState::Hurt;
        animation.play(self.id, &clip_key(&self.sheet, AnimState::Hurt));
    }

    pub(crate) fn clear_hurt(&mut self, animation: &mut dyn AnimationPlayer) {
        if !self.hurt_pinned {
            return;
        }
        self.hurt_pinned = false;
        self.select_clip(animation);
    }

    /// Replaces the velocity for the next physics step only.
    pub(crate) fn queue_knockback(&mut self, impulse: Vec2) {
        self.knockback = Some(impulse);
    }

    pub(crate) fn step(
        &mut self,
        physics: &mut dyn PhysicsWorld,
        dt_seconds: f32,
        solids: Option<&SolidMask>,
    ) {
        match self.knockback.take() {
            Some(impulse) => {
                let committed = self.body.velocity();
                self.body.set_velocity(impulse);
                physics.step(&mut *self.body, dt_seconds, solids);
                self.body.set_velocity(committed);
            }
            None => physics.step(&mut *self.body, dt_seconds, solids),
        }
    }

    fn select_clip(&mut self, animation: &mut dyn AnimationPlayer) {
        let state = if self.body.velocity().is_zero() {
            AnimState::Idle
        } else {
            AnimState::Walk
        };
        self.anim = state;
        animation.play(self.id, &clip_key(&self.sheet, state));
    }
}
