use std::f32::consts::TAU;
use std::time::Duration;

use engine::{AnimationPlayer, Vec2};
use rand::Rng;

use super::actor::Actor;
use super::config::WanderConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum CritterVariant {
    Amber,
    Moss,
    Slate,
    Rose,
}

impl CritterVariant {
    pub(crate) const ALL: [CritterVariant; 4] = [
        CritterVariant::Amber,
        CritterVariant::Moss,
        CritterVariant::Slate,
        CritterVariant::Rose,
    ];

    pub(crate) fn sheet(self) -> &'static str {
        match self {
            CritterVariant::Amber => "critter-amber",
            CritterVariant::Moss => "critter-moss",
            CritterVariant::Slate => "critter-slate",
            CritterVariant::Rose => "critter-rose",
        }
    }

    pub(crate) fn body_rgba(self) -> [u8; 4] {
        match self {
            CritterVariant::Amber => [230, 170, 60, 255],
            CritterVariant::Moss => [110, 170, 80, 255],
            CritterVariant::Slate => [120, 130, 150, 255],
            CritterVariant::Rose => [220, 120, 150, 255],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum WanderState {
    Idle,
    Walking { heading_radians: f32, speed: f32 },
}

/// Random walker. Heading and speed are committed at each decide and held
/// until the stop fires; knockback does not change them.
pub(crate) struct WanderAi {
    actor: Actor,
    variant: CritterVariant,
    state: WanderState,
    spawned_at: Duration,
}

impl WanderAi {
    pub(crate) fn new(actor: Actor, variant: CritterVariant, spawned_at: Duration) -> Self {
        Self {
            actor,
            variant,
            state: WanderState::Idle,
            spawned_at,
        }
    }

    pub(crate) fn actor(&self) -> &Actor {
        &self.actor
    }

    pub(crate) fn actor_mut(&mut self) -> &mut Actor {
        &mut self.actor
    }

    pub(crate) fn variant(&self) -> CritterVariant {
        self.variant
    }

    pub(crate) fn state(&self) -> WanderState {
        self.state
    }

    pub(crate) fn spawned_at(&self) -> Duration {
        self.spawned_at
    }

    pub(crate) fn committed_velocity(&self) -> Vec2 {
        match self.state {
            WanderState::Idle => Vec2::ZERO,
            WanderState::Walking {
                heading_radians,
                speed,
            } => Vec2::from_angle(heading_radians) * speed,
        }
    }

    pub(crate) fn decide<R: Rng>(&mut self, rng: &mut R, config: &WanderConfig) -> WanderState {
        let heading_radians = rng.gen_range(0.0..TAU);
        let speed = rng.gen_range(config.speed_min..=config.speed_max);
        self.state = WanderState::Walking {
            heading_radians,
            speed,
        };
        self.state
    }

    pub(crate) fn stop(&mut self) {
        self.state = WanderState::Idle;
    }

    pub(crate) fn apply_motion(&mut self, animation: &mut dyn AnimationPlayer) {
        let velocity = self.committed_velocity();
        self.actor.apply_motion(velocity, animation);
    }
}
