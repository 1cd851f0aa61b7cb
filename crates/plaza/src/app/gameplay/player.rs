use engine::{AnimationPlayer, InputAction, InputSnapshot, Vec2};
use tracing::debug;

use super::actor::Actor;
use super::config::PlayerConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum MoveMode {
    Idle,
    KeyboardMove { direction: Vec2 },
    SeekMove { target: Vec2 },
}

/// Directional keys held this tick. `any_down` stays true when opposing keys
/// cancel out, which still pre-empts seeking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct KeyboardIntent {
    pub(crate) any_down: bool,
    pub(crate) axis: Vec2,
}

impl KeyboardIntent {
    pub(crate) const NONE: KeyboardIntent = KeyboardIntent {
        any_down: false,
        axis: Vec2::ZERO,
    };

    pub(crate) fn from_snapshot(input: &InputSnapshot) -> Self {
        if !input.keyboard_bound() || !input.any_directional_down() {
            return Self::NONE;
        }
        let mut axis = Vec2::ZERO;
        if input.is_down(InputAction::MoveLeft) {
            axis.x -= 1.0;
        }
        if input.is_down(InputAction::MoveRight) {
            axis.x += 1.0;
        }
        if input.is_down(InputAction::MoveUp) {
            axis.y -= 1.0;
        }
        if input.is_down(InputAction::MoveDown) {
            axis.y += 1.0;
        }
        Self {
            any_down: true,
            axis,
        }
    }
}

pub(crate) fn transition(
    mode: MoveMode,
    keyboard: KeyboardIntent,
    position: Vec2,
    arrival_threshold: f32,
) -> MoveMode {
    if keyboard.any_down {
        return MoveMode::KeyboardMove {
            direction: keyboard.axis.normalized().unwrap_or(Vec2::ZERO),
        };
    }
    match mode {
        MoveMode::SeekMove { target } if position.distance(target) < arrival_threshold => {
            MoveMode::Idle
        }
        MoveMode::SeekMove { target } => MoveMode::SeekMove { target },
        MoveMode::KeyboardMove { .. } | MoveMode::Idle => MoveMode::Idle,
    }
}

/// Seek speed is capped so the final tick lands on the target instead of past it.
pub(crate) fn desired_velocity(mode: MoveMode, position: Vec2, speed: f32, dt_seconds: f32) -> Vec2 {
    match mode {
        MoveMode::Idle => Vec2::ZERO,
        MoveMode::KeyboardMove { direction } => direction * speed,
        MoveMode::SeekMove { target } => {
            let delta = target - position;
            let Some(heading) = delta.normalized() else {
                return Vec2::ZERO;
            };
            let reachable = if dt_seconds > 0.0 {
                delta.length() / dt_seconds
            } else {
                speed
            };
            heading * speed.min(reachable)
        }
    }
}

pub(crate) struct PlayerController {
    actor: Actor,
    mode: MoveMode,
    speed: f32,
    arrival_threshold: f32,
}

impl PlayerController {
    pub(crate) fn new(actor: Actor, config: &PlayerConfig) -> Self {
        Self {
            actor,
            mode: MoveMode::Idle,
            speed: config.speed,
            arrival_threshold: config.arrival_threshold,
        }
    }

    pub(crate) fn actor(&self) -> &Actor {
        &self.actor
    }

    pub(crate) fn actor_mut(&mut self) -> &mut Actor {
        &mut self.actor
    }

    pub(crate) fn mode(&self) -> MoveMode {
        self.mode
    }

    #[cfg(test)]
    pub(crate) fn seek_target(&self) -> Option<Vec2> {
        match self.mode {
            MoveMode::SeekMove { target } => Some(target),
            _ => None,
        }
    }

    /// Replaces any earlier target. Keys held on the same tick still win.
    pub(crate) fn set_seek_target(&mut self, target: Vec2) {
        self.mode = MoveMode::SeekMove { target };
    }

    pub(crate) fn update(
        &mut self,
        input: &InputSnapshot,
        dt_seconds: f32,
        animation: &mut dyn AnimationPlayer,
    ) {
        let position = self.actor.position();
        let previous = self.mode;
        self.mode = transition(
            previous,
            KeyboardIntent::from_snapshot(input),
            position,
            self.arrival_threshold,
        );
        match (previous, self.mode) {
            (MoveMode::SeekMove { target }, MoveMode::Idle) => {
                debug!(x = target.x, y = target.y, "seek_arrived");
            }
            (MoveMode::SeekMove { .. }, MoveMode::KeyboardMove { .. }) => {
                debug!("seek_preempted_by_keyboard");
            }
            _ => {}
        }
        let velocity = desired_velocity(self.mode, position, self.speed, dt_seconds);
        self.actor.apply_motion(velocity, animation);
    }
}
