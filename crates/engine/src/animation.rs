use std::collections::HashMap;

use tracing::{debug, warn};

use crate::app::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Loop,
    Once,
}

/// Frame sequence over one sprite sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipDef {
    pub sheet: String,
    pub frames: Vec<u32>,
    pub frame_rate: f32,
    pub playback: Playback,
}

pub trait AnimationPlayer {
    /// Registers `key` unless a clip with that key already exists. Returns true
    /// when the clip was newly registered.
    fn ensure_clip(&mut self, key: &str, clip: ClipDef) -> bool;
    fn has_clip(&self, key: &str) -> bool;

    /// Starts `key` on `target`. Replaying a clip that is still running keeps its
    /// playhead. Returns false when the clip is unknown.
    fn play(&mut self, target: EntityId, key: &str) -> bool;
    fn current_clip(&self, target: EntityId) -> Option<&str>;
    fn current_frame(&self, target: EntityId) -> Option<u32>;
    fn forget(&mut self, target: EntityId);
    fn tick(&mut self, dt_seconds: f32);
}

#[derive(Debug, Clone, PartialEq)]
struct Playhead {
    clip_key: String,
    cursor: usize,
    elapsed_seconds: f32,
    finished: bool,
}

#[derive(Debug, Default)]
pub struct AnimationStage {
    clips: HashMap<String, ClipDef>,
    playheads: HashMap<EntityId, Playhead>,
}

impl AnimationStage {
    pub fn clip(&self, key: &str) -> Option<&ClipDef> {
        self.clips.get(key)
    }

    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    pub fn is_finished(&self, target: EntityId) -> bool {
        self.playheads
            .get(&target)
            .map(|playhead| playhead.finished)
            .unwrap_or(true)
    }
}

impl AnimationPlayer for AnimationStage {
    fn ensure_clip(&mut self, key: &str, clip: ClipDef) -> bool {
        if self.clips.contains_key(key) {
            return false;
        }
        debug!(clip = key, frames = clip.frames.len(), "animation_clip_registered");
        self.clips.insert(key.to_string(), clip);
        true
    }

    fn has_clip(&self, key: &str) -> bool {
        self.clips.contains_key(key)
    }

    fn play(&mut self, target: EntityId, key: &str) -> bool {
        if !self.clips.contains_key(key) {
            warn!(clip = key, entity = target.0, "animation_clip_missing");
            return false;
        }
        if let Some(playhead) = self.playheads.get(&target) {
            if playhead.clip_key == key && !playhead.finished {
                return true;
            }
        }
        self.playheads.insert(
            target,
            Playhead {
                clip_key: key.to_string(),
                cursor: 0,
                elapsed_seconds: 0.0,
                finished: false,
            },
        );
        true
    }

    fn current_clip(&self, target: EntityId) -> Option<&str> {
        self.playheads
            .get(&target)
            .map(|playhead| playhead.clip_key.as_str())
    }

    fn current_frame(&self, target: EntityId) -> Option<u32> {
        let playhead = self.playheads.get(&target)?;
        let clip = self.clips.get(&playhead.clip_key)?;
        clip.frames.get(playhead.cursor).copied()
    }

    fn forget(&mut self, target: EntityId) {
        self.playheads.remove(&target);
    }

    fn tick(&mut self, dt_seconds: f32) {
        if !dt_seconds.is_finite() || dt_seconds <= 0.0 {
            return;
        }
        for playhead in self.playheads.values_mut() {
            if playhead.finished {
                continue;
            }
            let Some(clip) = self.clips.get(&playhead.clip_key) else {
                continue;
            };
            if clip.frames.is_empty() || clip.frame_rate <= 0.0 {
                continue;
            }
            let frame_seconds = clip.frame_rate.recip();
            playhead.elapsed_seconds += dt_seconds;
            while playhead.elapsed_seconds >= frame_seconds {
                playhead.elapsed_seconds -= frame_seconds;
                if playhead.cursor + 1 < clip.frames.len() {
                    playhead.cursor += 1;
                    continue;
                }
                match clip.playback {
                    Playback::Loop => playhead.cursor = 0,
                    Playback::Once => {
                        playhead.finished = true;
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(frames: Vec<u32>, playback: Playback) -> ClipDef {
        ClipDef {
            sheet: "critter".to_string(),
            frames,
            frame_rate: 10.0,
            playback,
        }
    }

    #[test]
    fn ensure_clip_is_idempotent() {
        let mut stage = AnimationStage::default();
        assert!(stage.ensure_clip("walk", clip(vec![0, 1], Playback::Loop)));
        assert!(!stage.ensure_clip("walk", clip(vec![5, 6, 7], Playback::Once)));
        assert_eq!(stage.clip_count(), 1);
        assert_eq!(stage.clip("walk").expect("clip").frames, vec![0, 1]);
    }

    #[test]
    fn play_unknown_clip_is_rejected() {
        let mut stage = AnimationStage::default();
        assert!(!stage.play(EntityId(1), "missing"));
        assert_eq!(stage.current_clip(EntityId(1)), None);
    }

    #[test]
    fn looping_clip_wraps_frames() {
        let mut stage = AnimationStage::default();
        stage.ensure_clip("walk", clip(vec![4, 5, 6], Playback::Loop));
        stage.play(EntityId(1), "walk");
        stage.tick(0.25);
        assert_eq!(stage.current_frame(EntityId(1)), Some(6));
        stage.tick(0.1);
        assert_eq!(stage.current_frame(EntityId(1)), Some(4));
    }

    #[test]
    fn once_clip_holds_last_frame_and_restarts_on_replay() {
        let mut stage = AnimationStage::default();
        stage.ensure_clip("hurt", clip(vec![8, 9], Playback::Once));
        stage.play(EntityId(2), "hurt");
        stage.tick(1.0);
        assert!(stage.is_finished(EntityId(2)));
        assert_eq!(stage.current_frame(EntityId(2)), Some(9));

        stage.play(EntityId(2), "hurt");
        assert!(!stage.is_finished(EntityId(2)));
        assert_eq!(stage.current_frame(EntityId(2)), Some(8));
    }

    #[test]
    fn replaying_running_clip_keeps_playhead() {
        let mut stage = AnimationStage::default();
        stage.ensure_clip("walk", clip(vec![0, 1, 2], Playback::Loop));
        stage.play(EntityId(3), "walk");
        stage.tick(0.15);
        stage.play(EntityId(3), "walk");
        assert_eq!(stage.current_frame(EntityId(3)), Some(1));
    }

    #[test]
    fn forget_drops_playhead() {
        let mut stage = AnimationStage::default();
        stage.ensure_clip("idle", clip(vec![0], Playback::Loop));
        stage.play(EntityId(4), "idle");
        stage.forget(EntityId(4));
        assert_eq!(stage.current_clip(EntityId(4)), None);
    }
}
