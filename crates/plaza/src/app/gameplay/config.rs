use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::actor::ACTOR_RADIUS;

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config at '{field}': {message}")]
    Parse { field: String, message: String },
    #[error("invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("seed override '{value}' is not an unsigned integer")]
    Seed { value: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct WorldConfig {
    pub(crate) map_key: String,
    pub(crate) map_path: String,
    pub(crate) below_layer: String,
    pub(crate) world_layer: String,
    pub(crate) above_layer: String,
    pub(crate) objects_layer: String,
    pub(crate) spawn_point: String,
    pub(crate) collides_property: String,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            map_key: "plaza".to_string(),
            map_path: "maps/plaza.json".to_string(),
            below_layer: "Below Player".to_string(),
            world_layer: "World".to_string(),
            above_layer: "Above Player".to_string(),
            objects_layer: "Objects".to_string(),
            spawn_point: "Spawn Point".to_string(),
            collides_property: "collides".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PlayerConfig {
    pub(crate) speed: f32,
    pub(crate) arrival_threshold: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            speed: 160.0,
            arrival_threshold: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct WanderConfig {
    pub(crate) decide_ms: u64,
    pub(crate) walk_ms: u64,
    pub(crate) speed_min: f32,
    pub(crate) speed_max: f32,
}

impl Default for WanderConfig {
    fn default() -> Self {
        Self {
            decide_ms: 2000,
            walk_ms: 1000,
            speed_min: 20.0,
            speed_max: 50.0,
        }
    }
}

impl WanderConfig {
    pub(crate) fn decide_interval(&self) -> Duration {
        Duration::from_millis(self.decide_ms)
    }

    pub(crate) fn walk_duration(&self) -> Duration {
        Duration::from_millis(self.walk_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CollisionConfig {
    pub(crate) actor_radius: f32,
    pub(crate) knockback_speed: f32,
    pub(crate) hurt_ms: u64,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            actor_radius: ACTOR_RADIUS,
            knockback_speed: 100.0,
            hurt_ms: 500,
        }
    }
}

impl CollisionConfig {
    pub(crate) fn hurt_duration(&self) -> Duration {
        Duration::from_millis(self.hurt_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SpawnConfig {
    pub(crate) count: u32,
    pub(crate) stagger_ms: u64,
    pub(crate) margin: f32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            count: 15,
            stagger_ms: 500,
            margin: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CameraConfig {
    pub(crate) min_zoom: f32,
    pub(crate) max_zoom: f32,
    pub(crate) initial_zoom: f32,
    pub(crate) zoom_step: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.5,
            max_zoom: 1.0,
            initial_zoom: 1.0,
            zoom_step: 0.1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PlazaConfig {
    pub(crate) world: WorldConfig,
    pub(crate) player: PlayerConfig,
    pub(crate) wander: WanderConfig,
    pub(crate) collision: CollisionConfig,
    pub(crate) spawn: SpawnConfig,
    pub(crate) camera: CameraConfig,
    /// Fixed seed for wander and spawn sampling; entropy when unset.
    pub(crate) seed: Option<u64>,
}

impl PlazaConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.wander.decide_ms == 0 {
            return invalid("wander.decide_ms", "must be greater than zero");
        }
        if self.wander.walk_ms == 0 {
            return invalid("wander.walk_ms", "must be greater than zero");
        }
        if self.wander.walk_ms >= self.wander.decide_ms {
            return invalid(
                "wander.walk_ms",
                format!(
                    "walk window {}ms must be shorter than decide interval {}ms",
                    self.wander.walk_ms, self.wander.decide_ms
                ),
            );
        }
        let (min, max) = (self.wander.speed_min, self.wander.speed_max);
        if !min.is_finite() || !max.is_finite() || min < 0.0 || min > max {
            return invalid(
                "wander.speed_min",
                format!("speed range [{min}, {max}] must be finite, non-negative and ordered"),
            );
        }
        if !(self.player.speed.is_finite() && self.player.speed > 0.0) {
            return invalid("player.speed", "must be a positive number");
        }
        if !(self.player.arrival_threshold.is_finite() && self.player.arrival_threshold >= 0.0) {
            return invalid("player.arrival_threshold", "must be a non-negative number");
        }
        if !(self.collision.actor_radius.is_finite() && self.collision.actor_radius > 0.0) {
            return invalid("collision.actor_radius", "must be a positive number");
        }
        if !(self.spawn.margin.is_finite() && self.spawn.margin >= 0.0) {
            return invalid("spawn.margin", "must be a non-negative number");
        }
        let camera = &self.camera;
        if !(camera.min_zoom.is_finite() && camera.min_zoom > 0.0)
            || !camera.max_zoom.is_finite()
            || camera.min_zoom > camera.max_zoom
        {
            return invalid(
                "camera.min_zoom",
                format!(
                    "zoom range [{}, {}] must be positive and ordered",
                    camera.min_zoom, camera.max_zoom
                ),
            );
        }
        Ok(())
    }

    pub(crate) fn apply_seed_override(&mut self, raw: Option<&str>) -> Result<(), ConfigError> {
        let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return Ok(());
        };
        let seed = raw.parse::<u64>().map_err(|_| ConfigError::Seed {
            value: raw.to_string(),
        })?;
        self.seed = Some(seed);
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid {
        field,
        reason: reason.into(),
    })
}

pub(crate) fn parse_config(text: &str) -> Result<PlazaConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    let config: PlazaConfig =
        serde_path_to_error::deserialize(&mut deserializer).map_err(|error| ConfigError::Parse {
            field: error.path().to_string(),
            message: error.inner().to_string(),
        })?;
    config.validate()?;
    Ok(config)
}

/// Reads `path` when it exists; a missing file means "all defaults".
pub(crate) fn load_config(path: &Path) -> Result<PlazaConfig, ConfigError> {
    if !path.is_file() {
        info!(path = %path.display(), "config_defaults");
        return Ok(PlazaConfig::default());
    }
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&text)?;
    info!(path = %path.display(), "config_loaded");
    Ok(config)
}
