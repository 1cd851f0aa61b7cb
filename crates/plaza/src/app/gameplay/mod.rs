mod actor;
mod camera_rig;
mod collision;
mod config;
mod orchestrator;
mod player;
mod scene_impl;
mod spawn;
mod tile_world;
mod wander;

use std::path::Path;

use engine::Scene;

pub(crate) use config::{load_config, ConfigError};
pub(crate) use orchestrator::WorldOrchestrator;

pub(crate) const CONFIG_FILE_NAME: &str = "plaza.json";

/// Loads `plaza.json` from `assets_dir` and builds the world scene from it.
pub(crate) fn build_scene(
    assets_dir: &Path,
    seed_override: Option<&str>,
) -> Result<Box<dyn Scene>, ConfigError> {
    let mut config = load_config(&assets_dir.join(CONFIG_FILE_NAME))?;
    config.apply_seed_override(seed_override)?;
    Ok(Box::new(WorldOrchestrator::new(config)))
}
