//! Static world built from a Tiled map: render layers, the solid-tile mask used
//! for blocking, named spawn points and the world pixel bounds.

use std::collections::HashMap;

use engine::{
    tileset_image_key, AssetCatalog, DrawCommand, DrawList, ImageRegion, Rect, SolidMask, TileMap,
    Vec2,
};
use thiserror::Error;
use tracing::{info, warn};

use super::config::WorldConfig;

pub(crate) const FALLBACK_SPAWN: Vec2 = Vec2::new(100.0, 100.0);
pub(crate) const FALLBACK_BOUNDS: (f32, f32) = (800.0, 600.0);

#[derive(Debug, Error)]
pub(crate) enum WorldLoadError {
    #[error("map '{key}' is not available: {reason}")]
    MapMissing { key: String, reason: String },
    #[error("map '{key}' has no tiles")]
    EmptyMap { key: String },
    #[error("map '{key}' is missing required tile layer '{layer}'")]
    LayerMissing { key: String, layer: String },
    #[error("tileset '{tileset}' image '{image_key}' was not loaded")]
    TilesetImageMissing { tileset: String, image_key: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LayerSlot {
    Below,
    World,
    Above,
}

impl LayerSlot {
    fn fallback_rgba(self, solid: bool) -> [u8; 4] {
        match (self, solid) {
            (_, true) => [92, 88, 96, 255],
            (LayerSlot::Below, false) => [74, 128, 82, 255],
            (LayerSlot::World, false) => [150, 126, 90, 255],
            (LayerSlot::Above, false) => [60, 96, 66, 255],
        }
    }
}

#[derive(Debug)]
struct LoadedWorld {
    map: TileMap,
    solids: SolidMask,
    /// Tileset name to the catalog key of its decoded image.
    tileset_images: HashMap<String, String>,
}

#[derive(Debug)]
pub(crate) struct TileWorld {
    config: WorldConfig,
    loaded: Option<LoadedWorld>,
}

impl TileWorld {
    pub(crate) fn new(config: WorldConfig) -> Self {
        Self {
            config,
            loaded: None,
        }
    }

    pub(crate) fn load(&mut self, assets: &AssetCatalog) -> Result<(), WorldLoadError> {
        let key = self.config.map_key.as_str();
        let Some(map) = assets.map(key) else {
            let reason = assets
                .failure(key)
                .map(ToString::to_string)
                .unwrap_or_else(|| "never loaded".to_string());
            return Err(WorldLoadError::MapMissing {
                key: key.to_string(),
                reason,
            });
        };
        if map.width == 0 || map.height == 0 {
            return Err(WorldLoadError::EmptyMap {
                key: key.to_string(),
            });
        }

        for layer in [
            &self.config.below_layer,
            &self.config.world_layer,
            &self.config.above_layer,
        ] {
            if map.tile_layer(layer).is_none() {
                return Err(WorldLoadError::LayerMissing {
                    key: key.to_string(),
                    layer: layer.clone(),
                });
            }
        }

        let mut tileset_images = HashMap::new();
        for tileset in &map.tilesets {
            if tileset.image.is_none() {
                continue;
            }
            let image_key = tileset_image_key(key, &tileset.name);
            if assets.image(&image_key).is_none() {
                return Err(WorldLoadError::TilesetImageMissing {
                    tileset: tileset.name.clone(),
                    image_key,
                });
            }
            tileset_images.insert(tileset.name.clone(), image_key);
        }

        let solids = self.build_solid_mask(map);
        info!(
            map = key,
            width = map.width,
            height = map.height,
            solid_tiles = solids.solid_count(),
            "tile_world_loaded"
        );
        self.loaded = Some(LoadedWorld {
            map: map.clone(),
            solids,
            tileset_images,
        });
        Ok(())
    }

    fn build_solid_mask(&self, map: &TileMap) -> SolidMask {
        let mut solids = SolidMask::new(map.width, map.height, map.tile_width, map.tile_height);
        for name in [&self.config.world_layer, &self.config.above_layer] {
            let Some(layer) = map.tile_layer(name) else {
                continue;
            };
            for y in 0..map.height {
                for x in 0..map.width {
                    let Some(gid) = map.gid_at(layer, x, y) else {
                        continue;
                    };
                    if gid != 0 && map.tile_flag(gid, &self.config.collides_property) {
                        solids.mark(x, y);
                    }
                }
            }
        }
        solids
    }

    #[cfg(test)]
    pub(crate) fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub(crate) fn map(&self) -> Option<&TileMap> {
        self.loaded.as_ref().map(|loaded| &loaded.map)
    }

    pub(crate) fn solids(&self) -> Option<&SolidMask> {
        self.loaded.as_ref().map(|loaded| &loaded.solids)
    }

    #[cfg(test)]
    pub(crate) fn is_solid_at(&self, point: Vec2) -> bool {
        self.solids()
            .map(|solids| solids.is_solid_at_world(point))
            .unwrap_or(false)
    }

    /// Declared point named `name` in the objects layer, or [`FALLBACK_SPAWN`].
    pub(crate) fn find_spawn_point(&self, name: &str) -> Vec2 {
        let objects = self
            .map()
            .and_then(|map| map.object_layer(&self.config.objects_layer));
        let Some(objects) = objects else {
            warn!(
                layer = %self.config.objects_layer,
                fallback_x = FALLBACK_SPAWN.x,
                fallback_y = FALLBACK_SPAWN.y,
                "object_layer_missing"
            );
            return FALLBACK_SPAWN;
        };
        match objects.objects.iter().find(|object| object.name == name) {
            Some(object) => Vec2::new(object.x, object.y),
            None => {
                warn!(
                    spawn_point = name,
                    fallback_x = FALLBACK_SPAWN.x,
                    fallback_y = FALLBACK_SPAWN.y,
                    "spawn_point_missing"
                );
                FALLBACK_SPAWN
            }
        }
    }

    /// World pixel size; [`FALLBACK_BOUNDS`] while no map is loaded.
    pub(crate) fn bounds(&self) -> (f32, f32) {
        match self.map() {
            Some(map) => {
                let (width, height) = map.pixel_size();
                (width as f32, height as f32)
            }
            None => FALLBACK_BOUNDS,
        }
    }

    pub(crate) fn bounds_rect(&self) -> Rect {
        let (width, height) = self.bounds();
        Rect::from_size(width, height)
    }

    pub(crate) fn layer_name(&self, slot: LayerSlot) -> &str {
        match slot {
            LayerSlot::Below => &self.config.below_layer,
            LayerSlot::World => &self.config.world_layer,
            LayerSlot::Above => &self.config.above_layer,
        }
    }

    /// Pushes the tiles of `slot` that intersect `visible`.
    pub(crate) fn draw_layer(&self, slot: LayerSlot, visible: Rect, draw_list: &mut DrawList) {
        let Some(loaded) = self.loaded.as_ref() else {
            return;
        };
        let map = &loaded.map;
        let Some(layer) = map.tile_layer(self.layer_name(slot)) else {
            return;
        };
        if !layer.visible || map.tile_width == 0 || map.tile_height == 0 {
            return;
        }

        let tile_w = map.tile_width as f32;
        let tile_h = map.tile_height as f32;
        let (x_min, x_max) = visible_span(visible.min.x, visible.max.x, tile_w, map.width);
        let (y_min, y_max) = visible_span(visible.min.y, visible.max.y, tile_h, map.height);
        for y in y_min..y_max {
            for x in x_min..x_max {
                let Some(gid) = map.gid_at(layer, x, y).filter(|gid| *gid != 0) else {
                    continue;
                };
                let region = map.tileset_for_gid(gid).and_then(|(tileset, local_id)| {
                    let image_key = loaded.tileset_images.get(&tileset.name)?;
                    let (sx, sy, sw, sh) = tileset.source_rect(local_id)?;
                    Some(ImageRegion {
                        image: draw_list.intern_image(image_key),
                        x: sx,
                        y: sy,
                        width: sw,
                        height: sh,
                    })
                });
                draw_list.push(DrawCommand::Tile {
                    min: Vec2::new(x as f32 * tile_w, y as f32 * tile_h),
                    size: Vec2::new(tile_w, tile_h),
                    region,
                    fallback_rgba: slot.fallback_rgba(loaded.solids.is_solid(x, y)),
                });
            }
        }
    }
}

fn visible_span(min: f32, max: f32, tile_extent: f32, tiles: u32) -> (u32, u32) {
    let first = (min / tile_extent).floor().max(0.0) as u32;
    let last = ((max / tile_extent).ceil().max(0.0) as u32).min(tiles);
    (first.min(last), last)
}
