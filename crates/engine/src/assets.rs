use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use image::ImageReader;
use thiserror::Error;
use tracing::{info, warn};

use crate::tilemap::{TileMap, TileMapError};

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset path '{path}' must be relative and stay inside the asset root")]
    InvalidPath { path: String },
    #[error("failed to load map '{key}' from {path}: {source}")]
    Map {
        key: String,
        path: PathBuf,
        #[source]
        source: TileMapError,
    },
    #[error("failed to open image '{key}' at {path}: {source}")]
    ImageOpen {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image '{key}' at {path}: {source}")]
    ImageDecode {
        key: String,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Decoded RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl LoadedImage {
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let bytes = self.rgba.get(offset..offset + 4)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

/// Named maps and images loaded during a scene's preload phase.
///
/// Load failures are kept by key instead of aborting preload so the scene can
/// decide at `create` time which assets it actually required.
#[derive(Debug, Default)]
pub struct AssetCatalog {
    root: PathBuf,
    maps: HashMap<String, TileMap>,
    images: HashMap<String, LoadedImage>,
    failures: HashMap<String, AssetError>,
}

impl AssetCatalog {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            ..Self::default()
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loads a Tiled map and every tileset image it references. Images are keyed
    /// by [`tileset_image_key`].
    pub fn load_map(&mut self, key: &str, relative_path: &str) -> bool {
        let path = match self.resolve(relative_path) {
            Ok(path) => path,
            Err(error) => {
                self.record_failure(key, error);
                return false;
            }
        };
        let map = match TileMap::load(&path) {
            Ok(map) => map,
            Err(source) => {
                self.record_failure(
                    key,
                    AssetError::Map {
                        key: key.to_string(),
                        path,
                        source,
                    },
                );
                return false;
            }
        };

        let map_dir = Path::new(relative_path)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let mut images_ok = true;
        for tileset in &map.tilesets {
            let Some(image) = tileset.image.as_deref() else {
                continue;
            };
            let image_path = map_dir.join(image);
            let image_key = tileset_image_key(key, &tileset.name);
            images_ok &= self.load_image(&image_key, &image_path.to_string_lossy());
        }

        info!(
            map = key,
            path = %path.display(),
            width = map.width,
            height = map.height,
            tile_layers = map.tile_layers.len(),
            tilesets = map.tilesets.len(),
            "asset_map_loaded"
        );
        self.failures.remove(key);
        self.maps.insert(key.to_string(), map);
        images_ok
    }

    pub fn load_image(&mut self, key: &str, relative_path: &str) -> bool {
        let result = self
            .resolve(relative_path)
            .and_then(|path| decode_image(key, &path));
        match result {
            Ok(image) => {
                self.failures.remove(key);
                self.images.insert(key.to_string(), image);
                true
            }
            Err(error) => {
                self.record_failure(key, error);
                false
            }
        }
    }

    pub fn insert_map(&mut self, key: &str, map: TileMap) {
        self.failures.remove(key);
        self.maps.insert(key.to_string(), map);
    }

    pub fn insert_image(&mut self, key: &str, image: LoadedImage) {
        self.failures.remove(key);
        self.images.insert(key.to_string(), image);
    }

    pub fn map(&self, key: &str) -> Option<&TileMap> {
        self.maps.get(key)
    }

    pub fn image(&self, key: &str) -> Option<&LoadedImage> {
        self.images.get(key)
    }

    pub fn failure(&self, key: &str) -> Option<&AssetError> {
        self.failures.get(key)
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Joins `relative_path` onto the root after collapsing `.` and `..`
    /// lexically; paths that would leave the root are rejected.
    fn resolve(&self, relative_path: &str) -> Result<PathBuf, AssetError> {
        let invalid = || AssetError::InvalidPath {
            path: relative_path.to_string(),
        };
        let mut normalized = PathBuf::new();
        for component in Path::new(relative_path).components() {
            match component {
                Component::Normal(part) => normalized.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !normalized.pop() {
                        return Err(invalid());
                    }
                }
                Component::RootDir | Component::Prefix(_) => return Err(invalid()),
            }
        }
        if normalized.as_os_str().is_empty() {
            return Err(invalid());
        }
        Ok(self.root.join(normalized))
    }

    fn record_failure(&mut self, key: &str, error: AssetError) {
        warn!(asset = key, error = %error, "asset_load_failed");
        self.failures.insert(key.to_string(), error);
    }
}

pub fn tileset_image_key(map_key: &str, tileset_name: &str) -> String {
    format!("{map_key}/{tileset_name}")
}

fn decode_image(key: &str, path: &Path) -> Result<LoadedImage, AssetError> {
    let reader = ImageReader::open(path).map_err(|source| AssetError::ImageOpen {
        key: key.to_string(),
        path: path.to_path_buf(),
        source,
    })?;
    let decoded = reader.decode().map_err(|source| AssetError::ImageDecode {
        key: key.to_string(),
        path: path.to_path_buf(),
        source,
    })?;
    let image = decoded.to_rgba8();
    Ok(LoadedImage {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}
