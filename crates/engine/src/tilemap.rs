//! Tiled map model with loaders for Tiled JSON and TMX (CSV layer data).
//!
//! Only orthogonal, finite maps with embedded tilesets are supported. GIDs keep
//! Tiled's convention: `0` is empty, tileset-local ids start at a tileset's
//! `first_gid`, and the top three bits carry flip flags.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

const GID_FLIP_MASK: u32 = 0xE000_0000;

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

pub type TileProperties = HashMap<String, PropertyValue>;

#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    pub name: String,
    pub visible: bool,
    gids: Vec<u32>,
}

impl TileLayer {
    pub fn gids(&self) -> &[u32] {
        &self.gids
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapObject {
    pub name: String,
    pub kind: String,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectLayer {
    pub name: String,
    pub objects: Vec<MapObject>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tileset {
    pub first_gid: u32,
    pub name: String,
    pub image: Option<String>,
    pub tile_width: u32,
    pub tile_height: u32,
    pub columns: u32,
    pub tile_count: u32,
    pub margin: u32,
    pub spacing: u32,
    pub tile_properties: HashMap<u32, TileProperties>,
}

impl Tileset {
    /// Source rectangle `(x, y, w, h)` of a local tile id inside the tileset image.
    pub fn source_rect(&self, local_id: u32) -> Option<(u32, u32, u32, u32)> {
        if self.columns == 0 || local_id >= self.tile_count.max(1) {
            return None;
        }
        let column = local_id % self.columns;
        let row = local_id / self.columns;
        let x = self.margin + column * (self.tile_width + self.spacing);
        let y = self.margin + row * (self.tile_height + self.spacing);
        Some((x, y, self.tile_width, self.tile_height))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileMap {
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tile_layers: Vec<TileLayer>,
    pub object_layers: Vec<ObjectLayer>,
    pub tilesets: Vec<Tileset>,
}

#[derive(Debug, Error)]
pub enum TileMapError {
    #[error("failed to read map file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported map format for {path}; expected .json or .tmx")]
    UnsupportedFormat { path: PathBuf },
    #[error("invalid map JSON at '{path}': {message}")]
    Json { path: String, message: String },
    #[error("invalid TMX XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("map root element must be <map>, found <{0}>")]
    NotAMap(String),
    #[error("<{element}> is missing attribute '{attribute}'")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },
    #[error("attribute '{attribute}' on <{element}> has invalid value '{value}'")]
    InvalidAttribute {
        element: String,
        attribute: String,
        value: String,
    },
    #[error("layer '{layer}' uses unsupported encoding '{encoding}'; save layers as CSV")]
    UnsupportedEncoding { layer: String, encoding: String },
    #[error("layer '{layer}' has {actual} tiles, expected {expected}")]
    TileCountMismatch {
        layer: String,
        expected: usize,
        actual: usize,
    },
    #[error("tileset '{name}' references external file '{reference}'; embed it in the map")]
    ExternalTileset { name: String, reference: String },
}

impl TileMap {
    pub fn load(path: &Path) -> Result<Self, TileMapError> {
        let text = fs::read_to_string(path).map_err(|source| TileMapError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&text),
            Some("tmx") => Self::from_tmx_str(&text),
            _ => Err(TileMapError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, TileMapError> {
        let mut deserializer = serde_json::Deserializer::from_str(text);
        let raw: RawMap = serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
            TileMapError::Json {
                path: error.path().to_string(),
                message: error.inner().to_string(),
            }
        })?;
        raw.into_map()
    }

    pub fn from_tmx_str(text: &str) -> Result<Self, TileMapError> {
        let document = roxmltree::Document::parse(text)?;
        let root = document.root_element();
        if root.tag_name().name() != "map" {
            return Err(TileMapError::NotAMap(root.tag_name().name().to_string()));
        }
        let mut map = TileMap {
            width: tmx_attr(root, "width")?,
            height: tmx_attr(root, "height")?,
            tile_width: tmx_attr(root, "tilewidth")?,
            tile_height: tmx_attr(root, "tileheight")?,
            tile_layers: Vec::new(),
            object_layers: Vec::new(),
            tilesets: Vec::new(),
        };
        for child in root.children().filter(|node| node.is_element()) {
            match child.tag_name().name() {
                "tileset" => {
                    let tileset = parse_tmx_tileset(child)?;
                    map.tilesets.push(tileset);
                }
                _ => collect_tmx_layer(child, &mut map)?,
            }
        }
        map.tilesets.sort_by_key(|tileset| tileset.first_gid);
        Ok(map)
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        (
            self.width.saturating_mul(self.tile_width),
            self.height.saturating_mul(self.tile_height),
        )
    }

    pub fn tile_layer(&self, name: &str) -> Option<&TileLayer> {
        self.tile_layers.iter().find(|layer| layer.name == name)
    }

    pub fn object_layer(&self, name: &str) -> Option<&ObjectLayer> {
        self.object_layers.iter().find(|layer| layer.name == name)
    }

    pub fn gid_at(&self, layer: &TileLayer, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = y as usize * self.width as usize + x as usize;
        layer.gids.get(index).map(|gid| gid & !GID_FLIP_MASK)
    }

    /// Resolves a GID to its tileset and tileset-local id.
    pub fn tileset_for_gid(&self, gid: u32) -> Option<(&Tileset, u32)> {
        let gid = gid & !GID_FLIP_MASK;
        if gid == 0 {
            return None;
        }
        self.tilesets
            .iter()
            .rev()
            .find(|tileset| tileset.first_gid <= gid)
            .map(|tileset| (tileset, gid - tileset.first_gid))
    }

    pub fn tile_property(&self, gid: u32, name: &str) -> Option<&PropertyValue> {
        let (tileset, local_id) = self.tileset_for_gid(gid)?;
        tileset.tile_properties.get(&local_id)?.get(name)
    }

    pub fn tile_flag(&self, gid: u32, name: &str) -> bool {
        matches!(self.tile_property(gid, name), Some(PropertyValue::Bool(true)))
    }

    fn push_tile_layer(
        &mut self,
        name: String,
        visible: bool,
        gids: Vec<u32>,
    ) -> Result<(), TileMapError> {
        let expected = self.width as usize * self.height as usize;
        if gids.len() != expected {
            return Err(TileMapError::TileCountMismatch {
                layer: name,
                expected,
                actual: gids.len(),
            });
        }
        self.tile_layers.push(TileLayer {
            name,
            visible,
            gids,
        });
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RawMap {
    width: u32,
    height: u32,
    tilewidth: u32,
    tileheight: u32,
    #[serde(default)]
    layers: Vec<RawLayer>,
    #[serde(default)]
    tilesets: Vec<RawTileset>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawLayer {
    #[serde(rename = "tilelayer")]
    Tiles(RawTileLayer),
    #[serde(rename = "objectgroup")]
    Objects(RawObjectLayer),
    #[serde(rename = "group")]
    Group(RawGroupLayer),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct RawTileLayer {
    name: String,
    #[serde(default)]
    data: Option<RawLayerData>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default = "default_visible")]
    visible: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawLayerData {
    Gids(Vec<u32>),
    Encoded(serde::de::IgnoredAny),
}

#[derive(Debug, Deserialize)]
struct RawObjectLayer {
    name: String,
    #[serde(default)]
    objects: Vec<RawObject>,
}

#[derive(Debug, Deserialize)]
struct RawGroupLayer {
    #[serde(default)]
    layers: Vec<RawLayer>,
}

#[derive(Debug, Deserialize)]
struct RawObject {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type", alias = "class")]
    kind: String,
    x: f32,
    y: f32,
}

#[derive(Debug, Deserialize)]
struct RawTileset {
    firstgid: u32,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    tilewidth: u32,
    #[serde(default)]
    tileheight: u32,
    #[serde(default)]
    columns: u32,
    #[serde(default)]
    tilecount: u32,
    #[serde(default)]
    margin: u32,
    #[serde(default)]
    spacing: u32,
    #[serde(default)]
    tiles: Vec<RawTile>,
    #[serde(default)]
    tileproperties: HashMap<String, HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct RawTile {
    id: u32,
    #[serde(default)]
    properties: Vec<RawProperty>,
}

#[derive(Debug, Deserialize)]
struct RawProperty {
    name: String,
    value: serde_json::Value,
}

fn default_visible() -> bool {
    true
}

impl RawMap {
    fn into_map(self) -> Result<TileMap, TileMapError> {
        let mut map = TileMap {
            width: self.width,
            height: self.height,
            tile_width: self.tilewidth,
            tile_height: self.tileheight,
            tile_layers: Vec::new(),
            object_layers: Vec::new(),
            tilesets: Vec::new(),
        };
        for raw in self.tilesets {
            map.tilesets.push(raw.into_tileset()?);
        }
        map.tilesets.sort_by_key(|tileset| tileset.first_gid);
        collect_json_layers(self.layers, &mut map)?;
        Ok(map)
    }
}

fn collect_json_layers(layers: Vec<RawLayer>, map: &mut TileMap) -> Result<(), TileMapError> {
    for layer in layers {
        match layer {
            RawLayer::Tiles(tiles) => {
                if let Some(encoding) = tiles.encoding.filter(|encoding| encoding != "csv") {
                    return Err(TileMapError::UnsupportedEncoding {
                        layer: tiles.name,
                        encoding,
                    });
                }
                let gids = match tiles.data {
                    Some(RawLayerData::Gids(gids)) => gids,
                    Some(RawLayerData::Encoded(_)) => {
                        return Err(TileMapError::UnsupportedEncoding {
                            layer: tiles.name,
                            encoding: "base64".to_string(),
                        });
                    }
                    None => Vec::new(),
                };
                map.push_tile_layer(tiles.name, tiles.visible, gids)?;
            }
            RawLayer::Objects(objects) => map.object_layers.push(ObjectLayer {
                name: objects.name,
                objects: objects
                    .objects
                    .into_iter()
                    .map(|object| MapObject {
                        name: object.name,
                        kind: object.kind,
                        x: object.x,
                        y: object.y,
                    })
                    .collect(),
            }),
            RawLayer::Group(group) => collect_json_layers(group.layers, map)?,
            RawLayer::Other => {}
        }
    }
    Ok(())
}

impl RawTileset {
    fn into_tileset(self) -> Result<Tileset, TileMapError> {
        if let Some(reference) = self.source {
            return Err(TileMapError::ExternalTileset {
                name: self.name,
                reference,
            });
        }
        let mut tile_properties: HashMap<u32, TileProperties> = HashMap::new();
        for tile in self.tiles {
            let properties = tile
                .properties
                .into_iter()
                .map(|property| (property.name, property_from_json(property.value)))
                .collect::<TileProperties>();
            if !properties.is_empty() {
                tile_properties.insert(tile.id, properties);
            }
        }
        for (raw_id, values) in self.tileproperties {
            let local_id = raw_id
                .parse::<u32>()
                .map_err(|_| TileMapError::InvalidAttribute {
                    element: "tileproperties".to_string(),
                    attribute: "id".to_string(),
                    value: raw_id.clone(),
                })?;
            let entry = tile_properties.entry(local_id).or_default();
            for (name, value) in values {
                entry.insert(name, property_from_json(value));
            }
        }
        Ok(Tileset {
            first_gid: self.firstgid,
            name: self.name,
            image: self.image,
            tile_width: self.tilewidth,
            tile_height: self.tileheight,
            columns: self.columns,
            tile_count: self.tilecount,
            margin: self.margin,
            spacing: self.spacing,
            tile_properties,
        })
    }
}

fn property_from_json(value: serde_json::Value) -> PropertyValue {
    match value {
        serde_json::Value::Bool(flag) => PropertyValue::Bool(flag),
        serde_json::Value::Number(number) => match number.as_i64() {
            Some(int) => PropertyValue::Int(int),
            None => PropertyValue::Float(number.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(text) => PropertyValue::String(text),
        other => PropertyValue::String(other.to_string()),
    }
}

fn collect_tmx_layer(node: roxmltree::Node<'_, '_>, map: &mut TileMap) -> Result<(), TileMapError> {
    match node.tag_name().name() {
        "layer" => {
            let name = node.attribute("name").unwrap_or_default().to_string();
            let visible = node.attribute("visible") != Some("0");
            let gids = parse_tmx_layer_data(node, &name)?;
            map.push_tile_layer(name, visible, gids)
        }
        "objectgroup" => {
            let mut objects = Vec::new();
            for object in node.children().filter(|child| child.has_tag_name("object")) {
                objects.push(MapObject {
                    name: object.attribute("name").unwrap_or_default().to_string(),
                    kind: object
                        .attribute("type")
                        .or_else(|| object.attribute("class"))
                        .unwrap_or_default()
                        .to_string(),
                    x: tmx_attr(object, "x")?,
                    y: tmx_attr(object, "y")?,
                });
            }
            map.object_layers.push(ObjectLayer {
                name: node.attribute("name").unwrap_or_default().to_string(),
                objects,
            });
            Ok(())
        }
        "group" => {
            for child in node.children().filter(|child| child.is_element()) {
                collect_tmx_layer(child, map)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn parse_tmx_layer_data(layer: roxmltree::Node<'_, '_>, name: &str) -> Result<Vec<u32>, TileMapError> {
    let Some(data) = layer.children().find(|child| child.has_tag_name("data")) else {
        return Ok(Vec::new());
    };
    match data.attribute("encoding") {
        Some("csv") => {}
        Some(other) => {
            return Err(TileMapError::UnsupportedEncoding {
                layer: name.to_string(),
                encoding: other.to_string(),
            })
        }
        None => {
            return Err(TileMapError::UnsupportedEncoding {
                layer: name.to_string(),
                encoding: "xml".to_string(),
            })
        }
    }
    data.text()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<u32>()
                .map_err(|_| TileMapError::InvalidAttribute {
                    element: "data".to_string(),
                    attribute: "csv".to_string(),
                    value: entry.to_string(),
                })
        })
        .collect()
}

fn parse_tmx_tileset(node: roxmltree::Node<'_, '_>) -> Result<Tileset, TileMapError> {
    let name = node.attribute("name").unwrap_or_default().to_string();
    if let Some(reference) = node.attribute("source") {
        return Err(TileMapError::ExternalTileset {
            name,
            reference: reference.to_string(),
        });
    }
    let mut tile_properties = HashMap::new();
    for tile in node.children().filter(|child| child.has_tag_name("tile")) {
        let local_id: u32 = tmx_attr(tile, "id")?;
        let mut properties = TileProperties::new();
        for property in tile
            .descendants()
            .filter(|child| child.has_tag_name("property"))
        {
            let Some(property_name) = property.attribute("name") else {
                continue;
            };
            properties.insert(property_name.to_string(), property_from_tmx(property)?);
        }
        if !properties.is_empty() {
            tile_properties.insert(local_id, properties);
        }
    }
    Ok(Tileset {
        first_gid: tmx_attr(node, "firstgid")?,
        name,
        image: node
            .children()
            .find(|child| child.has_tag_name("image"))
            .and_then(|image| image.attribute("source"))
            .map(ToString::to_string),
        tile_width: tmx_attr_or(node, "tilewidth", 0)?,
        tile_height: tmx_attr_or(node, "tileheight", 0)?,
        columns: tmx_attr_or(node, "columns", 0)?,
        tile_count: tmx_attr_or(node, "tilecount", 0)?,
        margin: tmx_attr_or(node, "margin", 0)?,
        spacing: tmx_attr_or(node, "spacing", 0)?,
        tile_properties,
    })
}

fn property_from_tmx(property: roxmltree::Node<'_, '_>) -> Result<PropertyValue, TileMapError> {
    let raw = property.attribute("value").unwrap_or_default();
    let invalid = || TileMapError::InvalidAttribute {
        element: "property".to_string(),
        attribute: "value".to_string(),
        value: raw.to_string(),
    };
    match property.attribute("type").unwrap_or("string") {
        "bool" => match raw {
            "true" => Ok(PropertyValue::Bool(true)),
            "false" => Ok(PropertyValue::Bool(false)),
            _ => Err(invalid()),
        },
        "int" => raw.parse().map(PropertyValue::Int).map_err(|_| invalid()),
        "float" => raw.parse().map(PropertyValue::Float).map_err(|_| invalid()),
        _ => Ok(PropertyValue::String(raw.to_string())),
    }
}

fn tmx_attr<T: std::str::FromStr>(
    node: roxmltree::Node<'_, '_>,
    attribute: &'static str,
) -> Result<T, TileMapError> {
    let raw = node
        .attribute(attribute)
        .ok_or_else(|| TileMapError::MissingAttribute {
            element: node.tag_name().name().to_string(),
            attribute,
        })?;
    raw.parse().map_err(|_| TileMapError::InvalidAttribute {
        element: node.tag_name().name().to_string(),
        attribute: attribute.to_string(),
        value: raw.to_string(),
    })
}

fn tmx_attr_or<T: std::str::FromStr>(
    node: roxmltree::Node<'_, '_>,
    attribute: &'static str,
    fallback: T,
) -> Result<T, TileMapError> {
    if node.attribute(attribute).is_none() {
        return Ok(fallback);
    }
    tmx_attr(node, attribute)
}
