use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::app::{
    CollisionLayer, GridError, GridModel, InteractionZone, ZoneRegistry, ZoneRegistryError,
};

/// Tiled stores flip/rotation flags in the top bits of each gid.
const TILE_GID_MASK: u32 = 0x0FFF_FFFF;

#[derive(Debug, Error)]
pub enum MapLoadError {
    #[error("failed to read room map {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse room map at {location}: {source}")]
    Parse {
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("tile layer '{layer}' has no inline data (infinite or base64 maps are not supported)")]
    MissingLayerData { layer: String },
    #[error("invalid room map {path}: {source}")]
    InvalidFile {
        path: PathBuf,
        #[source]
        source: Box<MapLoadError>,
    },
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Zones(#[from] ZoneRegistryError),
}

/// Which Tiled layers feed the grid and the zone registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MapLayerSpec {
    pub collision_layers: Vec<String>,
    pub interactives_layer: String,
}

impl Default for MapLayerSpec {
    fn default() -> Self {
        Self {
            collision_layers: vec![
                "walls".to_string(),
                "furnitures".to_string(),
                "woods".to_string(),
            ],
            interactives_layer: "interactives".to_string(),
        }
    }
}

/// Static data for one room: walkability plus interaction zones.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomMap {
    pub grid: GridModel,
    pub zones: ZoneRegistry,
}

#[derive(Debug, Deserialize)]
struct TiledMap {
    width: u32,
    height: u32,
    #[serde(rename = "tilewidth")]
    tile_width: u32,
    #[serde(rename = "tileheight")]
    tile_height: u32,
    #[serde(default)]
    layers: Vec<TiledLayer>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum TiledLayer {
    #[serde(rename = "tilelayer")]
    Tiles(TiledTileLayer),
    #[serde(rename = "objectgroup")]
    Objects(TiledObjectGroup),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct TiledTileLayer {
    name: String,
    width: Option<u32>,
    height: Option<u32>,
    data: Option<Vec<u32>>,
}

#[derive(Debug, Deserialize)]
struct TiledObjectGroup {
    name: String,
    #[serde(default)]
    objects: Vec<TiledObject>,
}

#[derive(Debug, Deserialize)]
struct TiledObject {
    #[serde(default)]
    name: String,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    width: Option<f32>,
    height: Option<f32>,
}

pub fn load_room_map(path: &Path, layers: &MapLayerSpec) -> Result<RoomMap, MapLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| MapLoadError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let map = parse_room_map(&raw, layers).map_err(|source| MapLoadError::InvalidFile {
        path: path.to_path_buf(),
        source: Box::new(source),
    })?;
    info!(
        path = %path.display(),
        width = map.grid.width(),
        height = map.grid.height(),
        zone_count = map.zones.len(),
        "room_map_loaded"
    );
    Ok(map)
}

pub fn parse_room_map(raw: &str, layers: &MapLayerSpec) -> Result<RoomMap, MapLoadError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let map: TiledMap =
        serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
            let location = error.path().to_string();
            MapLoadError::Parse {
                location,
                source: error.into_inner(),
            }
        })?;

    let mut collision_layers = Vec::new();
    for wanted in &layers.collision_layers {
        let found = map.layers.iter().find_map(|layer| match layer {
            TiledLayer::Tiles(tiles) if &tiles.name == wanted => Some(tiles),
            _ => None,
        });
        let Some(tiles) = found else {
            debug!(layer = %wanted, "collision_layer_missing");
            continue;
        };
        let data = tiles
            .data
            .as_ref()
            .ok_or_else(|| MapLoadError::MissingLayerData {
                layer: tiles.name.clone(),
            })?;
        let ids: Vec<u32> = data.iter().map(|gid| gid & TILE_GID_MASK).collect();
        collision_layers.push(CollisionLayer::from_tile_ids(
            tiles.name.clone(),
            tiles.width.unwrap_or(map.width),
            tiles.height.unwrap_or(map.height),
            &ids,
        )?);
    }
    let grid = GridModel::new(
        map.width,
        map.height,
        map.tile_width,
        map.tile_height,
        &collision_layers,
    )?;

    let objects = map.layers.iter().find_map(|layer| match layer {
        TiledLayer::Objects(group) if group.name == layers.interactives_layer => Some(group),
        _ => None,
    });
    let zones = match objects {
        Some(group) => {
            let mut zones = Vec::with_capacity(group.objects.len());
            for object in &group.objects {
                if object.name.is_empty() {
                    warn!(x = object.x, y = object.y, "interactive_object_without_name");
                    continue;
                }
                zones.push(InteractionZone::from_top_left(
                    object.name.clone(),
                    object.x,
                    object.y,
                    object.width,
                    object.height,
                ));
            }
            ZoneRegistry::new(zones)?
        }
        None => {
            warn!(layer = %layers.interactives_layer, "interactives_layer_missing");
            ZoneRegistry::default()
        }
    };

    Ok(RoomMap { grid, zones })
}
