mod tiled;

pub use tiled::{load_room_map, parse_room_map, MapLayerSpec, MapLoadError, RoomMap};
