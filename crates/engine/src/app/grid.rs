use thiserror::Error;

use super::Vec2;

pub const DEFAULT_TILE_SIZE_PX: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub col: i32,
    pub row: i32,
}

impl TileCoord {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    pub fn manhattan(self, other: TileCoord) -> u32 {
        self.col.abs_diff(other.col) + self.row.abs_diff(other.row)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("layer '{layer}' tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch {
        layer: String,
        expected: usize,
        actual: usize,
    },
    #[error("layer '{layer}' is {actual_width}x{actual_height}, grid is {width}x{height}")]
    LayerShapeMismatch {
        layer: String,
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },
    #[error("tile size must be non-zero, got {tile_width}x{tile_height}")]
    ZeroTileSize { tile_width: u32, tile_height: u32 },
}

/// One named layer of per-tile "something is here" flags.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionLayer {
    name: String,
    width: u32,
    height: u32,
    occupied: Vec<bool>,
}

impl CollisionLayer {
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        occupied: Vec<bool>,
    ) -> Result<Self, GridError> {
        let name = name.into();
        let expected = width as usize * height as usize;
        if occupied.len() != expected {
            return Err(GridError::TileCountMismatch {
                layer: name,
                expected,
                actual: occupied.len(),
            });
        }
        Ok(Self {
            name,
            width,
            height,
            occupied,
        })
    }

    /// Builds a layer from raw tile ids where `0` means an empty cell.
    pub fn from_tile_ids(
        name: impl Into<String>,
        width: u32,
        height: u32,
        tile_ids: &[u32],
    ) -> Result<Self, GridError> {
        Self::new(
            name,
            width,
            height,
            tile_ids.iter().map(|&id| id != 0).collect(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_occupied(&self, col: u32, row: u32) -> bool {
        if col >= self.width || row >= self.height {
            return false;
        }
        self.occupied[row as usize * self.width as usize + col as usize]
    }
}

/// Walkability grid for a single room.
///
/// Tile `(col, row)` covers the pixel rectangle
/// `[col * tile_width, (col + 1) * tile_width) x [row * tile_height, (row + 1) * tile_height)`.
/// Everything outside `width x height` tiles counts as blocked.
#[derive(Debug, Clone, PartialEq)]
pub struct GridModel {
    width: u32,
    height: u32,
    tile_width: u32,
    tile_height: u32,
    blocked: Vec<bool>,
    layer_names: Vec<String>,
}

impl GridModel {
    pub fn new(
        width: u32,
        height: u32,
        tile_width: u32,
        tile_height: u32,
        layers: &[CollisionLayer],
    ) -> Result<Self, GridError> {
        if tile_width == 0 || tile_height == 0 {
            return Err(GridError::ZeroTileSize {
                tile_width,
                tile_height,
            });
        }

        let mut blocked = vec![false; width as usize * height as usize];
        for layer in layers {
            if layer.width != width || layer.height != height {
                return Err(GridError::LayerShapeMismatch {
                    layer: layer.name.clone(),
                    width,
                    height,
                    actual_width: layer.width,
                    actual_height: layer.height,
                });
            }
            for (cell, occupied) in blocked.iter_mut().zip(&layer.occupied) {
                *cell |= *occupied;
            }
        }

        Ok(Self {
            width,
            height,
            tile_width,
            tile_height,
            blocked,
            layer_names: layers.iter().map(|layer| layer.name.clone()).collect(),
        })
    }

    /// A grid with no collision layers; every in-bounds tile is walkable.
    pub fn open(width: u32, height: u32, tile_width: u32, tile_height: u32) -> Self {
        Self {
            width,
            height,
            tile_width: tile_width.max(1),
            tile_height: tile_height.max(1),
            blocked: vec![false; width as usize * height as usize],
            layer_names: Vec::new(),
        }
    }

    /// Open grid with the listed tiles marked blocked. Out-of-range tiles are ignored.
    pub fn with_blocked_tiles(
        width: u32,
        height: u32,
        tile_width: u32,
        tile_height: u32,
        blocked_tiles: impl IntoIterator<Item = TileCoord>,
    ) -> Self {
        let mut grid = Self::open(width, height, tile_width, tile_height);
        for tile in blocked_tiles {
            if let Some(index) = grid.index_of(tile) {
                grid.blocked[index] = true;
            }
        }
        grid
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    pub fn width_px(&self) -> f32 {
        self.width as f32 * self.tile_width as f32
    }

    pub fn height_px(&self) -> f32 {
        self.height as f32 * self.tile_height as f32
    }

    pub fn layer_names(&self) -> &[String] {
        &self.layer_names
    }

    pub fn tile_count(&self) -> usize {
        self.blocked.len()
    }

    pub fn in_bounds(&self, tile: TileCoord) -> bool {
        tile.col >= 0
            && tile.row >= 0
            && (tile.col as u32) < self.width
            && (tile.row as u32) < self.height
    }

    pub fn index_of(&self, tile: TileCoord) -> Option<usize> {
        if !self.in_bounds(tile) {
            return None;
        }
        Some(tile.row as usize * self.width as usize + tile.col as usize)
    }

    /// Inverse of [`GridModel::index_of`]; `None` past the last tile.
    pub fn tile_at_index(&self, index: usize) -> Option<TileCoord> {
        if index >= self.tile_count() {
            return None;
        }
        let width = self.width.max(1) as usize;
        Some(TileCoord {
            col: (index % width) as i32,
            row: (index / width) as i32,
        })
    }

    pub fn is_blocked(&self, col: i32, row: i32) -> bool {
        self.index_of(TileCoord { col, row })
            .map(|index| self.blocked[index])
            .unwrap_or(true)
    }

    pub fn is_tile_blocked(&self, tile: TileCoord) -> bool {
        self.is_blocked(tile.col, tile.row)
    }

    pub fn world_to_tile(&self, world: Vec2) -> TileCoord {
        TileCoord {
            col: (world.x / self.tile_width as f32).floor() as i32,
            row: (world.y / self.tile_height as f32).floor() as i32,
        }
    }

    pub fn tile_center_world(&self, tile: TileCoord) -> Vec2 {
        let tile_width = self.tile_width as f32;
        let tile_height = self.tile_height as f32;
        Vec2 {
            x: tile.col as f32 * tile_width + tile_width * 0.5,
            y: tile.row as f32 * tile_height + tile_height * 0.5,
        }
    }

    pub fn is_world_point_blocked(&self, world: Vec2) -> bool {
        self.is_tile_blocked(self.world_to_tile(world))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(name: &str, width: u32, height: u32, occupied: &[(u32, u32)]) -> CollisionLayer {
        let mut ids = vec![0u32; (width * height) as usize];
        for (col, row) in occupied {
            ids[(row * width + col) as usize] = 17;
        }
        CollisionLayer::from_tile_ids(name, width, height, &ids).expect("layer")
    }

    #[test]
    fn tile_index_round_trips_and_stops_at_the_edge() {
        let grid = GridModel::open(4, 3, 32, 32);
        let tile = TileCoord::new(3, 2);
        let index = grid.index_of(tile).expect("in bounds");
        assert_eq!(grid.tile_at_index(index), Some(tile));
        assert_eq!(grid.tile_at_index(grid.tile_count()), None);
    }

    #[test]
    fn pixel_size_does_not_overflow_on_huge_maps() {
        let grid = GridModel::open(70_000, 1, 70_000, 32);
        assert_eq!(grid.width_px(), 70_000.0 * 70_000.0);
        assert_eq!(grid.height_px(), 32.0);
    }

    #[test]
    fn layers_are_combined_with_logical_or() {
        let walls = layer("walls", 4, 3, &[(0, 0)]);
        let furniture = layer("furnitures", 4, 3, &[(2, 1)]);
        let grid = GridModel::new(4, 3, 32, 32, &[walls, furniture]).expect("grid");

        assert!(grid.is_blocked(0, 0));
        assert!(grid.is_blocked(2, 1));
        assert!(!grid.is_blocked(1, 1));
        assert_eq!(grid.layer_names(), ["walls", "furnitures"]);
    }

    #[test]
    fn out_of_bounds_is_always_blocked() {
        let grid = GridModel::open(3, 3, 32, 32);
        assert!(grid.is_blocked(-1, 0));
        assert!(grid.is_blocked(0, -1));
        assert!(grid.is_blocked(3, 0));
        assert!(grid.is_blocked(0, 3));
        assert!(!grid.is_blocked(2, 2));
    }

    #[test]
    fn blocked_query_is_stable_across_repeats() {
        let grid = GridModel::with_blocked_tiles(5, 5, 32, 32, [TileCoord::new(1, 1)]);
        for _ in 0..3 {
            assert!(grid.is_blocked(1, 1));
            assert!(!grid.is_blocked(1, 2));
        }
    }

    #[test]
    fn layer_tile_count_mismatch_is_rejected() {
        let error = CollisionLayer::new("walls", 2, 2, vec![false; 3]).expect_err("mismatch");
        assert_eq!(
            error,
            GridError::TileCountMismatch {
                layer: "walls".to_string(),
                expected: 4,
                actual: 3,
            }
        );
    }

    #[test]
    fn layer_shape_must_match_grid() {
        let small = layer("walls", 2, 2, &[]);
        let error = GridModel::new(3, 3, 32, 32, &[small]).expect_err("shape");
        assert!(matches!(error, GridError::LayerShapeMismatch { .. }));
    }

    #[test]
    fn world_tile_conversion_uses_floor_division() {
        let grid = GridModel::open(10, 10, 32, 32);
        assert_eq!(grid.world_to_tile(Vec2::new(31.9, 32.0)), TileCoord::new(0, 1));
        assert_eq!(grid.world_to_tile(Vec2::new(-0.5, 5.0)), TileCoord::new(-1, 0));
        assert_eq!(grid.tile_center_world(TileCoord::new(2, 3)), Vec2::new(80.0, 112.0));
        assert!(grid.is_world_point_blocked(Vec2::new(-0.5, 5.0)));
    }
}
