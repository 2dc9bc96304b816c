use std::cmp::Ordering;

use super::{GridModel, InteractionZone, TileCoord, Vec2};

pub const WALKABLE_SEARCH_MAX_RADIUS: i32 = 5;
/// Center-distance gap (px²) above which nearness to the zone center decides access order.
pub const ACCESS_CENTER_BAND_PX_SQ: f32 = 256.0;
pub const NON_CARDINAL_PENALTY: f32 = 2.0;
/// A start this close to an access point with no path counts as already arrived.
pub const ARRIVED_RADIUS_PX: f32 = 8.0;

/// Waypoint sequence consumed front-to-back through a cursor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavPath {
    waypoints_world: Vec<Vec2>,
    next_waypoint_index: usize,
}

impl NavPath {
    pub fn new(waypoints_world: Vec<Vec2>) -> Self {
        Self {
            waypoints_world,
            next_waypoint_index: 0,
        }
    }

    pub fn waypoints(&self) -> &[Vec2] {
        &self.waypoints_world
    }

    pub fn len(&self) -> usize {
        self.waypoints_world.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints_world.is_empty()
    }

    pub fn goal(&self) -> Option<Vec2> {
        self.waypoints_world.last().copied()
    }

    pub fn current_waypoint(&self) -> Option<Vec2> {
        self.waypoints_world.get(self.next_waypoint_index).copied()
    }

    pub fn advance_waypoint(&mut self) {
        if self.next_waypoint_index < self.waypoints_world.len() {
            self.next_waypoint_index = self.next_waypoint_index.saturating_add(1);
        }
    }

    pub fn remaining(&self) -> usize {
        self.waypoints_world
            .len()
            .saturating_sub(self.next_waypoint_index)
    }

    pub fn is_complete(&self) -> bool {
        self.next_waypoint_index >= self.waypoints_world.len()
    }
}

/// Walkable tile next to (or inside) a zone, ranked for approach.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccessPoint {
    pub tile: TileCoord,
    pub world: Vec2,
    pub is_cardinal: bool,
}

/// Grid pathfinding queries. Unreachable targets yield empty paths, never errors.
#[derive(Debug, Clone, Copy)]
pub struct Pathfinder<'a> {
    grid: &'a GridModel,
}

impl<'a> Pathfinder<'a> {
    pub fn new(grid: &'a GridModel) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &'a GridModel {
        self.grid
    }

    /// Tile-center waypoints from the first step after `start` through the target tile.
    ///
    /// A blocked target is replaced by the nearest walkable tile within
    /// [`WALKABLE_SEARCH_MAX_RADIUS`] rings. The start tile itself is never checked.
    pub fn find_path(&self, start: Vec2, target: Vec2) -> NavPath {
        let start_tile = self.grid.world_to_tile(start);
        let mut goal_tile = self.grid.world_to_tile(target);
        if self.grid.is_tile_blocked(goal_tile) {
            match self.find_closest_walkable_tile(goal_tile, WALKABLE_SEARCH_MAX_RADIUS) {
                Some(tile) => goal_tile = tile,
                None => return NavPath::default(),
            }
        }
        if start_tile == goal_tile {
            return NavPath::default();
        }

        match self.find_path_tiles(start_tile, goal_tile) {
            Some(tiles) => NavPath::new(
                tiles
                    .into_iter()
                    .skip(1)
                    .map(|tile| self.grid.tile_center_world(tile))
                    .collect(),
            ),
            None => NavPath::default(),
        }
    }

    /// Walkable tiles in the zone's tile box grown by one ring, best approach first.
    pub fn get_sorted_access_points(
        &self,
        reference: Vec2,
        zone: &InteractionZone,
    ) -> Vec<AccessPoint> {
        let bounds = zone.bounds();
        let tile_width = self.grid.tile_width() as f32;
        let tile_height = self.grid.tile_height() as f32;
        let start_col = (bounds.x / tile_width).floor() as i32;
        let start_row = (bounds.y / tile_height).floor() as i32;
        let end_col = ((bounds.x + bounds.width - 1.0) / tile_width).floor() as i32;
        let end_row = ((bounds.y + bounds.height - 1.0) / tile_height).floor() as i32;

        let mut candidates = Vec::new();
        for col in (start_col - 1)..=(end_col + 1) {
            for row in (start_row - 1)..=(end_row + 1) {
                let tile = TileCoord { col, row };
                if self.grid.is_tile_blocked(tile) {
                    continue;
                }
                let is_cardinal =
                    (start_col..=end_col).contains(&col) || (start_row..=end_row).contains(&row);
                candidates.push(AccessPoint {
                    tile,
                    world: self.grid.tile_center_world(tile),
                    is_cardinal,
                });
            }
        }

        let center = zone.center();
        insertion_sort_by(&mut candidates, |a, b| {
            compare_access_points(a, b, center, reference)
        });
        candidates
    }

    /// First non-empty path to one of the zone's access points, in ranked order.
    pub fn find_path_to_zone(&self, start: Vec2, zone: &InteractionZone) -> NavPath {
        for point in self.get_sorted_access_points(start, zone) {
            let path = self.find_path(start, point.world);
            if !path.is_empty() {
                return path;
            }
            if start.distance(point.world) < ARRIVED_RADIUS_PX {
                return NavPath::default();
            }
        }
        NavPath::default()
    }

    pub fn find_closest_walkable_point(&self, target: Vec2) -> Option<Vec2> {
        let tile = self.grid.world_to_tile(target);
        self.find_closest_walkable_tile(tile, WALKABLE_SEARCH_MAX_RADIUS)
            .map(|tile| self.grid.tile_center_world(tile))
    }

    /// The tile itself if walkable, else the first walkable tile on square rings of
    /// growing radius, scanning columns left to right and rows top to bottom per ring.
    pub fn find_closest_walkable_tile(&self, origin: TileCoord, max_radius: i32) -> Option<TileCoord> {
        if !self.grid.is_tile_blocked(origin) {
            return Some(origin);
        }
        for radius in 1..=max_radius {
            for dx in -radius..=radius {
                for dy in -radius..=radius {
                    if dx.abs() != radius && dy.abs() != radius {
                        continue;
                    }
                    let tile = TileCoord {
                        col: origin.col + dx,
                        row: origin.row + dy,
                    };
                    if !self.grid.is_tile_blocked(tile) {
                        return Some(tile);
                    }
                }
            }
        }
        None
    }

    fn find_path_tiles(&self, start: TileCoord, goal: TileCoord) -> Option<Vec<TileCoord>> {
        let start_index = self.grid.index_of(start)?;
        let goal_index = self.grid.index_of(goal)?;

        let node_count = self.grid.tile_count();
        let mut best_g = vec![u32::MAX; node_count];
        let mut parent = vec![None::<usize>; node_count];
        let mut in_open = vec![false; node_count];
        let mut open = Vec::new();

        best_g[start_index] = 0;
        open.push(OpenNode {
            index: start_index,
            f_cost: euclidean_distance(start, goal),
        });
        in_open[start_index] = true;

        while !open.is_empty() {
            let best = pick_best_open_node_index(&open);
            let current = open.remove(best);
            in_open[current.index] = false;
            if current.index == goal_index {
                return Some(reconstruct_tile_path(
                    self.grid,
                    &parent,
                    start_index,
                    goal_index,
                ));
            }

            let Some(current_tile) = self.grid.tile_at_index(current.index) else {
                continue;
            };
            let current_g = best_g[current.index];
            for neighbor in neighbors(current_tile) {
                if self.grid.is_tile_blocked(neighbor) {
                    continue;
                }
                let Some(neighbor_index) = self.grid.index_of(neighbor) else {
                    continue;
                };
                let tentative_g = current_g.saturating_add(1);
                if tentative_g >= best_g[neighbor_index] {
                    continue;
                }

                best_g[neighbor_index] = tentative_g;
                parent[neighbor_index] = Some(current.index);
                // An entry already waiting in the open list keeps its original priority.
                if !in_open[neighbor_index] {
                    open.push(OpenNode {
                        index: neighbor_index,
                        f_cost: tentative_g as f32 + euclidean_distance(neighbor, goal),
                    });
                    in_open[neighbor_index] = true;
                }
            }
        }

        None
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenNode {
    index: usize,
    f_cost: f32,
}

/// Lowest f wins; among equal f the earliest entry in the list wins.
fn pick_best_open_node_index(open: &[OpenNode]) -> usize {
    let mut best_index = 0usize;
    for index in 1..open.len() {
        if open[index].f_cost < open[best_index].f_cost {
            best_index = index;
        }
    }
    best_index
}

/// Up, down, left, right.
fn neighbors(tile: TileCoord) -> [TileCoord; 4] {
    [
        TileCoord::new(tile.col, tile.row - 1),
        TileCoord::new(tile.col, tile.row + 1),
        TileCoord::new(tile.col - 1, tile.row),
        TileCoord::new(tile.col + 1, tile.row),
    ]
}

fn reconstruct_tile_path(
    grid: &GridModel,
    parent: &[Option<usize>],
    start_index: usize,
    goal_index: usize,
) -> Vec<TileCoord> {
    let mut cursor = goal_index;
    let mut indices = vec![cursor];
    while cursor != start_index {
        let Some(next) = parent.get(cursor).copied().flatten() else {
            break;
        };
        cursor = next;
        indices.push(cursor);
    }
    indices.reverse();
    indices
        .into_iter()
        .filter_map(|index| grid.tile_at_index(index))
        .collect()
}

fn euclidean_distance(a: TileCoord, b: TileCoord) -> f32 {
    let dx = (a.col - b.col) as f32;
    let dy = (a.row - b.row) as f32;
    (dx * dx + dy * dy).sqrt()
}

fn compare_access_points(
    a: &AccessPoint,
    b: &AccessPoint,
    center: Vec2,
    reference: Vec2,
) -> Ordering {
    let center_a = a.world.distance_sq(center);
    let center_b = b.world.distance_sq(center);
    if (center_a - center_b).abs() > ACCESS_CENTER_BAND_PX_SQ {
        return center_a.total_cmp(&center_b);
    }

    let mut reference_a = a.world.distance_sq(reference);
    let mut reference_b = b.world.distance_sq(reference);
    if !a.is_cardinal {
        reference_a *= NON_CARDINAL_PENALTY;
    }
    if !b.is_cardinal {
        reference_b *= NON_CARDINAL_PENALTY;
    }
    reference_a.total_cmp(&reference_b)
}

/// Stable insertion sort. The access-point ordering is not transitive, so
/// `slice::sort_by` is avoided; this gives a deterministic result for any comparator.
fn insertion_sort_by<T, F>(items: &mut [T], mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    for end in 1..items.len() {
        let mut cursor = end;
        while cursor > 0 && compare(&items[cursor - 1], &items[cursor]) == Ordering::Greater {
            items.swap(cursor - 1, cursor);
            cursor -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn tile_center(col: i32, row: i32) -> Vec2 {
        Vec2::new(col as f32 * 32.0 + 16.0, row as f32 * 32.0 + 16.0)
    }

    #[test]
    fn open_grid_corner_to_corner_path_is_manhattan_length() {
        let grid = GridModel::open(10, 10, 32, 32);
        let path = Pathfinder::new(&grid).find_path(tile_center(0, 0), tile_center(9, 9));

        // The start tile is not a waypoint: 17 intermediate tiles plus the target.
        assert_eq!(path.len(), 18);
        assert!(!path.waypoints().contains(&tile_center(0, 0)));
        let first = grid.world_to_tile(path.waypoints()[0]);
        assert!(
            first == TileCoord::new(1, 0) || first == TileCoord::new(0, 1),
            "first step {first:?}"
        );
        assert_eq!(path.goal(), Some(tile_center(9, 9)));

        let tiles: Vec<TileCoord> = std::iter::once(TileCoord::new(0, 0))
            .chain(path.waypoints().iter().map(|point| grid.world_to_tile(*point)))
            .collect();
        for pair in tiles.windows(2) {
            let step = (pair[1].col - pair[0].col).abs() + (pair[1].row - pair[0].row).abs();
            assert_eq!(step, 1, "{:?} -> {:?} is not one orthogonal step", pair[0], pair[1]);
        }
    }

    #[test]
    fn same_tile_start_and_target_yields_empty_path() {
        let grid = GridModel::open(4, 4, 32, 32);
        let path = Pathfinder::new(&grid).find_path(Vec2::new(40.0, 40.0), Vec2::new(60.0, 50.0));
        assert!(path.is_empty());
    }

    #[test]
    fn blocked_target_is_replaced_by_nearest_ring_tile() {
        let grid = GridModel::with_blocked_tiles(8, 8, 32, 32, [TileCoord::new(5, 5)]);
        let path = Pathfinder::new(&grid).find_path(tile_center(0, 5), tile_center(5, 5));
        // Ring 1 is scanned column-major from (-1, -1); (4, 4) is the first walkable tile.
        assert_eq!(path.goal(), Some(tile_center(4, 4)));
    }

    #[test]
    fn unreachable_target_yields_empty_path() {
        let walls = (0..6).map(|row| TileCoord::new(3, row));
        let grid = GridModel::with_blocked_tiles(6, 6, 32, 32, walls);
        let path = Pathfinder::new(&grid).find_path(tile_center(0, 0), tile_center(5, 5));
        assert!(path.is_empty());
    }

    #[test]
    fn fully_blocked_neighbourhood_has_no_closest_walkable_point() {
        let grid = GridModel::with_blocked_tiles(
            3,
            3,
            32,
            32,
            (0..3).flat_map(|col| (0..3).map(move |row| TileCoord::new(col, row))),
        );
        assert_eq!(
            Pathfinder::new(&grid).find_closest_walkable_point(tile_center(1, 1)),
            None
        );
    }

    #[test]
    fn path_cursor_advances_to_completion() {
        let mut path = NavPath::new(vec![Vec2::new(1.0, 1.0), Vec2::new(2.0, 2.0)]);
        assert_eq!(path.current_waypoint(), Some(Vec2::new(1.0, 1.0)));
        path.advance_waypoint();
        assert_eq!(path.remaining(), 1);
        path.advance_waypoint();
        path.advance_waypoint();
        assert!(path.is_complete());
        assert_eq!(path.current_waypoint(), None);
    }

    #[test]
    fn access_points_favor_cardinal_tiles_near_the_reference() {
        let grid = GridModel::open(10, 10, 32, 32);
        let zone = InteractionZone::new("desk", tile_center(5, 5), 32.0, 32.0);
        let points = Pathfinder::new(&grid).get_sorted_access_points(tile_center(5, 9), &zone);

        // The zone's own tile is the nearest to its center.
        assert_eq!(points[0].tile, TileCoord::new(5, 5));
        assert_eq!(points[1].tile, TileCoord::new(5, 6));
        assert!(points[1].is_cardinal);
        assert_eq!(points.len(), 9);
    }

    #[test]
    fn boxed_zone_is_approached_from_its_only_open_side() {
        let open_tile = TileCoord::new(5, 3);
        let blocked = (3..=7)
            .flat_map(|col| (3..=7).map(move |row| TileCoord::new(col, row)))
            .filter(|tile| *tile != open_tile);
        let grid = GridModel::with_blocked_tiles(12, 12, 32, 32, blocked);
        let zone = InteractionZone::new("book-shelf", tile_center(5, 5), 64.0, 64.0);
        let pathfinder = Pathfinder::new(&grid);

        let points = pathfinder.get_sorted_access_points(tile_center(5, 0), &zone);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].tile, open_tile);

        let path = pathfinder.find_path_to_zone(tile_center(5, 0), &zone);
        assert_eq!(path.goal(), Some(tile_center(5, 3)));
    }

    #[test]
    fn standing_on_the_access_point_counts_as_arrived() {
        let grid = GridModel::with_blocked_tiles(6, 6, 32, 32, [TileCoord::new(2, 2)]);
        let zone = InteractionZone::new("bed", tile_center(2, 2), 32.0, 32.0);
        let pathfinder = Pathfinder::new(&grid);
        let first = pathfinder.get_sorted_access_points(tile_center(2, 3), &zone)[0];
        assert_eq!(first.tile, TileCoord::new(2, 3));

        let path = pathfinder.find_path_to_zone(tile_center(2, 3), &zone);
        assert!(path.is_empty());
    }

    fn blocked_grid(blocked: &[(i32, i32)]) -> GridModel {
        GridModel::with_blocked_tiles(
            8,
            8,
            32,
            32,
            blocked.iter().map(|&(col, row)| TileCoord::new(col, row)),
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]
        #[test]
        fn paths_step_one_tile_at_a_time_over_walkable_tiles(
            blocked in prop::collection::vec((0_i32..8, 0_i32..8), 0..24),
            start in (0_i32..8, 0_i32..8),
            target in (0_i32..8, 0_i32..8)
        ) {
            let grid = blocked_grid(&blocked);
            let path = Pathfinder::new(&grid)
                .find_path(tile_center(start.0, start.1), tile_center(target.0, target.1));

            let mut previous = TileCoord::new(start.0, start.1);
            for waypoint in path.waypoints() {
                let tile = grid.world_to_tile(*waypoint);
                prop_assert!(!grid.is_tile_blocked(tile), "waypoint {tile:?} is blocked");
                prop_assert_eq!(previous.manhattan(tile), 1);
                previous = tile;
            }
        }

        #[test]
        fn access_points_are_walkable_and_hug_the_zone(
            blocked in prop::collection::vec((0_i32..8, 0_i32..8), 0..24),
            zone_tile in (1_i32..7, 1_i32..7),
            reference in (0_i32..8, 0_i32..8)
        ) {
            let grid = blocked_grid(&blocked);
            let zone = InteractionZone::new("zone", tile_center(zone_tile.0, zone_tile.1), 32.0, 32.0);
            let points = Pathfinder::new(&grid)
                .get_sorted_access_points(tile_center(reference.0, reference.1), &zone);

            for point in &points {
                prop_assert!(!grid.is_tile_blocked(point.tile));
                prop_assert!((point.tile.col - zone_tile.0).abs() <= 1);
                prop_assert!((point.tile.row - zone_tile.1).abs() <= 1);
                prop_assert_eq!(point.world, grid.tile_center_world(point.tile));
            }
        }
    }
}
