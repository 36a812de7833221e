//! Grid pathfinding over the world's obstacle map.
//!
//! `ObstacleGrid` rasterizes obstacle rectangles into square tiles. Paths are
//! found with 8-directional A* (no corner cutting) under a node cap and a
//! wall-clock budget; when the search cannot finish, callers get a direct
//! two-point path flagged `success = false`.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::time::{Duration, Instant};

use crate::components::{Bounds, Vec2, WorldSnapshot};
use crate::config::LocomotionConfig;

/// Tile coordinate (column, row)
pub type Cell = (i32, i32);

const DIAGONAL_COST: f32 = std::f32::consts::SQRT_2;
/// Expansions between wall-clock checks
const CLOCK_CHECK_INTERVAL: usize = 64;

const NEIGHBORS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Walkability raster of the world
#[derive(Debug, Clone)]
pub struct ObstacleGrid {
    origin: Vec2,
    tile_size: f32,
    cols: i32,
    rows: i32,
    blocked: Vec<bool>,
}

impl ObstacleGrid {
    /// Empty (fully walkable) grid covering `bounds`
    pub fn new(bounds: Bounds, tile_size: f32) -> Self {
        let tile_size = if tile_size > 0.0 { tile_size } else { 32.0 };
        let cols = ((bounds.width / tile_size).ceil() as i32).max(1);
        let rows = ((bounds.height / tile_size).ceil() as i32).max(1);
        Self {
            origin: Vec2::new(bounds.x, bounds.y),
            tile_size,
            cols,
            rows,
            blocked: vec![false; (cols * rows) as usize],
        }
    }

    pub fn from_world(world: &WorldSnapshot, tile_size: f32) -> Self {
        let mut grid = Self::new(world.bounds, tile_size);
        for obstacle in &world.obstacles {
            grid.block_rect(obstacle);
        }
        grid
    }

    /// Mark every tile overlapping `rect` as blocked
    pub fn block_rect(&mut self, rect: &Bounds) {
        let min_col = ((rect.x - self.origin.x) / self.tile_size).floor() as i32;
        let min_row = ((rect.y - self.origin.y) / self.tile_size).floor() as i32;
        let max_col = ((rect.max_x() - self.origin.x) / self.tile_size).ceil() as i32 - 1;
        let max_row = ((rect.max_y() - self.origin.y) / self.tile_size).ceil() as i32 - 1;
        for row in min_row.max(0)..=max_row.min(self.rows - 1) {
            for col in min_col.max(0)..=max_col.min(self.cols - 1) {
                let idx = self.index((col, row));
                self.blocked[idx] = true;
            }
        }
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    fn index(&self, (col, row): Cell) -> usize {
        (row * self.cols + col) as usize
    }

    pub fn in_bounds(&self, (col, row): Cell) -> bool {
        col >= 0 && row >= 0 && col < self.cols && row < self.rows
    }

    /// Out-of-bounds cells count as blocked
    pub fn is_blocked(&self, cell: Cell) -> bool {
        !self.in_bounds(cell) || self.blocked[self.index(cell)]
    }

    /// Tile containing `point`, clamped to the grid
    pub fn cell_of(&self, point: Vec2) -> Cell {
        let col = ((point.x - self.origin.x) / self.tile_size).floor() as i32;
        let row = ((point.y - self.origin.y) / self.tile_size).floor() as i32;
        (col.clamp(0, self.cols - 1), row.clamp(0, self.rows - 1))
    }

    pub fn cell_center(&self, (col, row): Cell) -> Vec2 {
        Vec2::new(
            self.origin.x + (col as f32 + 0.5) * self.tile_size,
            self.origin.y + (row as f32 + 0.5) * self.tile_size,
        )
    }

    /// Nearest free tile around `cell`, scanning square rings of growing radius
    pub fn find_free_near(&self, cell: Cell, max_radius: i32) -> Option<Cell> {
        if !self.is_blocked(cell) {
            return Some(cell);
        }
        let (cx, cy) = cell;
        for radius in 1..=max_radius {
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    if dx.abs() != radius && dy.abs() != radius {
                        continue;
                    }
                    let candidate = (cx + dx, cy + dy);
                    if !self.is_blocked(candidate) {
                        return Some(candidate);
                    }
                }
            }
        }
        None
    }

    /// Diagonal moves need both adjacent orthogonal tiles free
    fn can_step(&self, (col, row): Cell, (dx, dy): (i32, i32)) -> bool {
        if self.is_blocked((col + dx, row + dy)) {
            return false;
        }
        if dx != 0 && dy != 0 {
            return !self.is_blocked((col + dx, row)) && !self.is_blocked((col, row + dy));
        }
        true
    }
}

/// Limits applied to a single grid search
#[derive(Debug, Clone, Copy)]
pub struct SearchLimits {
    pub max_nodes: usize,
    pub time_budget: Duration,
}

impl SearchLimits {
    pub fn from_config(config: &LocomotionConfig) -> Self {
        Self {
            max_nodes: config.max_search_nodes,
            time_budget: Duration::from_millis(config.search_time_budget_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Cells from start to goal inclusive
    Found(Vec<Cell>),
    NoPath,
    BudgetExceeded,
}

/// Node in the A* open set
#[derive(Debug, Clone, Copy)]
struct OpenNode {
    cell: Cell,
    f_cost: f32,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cell == other.cell
    }
}

impl Eq for OpenNode {}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other
            .f_cost
            .partial_cmp(&self.f_cost)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Octile distance
fn heuristic((ax, ay): Cell, (bx, by): Cell) -> f32 {
    let dx = (ax - bx).abs() as f32;
    let dy = (ay - by).abs() as f32;
    dx.max(dy) + (DIAGONAL_COST - 1.0) * dx.min(dy)
}

/// A* between two free cells
pub fn astar(grid: &ObstacleGrid, start: Cell, goal: Cell, limits: SearchLimits) -> SearchOutcome {
    if grid.is_blocked(start) || grid.is_blocked(goal) {
        return SearchOutcome::NoPath;
    }
    if start == goal {
        return SearchOutcome::Found(vec![start]);
    }

    let started = Instant::now();
    let mut open_set = BinaryHeap::new();
    let mut came_from: HashMap<Cell, Cell> = HashMap::new();
    let mut g_scores: HashMap<Cell, f32> = HashMap::new();
    let mut expanded = 0usize;

    g_scores.insert(start, 0.0);
    open_set.push(OpenNode {
        cell: start,
        f_cost: heuristic(start, goal),
    });

    while let Some(current) = open_set.pop() {
        if current.cell == goal {
            return SearchOutcome::Found(reconstruct_path(&came_from, goal));
        }

        let current_g = *g_scores.get(&current.cell).unwrap_or(&f32::INFINITY);
        // Stale heap entry
        if current.f_cost > current_g + heuristic(current.cell, goal) + 1e-3 {
            continue;
        }

        expanded += 1;
        if expanded > limits.max_nodes {
            return SearchOutcome::BudgetExceeded;
        }
        if expanded % CLOCK_CHECK_INTERVAL == 0 && started.elapsed() > limits.time_budget {
            return SearchOutcome::BudgetExceeded;
        }

        for step in NEIGHBORS {
            if !grid.can_step(current.cell, step) {
                continue;
            }
            let neighbor = (current.cell.0 + step.0, current.cell.1 + step.1);
            let move_cost = if step.0 != 0 && step.1 != 0 {
                DIAGONAL_COST
            } else {
                1.0
            };
            let tentative_g = current_g + move_cost;
            let neighbor_g = *g_scores.get(&neighbor).unwrap_or(&f32::INFINITY);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.cell);
                g_scores.insert(neighbor, tentative_g);
                open_set.push(OpenNode {
                    cell: neighbor,
                    f_cost: tentative_g + heuristic(neighbor, goal),
                });
            }
        }
    }

    SearchOutcome::NoPath
}

fn reconstruct_path(came_from: &HashMap<Cell, Cell>, mut current: Cell) -> Vec<Cell> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Waypoints from start to destination. `success` is false when the path is
/// a direct fallback that may cross obstacles.
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    pub path: Vec<Vec2>,
    pub success: bool,
}

impl PathResult {
    pub fn direct(from: Vec2, to: Vec2, success: bool) -> Self {
        Self {
            path: vec![from, to],
            success,
        }
    }

    pub fn destination(&self) -> Option<Vec2> {
        self.path.last().copied()
    }

    pub fn length(&self) -> f32 {
        path_length(&self.path)
    }
}

/// Total arc length of a polyline
pub fn path_length(path: &[Vec2]) -> f32 {
    path.windows(2).map(|w| w[0].distance(&w[1])).sum()
}

/// Plan a route from `from` to `to`.
///
/// Short hops go direct. A blocked destination is moved to the nearest free
/// tile within `fallback_search_radius`; if there is none, or the search
/// fails or runs out of budget, the result is a direct path with
/// `success = false`.
pub fn plan_path(
    grid: &ObstacleGrid,
    from: Vec2,
    to: Vec2,
    config: &LocomotionConfig,
) -> PathResult {
    if from.distance(&to) < config.short_path_threshold {
        return PathResult::direct(from, to, true);
    }

    let target_cell = grid.cell_of(to);
    let Some(goal) = grid.find_free_near(target_cell, config.fallback_search_radius) else {
        log::debug!(
            "No free tile near ({:.0}, {:.0}); using direct path",
            to.x,
            to.y
        );
        return PathResult::direct(from, to, false);
    };
    let Some(start) = grid.find_free_near(grid.cell_of(from), config.fallback_search_radius) else {
        log::debug!(
            "Start ({:.0}, {:.0}) is enclosed; using direct path",
            from.x,
            from.y
        );
        return PathResult::direct(from, to, false);
    };
    let destination = if goal == target_cell {
        to
    } else {
        grid.cell_center(goal)
    };

    match astar(grid, start, goal, SearchLimits::from_config(config)) {
        SearchOutcome::Found(cells) => {
            let mut path = Vec::with_capacity(cells.len() + 1);
            path.push(from);
            if cells.len() > 2 {
                path.extend(cells[1..cells.len() - 1].iter().map(|c| grid.cell_center(*c)));
            }
            path.push(destination);
            PathResult {
                path,
                success: true,
            }
        }
        SearchOutcome::NoPath => {
            log::debug!("No path from {:?} to {:?}; using direct path", start, goal);
            PathResult::direct(from, destination, false)
        }
        SearchOutcome::BudgetExceeded => {
            log::debug!(
                "Path search from {:?} to {:?} exceeded its budget; using direct path",
                start,
                goal
            );
            PathResult::direct(from, destination, false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_grid() -> ObstacleGrid {
        ObstacleGrid::new(Bounds::new(0.0, 0.0, 640.0, 640.0), 32.0)
    }

    fn generous() -> SearchLimits {
        SearchLimits {
            max_nodes: 100_000,
            time_budget: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_grid_dimensions_and_cells() {
        let grid = ObstacleGrid::new(Bounds::new(0.0, 0.0, 100.0, 64.0), 32.0);
        assert_eq!((grid.cols(), grid.rows()), (4, 2));
        assert_eq!(grid.cell_of(Vec2::new(33.0, 10.0)), (1, 0));
        assert_eq!(grid.cell_of(Vec2::new(-50.0, 900.0)), (0, 1));
        assert_eq!(grid.cell_center((1, 1)), Vec2::new(48.0, 48.0));
        assert!(grid.is_blocked((-1, 0)));
    }

    #[test]
    fn test_block_rect_marks_overlapping_tiles() {
        let mut grid = open_grid();
        grid.block_rect(&Bounds::new(40.0, 40.0, 30.0, 30.0));
        assert!(grid.is_blocked((1, 1)));
        assert!(grid.is_blocked((2, 2)));
        assert!(!grid.is_blocked((3, 3)));
        assert!(!grid.is_blocked((0, 0)));
    }

    #[test]
    fn test_astar_straight_line() {
        let grid = open_grid();
        match astar(&grid, (0, 0), (5, 0), generous()) {
            SearchOutcome::Found(cells) => {
                assert_eq!(cells.first(), Some(&(0, 0)));
                assert_eq!(cells.last(), Some(&(5, 0)));
                assert_eq!(cells.len(), 6);
            }
            other => panic!("expected path, got {:?}", other),
        }
    }

    #[test]
    fn test_astar_routes_around_wall() {
        let mut grid = open_grid();
        // Vertical wall at column 5, rows 0..=15
        grid.block_rect(&Bounds::new(160.0, 0.0, 32.0, 512.0));
        match astar(&grid, (2, 2), (8, 2), generous()) {
            SearchOutcome::Found(cells) => {
                assert!(cells.iter().all(|c| !grid.is_blocked(*c)));
                assert!(cells.iter().any(|c| c.1 >= 16));
            }
            other => panic!("expected path, got {:?}", other),
        }
    }

    #[test]
    fn test_no_corner_cutting() {
        let mut grid = ObstacleGrid::new(Bounds::new(0.0, 0.0, 96.0, 96.0), 32.0);
        grid.block_rect(&Bounds::new(32.0, 0.0, 32.0, 32.0));
        // (0,0) -> (1,1) diagonal would clip the blocked (1,0)
        match astar(&grid, (0, 0), (1, 1), generous()) {
            SearchOutcome::Found(cells) => assert_eq!(cells, vec![(0, 0), (0, 1), (1, 1)]),
            other => panic!("expected path, got {:?}", other),
        }
    }

    #[test]
    fn test_astar_enclosed_goal() {
        let mut grid = open_grid();
        for rect in [
            Bounds::new(256.0, 256.0, 96.0, 32.0),
            Bounds::new(256.0, 320.0, 96.0, 32.0),
            Bounds::new(256.0, 288.0, 32.0, 32.0),
            Bounds::new(320.0, 288.0, 32.0, 32.0),
        ] {
            grid.block_rect(&rect);
        }
        assert_eq!(astar(&grid, (0, 0), (9, 9), generous()), SearchOutcome::NoPath);
    }

    #[test]
    fn test_node_cap_exceeded() {
        let grid = open_grid();
        let limits = SearchLimits {
            max_nodes: 3,
            time_budget: Duration::from_secs(5),
        };
        assert_eq!(astar(&grid, (0, 0), (19, 19), limits), SearchOutcome::BudgetExceeded);
    }

    #[test]
    fn test_find_free_near() {
        let mut grid = open_grid();
        grid.block_rect(&Bounds::new(64.0, 64.0, 32.0, 32.0));
        let free = grid.find_free_near((2, 2), 3).unwrap();
        assert!(!grid.is_blocked(free));
        assert_eq!((free.0 - 2).abs().max((free.1 - 2).abs()), 1);

        let mut walled = open_grid();
        walled.block_rect(&Bounds::new(0.0, 0.0, 640.0, 640.0));
        assert_eq!(walled.find_free_near((5, 5), 3), None);
    }

    #[test]
    fn test_plan_short_path_is_direct() {
        let grid = open_grid();
        let config = LocomotionConfig::default();
        let result = plan_path(&grid, Vec2::new(10.0, 10.0), Vec2::new(60.0, 10.0), &config);
        assert!(result.success);
        assert_eq!(result.path.len(), 2);
        assert!((result.length() - 50.0).abs() < 0.001);
    }

    #[test]
    fn test_plan_long_path_ends_at_target() {
        let mut grid = open_grid();
        grid.block_rect(&Bounds::new(288.0, 0.0, 32.0, 480.0));
        let config = LocomotionConfig::default();
        let to = Vec2::new(500.0, 100.0);
        let result = plan_path(&grid, Vec2::new(100.0, 100.0), to, &config);
        assert!(result.success);
        assert_eq!(result.path.first(), Some(&Vec2::new(100.0, 100.0)));
        assert_eq!(result.destination(), Some(to));
        assert!(result.length() > 400.0);
    }

    #[test]
    fn test_plan_blocked_target_uses_nearby_tile() {
        let mut grid = open_grid();
        grid.block_rect(&Bounds::new(480.0, 480.0, 32.0, 32.0));
        let config = LocomotionConfig::default();
        let result = plan_path(&grid, Vec2::new(50.0, 50.0), Vec2::new(496.0, 496.0), &config);
        assert!(result.success);
        let end = result.destination().unwrap();
        assert!(!grid.is_blocked(grid.cell_of(end)));
        assert!(end.distance(&Vec2::new(496.0, 496.0)) < 32.0 * 2.0);
    }

    #[test]
    fn test_plan_unreachable_falls_back_to_direct() {
        let mut grid = open_grid();
        // Box around tiles (8..=11, 8..=11) with a free interior
        grid.block_rect(&Bounds::new(224.0, 224.0, 192.0, 32.0));
        grid.block_rect(&Bounds::new(224.0, 384.0, 192.0, 32.0));
        grid.block_rect(&Bounds::new(224.0, 256.0, 32.0, 128.0));
        grid.block_rect(&Bounds::new(384.0, 256.0, 32.0, 128.0));
        let config = LocomotionConfig::default();
        let to = Vec2::new(320.0, 320.0);
        let result = plan_path(&grid, Vec2::new(20.0, 20.0), to, &config);
        assert!(!result.success);
        assert_eq!(result.path, vec![Vec2::new(20.0, 20.0), to]);
    }
}
