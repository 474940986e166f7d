//! Probabilistic occupancy grid.
//!
//! Cells carry an occupancy probability in [0, 1] where 0.5 means unknown.
//! Integration of a hit ray overwrites every crossed cell to the miss
//! probability and the endpoint to the hit probability, which makes
//! integration idempotent and converges quickly on occupied borders while
//! letting stale free space decay softly. Free-space (max-range) readings
//! are ignored at this layer.

use std::time::Instant;

use serde::Deserialize;

use crate::core::types::Pose2D;
use crate::sensors::SensorReading;

use super::RayCells;

/// Configuration for the occupancy grid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OccupancyGridConfig {
    /// Grid width in meters.
    pub width_m: f32,

    /// Grid height in meters.
    pub height_m: f32,

    /// Cell size in meters. Typical: 0.05
    pub resolution: f32,

    /// Probability written to a cell a ray ends in.
    pub hit_probability: f32,

    /// Probability written to cells a ray crosses.
    pub miss_probability: f32,

    /// Probability jump that counts as a significant map change.
    pub significant_change_threshold: f32,

    /// Safety margin for inflated traversability queries, in cells.
    pub inflation_margin: usize,
}

impl Default for OccupancyGridConfig {
    fn default() -> Self {
        Self {
            width_m: 30.0,
            height_m: 30.0,
            resolution: 0.05,
            hit_probability: 0.95,
            miss_probability: 0.10,
            significant_change_threshold: 0.3,
            inflation_margin: 2,
        }
    }
}

/// One cell of the occupancy grid.
#[derive(Debug, Clone, Copy)]
pub struct GridCell {
    /// Whether the cell is currently believed occupied.
    pub occupied: bool,
    /// Occupancy probability in [0, 1]; 0.5 = unknown.
    pub probability: f32,
    /// Planner-facing obstacle cost (probability for occupied cells, else 0).
    pub cost: f32,
    /// When the cell was last written.
    pub last_updated: Instant,
}

impl GridCell {
    fn unknown(now: Instant) -> Self {
        Self {
            occupied: false,
            probability: 0.5,
            cost: 0.0,
            last_updated: now,
        }
    }

    /// A cell is traversable when it is not occupied and not likely occupied.
    #[inline]
    pub fn is_traversable(&self) -> bool {
        !self.occupied && self.probability <= 0.5
    }
}

/// 2D probabilistic occupancy grid.
///
/// Row-major storage, `index = row * width + col`. The grid owns its cells
/// exclusively; the navigation controller is the only writer, planners
/// borrow read-only for the duration of one plan call.
#[derive(Debug)]
pub struct OccupancyGrid {
    config: OccupancyGridConfig,
    cells: Vec<GridCell>,

    /// Width in cells.
    width: usize,

    /// Height in cells.
    height: usize,

    /// World coordinates of cell (0, 0).
    origin_x: f32,
    origin_y: f32,
}

impl OccupancyGrid {
    /// Create a grid of unknown cells, centered on the world origin.
    pub fn new(config: OccupancyGridConfig) -> Self {
        let width = (config.width_m / config.resolution).ceil() as usize;
        let height = (config.height_m / config.resolution).ceil() as usize;
        let origin_x = -config.width_m / 2.0;
        let origin_y = -config.height_m / 2.0;

        let now = Instant::now();
        Self {
            config,
            cells: vec![GridCell::unknown(now); width * height],
            width,
            height,
            origin_x,
            origin_y,
        }
    }

    /// Grid width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Cell size in meters.
    pub fn resolution(&self) -> f32 {
        self.config.resolution
    }

    /// World coordinates of cell (0, 0).
    pub fn origin(&self) -> (f32, f32) {
        (self.origin_x, self.origin_y)
    }

    /// The configuration.
    pub fn config(&self) -> &OccupancyGridConfig {
        &self.config
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    /// Convert world coordinates to `(row, col)`.
    ///
    /// Returns `None` outside grid bounds.
    #[inline]
    pub fn world_to_cell(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        let col = ((x - self.origin_x) / self.config.resolution).floor();
        let row = ((y - self.origin_y) / self.config.resolution).floor();

        if row >= 0.0 && col >= 0.0 {
            let (row, col) = (row as usize, col as usize);
            if row < self.height && col < self.width {
                return Some((row, col));
            }
        }
        None
    }

    /// Convert world coordinates to signed `(row, col)`, for ray walks that
    /// may start outside the grid.
    #[inline]
    pub fn world_to_cell_signed(&self, x: f32, y: f32) -> (i32, i32) {
        let col = ((x - self.origin_x) / self.config.resolution).floor() as i32;
        let row = ((y - self.origin_y) / self.config.resolution).floor() as i32;
        (row, col)
    }

    /// World coordinates of a cell center.
    #[inline]
    pub fn cell_to_world(&self, row: usize, col: usize) -> (f32, f32) {
        let x = self.origin_x + (col as f32 + 0.5) * self.config.resolution;
        let y = self.origin_y + (row as f32 + 0.5) * self.config.resolution;
        (x, y)
    }

    /// The cell at `(row, col)`, if in bounds.
    #[inline]
    pub fn cell(&self, row: usize, col: usize) -> Option<&GridCell> {
        if row < self.height && col < self.width {
            Some(&self.cells[row * self.width + col])
        } else {
            None
        }
    }

    /// Occupancy probability at `(row, col)`, if in bounds.
    #[inline]
    pub fn probability(&self, row: usize, col: usize) -> Option<f32> {
        self.cell(row, col).map(|c| c.probability)
    }

    /// Whether the cell at `(row, col)` is traversable.
    ///
    /// Out-of-bounds cells are unknown and count as non-traversable.
    #[inline]
    pub fn is_traversable(&self, row: usize, col: usize) -> bool {
        self.cell(row, col).is_some_and(|c| c.is_traversable())
    }

    /// Whether every cell of the `(2·margin+1)²` square around `(row, col)`
    /// is traversable.
    ///
    /// This is the only obstacle query planners use; the margin buys the
    /// robot body clearance around obstacles.
    pub fn inflated_traversable(&self, row: usize, col: usize, margin: usize) -> bool {
        let m = margin as i32;
        for dr in -m..=m {
            for dc in -m..=m {
                let r = row as i32 + dr;
                let c = col as i32 + dc;
                if r < 0 || c < 0 {
                    return false;
                }
                if !self.is_traversable(r as usize, c as usize) {
                    return false;
                }
            }
        }
        true
    }

    /// Integrate a batch of sensor readings taken from `robot_pose`.
    ///
    /// For each hit reading, walks the ray from the robot cell to the hit
    /// cell: crossed cells are overwritten with the miss probability, the
    /// endpoint with the hit probability. Readings whose hit cell is out of
    /// bounds are skipped, as are max-range returns.
    ///
    /// Returns `true` when any cell's probability jumped by more than the
    /// significant-change threshold.
    pub fn integrate(&mut self, readings: &[SensorReading], robot_pose: &Pose2D) -> bool {
        let now = Instant::now();
        let mut significant = false;

        let (robot_row, robot_col) = self.world_to_cell_signed(robot_pose.x, robot_pose.y);

        for reading in readings.iter().filter(|r| r.occupied) {
            let Some((hit_row, hit_col)) = self.world_to_cell(reading.point.x, reading.point.y)
            else {
                continue;
            };

            for (row, col) in RayCells::new(robot_row, robot_col, hit_row as i32, hit_col as i32) {
                if row < 0 || col < 0 {
                    continue;
                }
                let (row, col) = (row as usize, col as usize);
                if row >= self.height || col >= self.width {
                    continue;
                }

                let is_hit = row == hit_row && col == hit_col;
                let probability = if is_hit {
                    self.config.hit_probability
                } else {
                    self.config.miss_probability
                };

                let idx = self.index(row, col);
                let cell = &mut self.cells[idx];
                if (cell.probability - probability).abs() > self.config.significant_change_threshold
                {
                    significant = true;
                }
                cell.probability = probability;
                cell.occupied = is_hit;
                cell.cost = if is_hit { probability } else { 0.0 };
                cell.last_updated = now;
            }
        }

        significant
    }

    /// Mark a single cell occupied with the hit probability.
    ///
    /// World-building helper for tests and simulations; real updates go
    /// through [`OccupancyGrid::integrate`].
    pub fn mark_occupied(&mut self, row: usize, col: usize) {
        if row < self.height && col < self.width {
            let idx = self.index(row, col);
            let cell = &mut self.cells[idx];
            cell.probability = self.config.hit_probability;
            cell.occupied = true;
            cell.cost = self.config.hit_probability;
            cell.last_updated = Instant::now();
        }
    }

    /// Count (free, unknown, occupied) cells, for diagnostics.
    pub fn count_cells(&self) -> (usize, usize, usize) {
        let mut free = 0;
        let mut unknown = 0;
        let mut occupied = 0;
        for cell in &self.cells {
            if cell.occupied {
                occupied += 1;
            } else if (cell.probability - 0.5).abs() < 1e-6 {
                unknown += 1;
            } else {
                free += 1;
            }
        }
        (free, unknown, occupied)
    }
}
