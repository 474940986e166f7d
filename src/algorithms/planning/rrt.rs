//! RRT path planner over the occupancy grid.
//!
//! Grows a tree from the start by repeatedly extending toward random
//! samples (goal-biased), validating every extension against the inflated
//! occupancy grid. Feasibility-only: the first branch that reaches the
//! goal neighborhood wins. The tree lives in a flat arena with parent
//! indices and is discarded when `plan` returns.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use thiserror::Error;

use crate::algorithms::mapping::OccupancyGrid;
use crate::core::types::{Point2D, Pose2D};
use crate::navigation::NavPath;

/// Reason a plan attempt produced no path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlanningError {
    #[error("start position is blocked")]
    StartBlocked,

    #[error("goal position is blocked")]
    GoalBlocked,

    #[error("no path found to goal")]
    NoPathFound,
}

/// Configuration for the RRT planner.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RrtConfig {
    /// Maximum tree extensions per plan call.
    pub max_iterations: usize,

    /// Extension step in meters.
    pub step_size: f32,

    /// Probability of sampling the goal instead of a random point.
    pub goal_bias: f64,

    /// Wall-clock budget per plan call, in milliseconds.
    pub timeout_ms: u64,

    /// Cells at or above this occupancy probability reject a sample even
    /// before the inflation check.
    pub occupancy_threshold: f32,

    /// Inflation margin for traversability queries, in cells.
    pub inflation_margin: usize,

    /// Random seed for deterministic behavior (0 = entropy seed).
    pub seed: u64,
}

impl Default for RrtConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            step_size: 0.5,
            goal_bias: 0.10,
            timeout_ms: 2000,
            occupancy_threshold: 0.65,
            inflation_margin: 2,
            seed: 0,
        }
    }
}

/// Node of the search tree: a position plus a back-pointer into the arena.
///
/// Each node has exactly one parent and the root has none, so the tree is
/// acyclic by construction.
#[derive(Debug, Clone, Copy)]
struct RrtNode {
    x: f32,
    y: f32,
    parent: Option<usize>,
}

/// Sampling-based feasibility planner.
#[derive(Debug)]
pub struct RrtPlanner {
    config: RrtConfig,
    rng: StdRng,
}

impl RrtPlanner {
    /// Create a planner.
    pub fn new(config: RrtConfig) -> Self {
        let seed = if config.seed == 0 {
            rand::rng().random()
        } else {
            config.seed
        };
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &RrtConfig {
        &self.config
    }

    /// Plan a collision-free path from `start` to `goal` over `grid`.
    ///
    /// The returned path starts at `start` and ends at `goal` (both
    /// verbatim), with consecutive waypoints at most 1.5 step sizes apart
    /// and every validated segment clear of the inflated obstacle set.
    pub fn plan(
        &mut self,
        start: &Pose2D,
        goal: &Pose2D,
        grid: &OccupancyGrid,
    ) -> Result<NavPath, PlanningError> {
        if !self.point_clear(grid, start.x, start.y) {
            return Err(PlanningError::StartBlocked);
        }
        if !self.point_clear(grid, goal.x, goal.y) {
            return Err(PlanningError::GoalBlocked);
        }

        let deadline = Instant::now() + Duration::from_millis(self.config.timeout_ms);
        let goal_point = goal.position();
        let goal_radius = 1.5 * self.config.step_size;

        let mut tree = vec![RrtNode {
            x: start.x,
            y: start.y,
            parent: None,
        }];

        for _ in 0..self.config.max_iterations {
            if Instant::now() >= deadline {
                log::debug!("plan timed out after {} nodes", tree.len());
                break;
            }

            let target = self.sample_target(&goal_point, grid);
            let nearest = Self::nearest_node(&tree, &target);
            let from = Point2D::new(tree[nearest].x, tree[nearest].y);
            let new_point = self.extend(&from, &target);

            if !self.segment_clear(grid, &from, &new_point) {
                continue;
            }

            tree.push(RrtNode {
                x: new_point.x,
                y: new_point.y,
                parent: Some(nearest),
            });

            if new_point.distance(&goal_point) < goal_radius
                && self.segment_clear(grid, &new_point, &goal_point)
            {
                return Ok(Self::build_path(&tree, tree.len() - 1, start, goal));
            }
        }

        Err(PlanningError::NoPathFound)
    }

    /// Pick an extension target: the goal with the configured bias,
    /// otherwise a random free position within the map bounds (best-effort;
    /// after 100 blocked samples any point is accepted and left to segment
    /// validation).
    fn sample_target(&mut self, goal: &Point2D, grid: &OccupancyGrid) -> Point2D {
        if self.rng.random::<f64>() < self.config.goal_bias {
            return *goal;
        }

        let (origin_x, origin_y) = grid.origin();
        let max_x = origin_x + grid.width() as f32 * grid.resolution();
        let max_y = origin_y + grid.height() as f32 * grid.resolution();

        let mut sample = Point2D::new(
            self.rng.random_range(origin_x..max_x),
            self.rng.random_range(origin_y..max_y),
        );
        for _ in 0..100 {
            if self.point_clear(grid, sample.x, sample.y) {
                break;
            }
            sample = Point2D::new(
                self.rng.random_range(origin_x..max_x),
                self.rng.random_range(origin_y..max_y),
            );
        }
        sample
    }

    /// Index of the tree node closest to `target`.
    fn nearest_node(tree: &[RrtNode], target: &Point2D) -> usize {
        let mut best = 0;
        let mut best_dist = f32::INFINITY;
        for (i, node) in tree.iter().enumerate() {
            let dx = node.x - target.x;
            let dy = node.y - target.y;
            let dist = dx * dx + dy * dy;
            if dist < best_dist {
                best_dist = dist;
                best = i;
            }
        }
        best
    }

    /// Step from `from` toward `target` by at most one step size.
    fn extend(&self, from: &Point2D, target: &Point2D) -> Point2D {
        let dist = from.distance(target);
        if dist < self.config.step_size {
            return *target;
        }
        let heading = from.heading_to(target);
        Point2D::new(
            from.x + self.config.step_size * heading.cos(),
            from.y + self.config.step_size * heading.sin(),
        )
    }

    /// Whether the world position sits on a clear, inflated-traversable cell.
    fn point_clear(&self, grid: &OccupancyGrid, x: f32, y: f32) -> bool {
        match grid.world_to_cell(x, y) {
            Some((row, col)) => {
                grid.inflated_traversable(row, col, self.config.inflation_margin)
                    && grid
                        .probability(row, col)
                        .is_some_and(|p| p < self.config.occupancy_threshold)
            }
            None => false,
        }
    }

    /// Validate a segment by sampling it densely (quarter-resolution
    /// spacing, endpoints inclusive).
    fn segment_clear(&self, grid: &OccupancyGrid, from: &Point2D, to: &Point2D) -> bool {
        let dist = from.distance(to);
        let samples = (dist / (grid.resolution() / 4.0)).ceil() as usize + 1;

        if samples < 2 {
            return self.point_clear(grid, to.x, to.y);
        }

        for i in 0..samples {
            let t = i as f32 / (samples - 1) as f32;
            let x = from.x + t * (to.x - from.x);
            let y = from.y + t * (to.y - from.y);
            if !self.point_clear(grid, x, y) {
                return false;
            }
        }
        true
    }

    /// Walk parent pointers back to the root and assemble the final path:
    /// start verbatim, tree chain, goal verbatim, headings per segment.
    fn build_path(tree: &[RrtNode], goal_node: usize, start: &Pose2D, goal: &Pose2D) -> NavPath {
        let mut chain = Vec::new();
        let mut current = Some(goal_node);
        while let Some(idx) = current {
            chain.push(Point2D::new(tree[idx].x, tree[idx].y));
            current = tree[idx].parent;
        }
        chain.reverse();

        // The root is the start position; pin it to the verbatim start and
        // close the path with the verbatim goal.
        let mut points = Vec::with_capacity(chain.len() + 1);
        points.push(start.position());
        points.extend(chain.into_iter().skip(1));
        points.push(goal.position());

        NavPath::from_waypoints(&points)
    }
}
