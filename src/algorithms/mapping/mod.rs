//! Occupancy mapping: probabilistic grid and ray tracing.

mod occupancy_grid;
mod ray_tracer;

pub use occupancy_grid::{GridCell, OccupancyGrid, OccupancyGridConfig};
pub use ray_tracer::RayCells;
