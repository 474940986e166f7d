//! Sampling-based path planning.

mod rrt;

pub use rrt::{PlanningError, RrtConfig, RrtPlanner};
