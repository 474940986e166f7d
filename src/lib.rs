//! MargaNav - autonomous navigation stack for a mobile robot on a 2D
//! ground plane.
//!
//! Given noisy odometry and range readings from external providers, the
//! stack maintains a probabilistic occupancy map, tracks the robot pose
//! with a particle filter, plans collision-free paths with an RRT, and
//! steers around obstacles with a vector field histogram, emitting
//! `(linear, angular)` velocity commands toward user-supplied goals.
//!
//! # Architecture
//!
//! The crate is organized in layers, lowest first:
//!
//! ```text
//! core/         types and math shared by everything
//! sensors/      range sensor boundary (world frame → planar frame)
//! algorithms/   mapping, localization, planning, avoidance
//! navigation/   goals, state machine, the navigation controller
//! ```
//!
//! The [`NavigationController`] is a single-owner actor: the caller feeds
//! it odometry, sensor batches and goals from one thread, and reads back
//! velocity commands and state snapshots. No shared-memory concurrency is
//! involved; sensor polling is the only boundary that may block.
//!
//! # Frames
//!
//! The world adapter speaks [`Vector3`] (world x/y/z); navigation happens
//! on the plane spanned by world x and z. The projection happens exactly
//! once at the sensor/odometry boundary, after which everything is planar
//! [`Point2D`]/[`Pose2D`] math with headings canonical in (-π, π].

// Layer 1: foundation (no internal deps)
pub mod core;

// Layer 2: sensor boundary (depends on core)
pub mod sensors;

// Layer 3: algorithms (depends on core, sensors)
pub mod algorithms;

// Layer 4: navigation orchestration (depends on all lower layers)
pub mod navigation;

pub mod config;
pub mod error;

// Convenience re-exports (flat namespace for common use)

pub use crate::core::math;
pub use crate::core::types::{Point2D, Pose2D, Vector3, VelocityCommand};

pub use sensors::{
    Disc, RangeSensor, SensorError, SensorReading, SimulatedLidar, SimulatedLidarConfig,
};

pub use algorithms::avoidance::{VectorFieldHistogram, VfhConfig};
pub use algorithms::localization::{
    Particle, ParticleFilter, ParticleFilterConfig, ParticleFilterState,
};
pub use algorithms::mapping::{GridCell, OccupancyGrid, OccupancyGridConfig, RayCells};
pub use algorithms::planning::{PlanningError, RrtConfig, RrtPlanner};

pub use navigation::{
    ControllerConfig, GoalTolerance, NavPath, NavStatus, NavigationController, NavigationGoal,
    NavigationState,
};

pub use config::MargaConfig;
pub use error::{MargaError, Result};
