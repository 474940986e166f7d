//! Navigation controller.
//!
//! The controller is the single owner of the grid, the localizer, the
//! planner and the avoider. Per control tick the caller feeds it odometry
//! (`update_pose`), sensor readings (`update_map`) and asks for a velocity
//! command (`velocity_command`), in that order; [`NavigationController::tick`]
//! bundles the sequence. All state mutation happens on the caller's
//! thread; sensors are the only boundary that may block.

use serde::Deserialize;

use crate::algorithms::avoidance::VectorFieldHistogram;
use crate::algorithms::localization::ParticleFilter;
use crate::algorithms::mapping::OccupancyGrid;
use crate::algorithms::planning::RrtPlanner;
use crate::config::MargaConfig;
use crate::core::math::angle_diff;
use crate::core::types::{Point2D, Pose2D, Vector3, VelocityCommand};
use crate::sensors::{RangeSensor, SensorReading};

use super::{NavStatus, NavigationGoal, NavigationState};

/// Configuration for the navigation controller.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Any reading closer than this stops the robot outright, in meters.
    pub emergency_stop_distance: f32,

    /// Distance at which an intermediate waypoint counts as reached, in
    /// meters. The final waypoint is released by the goal tolerance
    /// instead, so the robot closes the last stretch.
    pub waypoint_reached_distance: f32,

    /// Linear speed ceiling in m/s.
    pub max_linear_speed: f32,

    /// Proportional gain from waypoint distance to linear speed.
    pub approach_gain: f32,

    /// Proportional gain from heading error to angular speed.
    pub turn_gain: f32,

    /// Angular speed clamp in rad/s.
    pub max_angular_speed: f32,

    /// Distance over which the obstacle speed factor ramps back to full
    /// speed beyond the emergency stop distance, in meters.
    pub speed_factor_distance: f32,

    /// Floor of the obstacle speed factor.
    pub min_speed_factor: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            emergency_stop_distance: 0.3,
            waypoint_reached_distance: 0.3,
            max_linear_speed: 0.5,
            approach_gain: 0.5,
            turn_gain: 2.0,
            max_angular_speed: 1.0,
            speed_factor_distance: 1.0,
            min_speed_factor: 0.1,
        }
    }
}

/// The navigation actor: owns map, localizer, planner, avoider and the
/// sensor list, and turns goals into velocity commands.
pub struct NavigationController {
    config: ControllerConfig,
    grid: OccupancyGrid,
    filter: ParticleFilter,
    planner: RrtPlanner,
    vfh: VectorFieldHistogram,
    sensors: Vec<Box<dyn RangeSensor>>,
    state: NavigationState,

    /// Last world position fed to `update_pose`, for odometry deltas.
    last_position: Option<Vector3>,
    last_rotation: Vector3,
}

impl NavigationController {
    /// Build a controller from configuration, localized around
    /// `initial_pose`.
    pub fn new(config: &MargaConfig, initial_pose: Pose2D) -> Self {
        Self {
            config: config.controller.clone(),
            grid: OccupancyGrid::new(config.grid.clone()),
            filter: ParticleFilter::new(config.filter.clone(), initial_pose),
            planner: RrtPlanner::new(config.planner.clone()),
            vfh: VectorFieldHistogram::new(config.vfh.clone()),
            sensors: Vec::new(),
            state: NavigationState {
                current_pose: initial_pose,
                ..Default::default()
            },
            last_position: None,
            last_rotation: Vector3::default(),
        }
    }

    /// Register a sensor. Initialization failures are logged; the sensor
    /// stays registered and may recover on a later poll.
    pub fn add_sensor(&mut self, mut sensor: Box<dyn RangeSensor>) {
        if let Err(err) = sensor.initialize() {
            log::warn!("sensor failed to initialize: {err}");
        }
        self.sensors.push(sensor);
    }

    /// Poll every sensor at the last known world pose and gather the
    /// combined batch. A failing sensor loses its batch for this tick and
    /// is otherwise ignored.
    pub fn poll_sensors(&mut self) -> Vec<SensorReading> {
        let Some(position) = self.last_position else {
            return Vec::new();
        };
        let rotation = self.last_rotation;

        let mut readings = Vec::new();
        for sensor in &mut self.sensors {
            match sensor.update(&position, &rotation) {
                Ok(batch) => readings.extend(batch),
                Err(err) => log::warn!("sensor read failed, skipping batch: {err}"),
            }
        }
        readings
    }

    /// Feed a world-frame odometry sample.
    ///
    /// Predicts the particle cloud with the position delta and yaw delta,
    /// corrects it against the current hit readings, publishes the new
    /// pose estimate, and retires the goal once it is reached within
    /// tolerances.
    pub fn update_pose(&mut self, position: Vector3, rotation: Vector3) {
        let delta = match self.last_position {
            Some(previous) => position - previous,
            None => Vector3::default(),
        };
        let delta_theta = angle_diff(self.state.current_pose.theta, rotation.y);

        self.filter.predict(delta.planar(), delta_theta);

        self.last_position = Some(position);
        self.last_rotation = rotation;

        let occupied: Vec<SensorReading> = self
            .poll_sensors()
            .into_iter()
            .filter(|r| r.occupied)
            .collect();
        if !occupied.is_empty() {
            self.filter.update(&occupied);
        }

        self.state.current_pose = self.filter.estimated_pose();

        if self.state.is_navigating
            && let Some(goal) = self.state.current_goal
            && goal.is_reached(&self.state.current_pose)
        {
            log::info!(
                "goal reached at ({:.2}, {:.2})",
                self.state.current_pose.x,
                self.state.current_pose.y
            );
            self.state.reach_goal();
        }
    }

    /// Adopt a new goal, superseding any previous one, and plan a path
    /// from the current pose estimate.
    ///
    /// On planning failure the state surfaces `Failed` with
    /// `last_error = "No path found to goal"` and navigation stays off.
    pub fn set_goal(&mut self, goal: NavigationGoal) {
        self.state.status = NavStatus::Planning;
        self.state.current_goal = Some(goal);
        self.state.last_error = None;

        log::info!(
            "planning path from ({:.2}, {:.2}) to ({:.2}, {:.2})",
            self.state.current_pose.x,
            self.state.current_pose.y,
            goal.pose.x,
            goal.pose.y
        );

        match self
            .planner
            .plan(&self.state.current_pose, &goal.pose, &self.grid)
        {
            Ok(path) => {
                log::info!(
                    "path found: {} waypoints, {:.2} m",
                    path.len(),
                    path.total_length()
                );
                self.state.path = Some(path);
                self.state.is_navigating = true;
                self.state.status = NavStatus::Moving;
            }
            Err(err) => {
                log::warn!("planning failed: {err}");
                self.state.fail("No path found to goal");
            }
        }
    }

    /// Integrate a sensor batch into the map.
    ///
    /// When the integration changes the map significantly while a path is
    /// being followed, the path is re-validated against the new map and
    /// replanned if any segment crosses an occupied or likely-occupied
    /// cell. A failed replan surfaces `Blocked` and clears the path.
    pub fn update_map(&mut self, readings: &[SensorReading]) {
        let robot_pose = self.state.current_pose;
        let significant = self.grid.integrate(readings, &robot_pose);

        if !significant || !self.state.is_navigating {
            return;
        }
        let Some(goal) = self.state.current_goal else {
            return;
        };
        if self.path_is_clear() {
            return;
        }

        log::info!("map change invalidated current path, replanning");
        match self
            .planner
            .plan(&self.state.current_pose, &goal.pose, &self.grid)
        {
            Ok(path) => {
                log::info!("replan found {} waypoints", path.len());
                self.state.path = Some(path);
                self.state.status = NavStatus::Moving;
            }
            Err(err) => {
                log::warn!("replanning failed: {err}");
                self.state.block(err.to_string());
            }
        }
    }

    /// Re-validate the remaining path against the grid.
    ///
    /// Segments are sampled at twice the grid resolution; a sample on an
    /// occupied or likely-occupied (p > 0.5) cell, or off the grid,
    /// invalidates the path.
    fn path_is_clear(&self) -> bool {
        let Some(path) = &self.state.path else {
            return true;
        };

        let spacing = self.grid.resolution() * 2.0;
        let poses: Vec<Point2D> = path.poses().map(|p| p.position()).collect();

        if poses.len() == 1 {
            return self.point_is_clear(&poses[0]);
        }

        for pair in poses.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let samples = (a.distance(&b) / spacing).ceil() as usize + 1;
            for i in 0..samples {
                let t = if samples > 1 {
                    i as f32 / (samples - 1) as f32
                } else {
                    0.0
                };
                let point = Point2D::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y));
                if !self.point_is_clear(&point) {
                    return false;
                }
            }
        }
        true
    }

    fn point_is_clear(&self, point: &Point2D) -> bool {
        match self.grid.world_to_cell(point.x, point.y) {
            Some((row, col)) => self
                .grid
                .cell(row, col)
                .is_some_and(|cell| !cell.occupied && cell.probability <= 0.5),
            None => false,
        }
    }

    /// Compute the velocity command for this tick.
    ///
    /// Emits a stop when idle, when the path ran out, or when any reading
    /// is inside the emergency stop distance (transient; navigation state
    /// is untouched). Otherwise steers toward the VFH-safe direction for
    /// the next waypoint with the speed envelope scaled by obstacle
    /// proximity and heading error.
    pub fn velocity_command(&mut self) -> VelocityCommand {
        if !self.state.is_navigating {
            return VelocityCommand::stop();
        }
        if self.state.path.as_ref().is_none_or(|p| p.is_empty()) {
            return VelocityCommand::stop();
        }

        let readings = self.poll_sensors();
        let min_distance = readings
            .iter()
            .map(|r| r.distance)
            .fold(f32::INFINITY, f32::min);
        if min_distance < self.config.emergency_stop_distance {
            log::debug!("emergency stop: obstacle at {:.2} m", min_distance);
            return VelocityCommand::stop();
        }

        let pose = self.state.current_pose;
        let Some(target) = self.state.path.as_ref().and_then(|p| p.front()).copied() else {
            return VelocityCommand::stop();
        };

        let dx = target.x - pose.x;
        let dy = target.y - pose.y;
        let distance = (dx * dx + dy * dy).sqrt();
        let target_angle = dy.atan2(dx);

        let safe_angle = self
            .vfh
            .best_direction(&readings, target_angle, Point2D::new(dx, dy));

        // Intermediate waypoints are consumed on contact; the final one is
        // kept as the tracking target until the goal tolerance fires.
        if distance < self.config.waypoint_reached_distance
            && let Some(path) = self.state.path.as_mut()
            && path.len() > 1
        {
            path.advance();
        }

        let angle_error = angle_diff(pose.theta, safe_angle);
        let speed_factor = ((min_distance - self.config.emergency_stop_distance)
            / self.config.speed_factor_distance)
            .clamp(self.config.min_speed_factor, 1.0);
        let linear = ((distance * self.config.approach_gain).min(self.config.max_linear_speed)
            * speed_factor
            * angle_error.cos())
        .max(0.0);
        let angular = (angle_error * self.config.turn_gain)
            .clamp(-self.config.max_angular_speed, self.config.max_angular_speed);

        VelocityCommand::new(linear, angular)
    }

    /// One full control tick: odometry in, map update, velocity out.
    pub fn tick(&mut self, position: Vector3, rotation: Vector3) -> VelocityCommand {
        self.update_pose(position, rotation);
        let readings = self.poll_sensors();
        self.update_map(&readings);
        self.velocity_command()
    }

    /// The current navigation state snapshot.
    pub fn navigation_state(&self) -> &NavigationState {
        &self.state
    }

    /// Current pose estimate.
    pub fn current_pose(&self) -> Pose2D {
        self.state.current_pose
    }

    /// Read access to the map.
    pub fn map(&self) -> &OccupancyGrid {
        &self.grid
    }

    /// Write access to the map.
    ///
    /// The controller is the exclusive writer during operation; this
    /// handle exists for world setup and diagnostics.
    pub fn map_mut(&mut self) -> &mut OccupancyGrid {
        &mut self.grid
    }

    /// The localization filter, for diagnostics.
    pub fn filter(&self) -> &ParticleFilter {
        &self.filter
    }
}
