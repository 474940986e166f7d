//! End-to-end navigation scenarios.
//!
//! Each scenario drives the full stack (grid, filter, planner, VFH,
//! controller) the way the world adapter would: feed odometry, feed
//! readings, integrate the commanded velocities with frictionless
//! unicycle kinematics.

use marga_nav::{
    Disc, MargaConfig, NavStatus, NavigationController, NavigationGoal, ParticleFilter,
    ParticleFilterConfig, Point2D, Pose2D, RangeSensor, SensorError, SensorReading, SimulatedLidar,
    SimulatedLidarConfig, Vector3,
};

/// Sensor that replays a fixed batch every poll.
struct FixedSensor(Vec<SensorReading>);

impl RangeSensor for FixedSensor {
    fn update(
        &mut self,
        _position: &Vector3,
        _rotation: &Vector3,
    ) -> Result<Vec<SensorReading>, SensorError> {
        Ok(self.0.clone())
    }
}

fn seeded_config(seed: u64) -> MargaConfig {
    let mut config = MargaConfig::default();
    config.filter.seed = seed;
    config.planner.seed = seed;
    config
}

fn hit(x: f32, y: f32, distance: f32) -> SensorReading {
    SensorReading {
        point: Point2D::new(x, y),
        distance,
        occupied: true,
        mesh_id: "obstacle".to_string(),
        normal: None,
    }
}

/// Ground-truth unicycle state driven by controller commands.
struct Sim {
    x: f32,
    y: f32,
    theta: f32,
    dt: f32,
}

impl Sim {
    fn new(pose: Pose2D) -> Self {
        Self {
            x: pose.x,
            y: pose.y,
            theta: pose.theta,
            dt: 0.1,
        }
    }

    fn position(&self) -> Vector3 {
        Vector3::new(self.x, 0.0, self.y)
    }

    fn rotation(&self) -> Vector3 {
        Vector3::new(0.0, self.theta, 0.0)
    }

    /// One control tick: pose in, command out, integrate.
    fn step(&mut self, controller: &mut NavigationController) {
        let command = controller.tick(self.position(), self.rotation());
        self.theta += command.angular * self.dt;
        self.x += command.linear * self.theta.cos() * self.dt;
        self.y += command.linear * self.theta.sin() * self.dt;
    }
}

/// Mark a rectangle of cells occupied.
fn add_wall(
    controller: &mut NavigationController,
    rows: std::ops::RangeInclusive<usize>,
    cols: std::ops::RangeInclusive<usize>,
) {
    for row in rows {
        for col in cols.clone() {
            controller.map_mut().mark_occupied(row, col);
        }
    }
}

#[test]
fn empty_world_reaches_goal() {
    let mut controller = NavigationController::new(&seeded_config(42), Pose2D::identity());
    let mut sim = Sim::new(Pose2D::identity());

    controller.update_pose(sim.position(), sim.rotation());
    let planning_start = controller.current_pose();
    controller.set_goal(NavigationGoal::new(Pose2D::new(5.0, 0.0, 0.0)));

    // A fresh grid is all unknown and fully traversable: planning succeeds
    // with both endpoints verbatim.
    {
        let state = controller.navigation_state();
        assert_eq!(state.status, NavStatus::Moving);
        let path = state.path.as_ref().expect("path expected");
        assert!(path.len() >= 2);
        let first = path.front().unwrap();
        let last = path.last().unwrap();
        assert!((first.x - planning_start.x).abs() < 1e-5);
        assert!((first.y - planning_start.y).abs() < 1e-5);
        assert!((last.x - 5.0).abs() < 1e-5 && (last.y - 0.0).abs() < 1e-5);
    }

    for _ in 0..300 {
        sim.step(&mut controller);
        if controller.navigation_state().status == NavStatus::GoalReached {
            break;
        }
    }

    let state = controller.navigation_state();
    assert_eq!(state.status, NavStatus::GoalReached);
    assert!(!state.is_navigating);

    // The pose estimate satisfied the 0.1 m goal tolerance; ground truth
    // tracks it up to odometry-noise drift.
    let estimate = state.current_pose;
    let goal = Point2D::new(5.0, 0.0);
    assert!(estimate.position().distance(&goal) < 0.1);
    let truth = Point2D::new(sim.x, sim.y);
    assert!(
        truth.distance(&goal) < 0.2,
        "truth finished {:.3} m from goal",
        truth.distance(&goal)
    );
}

#[test]
fn wall_between_start_and_goal_forces_detour() {
    let mut config = seeded_config(42);
    // A 10+ m detour needs a deeper tree than the default budget.
    config.planner.max_iterations = 4000;
    config.planner.timeout_ms = 10_000;
    let mut controller = NavigationController::new(&config, Pose2D::new(-5.0, 0.0, 0.0));

    // Wall spanning x ≈ [3.0, 4.05], y ≈ [-3.0, 3.05].
    add_wall(&mut controller, 240..=360, 360..=380);

    controller.set_goal(NavigationGoal::new(Pose2D::new(5.0, 0.0, 0.0)));

    let state = controller.navigation_state();
    assert_eq!(state.status, NavStatus::Moving);
    let path = state.path.as_ref().expect("path expected");

    let first = path.front().unwrap();
    let last = path.last().unwrap();
    assert!((first.x + 5.0).abs() < 1e-5);
    assert!((last.x - 5.0).abs() < 1e-5);

    // The detour around the wall is well beyond the 10 m straight line.
    assert!(
        path.total_length() > 10.0,
        "path length {:.2} not a detour",
        path.total_length()
    );

    // Every segment stays clear of the inflated wall.
    let grid = controller.map();
    let margin = 2;
    let poses: Vec<Pose2D> = path.poses().copied().collect();
    for pair in poses.windows(2) {
        let a = pair[0].position();
        let b = pair[1].position();
        let samples = (a.distance(&b) / (grid.resolution() / 4.0)).ceil() as usize + 1;
        for i in 0..samples {
            let t = i as f32 / (samples - 1).max(1) as f32;
            let point = Point2D::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y));
            let (row, col) = grid
                .world_to_cell(point.x, point.y)
                .expect("path sample left the grid");
            assert!(
                grid.inflated_traversable(row, col, margin),
                "path sample ({:.2}, {:.2}) violates the inflated wall",
                point.x,
                point.y
            );
        }
    }
}

#[test]
fn goal_inside_obstacle_fails_with_error() {
    let mut controller = NavigationController::new(&seeded_config(42), Pose2D::identity());

    let (row, col) = controller.map().world_to_cell(4.0, 1.0).unwrap();
    add_wall(&mut controller, row - 4..=row + 4, col - 4..=col + 4);

    controller.set_goal(NavigationGoal::new(Pose2D::new(4.0, 1.0, 0.0)));

    let state = controller.navigation_state();
    assert_eq!(state.status, NavStatus::Failed);
    assert_eq!(state.last_error.as_deref(), Some("No path found to goal"));
    assert!(!state.is_navigating);
    assert!(state.path.is_none());
}

#[test]
fn emergency_stop_preserves_navigation() {
    let mut controller = NavigationController::new(&seeded_config(42), Pose2D::identity());
    let sim = Sim::new(Pose2D::identity());

    controller.update_pose(sim.position(), sim.rotation());
    controller.set_goal(NavigationGoal::new(Pose2D::new(4.0, 0.0, 0.0)));
    assert!(controller.navigation_state().is_navigating);
    let path_len = controller.navigation_state().path.as_ref().unwrap().len();

    // Something appears 0.2 m away.
    controller.add_sensor(Box::new(FixedSensor(vec![hit(0.2, 0.0, 0.2)])));

    let command = controller.velocity_command();

    assert_eq!(command.linear, 0.0);
    assert_eq!(command.angular, 0.0);
    let state = controller.navigation_state();
    assert!(state.is_navigating, "emergency stop must not cancel the goal");
    assert_eq!(state.status, NavStatus::Moving);
    assert_eq!(state.path.as_ref().unwrap().len(), path_len);
}

#[test]
fn map_change_replans_around_new_obstacle() {
    let mut controller = NavigationController::new(&seeded_config(42), Pose2D::identity());
    let sim = Sim::new(Pose2D::identity());

    controller.update_pose(sim.position(), sim.rotation());
    controller.set_goal(NavigationGoal::new(Pose2D::new(4.0, 0.0, 0.0)));

    // Take an upcoming waypoint off the planned path and put an obstacle
    // exactly there.
    let waypoint = {
        let path = controller.navigation_state().path.as_ref().unwrap();
        let poses: Vec<Pose2D> = path.poses().copied().collect();
        poses[poses.len() / 2].position()
    };

    controller.update_map(&[hit(waypoint.x, waypoint.y, waypoint.distance(&Point2D::default()))]);

    let state = controller.navigation_state();
    assert_eq!(state.status, NavStatus::Moving, "replan should succeed here");
    let path = state.path.as_ref().expect("replanned path expected");

    // The replanned path avoids the newly occupied cell.
    let grid = controller.map();
    let (blocked_row, blocked_col) = grid.world_to_cell(waypoint.x, waypoint.y).unwrap();
    for pose in path.poses() {
        let (row, col) = grid.world_to_cell(pose.x, pose.y).unwrap();
        assert!(
            row != blocked_row || col != blocked_col,
            "replanned path still visits the blocked cell"
        );
    }
}

#[test]
fn map_change_with_no_alternative_blocks() {
    let mut controller = NavigationController::new(&seeded_config(42), Pose2D::identity());
    let sim = Sim::new(Pose2D::identity());

    controller.update_pose(sim.position(), sim.rotation());
    controller.set_goal(NavigationGoal::new(Pose2D::new(4.0, 0.0, 0.0)));
    assert!(controller.navigation_state().is_navigating);

    // Box the goal in completely (ring well outside the goal cell so the
    // goal itself stays traversable but unreachable).
    let (row, col) = controller.map().world_to_cell(4.0, 0.0).unwrap();
    add_wall(&mut controller, row - 14..=row + 14, col - 14..=col - 12);
    add_wall(&mut controller, row - 14..=row + 14, col + 12..=col + 14);
    add_wall(&mut controller, row - 14..=row - 12, col - 14..=col + 14);
    add_wall(&mut controller, row + 12..=row + 14, col - 14..=col + 14);

    // A hit on an upcoming waypoint invalidates the path and forces the
    // replan attempt.
    let waypoint = {
        let path = controller.navigation_state().path.as_ref().unwrap();
        let poses: Vec<Pose2D> = path.poses().copied().collect();
        poses[poses.len() / 2].position()
    };
    controller.update_map(&[hit(waypoint.x, waypoint.y, waypoint.distance(&Point2D::default()))]);

    let state = controller.navigation_state();
    assert_eq!(state.status, NavStatus::Blocked);
    assert!(!state.is_navigating);
    assert!(state.path.is_none());
}

#[test]
fn localization_converges_under_static_observations() {
    // Truth at the origin; readings from a lidar sweep of a small world.
    let truth = Pose2D::identity();
    let mut lidar = SimulatedLidar::new(
        SimulatedLidarConfig {
            num_rays: 12,
            max_range: 5.0,
        },
        vec![
            Disc::new(2.0, 0.0, 0.5, "a"),
            Disc::new(0.0, 2.0, 0.5, "b"),
            Disc::new(-2.0, -1.0, 0.5, "c"),
        ],
    );
    let readings: Vec<SensorReading> = lidar
        .update(&Vector3::new(0.0, 0.0, 0.0), &Vector3::new(0.0, 0.0, 0.0))
        .unwrap()
        .into_iter()
        .filter(|r| r.occupied)
        .collect();
    assert!(readings.len() >= 3, "world must be observable");

    let config = ParticleFilterConfig {
        num_particles: 500,
        seed: 1234,
        ..Default::default()
    };
    let mut filter = ParticleFilter::new(config, truth);

    for _ in 0..50 {
        filter.predict(Point2D::default(), 0.0);
        filter.update(&readings);
    }

    let estimate = filter.estimated_pose();
    let position_error = estimate.position().distance(&truth.position());
    assert!(
        position_error < 0.05,
        "position error {:.3} m after convergence",
        position_error
    );
    assert!(
        estimate.theta.abs() < 0.05,
        "heading error {:.3} rad after convergence",
        estimate.theta.abs()
    );
}
