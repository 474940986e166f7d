//! Simulated navigation demo.
//!
//! Drives the full stack in a disc-obstacle world with a simulated lidar
//! and frictionless unicycle kinematics: set a goal, tick the controller,
//! integrate the commanded velocities, repeat until the goal is reached
//! or navigation gives up.
//!
//! Usage:
//!   cargo run --bin nav_sim -- --goal-x 5.0 --goal-y 2.0
//!
//! Enable logging to watch the controller work:
//!   RUST_LOG=info cargo run --bin nav_sim

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use marga_nav::{
    Disc, MargaConfig, NavStatus, NavigationController, NavigationGoal, Pose2D, SimulatedLidar,
    SimulatedLidarConfig, Vector3,
};

/// Simulated navigation run
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Goal X position in meters
    #[arg(long, default_value = "5.0")]
    goal_x: f32,

    /// Goal Y position in meters
    #[arg(long, default_value = "2.0")]
    goal_y: f32,

    /// Control period in seconds
    #[arg(long, default_value = "0.1")]
    dt: f32,

    /// Maximum control ticks before giving up
    #[arg(long, default_value = "1000")]
    max_ticks: usize,

    /// Random seed for filter and planner (0 = nondeterministic)
    #[arg(long, default_value = "7")]
    seed: u64,

    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Progress report interval in ticks
    #[arg(long, default_value = "20")]
    progress_interval: usize,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match MargaConfig::load(Path::new(path)) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("failed to load config {path}: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => MargaConfig::default(),
    };
    config.filter.seed = args.seed;
    config.planner.seed = args.seed;

    // A small cluttered room.
    let obstacles = vec![
        Disc::new(2.0, 0.5, 0.4, "crate"),
        Disc::new(3.5, -1.0, 0.5, "pillar"),
        Disc::new(1.0, 2.0, 0.3, "stool"),
        Disc::new(4.0, 2.5, 0.4, "plant"),
    ];

    let mut controller = NavigationController::new(&config, Pose2D::identity());
    controller.add_sensor(Box::new(SimulatedLidar::new(
        SimulatedLidarConfig::default(),
        obstacles,
    )));

    // Ground truth state, integrated from the commanded velocities.
    let mut x = 0.0f32;
    let mut y = 0.0f32;
    let mut theta = 0.0f32;

    // Prime the pose estimate before planning.
    controller.update_pose(Vector3::new(x, 0.0, y), Vector3::new(0.0, theta, 0.0));
    controller.set_goal(NavigationGoal::new(Pose2D::new(args.goal_x, args.goal_y, 0.0)));

    if controller.navigation_state().status == NavStatus::Failed {
        eprintln!(
            "planning failed: {}",
            controller
                .navigation_state()
                .last_error
                .as_deref()
                .unwrap_or("unknown")
        );
        return ExitCode::FAILURE;
    }

    let progress_interval = args.progress_interval.max(1);
    let mut ticks = 0;
    for tick in 0..args.max_ticks {
        ticks = tick + 1;

        let command = controller.tick(Vector3::new(x, 0.0, y), Vector3::new(0.0, theta, 0.0));

        theta += command.angular * args.dt;
        x += command.linear * theta.cos() * args.dt;
        y += command.linear * theta.sin() * args.dt;

        if tick % progress_interval == 0 {
            let state = controller.navigation_state();
            println!(
                "tick {tick:4}  truth=({x:6.2}, {y:6.2})  estimate=({:6.2}, {:6.2})  status={}",
                state.current_pose.x,
                state.current_pose.y,
                state.status.as_str()
            );
        }

        match controller.navigation_state().status {
            NavStatus::GoalReached | NavStatus::Failed | NavStatus::Blocked => break,
            _ => {}
        }
    }

    let state = controller.navigation_state();
    let (free, unknown, occupied) = controller.map().count_cells();
    println!();
    println!("finished after {ticks} ticks with status {}", state.status.as_str());
    println!("truth position: ({x:.2}, {y:.2}), goal: ({:.2}, {:.2})", args.goal_x, args.goal_y);
    println!("map cells: {free} free, {occupied} occupied, {unknown} unknown");

    match state.status {
        NavStatus::GoalReached => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}
