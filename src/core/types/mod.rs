//! Core value types shared across the stack.

mod pose;
mod vector;
mod velocity;

pub use pose::{Point2D, Pose2D};
pub use vector::Vector3;
pub use velocity::VelocityCommand;
