//! Reactive obstacle avoidance.

mod vfh;

pub use vfh::{VectorFieldHistogram, VfhConfig};
