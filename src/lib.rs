//! Rust implementation of a numeric, iterative inverse kinematics solver for serial robots
//! of any number of joints.
//!
//! The solver only needs forward kinematics and a Jacobian of the robot, supplied through
//! the [`kinematic_traits::KinematicModel`] trait. Starting from the given joint configuration,
//! it repeatedly moves the joints along the Moore-Penrose pseudo-inverse of the Jacobian
//! applied to the pose error until the error falls below the tolerance or the iteration
//! budget runs out.
//!
//! # Features
//!
//! - Targets with position only, or position and orientation (quaternion).
//! - Joint limits, enforced after every step. Limits are specified in degrees.
//! - Step length bounded, learning rate configurable.
//! - The best configuration seen is returned even if the tolerance has not been reached.
//! - On a singular Jacobian, joints are perturbed with small Gaussian noise and the
//!   iteration continues. The random source can be supplied for reproducible results.
//! - Generic serial chains, also extracted from URDF (experimental).
//! - Decomposition of a sequence of Cartesian waypoints into joint configurations.
//! - Solver configuration from YAML.
//!
//! ## Examples
//!
//! - **basic.rs**: Solving position and pose targets for a planar and a spatial chain.
//! - **workflow.rs**: Reading a robot from URDF and decomposing a list of waypoints.

pub mod kinematic_traits;

pub mod pose_error;

pub mod constraints;

pub mod jacobian;

pub mod solver;

pub mod chain;

pub mod workflow;

#[path = "utils/utils.rs"]
pub mod utils;

#[cfg(feature = "allow_filesystem")]
pub mod parameters_from_file;

#[cfg(feature = "allow_filesystem")]
pub mod urdf;
#[cfg(feature = "allow_filesystem")]
pub mod parameter_error;

#[cfg(test)]
mod tests;
