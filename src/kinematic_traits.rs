//! Data model and the kinematic model interface consumed by the solver

extern crate nalgebra as na;

use crate::constraints::JointLimits;
use na::{DMatrix, DVector, UnitQuaternion, Vector3};
use thiserror::Error;

/// Joint values of the robot in radians, one per degree of freedom.
/// ```
/// use rs_numeric_ik::kinematic_traits::JointConfiguration;
/// let joints = JointConfiguration::from_vec(vec![0.0, 0.5, -0.25]);
/// assert_eq!(joints.len(), 3);
/// ```
pub type JointConfiguration = DVector<f64>;

/// End effector pose. The orientation is optional: `None` means the orientation
/// is not constrained and does not take part in the error metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vector3<f64>,
    pub orientation: Option<UnitQuaternion<f64>>,
}

impl Pose {
    pub fn new(position: Vector3<f64>, orientation: Option<UnitQuaternion<f64>>) -> Self {
        Pose { position, orientation }
    }

    /// Pose with only the position defined.
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Pose { position: Vector3::new(x, y, z), orientation: None }
    }

    /// Orientation as `[x, y, z, w]`, if present.
    pub fn quaternion_xyzw(&self) -> Option<[f64; 4]> {
        self.orientation.map(|q| [q.i, q.j, q.k, q.w])
    }
}

/// Failures raised by a kinematic model. The solver treats all of them as structural:
/// they end the solve instead of triggering the singularity recovery.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KinematicsError {
    #[error("expected {expected} joint values, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("non-finite value: {0}")]
    NonFinite(String),

    #[error("kinematic model failure: {0}")]
    Model(String),
}

/// Number of error (and Jacobian) rows for the given constraint. Position takes 3 rows,
/// orientation (quaternion x, y, z, w) adds 4 more.
pub fn error_rows(orientation_constrained: bool) -> usize {
    if orientation_constrained { 7 } else { 3 }
}

/// The robot as seen by the inverse kinematics solver.
pub trait KinematicModel {
    /// Degrees of freedom (number of joints).
    fn dof(&self) -> usize;

    /// Limits of every joint.
    fn joint_limits(&self) -> &JointLimits;

    /// Pose of the end effector for the given joints.
    fn forward_kinematics(&self, joints: &JointConfiguration) -> Result<Pose, KinematicsError>;

    /// Jacobian of the pose error coordinates with respect to the joints. The matrix
    /// has `error_rows(orientation_constrained)` rows and `dof()` columns.
    fn jacobian(
        &self,
        joints: &JointConfiguration,
        orientation_constrained: bool,
    ) -> Result<DMatrix<f64>, KinematicsError>;

    /// Error vector between current and target pose. Its length matches the rows
    /// of the Jacobian. Override only together with `jacobian`.
    fn pose_error(
        &self,
        current: &Pose,
        target_position: &Vector3<f64>,
        target_orientation: Option<&UnitQuaternion<f64>>,
    ) -> DVector<f64> {
        crate::pose_error::pose_error(current, target_position, target_orientation)
    }
}
