extern crate nalgebra as na;

use crate::kinematic_traits::{JointConfiguration, KinematicModel, KinematicsError, error_rows};
use crate::pose_error::aligned_coordinates;
use na::linalg::SVD;
use na::{DMatrix, DVector, UnitQuaternion};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use thiserror::Error;

/// Relative cut-off for small singular values: values below `RCOND * sigma_max`
/// are treated as zero by the pseudo-inverse.
pub const RCOND: f64 = 1e-15;

/// Upper bound on SVD sweeps before the decomposition is declared non-convergent.
const MAX_SVD_ITERATIONS: usize = 1000;

/// Default disturbance for the finite difference Jacobian, radians.
pub const DEFAULT_DIFFERENTIATION_STEP: f64 = 1e-7;

/// The Jacobian could not be inverted. This is the numeric failure the solver
/// recovers from by perturbing the joints.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("singular Jacobian: {0}")]
pub struct SingularJacobian(pub &'static str);

/// Jacobian matrix of the pose error coordinates over the joints.
pub struct Jacobian {
    /// Rows are pose error coordinates (position x, y, z, then optionally
    /// quaternion x, y, z, w), columns are joints.
    matrix: DMatrix<f64>,
}

impl Jacobian {
    /// Computes the Jacobian of `model` at the given joints.
    pub fn new<M: KinematicModel + ?Sized>(
        model: &M,
        joints: &JointConfiguration,
        orientation_constrained: bool,
    ) -> Result<Self, KinematicsError> {
        let matrix = model.jacobian(joints, orientation_constrained)?;
        let expected_rows = error_rows(orientation_constrained);
        if matrix.nrows() != expected_rows {
            return Err(KinematicsError::DimensionMismatch {
                expected: expected_rows,
                found: matrix.nrows(),
            });
        }
        if matrix.ncols() != joints.len() {
            return Err(KinematicsError::DimensionMismatch {
                expected: joints.len(),
                found: matrix.ncols(),
            });
        }
        Ok(Self { matrix })
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Joint change that produces the given change of the pose coordinates, in the
    /// least squares sense (Moore-Penrose pseudo-inverse).
    pub fn velocities_from_vector(&self, desired: &DVector<f64>) -> Result<DVector<f64>, SingularJacobian> {
        let pinv = pseudo_inverse(&self.matrix)?;
        let velocities = pinv * desired;
        if velocities.iter().all(|v| v.is_finite()) {
            Ok(velocities)
        } else {
            Err(SingularJacobian("non-finite joint velocities"))
        }
    }
}

/// Moore-Penrose pseudo-inverse computed via SVD.
pub fn pseudo_inverse(matrix: &DMatrix<f64>) -> Result<DMatrix<f64>, SingularJacobian> {
    if matrix.is_empty() {
        return Err(SingularJacobian("empty Jacobian"));
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(SingularJacobian("non-finite Jacobian entries"));
    }
    let svd = SVD::try_new(matrix.clone(), true, true, f64::EPSILON, MAX_SVD_ITERATIONS)
        .ok_or(SingularJacobian("SVD did not converge"))?;
    let sigma_max = svd.singular_values.max();
    if sigma_max <= 0.0 {
        return Err(SingularJacobian("all singular values are zero"));
    }
    let pinv = svd.pseudo_inverse(RCOND * sigma_max)
        .map_err(|_| SingularJacobian("unable to compute the pseudoinverse"))?;
    if pinv.iter().any(|v| !v.is_finite()) {
        return Err(SingularJacobian("non-finite pseudoinverse"));
    }
    Ok(pinv)
}

/// Jacobian by forward finite differences of `model.forward_kinematics`. Row layout
/// matches `pose_error`: 3 position rows, and 4 quaternion rows `[x, y, z, w]` if
/// the orientation is constrained. Quaternions of the disturbed poses are sign-aligned
/// with the undisturbed one so that the derivative does not jump across the double cover.
pub fn numeric_jacobian<M: KinematicModel + Sync + ?Sized>(
    model: &M,
    joints: &JointConfiguration,
    orientation_constrained: bool,
    epsilon: f64,
) -> Result<DMatrix<f64>, KinematicsError> {
    let rows = error_rows(orientation_constrained);
    let current = model.forward_kinematics(joints)?;
    let current_orientation = current.orientation.unwrap_or_else(UnitQuaternion::identity);
    let current_q = aligned_coordinates(&current_orientation, &current_orientation);

    let column = |i: usize| -> Result<DVector<f64>, KinematicsError> {
        let mut disturbed = joints.clone();
        disturbed[i] += epsilon;
        let pose = model.forward_kinematics(&disturbed)?;
        let mut derivative = DVector::zeros(rows);
        let dp = (pose.position - current.position) / epsilon;
        derivative.fixed_rows_mut::<3>(0).copy_from(&dp);
        if orientation_constrained {
            let orientation = pose.orientation.unwrap_or_else(UnitQuaternion::identity);
            let q = aligned_coordinates(&orientation, &current_orientation);
            for k in 0..4 {
                derivative[3 + k] = (q[k] - current_q[k]) / epsilon;
            }
        }
        Ok(derivative)
    };

    #[cfg(feature = "parallel")]
    let columns: Vec<_> = (0..joints.len()).into_par_iter().map(column).collect::<Result<_, _>>()?;
    #[cfg(not(feature = "parallel"))]
    let columns: Vec<_> = (0..joints.len()).map(column).collect::<Result<_, _>>()?;

    let mut jacobian = DMatrix::zeros(rows, joints.len());
    for (i, derivative) in columns.into_iter().enumerate() {
        jacobian.set_column(i, &derivative);
    }
    Ok(jacobian)
}
