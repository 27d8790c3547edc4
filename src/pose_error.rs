//! Pose error metric shared by the solver and the numeric Jacobian

use crate::kinematic_traits::{Pose, error_rows};
use nalgebra::{DVector, UnitQuaternion, Vector3};

/// Quaternion coordinates `[x, y, z, w]` of `q`, sign-flipped if needed so that they
/// lie in the same hemisphere as `reference` (q and -q are the same rotation).
pub fn aligned_coordinates(q: &UnitQuaternion<f64>, reference: &UnitQuaternion<f64>) -> [f64; 4] {
    let sign = if q.coords.dot(&reference.coords) < 0.0 { -1.0 } else { 1.0 };
    [sign * q.i, sign * q.j, sign * q.k, sign * q.w]
}

/// Computes `target - current`. The position difference is always present.
/// The 4 quaternion rows are only appended when the target orientation is given;
/// without it the vector is 3 long, not padded with zeros.
///
/// A current pose without orientation is compared against the identity rotation.
pub fn pose_error(
    current: &Pose,
    target_position: &Vector3<f64>,
    target_orientation: Option<&UnitQuaternion<f64>>,
) -> DVector<f64> {
    let mut error = DVector::zeros(error_rows(target_orientation.is_some()));
    let dp = target_position - current.position;
    error.fixed_rows_mut::<3>(0).copy_from(&dp);

    if let Some(target) = target_orientation {
        let current_q = current.orientation.unwrap_or_else(UnitQuaternion::identity);
        let c = aligned_coordinates(&current_q, target);
        let t = [target.i, target.j, target.k, target.w];
        for k in 0..4 {
            error[3 + k] = t[k] - c[k];
        }
    }
    error
}
