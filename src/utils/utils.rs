//! Helper functions

use crate::kinematic_traits::{JointConfiguration, Pose};

/// Checks if all joint values are finite
pub fn is_valid(qs: &JointConfiguration) -> bool {
    qs.iter().all(|&q| q.is_finite())
}

/// Allows to specify joint values in degrees (converts to radians)
pub fn as_radians(degrees: &[f64]) -> JointConfiguration {
    JointConfiguration::from_iterator(degrees.len(), degrees.iter().map(|d| d.to_radians()))
}

/// Convert joints in radians to degrees
pub fn to_degrees(joints: &JointConfiguration) -> Vec<f64> {
    joints.iter().map(|q| q.to_degrees()).collect()
}

/// Formats joint values, converting radians to degrees.
pub fn format_joints(joints: &JointConfiguration) -> String {
    let row = joints
        .iter()
        .map(|q| format!("{:5.2}", q.to_degrees()))
        .collect::<Vec<_>>()
        .join(" ");
    format!("[{}]", row)
}

/// Print joint values, converting radians to degrees.
pub fn dump_joints(joints: &JointConfiguration) {
    println!("{}", format_joints(joints));
}

pub fn format_pose(pose: &Pose) -> String {
    let p = pose.position;
    match pose.quaternion_xyzw() {
        Some([x, y, z, w]) => format!(
            "x: {:.5}, y: {:.5}, z: {:.5},  quat: {:.5},{:.5},{:.5},{:.5}",
            p.x, p.y, p.z, x, y, z, w
        ),
        None => format!("x: {:.5}, y: {:.5}, z: {:.5}", p.x, p.y, p.z),
    }
}

pub fn dump_pose(pose: &Pose) {
    println!("{}", format_pose(pose));
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{UnitQuaternion, Vector3};
    use std::f64::consts::PI;

    #[test]
    fn test_is_valid_with_all_finite() {
        let qs = JointConfiguration::from_vec(vec![0.0, 1.0, -1.0, 0.5, -0.5, PI]);
        assert!(is_valid(&qs));
    }

    #[test]
    fn test_is_valid_with_nan() {
        let qs = JointConfiguration::from_vec(vec![0.0, f64::NAN, 1.0]);
        assert!(!is_valid(&qs));
    }

    #[test]
    fn test_is_valid_with_infinity() {
        let qs = JointConfiguration::from_vec(vec![f64::INFINITY, 1.0]);
        assert!(!is_valid(&qs));
    }

    #[test]
    fn test_degrees() {
        let joints = as_radians(&[90.0, -45.0]);
        assert!((joints[0] - PI / 2.0).abs() < 1e-12);
        let back = to_degrees(&joints);
        assert!((back[1] + 45.0).abs() < 1e-9);
        assert_eq!(format_joints(&joints), "[90.00 -45.00]");
    }

    #[test]
    fn test_format_pose() {
        assert_eq!(format_pose(&Pose::at(1.0, 2.0, 3.0)), "x: 1.00000, y: 2.00000, z: 3.00000");
        let rotated = Pose::new(Vector3::zeros(), Some(UnitQuaternion::identity()));
        assert_eq!(format_pose(&rotated), "x: 0.00000, y: 0.00000, z: 0.00000,  quat: 0.00000,0.00000,0.00000,1.00000");
    }
}
