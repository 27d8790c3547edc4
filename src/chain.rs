//! Serial kinematic chain, the generic robot model
//!
//! A chain is an ordered list of actuated joints from the base link to the tool
//! link. Each joint carries the static transform from the previous joint and its
//! motion axis. Fixed joints between them are folded into the next joint's origin
//! or, at the end of the chain, into the tip offset.

use crate::constraints::{JointLimits, LimitsError};
use crate::jacobian::{DEFAULT_DIFFERENTIATION_STEP, numeric_jacobian};
use crate::kinematic_traits::{JointConfiguration, KinematicModel, KinematicsError, Pose};
use nalgebra::{DMatrix, Isometry3, Translation3, Unit, UnitQuaternion, Vector3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointKind {
    Revolute,
    Prismatic,
}

/// A single actuated joint.
#[derive(Debug, Clone)]
pub struct ChainJoint {
    pub name: String,
    /// Transform from the previous joint frame (or base) to this joint frame.
    pub origin: Isometry3<f64>,
    /// Motion axis in this joint's frame.
    pub axis: Unit<Vector3<f64>>,
    pub kind: JointKind,
}

impl ChainJoint {
    pub fn revolute(name: &str, origin: Isometry3<f64>, axis: Vector3<f64>) -> Self {
        ChainJoint {
            name: name.to_string(),
            origin,
            axis: Unit::new_normalize(axis),
            kind: JointKind::Revolute,
        }
    }

    pub fn prismatic(name: &str, origin: Isometry3<f64>, axis: Vector3<f64>) -> Self {
        ChainJoint {
            name: name.to_string(),
            origin,
            axis: Unit::new_normalize(axis),
            kind: JointKind::Prismatic,
        }
    }

    /// Motion of this joint at the given position (radians or meters).
    fn motion(&self, position: f64) -> Isometry3<f64> {
        match self.kind {
            JointKind::Revolute => Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(&self.axis, position),
            ),
            JointKind::Prismatic => Isometry3::from_parts(
                Translation3::from(self.axis.into_inner() * position),
                UnitQuaternion::identity(),
            ),
        }
    }
}

/// Serial chain implementing `KinematicModel`. Forward kinematics composes the joint
/// transforms; the Jacobian is computed by finite differences so that it always matches
/// the layout of the pose error (3 position rows, 4 more for the quaternion).
#[derive(Debug, Clone)]
pub struct SerialChain {
    joints: Vec<ChainJoint>,
    /// Transform from the last joint frame to the tool center point.
    tip_offset: Isometry3<f64>,
    limits: JointLimits,
    /// Finite difference step for the Jacobian, radians (meters for prismatic joints).
    pub differentiation_step: f64,
}

impl SerialChain {
    pub fn new(
        joints: Vec<ChainJoint>,
        tip_offset: Isometry3<f64>,
        limits: JointLimits,
    ) -> Result<Self, KinematicsError> {
        if limits.len() != joints.len() {
            return Err(KinematicsError::DimensionMismatch {
                expected: joints.len(),
                found: limits.len(),
            });
        }
        Ok(SerialChain {
            joints,
            tip_offset,
            limits,
            differentiation_step: DEFAULT_DIFFERENTIATION_STEP,
        })
    }

    /// Planar arm in the XY plane: revolute joints around Z, each link extending
    /// along X by the given length. Joints are limited to +/- 180 degrees.
    pub fn planar(link_lengths: &[f64]) -> Result<Self, LimitsError> {
        let joints = link_lengths
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let origin = if i == 0 {
                    Isometry3::identity()
                } else {
                    Isometry3::translation(link_lengths[i - 1], 0.0, 0.0)
                };
                ChainJoint::revolute(&format!("joint{}", i + 1), origin, Vector3::z())
            })
            .collect::<Vec<_>>();
        let tip = link_lengths.last().copied().unwrap_or(0.0);
        let limits = JointLimits::uniform(joints.len(), -180.0..=180.0)?;
        Ok(SerialChain {
            joints,
            tip_offset: Isometry3::translation(tip, 0.0, 0.0),
            limits,
            differentiation_step: DEFAULT_DIFFERENTIATION_STEP,
        })
    }

    pub fn joints(&self) -> &[ChainJoint] {
        &self.joints
    }

    pub fn joint_names(&self) -> Vec<&str> {
        self.joints.iter().map(|j| j.name.as_str()).collect()
    }

    pub fn tip_offset(&self) -> &Isometry3<f64> {
        &self.tip_offset
    }

    /// Replaces the joint limits, for instance with tighter software limits.
    pub fn with_limits(mut self, limits: JointLimits) -> Result<Self, KinematicsError> {
        if limits.len() != self.joints.len() {
            return Err(KinematicsError::DimensionMismatch {
                expected: self.joints.len(),
                found: limits.len(),
            });
        }
        self.limits = limits;
        Ok(self)
    }

    /// Full transform of the tool center point.
    pub fn tcp(&self, joints: &JointConfiguration) -> Result<Isometry3<f64>, KinematicsError> {
        if joints.len() != self.joints.len() {
            return Err(KinematicsError::DimensionMismatch {
                expected: self.joints.len(),
                found: joints.len(),
            });
        }
        let mut transform = Isometry3::identity();
        for (joint, &position) in self.joints.iter().zip(joints.iter()) {
            transform *= joint.origin;
            transform *= joint.motion(position);
        }
        Ok(transform * self.tip_offset)
    }
}

impl KinematicModel for SerialChain {
    fn dof(&self) -> usize {
        self.joints.len()
    }

    fn joint_limits(&self) -> &JointLimits {
        &self.limits
    }

    fn forward_kinematics(&self, joints: &JointConfiguration) -> Result<Pose, KinematicsError> {
        let tcp = self.tcp(joints)?;
        let position = tcp.translation.vector;
        if position.iter().any(|v| !v.is_finite()) {
            return Err(KinematicsError::NonFinite(format!(
                "tool position for joints {:?}",
                joints.as_slice()
            )));
        }
        Ok(Pose::new(position, Some(tcp.rotation)))
    }

    fn jacobian(
        &self,
        joints: &JointConfiguration,
        orientation_constrained: bool,
    ) -> Result<DMatrix<f64>, KinematicsError> {
        numeric_jacobian(self, joints, orientation_constrained, self.differentiation_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_planar_forward() {
        let chain = SerialChain::planar(&[1.0, 0.5]).unwrap();
        let pose = chain
            .forward_kinematics(&JointConfiguration::from_vec(vec![FRAC_PI_2, 0.0]))
            .unwrap();
        assert!(pose.position.x.abs() < 1e-12);
        assert!((pose.position.y - 1.5).abs() < 1e-12);

        let pose = chain
            .forward_kinematics(&JointConfiguration::from_vec(vec![0.0, FRAC_PI_2]))
            .unwrap();
        assert!((pose.position.x - 1.0).abs() < 1e-12);
        assert!((pose.position.y - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_prismatic_joint() {
        let joints = vec![
            ChainJoint::prismatic("lift", Isometry3::identity(), Vector3::z()),
            ChainJoint::revolute("yaw", Isometry3::translation(0.0, 0.0, 0.1), Vector3::z()),
        ];
        let limits = JointLimits::from_degrees(vec![0.0..=30.0, -180.0..=180.0]).unwrap();
        let chain = SerialChain::new(joints, Isometry3::translation(0.2, 0.0, 0.0), limits).unwrap();
        let pose = chain
            .forward_kinematics(&JointConfiguration::from_vec(vec![0.3, FRAC_PI_2]))
            .unwrap();
        assert!(pose.position.x.abs() < 1e-12);
        assert!((pose.position.y - 0.2).abs() < 1e-12);
        assert!((pose.position.z - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_dimension_mismatch() {
        let chain = SerialChain::planar(&[1.0, 1.0]).unwrap();
        let result = chain.forward_kinematics(&JointConfiguration::zeros(3));
        assert_eq!(result, Err(KinematicsError::DimensionMismatch { expected: 2, found: 3 }));

        let limits = JointLimits::uniform(3, -90.0..=90.0).unwrap();
        assert!(chain.with_limits(limits).is_err());
    }

    #[test]
    fn test_jacobian_planar() {
        // d(tip)/d(q1) at zero is (0, L1 + L2, 0), d(tip)/d(q2) is (0, L2, 0).
        let chain = SerialChain::planar(&[1.0, 0.5]).unwrap();
        let m = chain.jacobian(&JointConfiguration::zeros(2), false).unwrap();
        assert_eq!(m.shape(), (3, 2));
        assert!((m[(1, 0)] - 1.5).abs() < 1e-5);
        assert!((m[(1, 1)] - 0.5).abs() < 1e-5);
        assert!(m[(0, 0)].abs() < 1e-5);
    }
}
