//! Workflow decomposition: a sequence of Cartesian waypoints to a joint trajectory

use crate::kinematic_traits::{JointConfiguration, KinematicModel};
use crate::solver::{IkSolver, SolverError};
use nalgebra::{UnitQuaternion, Vector3};
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info};

/// Target of one workflow step. Without orientation, only the position is reached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub position: Vector3<f64>,
    pub orientation: Option<UnitQuaternion<f64>>,
}

impl Waypoint {
    pub fn position(x: f64, y: f64, z: f64) -> Self {
        Waypoint { position: Vector3::new(x, y, z), orientation: None }
    }

    pub fn pose(position: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Waypoint { position, orientation: Some(orientation) }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryPoint {
    pub waypoint_index: usize,
    pub joints: JointConfiguration,
    pub residual_error: f64,
    pub converged: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    pub points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True if every waypoint was reached within the solver tolerance.
    pub fn all_converged(&self) -> bool {
        self.points.iter().all(|p| p.converged)
    }

    /// Largest change of any single joint between two consecutive points, radians.
    pub fn max_joint_jump(&self) -> f64 {
        self.points
            .windows(2)
            .flat_map(|pair| {
                pair[0].joints.iter().zip(pair[1].joints.iter())
                    .map(|(a, b)| (a - b).abs())
                    .collect::<Vec<_>>()
            })
            .fold(0.0, f64::max)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("waypoint {index}: {source}")]
    Solver {
        index: usize,
        #[source]
        source: SolverError,
    },

    #[error("waypoint {index} not reached, residual error {residual}")]
    Unreachable { index: usize, residual: f64 },
}

/// Converts waypoints into joint configurations by solving them one after another,
/// each solve starting from the solution of the previous waypoint.
#[derive(Debug, Clone, Default)]
pub struct WorkflowPlanner {
    pub solver: IkSolver,

    /// If set, a waypoint that does not converge aborts the decomposition.
    /// Otherwise the best candidate is taken and the planning continues.
    pub require_convergence: bool,
}

impl WorkflowPlanner {
    pub fn new(solver: IkSolver, require_convergence: bool) -> Self {
        Self { solver, require_convergence }
    }

    pub fn decompose<M: KinematicModel + ?Sized>(
        &self,
        model: &M,
        start: &JointConfiguration,
        waypoints: &[Waypoint],
    ) -> Result<Trajectory, WorkflowError> {
        let mut rng = rand::thread_rng();
        self.decompose_with_rng(model, start, waypoints, &mut rng)
    }

    pub fn decompose_with_rng<M: KinematicModel + ?Sized, R: Rng>(
        &self,
        model: &M,
        start: &JointConfiguration,
        waypoints: &[Waypoint],
        rng: &mut R,
    ) -> Result<Trajectory, WorkflowError> {
        let mut trajectory = Trajectory::default();
        let mut previous = start.clone();

        for (index, waypoint) in waypoints.iter().enumerate() {
            let outcome = self.solver
                .solve_with_rng(model, &waypoint.position, &previous, waypoint.orientation.as_ref(), rng)
                .map_err(|source| WorkflowError::Solver { index, source })?;

            if !outcome.converged {
                if self.require_convergence {
                    return Err(WorkflowError::Unreachable { index, residual: outcome.residual_error });
                }
                debug!(index, residual = outcome.residual_error, "waypoint not reached, using best candidate");
            }

            previous = outcome.joints.clone();
            trajectory.points.push(TrajectoryPoint {
                waypoint_index: index,
                joints: outcome.joints,
                residual_error: outcome.residual_error,
                converged: outcome.converged,
            });
        }

        info!(
            waypoints = waypoints.len(),
            converged = trajectory.points.iter().filter(|p| p.converged).count(),
            "workflow decomposed"
        );
        Ok(trajectory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(joints: Vec<f64>) -> TrajectoryPoint {
        TrajectoryPoint {
            waypoint_index: 0,
            joints: JointConfiguration::from_vec(joints),
            residual_error: 0.0,
            converged: true,
        }
    }

    #[test]
    fn test_max_joint_jump() {
        let trajectory = Trajectory {
            points: vec![point(vec![0.0, 0.0]), point(vec![0.1, -0.3]), point(vec![0.15, -0.25])],
        };
        assert!((trajectory.max_joint_jump() - 0.3).abs() < 1e-12);
        assert!(trajectory.all_converged());
    }

    #[test]
    fn test_empty_trajectory() {
        let trajectory = Trajectory::default();
        assert!(trajectory.is_empty());
        assert_eq!(trajectory.max_joint_jump(), 0.0);
    }
}
