//! Iterative inverse kinematics solver
//!
//! The solver moves the joints along the Moore-Penrose pseudo-inverse of the Jacobian
//! applied to the pose error, scaled by a learning rate, with the step length bounded
//! and every joint clamped into its limits after each step. If the Jacobian cannot be
//! inverted, the joints are shaken with small Gaussian noise instead and the iteration
//! continues from there.
//!
//! The best configuration seen (smallest error norm) is tracked across iterations.
//! This is what is returned both on convergence and when the iteration budget runs out;
//! the returned pose is always recomputed from the returned joints.
//!
//! ```
//! use rs_numeric_ik::solver::IkSolver;
//! use rs_numeric_ik::chain::SerialChain;
//! use nalgebra::{DVector, Vector3};
//!
//! // Planar arm, two links of 0.5 m rotating around Z.
//! let chain = SerialChain::planar(&[0.5, 0.5]).unwrap();
//! let solver = IkSolver::default();
//! let outcome = solver
//!     .solve(&chain, &Vector3::new(0.6, 0.4, 0.0), &DVector::from_vec(vec![0.3, 0.3]), None)
//!     .expect("solver failure");
//! assert!(outcome.residual_error < 1e-3);
//! ```

use crate::kinematic_traits::{JointConfiguration, KinematicModel, KinematicsError, Pose};
use crate::jacobian::Jacobian;
use nalgebra::{UnitQuaternion, Vector3};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Tuning of the solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Iteration budget. Singularity recoveries consume it as ordinary steps.
    pub max_iterations: usize,

    /// Convergence threshold on the Euclidean norm of the pose error.
    pub epsilon: f64,

    /// Fraction of the pseudo-inverse solution applied per step.
    pub learning_rate: f64,

    /// Maximal Euclidean norm of the joint step (after the learning rate), radians.
    pub max_step: f64,

    /// Standard deviation of the per-joint Gaussian perturbation applied when
    /// the Jacobian is singular, radians.
    pub perturbation_std: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            epsilon: 1e-6,
            learning_rate: 0.1,
            max_step: 0.1,
            perturbation_std: 0.01,
        }
    }
}

impl SolverConfig {
    /// Checks that all values are usable: finite, positive (noise may be zero).
    pub fn validate(&self) -> Result<(), SolverError> {
        fn positive(name: &str, value: f64) -> Result<(), SolverError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(SolverError::InvalidConfig(format!("{name} must be finite and > 0, got {value}")))
            }
        }
        if self.max_iterations == 0 {
            return Err(SolverError::InvalidConfig("max_iterations must be > 0".into()));
        }
        positive("epsilon", self.epsilon)?;
        positive("learning_rate", self.learning_rate)?;
        positive("max_step", self.max_step)?;
        if !(self.perturbation_std.is_finite() && self.perturbation_std >= 0.0) {
            return Err(SolverError::InvalidConfig(format!(
                "perturbation_std must be finite and >= 0, got {}",
                self.perturbation_std
            )));
        }
        Ok(())
    }
}

/// Why the solver could not produce any joint configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The kinematic model failed (wrong dimensions, non-finite output, ...).
    #[error("kinematic model failed: {0}")]
    CollaboratorFailure(#[from] KinematicsError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid solver configuration: {0}")]
    InvalidConfig(String),

    /// No iteration produced a finite error, so there is no best candidate.
    #[error("no iteration produced a usable pose error")]
    NoImprovement,

    /// As `NoImprovement`, and the Jacobian was singular in every iteration.
    #[error("Jacobian singular in all {iterations} iterations")]
    SingularJacobianExhausted { iterations: usize },

    #[error("cancelled at iteration {iteration}")]
    Cancelled { iteration: usize },
}

/// How a successful solve ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The error norm fell below epsilon.
    Converged,
    /// The iteration budget ran out; the best candidate is returned anyway.
    MaxIterationsExhausted,
}

/// Result of a solve that produced a joint configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    /// Best joint configuration found, radians.
    pub joints: JointConfiguration,

    /// Forward kinematics recomputed at `joints`.
    pub final_pose: Pose,

    /// Error norm at `joints`.
    pub residual_error: f64,

    pub converged: bool,

    /// Number of iterations executed (including the converging one).
    pub iterations: usize,

    /// How many iterations went through singularity recovery.
    pub singular_recoveries: usize,
}

impl SolveOutcome {
    pub fn termination(&self) -> Termination {
        if self.converged {
            Termination::Converged
        } else {
            Termination::MaxIterationsExhausted
        }
    }
}

pub type SolveResult = Result<SolveOutcome, SolverError>;

/// What happened after the error was evaluated in one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IterationStep {
    /// Pseudo-inverse step; `step_norm` is measured after clamping to `max_step`
    /// but before the joint limits are applied.
    Update { step_norm: f64 },
    /// Singular Jacobian, joints perturbed randomly.
    Recovery,
    /// Error below epsilon, solve finished.
    Converged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    pub iteration: usize,
    pub joints: JointConfiguration,
    pub error_norm: f64,
    /// Best error after this iteration's bookkeeping.
    pub best_error: f64,
    pub step: IterationStep,
}

/// Per-iteration history of a solve, for diagnostics and tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolveTrace {
    pub iterations: Vec<IterationRecord>,
}

/// The iterative inverse kinematics solver. Holds no state between solves;
/// one instance may be shared between threads.
#[derive(Debug, Clone, Default)]
pub struct IkSolver {
    pub config: SolverConfig,
}

impl IkSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Solves using the thread local random generator for singularity recovery.
    ///
    /// `initial_joints` is the starting point and is not checked against the limits.
    /// `target_orientation` of `None` leaves the orientation unconstrained.
    pub fn solve<M: KinematicModel + ?Sized>(
        &self,
        model: &M,
        target_position: &Vector3<f64>,
        initial_joints: &JointConfiguration,
        target_orientation: Option<&UnitQuaternion<f64>>,
    ) -> SolveResult {
        let mut rng = rand::thread_rng();
        self.solve_with_rng(model, target_position, initial_joints, target_orientation, &mut rng)
    }

    /// As `solve`, with the random source for singularity recovery supplied by the caller.
    pub fn solve_with_rng<M: KinematicModel + ?Sized, R: Rng>(
        &self,
        model: &M,
        target_position: &Vector3<f64>,
        initial_joints: &JointConfiguration,
        target_orientation: Option<&UnitQuaternion<f64>>,
        rng: &mut R,
    ) -> SolveResult {
        self.run(model, target_position, initial_joints, target_orientation, rng, None, None)
    }

    /// As `solve_with_rng`, additionally returning the history of all iterations.
    pub fn solve_traced<M: KinematicModel + ?Sized, R: Rng>(
        &self,
        model: &M,
        target_position: &Vector3<f64>,
        initial_joints: &JointConfiguration,
        target_orientation: Option<&UnitQuaternion<f64>>,
        rng: &mut R,
    ) -> (SolveResult, SolveTrace) {
        let mut trace = SolveTrace::default();
        let result = self.run(
            model, target_position, initial_joints, target_orientation, rng, None, Some(&mut trace),
        );
        (result, trace)
    }

    /// As `solve_with_rng`, checking `cancel` before every iteration. Intended for
    /// callers running the solve off the UI thread.
    pub fn solve_cancellable<M: KinematicModel + ?Sized, R: Rng>(
        &self,
        model: &M,
        target_position: &Vector3<f64>,
        initial_joints: &JointConfiguration,
        target_orientation: Option<&UnitQuaternion<f64>>,
        rng: &mut R,
        cancel: &AtomicBool,
    ) -> SolveResult {
        self.run(model, target_position, initial_joints, target_orientation, rng, Some(cancel), None)
    }

    #[allow(clippy::too_many_arguments)]
    fn run<M: KinematicModel + ?Sized, R: Rng>(
        &self,
        model: &M,
        target_position: &Vector3<f64>,
        initial_joints: &JointConfiguration,
        target_orientation: Option<&UnitQuaternion<f64>>,
        rng: &mut R,
        cancel: Option<&AtomicBool>,
        mut trace: Option<&mut SolveTrace>,
    ) -> SolveResult {
        let config = &self.config;
        config.validate()?;
        self.check_input(model, target_position, initial_joints, target_orientation)?;
        let noise = Normal::new(0.0, config.perturbation_std)
            .map_err(|e| SolverError::InvalidConfig(e.to_string()))?;

        let limits = model.joint_limits();
        if !limits.compliant(initial_joints) {
            warn!("Initial joints {:?} are outside the joint limits", initial_joints.as_slice());
        }
        let orientation_constrained = target_orientation.is_some();

        let mut current = initial_joints.clone();
        let mut best_error = f64::INFINITY;
        let mut best: Option<JointConfiguration> = None;
        let mut singular_recoveries = 0;

        for iteration in 0..config.max_iterations {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                debug!("Solve cancelled at iteration {iteration}");
                return Err(SolverError::Cancelled { iteration });
            }

            let pose = model.forward_kinematics(&current)?;
            let error = model.pose_error(&pose, target_position, target_orientation);
            let error_norm = error.norm();

            // Strict: ties keep the earliest configuration.
            if error_norm < best_error {
                best_error = error_norm;
                best = Some(current.clone());
            }

            if error_norm < config.epsilon {
                trace!(iteration, error_norm, "converged");
                record(&mut trace, iteration, &current, error_norm, best_error, IterationStep::Converged);
                let Some(best) = best else {
                    return Err(SolverError::NoImprovement);
                };
                return self.finish(
                    model, best, target_position, target_orientation,
                    true, iteration + 1, singular_recoveries,
                );
            }

            let jacobian = Jacobian::new(model, &current, orientation_constrained)?;
            if jacobian.matrix().nrows() != error.len() {
                return Err(SolverError::CollaboratorFailure(KinematicsError::DimensionMismatch {
                    expected: jacobian.matrix().nrows(),
                    found: error.len(),
                }));
            }

            match jacobian.velocities_from_vector(&error) {
                Ok(direction) => {
                    let mut delta = direction * config.learning_rate;
                    let mut step_norm = delta.norm();
                    if step_norm > config.max_step {
                        delta *= config.max_step / step_norm;
                        step_norm = delta.norm();
                    }
                    trace!(iteration, error_norm, step_norm, "step");
                    record(&mut trace, iteration, &current, error_norm, best_error,
                           IterationStep::Update { step_norm });
                    current = limits.clip(&(&current + delta));
                }
                Err(singular) => {
                    debug!(iteration, error_norm, "{singular}, perturbing joints");
                    record(&mut trace, iteration, &current, error_norm, best_error, IterationStep::Recovery);
                    singular_recoveries += 1;
                    current = current.map(|q| q + noise.sample(rng));
                }
            }
        }

        match best {
            Some(best) => {
                debug!(best_error, "iteration budget exhausted, returning best candidate");
                self.finish(
                    model, best, target_position, target_orientation,
                    false, config.max_iterations, singular_recoveries,
                )
            }
            None if singular_recoveries == config.max_iterations => {
                Err(SolverError::SingularJacobianExhausted { iterations: config.max_iterations })
            }
            None => Err(SolverError::NoImprovement),
        }
    }

    /// Builds the outcome from the best joints, recomputing pose and error there
    /// so that the returned pose always belongs to the returned joints.
    #[allow(clippy::too_many_arguments)]
    fn finish<M: KinematicModel + ?Sized>(
        &self,
        model: &M,
        best: JointConfiguration,
        target_position: &Vector3<f64>,
        target_orientation: Option<&UnitQuaternion<f64>>,
        converged: bool,
        iterations: usize,
        singular_recoveries: usize,
    ) -> SolveResult {
        let final_pose = model.forward_kinematics(&best)?;
        let residual_error = model
            .pose_error(&final_pose, target_position, target_orientation)
            .norm();
        debug!(converged, iterations, residual_error, "solve finished");
        Ok(SolveOutcome {
            joints: best,
            final_pose,
            residual_error,
            converged,
            iterations,
            singular_recoveries,
        })
    }

    fn check_input<M: KinematicModel + ?Sized>(
        &self,
        model: &M,
        target_position: &Vector3<f64>,
        initial_joints: &JointConfiguration,
        target_orientation: Option<&UnitQuaternion<f64>>,
    ) -> Result<(), SolverError> {
        let dof = model.dof();
        if dof == 0 {
            return Err(SolverError::InvalidInput("robot has no joints".into()));
        }
        if initial_joints.len() != dof {
            return Err(SolverError::InvalidInput(format!(
                "{} initial joint values for a robot with {} degrees of freedom",
                initial_joints.len(),
                dof
            )));
        }
        if model.joint_limits().len() != dof {
            return Err(SolverError::InvalidInput(format!(
                "{} joint limits for a robot with {} degrees of freedom",
                model.joint_limits().len(),
                dof
            )));
        }
        if !crate::utils::is_valid(initial_joints) {
            return Err(SolverError::InvalidInput("initial joints must be finite".into()));
        }
        if target_position.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::InvalidInput("target position must be finite".into()));
        }
        if target_orientation.is_some_and(|q| q.coords.iter().any(|v| !v.is_finite())) {
            return Err(SolverError::InvalidInput("target orientation must be finite".into()));
        }
        Ok(())
    }
}

fn record(
    trace: &mut Option<&mut SolveTrace>,
    iteration: usize,
    joints: &JointConfiguration,
    error_norm: f64,
    best_error: f64,
    step: IterationStep,
) {
    if let Some(trace) = trace {
        trace.iterations.push(IterationRecord {
            iteration,
            joints: joints.clone(),
            error_norm,
            best_error,
            step,
        });
    }
}
