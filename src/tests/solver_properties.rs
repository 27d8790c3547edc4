#[cfg(test)]
mod tests {
    use crate::chain::SerialChain;
    use crate::kinematic_traits::KinematicModel;
    use crate::solver::{IkSolver, IterationStep, SolverConfig, Termination};
    use crate::tests::test_utils::{LinearModel, joints};
    use nalgebra::{UnitQuaternion, Vector3};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::f64::consts::PI;

    fn rng() -> StdRng {
        StdRng::from_seed([0u8; 32])
    }

    #[test]
    fn test_reachable_target_converges() {
        let model = LinearModel::new();
        let solver = IkSolver::default();
        let target = Vector3::new(0.01, 0.0, 0.0);

        let outcome = solver
            .solve_with_rng(&model, &target, &joints(&[0.0, 0.0, 0.0]), None, &mut rng())
            .expect("solve failed");

        println!("Converged after {} iterations, residual {:e}", outcome.iterations, outcome.residual_error);
        assert!(outcome.converged);
        assert_eq!(outcome.termination(), Termination::Converged);
        assert!(outcome.iterations < 100);
        assert!(outcome.residual_error < 1e-6);
        assert!((outcome.final_pose.position - target).norm() < 1e-6);
        // The step is split evenly between the two joints moving x, the third stays.
        assert!((outcome.joints[0] - outcome.joints[1]).abs() < 1e-9);
        assert!(outcome.joints[2].abs() < 1e-12);
        assert_eq!(outcome.singular_recoveries, 0);
    }

    #[test]
    fn test_unreachable_target_returns_best() {
        let model = LinearModel::new();
        let solver = IkSolver::default();
        let target = Vector3::new(1000.0, 1000.0, 1000.0);

        let outcome = solver
            .solve_with_rng(&model, &target, &joints(&[0.0, 0.0, 0.0]), None, &mut rng())
            .expect("unreachable target still gives the best candidate");

        assert!(!outcome.converged);
        assert_eq!(outcome.termination(), Termination::MaxIterationsExhausted);
        assert_eq!(outcome.iterations, 100);
        for q in outcome.joints.iter() {
            assert!((q - PI).abs() < 1e-9, "joint {} not at the upper limit", q);
        }
        let expected = (target - outcome.final_pose.position).norm();
        assert!((outcome.residual_error - expected).abs() < 1e-9);
    }

    #[test]
    fn test_best_error_never_increases() {
        let model = LinearModel::new();
        let solver = IkSolver::default();
        let (result, trace) = solver.solve_traced(
            &model, &Vector3::new(1000.0, -1000.0, 1000.0), &joints(&[0.5, -0.5, 0.0]), None, &mut rng(),
        );
        let outcome = result.expect("solve failed");
        assert_eq!(trace.iterations.len(), 100);

        let mut previous = f64::INFINITY;
        for record in &trace.iterations {
            assert!(record.best_error <= previous);
            assert!(record.best_error <= record.error_norm);
            previous = record.best_error;
        }
        assert!((outcome.residual_error - previous).abs() < 1e-12);

        // Returned joints are the earliest configuration with the smallest error.
        let first_best = trace.iterations.iter()
            .find(|r| r.error_norm == previous)
            .expect("best configuration is in the trace");
        assert_eq!(first_best.joints, outcome.joints);
    }

    #[test]
    fn test_step_bounded_and_limits_respected() {
        let model = LinearModel::new();
        let config = SolverConfig { max_step: 0.05, ..SolverConfig::default() };
        let solver = IkSolver::new(config);
        let (result, trace) = solver.solve_traced(
            &model, &Vector3::new(50.0, -50.0, 0.0), &joints(&[0.0, 0.0, 0.0]), None, &mut rng(),
        );
        let outcome = result.expect("solve failed");
        let limits = model.joint_limits();

        for record in &trace.iterations {
            if let IterationStep::Update { step_norm } = record.step {
                assert!(step_norm <= config.max_step + 1e-12, "step {} too long", step_norm);
            }
            assert!(limits.compliant(&record.joints));
        }
        for pair in trace.iterations.windows(2) {
            assert!((&pair[1].joints - &pair[0].joints).norm() <= config.max_step + 1e-12);
        }
        assert!(limits.compliant(&outcome.joints));
    }

    #[test]
    fn test_out_of_limits_start_is_clipped() {
        let model = LinearModel::new();
        let solver = IkSolver::default();
        let start = joints(&[4.0, 0.0, -4.0]);
        let (result, trace) = solver.solve_traced(&model, &Vector3::new(0.0, 0.0, 0.0), &start, None, &mut rng());
        result.expect("solve failed");
        // The start itself is evaluated as given, everything after is clipped.
        assert_eq!(trace.iterations[0].joints, start);
        for record in trace.iterations.iter().skip(1) {
            assert!(model.joint_limits().compliant(&record.joints));
        }
    }

    #[test]
    fn test_final_pose_matches_joints() {
        let chain = SerialChain::planar(&[0.5, 0.5]).unwrap();
        let solver = IkSolver::default();
        for target in [Vector3::new(0.6, 0.4, 0.0), Vector3::new(3.0, 3.0, 0.0)] {
            let outcome = solver
                .solve_with_rng(&chain, &target, &joints(&[0.3, 0.3]), None, &mut rng())
                .expect("solve failed");
            let pose = chain.forward_kinematics(&outcome.joints).unwrap();
            assert_eq!(pose, outcome.final_pose);
            assert!((outcome.residual_error - (target - pose.position).norm()).abs() < 1e-12);
        }
    }

    #[test]
    fn test_already_at_target() {
        let model = LinearModel::new();
        let start = joints(&[0.2, 0.3, 0.4]);
        let target = model.forward_kinematics(&start).unwrap().position;
        let outcome = IkSolver::default()
            .solve_with_rng(&model, &target, &start, None, &mut rng())
            .expect("solve failed");
        assert!(outcome.converged);
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.joints, start);
    }

    #[test]
    fn test_planar_pose_target() {
        let chain = SerialChain::planar(&[0.5, 0.5]).unwrap();
        let expected = joints(&[0.5, 0.8]);
        let pose = chain.forward_kinematics(&expected).unwrap();
        let orientation: UnitQuaternion<f64> = pose.orientation.unwrap();

        let config = SolverConfig { max_iterations: 1000, learning_rate: 0.5, ..SolverConfig::default() };
        let outcome = IkSolver::new(config)
            .solve_with_rng(&chain, &pose.position, &joints(&[0.3, 0.3]), Some(&orientation), &mut rng())
            .expect("solve failed");

        println!("Pose target reached in {} iterations", outcome.iterations);
        assert!(outcome.converged);
        assert!((outcome.final_pose.position - pose.position).norm() < 1e-5);
        assert!(outcome.final_pose.orientation.unwrap().angle_to(&orientation) < 1e-5);
        assert!((&outcome.joints - &expected).norm() < 1e-4);
    }

    #[test]
    fn test_same_seed_same_result() {
        let chain = SerialChain::planar(&[0.5, 0.5, 0.3]).unwrap();
        let solver = IkSolver::default();
        let target = Vector3::new(0.4, 0.7, 0.0);
        let start = joints(&[0.1, 0.2, 0.3]);
        let a = solver.solve_with_rng(&chain, &target, &start, None, &mut StdRng::seed_from_u64(5));
        let b = solver.solve_with_rng(&chain, &target, &start, None, &mut StdRng::seed_from_u64(5));
        assert_eq!(a, b);
    }
}
