#[cfg(test)]
mod tests {
    use crate::chain::SerialChain;
    use crate::kinematic_traits::{JointConfiguration, KinematicsError};
    use crate::solver::{IkSolver, SolverConfig, SolverError};
    use crate::tests::test_utils::{LinearModel, MisshapenModel, joints};
    use nalgebra::{Quaternion, UnitQuaternion, Vector3};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::atomic::AtomicBool;

    fn rng() -> StdRng {
        StdRng::from_seed([0u8; 32])
    }

    #[test]
    fn test_wrong_number_of_joints() {
        let result = IkSolver::default().solve_with_rng(
            &LinearModel::new(), &Vector3::new(0.01, 0.0, 0.0), &joints(&[0.0, 0.0]), None, &mut rng(),
        );
        assert!(matches!(result, Err(SolverError::InvalidInput(_))));
    }

    #[test]
    fn test_robot_without_joints() {
        let chain = SerialChain::planar(&[]).unwrap();
        let result = IkSolver::default().solve_with_rng(
            &chain, &Vector3::new(0.1, 0.0, 0.0), &JointConfiguration::zeros(0), None, &mut rng(),
        );
        println!("{:?}", result.as_ref().err());
        assert!(matches!(result, Err(SolverError::InvalidInput(_))));
    }

    #[test]
    fn test_non_finite_input() {
        let solver = IkSolver::default();
        let model = LinearModel::new();
        let result = solver.solve_with_rng(
            &model, &Vector3::new(f64::NAN, 0.0, 0.0), &joints(&[0.0, 0.0, 0.0]), None, &mut rng(),
        );
        assert!(matches!(result, Err(SolverError::InvalidInput(_))));

        let result = solver.solve_with_rng(
            &model, &Vector3::new(0.0, 0.0, 0.0), &joints(&[0.0, f64::INFINITY, 0.0]), None, &mut rng(),
        );
        assert!(matches!(result, Err(SolverError::InvalidInput(_))));

        let nan_orientation = UnitQuaternion::new_unchecked(Quaternion::new(f64::NAN, 0.0, 0.0, 0.0));
        let result = solver.solve_with_rng(
            &model, &Vector3::new(0.0, 0.0, 0.0), &joints(&[0.0, 0.0, 0.0]), Some(&nan_orientation), &mut rng(),
        );
        assert!(matches!(result, Err(SolverError::InvalidInput(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let solver = IkSolver::new(SolverConfig { learning_rate: 0.0, ..SolverConfig::default() });
        let result = solver.solve_with_rng(
            &LinearModel::new(), &Vector3::new(0.01, 0.0, 0.0), &joints(&[0.0, 0.0, 0.0]), None, &mut rng(),
        );
        assert!(matches!(result, Err(SolverError::InvalidConfig(_))));
    }

    #[test]
    fn test_model_failure_is_not_recovered() {
        // The linear model refuses orientation targets
        let result = IkSolver::default().solve_with_rng(
            &LinearModel::new(),
            &Vector3::new(0.01, 0.0, 0.0),
            &joints(&[0.0, 0.0, 0.0]),
            Some(&UnitQuaternion::identity()),
            &mut rng(),
        );
        assert!(matches!(result, Err(SolverError::CollaboratorFailure(KinematicsError::Model(_)))));
    }

    #[test]
    fn test_misshapen_jacobian() {
        let model = MisshapenModel { inner: LinearModel::new() };
        let result = IkSolver::default().solve_with_rng(
            &model, &Vector3::new(0.01, 0.0, 0.0), &joints(&[0.0, 0.0, 0.0]), None, &mut rng(),
        );
        assert_eq!(
            result,
            Err(SolverError::CollaboratorFailure(KinematicsError::DimensionMismatch { expected: 3, found: 2 }))
        );
    }

    #[test]
    fn test_cancelled() {
        let cancel = AtomicBool::new(true);
        let result = IkSolver::default().solve_cancellable(
            &LinearModel::new(), &Vector3::new(0.01, 0.0, 0.0), &joints(&[0.0, 0.0, 0.0]), None, &mut rng(), &cancel,
        );
        assert_eq!(result, Err(SolverError::Cancelled { iteration: 0 }));

        let cancel = AtomicBool::new(false);
        let result = IkSolver::default().solve_cancellable(
            &LinearModel::new(), &Vector3::new(0.01, 0.0, 0.0), &joints(&[0.0, 0.0, 0.0]), None, &mut rng(), &cancel,
        );
        assert!(result.expect("not cancelled").converged);
    }
}
