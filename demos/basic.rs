use nalgebra::{Isometry3, UnitQuaternion, Vector3};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rs_numeric_ik::chain::{ChainJoint, SerialChain};
use rs_numeric_ik::constraints::JointLimits;
use rs_numeric_ik::kinematic_traits::{JointConfiguration, KinematicModel};
use rs_numeric_ik::solver::{IkSolver, SolverConfig};
use rs_numeric_ik::utils::{as_radians, dump_joints, dump_pose};

/// Usage example.
fn main() {
    // Planar arm with three links, position only.
    let planar = SerialChain::planar(&[0.4, 0.3, 0.2]).expect("valid limits");
    let solver = IkSolver::default();
    let start = as_radians(&[10.0, 20.0, 30.0]);
    let target = Vector3::new(0.5, 0.4, 0.0);

    println!("Planar arm, target {:?}", target.as_slice());
    match solver.solve(&planar, &target, &start, None) {
        Ok(outcome) => {
            dump_joints(&outcome.joints);
            dump_pose(&outcome.final_pose);
            println!("residual {:.2e}, converged {}", outcome.residual_error, outcome.converged);
        }
        Err(e) => println!("Failed: {}", e),
    }

    // Spatial arm with yaw, pitch, pitch, roll. Position and orientation.
    let joints = vec![
        ChainJoint::revolute("j1", Isometry3::translation(0.0, 0.0, 0.3), Vector3::z()),
        ChainJoint::revolute("j2", Isometry3::identity(), Vector3::y()),
        ChainJoint::revolute("j3", Isometry3::translation(0.0, 0.0, 0.4), Vector3::y()),
        ChainJoint::revolute("j4", Isometry3::translation(0.0, 0.0, 0.35), Vector3::z()),
    ];
    let limits = JointLimits::from_degrees(vec![
        -170.0..=170.0,
        -90.0..=120.0,
        -150.0..=150.0,
        -180.0..=180.0,
    ]).expect("valid limits");
    let arm = SerialChain::new(joints, Isometry3::translation(0.0, 0.0, 0.1), limits)
        .expect("limits match joints");

    // Target generated from known joints so that it is reachable.
    let known = as_radians(&[30.0, 20.0, 40.0, 10.0]);
    let pose = arm.forward_kinematics(&known).expect("forward kinematics");
    let orientation: UnitQuaternion<f64> = pose.orientation.unwrap_or_else(UnitQuaternion::identity);

    let solver = IkSolver::new(SolverConfig { max_iterations: 500, learning_rate: 0.3, ..SolverConfig::default() });
    let mut rng = StdRng::seed_from_u64(7);
    let start: JointConfiguration = arm.joint_limits().centers();
    println!("Spatial arm, pose target");
    match solver.solve_with_rng(&arm, &pose.position, &start, Some(&orientation), &mut rng) {
        Ok(outcome) => {
            dump_joints(&outcome.joints);
            dump_pose(&outcome.final_pose);
            println!(
                "residual {:.2e}, converged {}, iterations {}",
                outcome.residual_error, outcome.converged, outcome.iterations
            );
        }
        Err(e) => println!("Failed: {}", e),
    }
}
