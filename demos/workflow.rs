use rand::SeedableRng;
use rand::rngs::StdRng;
use rs_numeric_ik::kinematic_traits::KinematicModel;
use rs_numeric_ik::parameters_from_file::waypoints_from_yaml_file;
use rs_numeric_ik::solver::{IkSolver, SolverConfig};
use rs_numeric_ik::urdf::from_urdf_file;
use rs_numeric_ik::utils::dump_joints;
use rs_numeric_ik::workflow::WorkflowPlanner;

/// Reads the robot from URDF and the solver tuning and waypoints from YAML,
/// then converts the waypoints into joint configurations.
fn main() -> anyhow::Result<()> {
    let chain = from_urdf_file("src/tests/data/arm6.urdf", "base_link", "tool0")?;
    println!("Joints: {:?}", chain.joint_names());

    let config = SolverConfig::from_yaml_file("src/tests/data/solver.yaml")?;
    println!("Solver configuration:\n{}", config.to_yaml());

    let waypoints = waypoints_from_yaml_file("src/tests/data/waypoints.yaml")?;
    let planner = WorkflowPlanner::new(IkSolver::new(config), false);
    let start = chain.joint_limits().centers();

    let mut rng = StdRng::seed_from_u64(42);
    let trajectory = planner.decompose_with_rng(&chain, &start, &waypoints, &mut rng)?;
    for point in &trajectory.points {
        print!("{} (residual {:.2e}): ", point.waypoint_index, point.residual_error);
        dump_joints(&point.joints);
    }
    println!(
        "All reached: {}, largest joint jump {:.2} deg",
        trajectory.all_converged(),
        trajectory.max_joint_jump().to_degrees()
    );
    Ok(())
}
