use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rs_numeric_ik::chain::SerialChain;
use rs_numeric_ik::kinematic_traits::{JointConfiguration, KinematicModel};
use rs_numeric_ik::parameters_from_file::waypoints_from_yaml_file;
use rs_numeric_ik::solver::{IkSolver, SolverConfig};
use rs_numeric_ik::urdf::from_urdf_file;
use rs_numeric_ik::utils::{as_radians, format_joints, format_pose};
use rs_numeric_ik::workflow::WorkflowPlanner;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Numeric inverse kinematics for serial robots described in URDF
#[derive(Parser)]
#[command(name = "rs-numeric-ik")]
#[command(about = "Iterative inverse kinematics for URDF robots", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RobotArgs {
    /// URDF file of the robot
    #[arg(long)]
    urdf: PathBuf,

    /// Base link of the chain
    #[arg(long, default_value = "base_link")]
    base: String,

    /// Tip (tool) link of the chain
    #[arg(long, default_value = "tool0")]
    tip: String,

    /// Solver configuration YAML (ik_solver section)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Starting joint values in degrees, comma separated. Centers of the limits if omitted.
    #[arg(long, allow_hyphen_values = true)]
    initial: Option<String>,

    /// Seed for the random perturbation, for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a single target
    Solve {
        #[command(flatten)]
        robot: RobotArgs,

        /// Target position x,y,z
        #[arg(long, allow_hyphen_values = true)]
        target: String,

        /// Target orientation quaternion x,y,z,w
        #[arg(long, allow_hyphen_values = true)]
        orientation: Option<String>,
    },

    /// Decompose a YAML list of waypoints into joint configurations
    Plan {
        #[command(flatten)]
        robot: RobotArgs,

        /// YAML file with the waypoints
        #[arg(long)]
        waypoints: PathBuf,

        /// Fail if any waypoint is not reached within tolerance
        #[arg(long)]
        strict: bool,
    },

    /// Print the default solver configuration as YAML
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Solve { robot, target, orientation } => solve(&robot, &target, orientation.as_deref()),
        Commands::Plan { robot, waypoints, strict } => plan(&robot, &waypoints, strict),
        Commands::Config => {
            print!("{}", SolverConfig::default().to_yaml());
            Ok(())
        }
    }
}

fn solve(robot: &RobotArgs, target: &str, orientation: Option<&str>) -> Result<()> {
    let (chain, start, solver) = load(robot)?;
    let target = match parse_list(target)?.as_slice() {
        [x, y, z] => Vector3::new(*x, *y, *z),
        other => bail!("--target needs 3 values, got {}", other.len()),
    };
    let orientation = orientation.map(|q| quaternion(&parse_list(q)?)).transpose()?;

    let outcome = solver.solve_with_rng(&chain, &target, &start, orientation.as_ref(), &mut rng(robot.seed))?;
    println!("joints (deg): {}", format_joints(&outcome.joints));
    println!("pose:         {}", format_pose(&outcome.final_pose));
    println!(
        "residual: {:.3e}, converged: {}, iterations: {}, singular recoveries: {}",
        outcome.residual_error, outcome.converged, outcome.iterations, outcome.singular_recoveries
    );
    Ok(())
}

fn plan(robot: &RobotArgs, waypoints: &Path, strict: bool) -> Result<()> {
    let (chain, start, solver) = load(robot)?;
    let waypoints = waypoints_from_yaml_file(waypoints)
        .with_context(|| format!("reading waypoints from {}", waypoints.display()))?;

    let planner = WorkflowPlanner::new(solver, strict);
    let trajectory = planner.decompose_with_rng(&chain, &start, &waypoints, &mut rng(robot.seed))?;
    for point in &trajectory.points {
        println!(
            "{:3}: {} residual {:.3e}{}",
            point.waypoint_index,
            format_joints(&point.joints),
            point.residual_error,
            if point.converged { "" } else { " (not reached)" }
        );
    }
    println!("max joint jump: {:.2} deg", trajectory.max_joint_jump().to_degrees());
    Ok(())
}

fn load(robot: &RobotArgs) -> Result<(SerialChain, JointConfiguration, IkSolver)> {
    let chain = from_urdf_file(&robot.urdf, &robot.base, &robot.tip)
        .with_context(|| format!("reading robot from {}", robot.urdf.display()))?;
    tracing::info!(joints = ?chain.joint_names(), "chain loaded");

    let config = match &robot.config {
        Some(path) => SolverConfig::from_yaml_file(path)
            .with_context(|| format!("reading solver configuration from {}", path.display()))?,
        None => SolverConfig::default(),
    };

    let start = match &robot.initial {
        Some(degrees) => {
            let degrees = parse_list(degrees)?;
            if degrees.len() != chain.dof() {
                bail!("--initial needs {} values, got {}", chain.dof(), degrees.len());
            }
            as_radians(&degrees)
        }
        None => chain.joint_limits().centers(),
    };
    Ok((chain, start, IkSolver::new(config)))
}

fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn quaternion(values: &[f64]) -> Result<UnitQuaternion<f64>> {
    let [x, y, z, w] = values else {
        bail!("--orientation needs 4 values (x,y,z,w), got {}", values.len());
    };
    let q = Quaternion::new(*w, *x, *y, *z);
    if q.norm() == 0.0 {
        bail!("--orientation must not be a zero quaternion");
    }
    Ok(UnitQuaternion::from_quaternion(q))
}

/// Comma separated numbers, like `0.3,-0.1,0.5`.
fn parse_list(value: &str) -> Result<Vec<f64>> {
    value
        .split(',')
        .map(|v| v.trim().parse::<f64>().with_context(|| format!("'{}' is not a number", v.trim())))
        .collect()
}
