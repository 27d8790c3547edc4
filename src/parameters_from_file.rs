//! Supports reading solver configuration and waypoint lists from YAML (optional)

use crate::parameter_error::ParameterError;
use crate::solver::SolverConfig;
use crate::workflow::Waypoint;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use std::path::Path;
use yaml_rust2::{Yaml, YamlLoader};

const SOLVER_SECTION: &str = "ik_solver";

impl SolverConfig {
    /// Read the solver configuration from YAML file. YAML file like this is supported:
    /// ```yaml
    /// ik_solver:
    ///   max_iterations: 100
    ///   epsilon: 1.0e-6
    ///   learning_rate: 0.1
    ///   max_step: 0.1
    ///   perturbation_std: 0.01
    /// ```
    /// All keys are optional, missing ones keep their default values.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ParameterError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// As `from_yaml_file`, from string content.
    ///
    /// ```
    /// use rs_numeric_ik::solver::SolverConfig;
    /// let config = SolverConfig::from_yaml_str("ik_solver:\n  max_iterations: 250\n").unwrap();
    /// assert_eq!(config.max_iterations, 250);
    /// assert_eq!(config.max_step, 0.1);
    /// ```
    pub fn from_yaml_str(contents: &str) -> Result<Self, ParameterError> {
        let docs = load(contents)?;
        let mut config = SolverConfig::default();
        let Some(doc) = docs.first() else {
            return Ok(config);
        };
        let section = &doc[SOLVER_SECTION];
        if section.is_badvalue() || section.is_null() {
            return Ok(config);
        }
        if section.as_hash().is_none() {
            return Err(ParameterError::ParseError(format!("'{}' must be a mapping", SOLVER_SECTION)));
        }

        if let Some(value) = optional(section, "max_iterations") {
            let iterations = value.as_i64().ok_or_else(|| {
                ParameterError::ParseError("max_iterations must be an integer".into())
            })?;
            config.max_iterations = usize::try_from(iterations).map_err(|_| {
                ParameterError::ParseError(format!("max_iterations must be positive (got {})", iterations))
            })?;
        }
        if let Some(value) = optional(section, "epsilon") {
            config.epsilon = number(value, "epsilon")?;
        }
        if let Some(value) = optional(section, "learning_rate") {
            config.learning_rate = number(value, "learning_rate")?;
        }
        if let Some(value) = optional(section, "max_step") {
            config.max_step = number(value, "max_step")?;
        }
        if let Some(value) = optional(section, "perturbation_std") {
            config.perturbation_std = number(value, "perturbation_std")?;
        }

        config.validate().map_err(|e| ParameterError::ParseError(e.to_string()))?;
        Ok(config)
    }

    /// Convert to string yaml representation (quick viewing, etc).
    pub fn to_yaml(&self) -> String {
        format!(
            "{}:\n  \
              max_iterations: {}\n  \
              epsilon: {:e}\n  \
              learning_rate: {}\n  \
              max_step: {}\n  \
              perturbation_std: {}\n",
            SOLVER_SECTION,
            self.max_iterations,
            self.epsilon,
            self.learning_rate,
            self.max_step,
            self.perturbation_std,
        )
    }
}

/// Reads a list of waypoints:
/// ```yaml
/// waypoints:
///   - position: [0.3, 0.1, 0.2]
///   - position: [0.3, 0.2, 0.2]
///     orientation: [0.0, 0.0, 0.0, 1.0] # x, y, z, w
/// ```
pub fn waypoints_from_yaml_str(contents: &str) -> Result<Vec<Waypoint>, ParameterError> {
    let docs = load(contents)?;
    let list = docs.first()
        .map(|doc| &doc["waypoints"])
        .and_then(|w| w.as_vec())
        .ok_or_else(|| ParameterError::MissingField("waypoints".into()))?;

    list.iter()
        .enumerate()
        .map(|(i, entry)| {
            let position = numbers(&entry["position"], &format!("waypoints[{}].position", i), 3)?;
            let position = Vector3::new(position[0], position[1], position[2]);
            let orientation = match optional(entry, "orientation") {
                Some(value) => {
                    let q = numbers(value, &format!("waypoints[{}].orientation", i), 4)?;
                    let quaternion = Quaternion::new(q[3], q[0], q[1], q[2]);
                    if quaternion.norm() == 0.0 {
                        return Err(ParameterError::ParseError(format!(
                            "waypoints[{}].orientation is a zero quaternion", i
                        )));
                    }
                    Some(UnitQuaternion::from_quaternion(quaternion))
                }
                None => None,
            };
            Ok(Waypoint { position, orientation })
        })
        .collect()
}

pub fn waypoints_from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Vec<Waypoint>, ParameterError> {
    let contents = std::fs::read_to_string(path)?;
    waypoints_from_yaml_str(&contents)
}

fn load(contents: &str) -> Result<Vec<Yaml>, ParameterError> {
    YamlLoader::load_from_str(contents).map_err(|e| ParameterError::ParseError(e.to_string()))
}

fn optional<'a>(yaml: &'a Yaml, key: &str) -> Option<&'a Yaml> {
    let value = &yaml[key];
    if value.is_badvalue() || value.is_null() { None } else { Some(value) }
}

/// Accepts both integers and reals.
fn number(value: &Yaml, label: &str) -> Result<f64, ParameterError> {
    match value {
        Yaml::Integer(i) => Ok(*i as f64),
        Yaml::Real(_) => value.as_f64()
            .ok_or_else(|| ParameterError::ParseError(format!("{} is not a number", label))),
        _ => Err(ParameterError::ParseError(format!("{} must be a number", label))),
    }
}

fn numbers(value: &Yaml, label: &str, expected: usize) -> Result<Vec<f64>, ParameterError> {
    let list = value.as_vec()
        .ok_or_else(|| ParameterError::MissingField(label.to_string()))?;
    if list.len() != expected {
        return Err(ParameterError::InvalidLength { expected, found: list.len() });
    }
    list.iter().map(|v| number(v, label)).collect()
}
