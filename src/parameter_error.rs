//! Error handling for robot model and configuration readers

use crate::constraints::LimitsError;
use crate::kinematic_traits::KinematicsError;
use std::io;
use thiserror::Error;

/// Unified error to report failures during both YAML and URDF/XACRO parsing.
#[derive(Error, Debug)]
pub enum ParameterError {
    #[error("IO Error: {0}")]
    IoError(#[from] io::Error),

    #[error("Parse Error: {0}")]
    ParseError(String),

    #[error("Missing Field: {0}")]
    MissingField(String),

    #[error("Wrong angle representation: {0}")]
    WrongAngle(String),

    #[error("Invalid Length: expected {expected}, found {found}")]
    InvalidLength { expected: usize, found: usize },

    #[error("XML Processing Error: {0}")]
    XmlProcessingError(String),

    #[error("No joint chain from '{base}' to '{tip}'")]
    ChainNotFound { base: String, tip: String },

    #[error("Invalid joint limits: {0}")]
    Limits(#[from] LimitsError),

    #[error("Kinematics Configuration Error: {0}")]
    KinematicsConfigurationError(#[from] KinematicsError),
}
