//! Supports extracting the serial chain from URDF (optional)

extern crate sxd_document;

use crate::chain::{ChainJoint, SerialChain};
use crate::constraints::JointLimits;
use crate::parameter_error::ParameterError;
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use regex::Regex;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::fs::read_to_string;
use std::path::Path;
use sxd_document::{QName, dom, parser};
use tracing::warn;

/// Reads the chain between `base_link` and `tip_link` from an URDF file. XACRO files may
/// also work as long as joint origins and limits are literal numbers or `${radians(x)}`.
///
/// # Example
/// ```no_run
/// use rs_numeric_ik::urdf::from_urdf_file;
/// let chain = from_urdf_file("robot.urdf", "base_link", "tool0").expect("Cannot read URDF");
/// println!("{:?}", chain.joint_names());
/// ```
pub fn from_urdf_file<P: AsRef<Path>>(path: P, base_link: &str, tip_link: &str) -> Result<SerialChain, ParameterError> {
    let xml_content = read_to_string(path)?;
    from_urdf(&xml_content, base_link, tip_link)
}

/// Parses URDF XML content and builds the serial chain from `base_link` to `tip_link`.
/// Revolute, continuous and prismatic joints become chain joints, fixed joints are folded
/// into the transform of the next actuated joint (or the tip offset). Continuous joints,
/// and joints without `<limit>`, get the range -180 .. 180 degrees.
///
/// # Example
/// ```
/// use rs_numeric_ik::urdf::from_urdf;
/// use rs_numeric_ik::kinematic_traits::KinematicModel;
/// let xml = r#"
///     <robot name="arm">
///         <joint name="shoulder" type="revolute">
///             <parent link="base"/><child link="upper"/>
///             <origin xyz="0 0 0.1" rpy="0 0 0"/>
///             <axis xyz="0 0 1"/>
///             <limit lower="${radians(-90)}" upper="${radians(90)}" effort="1" velocity="1"/>
///         </joint>
///         <joint name="flange" type="fixed">
///             <parent link="upper"/><child link="tool0"/>
///             <origin xyz="0.3 0 0"/>
///         </joint>
///     </robot>
/// "#;
/// let chain = from_urdf(xml, "base", "tool0").unwrap();
/// assert_eq!(chain.dof(), 1);
/// assert!((chain.joint_limits().to[0] - 90.0).abs() < 1e-9);
/// ```
pub fn from_urdf(xml_content: &str, base_link: &str, tip_link: &str) -> Result<SerialChain, ParameterError> {
    let joints = process_joints(xml_content)?;
    build_chain(&joints, base_link, tip_link)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum UrdfJointType {
    Revolute,
    Continuous,
    Prismatic,
    Fixed,
}

#[derive(Debug, Clone, PartialEq)]
struct JointData {
    name: String,
    joint_type: UrdfJointType,
    parent: String,
    child: String,
    xyz: Vector3<f64>,
    rpy: Vector3<f64>,
    axis: Vector3<f64>,
    limits: Option<(f64, f64)>,
}

impl JointData {
    fn origin(&self) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::from(self.xyz),
            UnitQuaternion::from_euler_angles(self.rpy.x, self.rpy.y, self.rpy.z),
        )
    }
}

fn process_joints(xml: &str) -> Result<Vec<JointData>, ParameterError> {
    let package = parser::parse(xml)
        .map_err(|e| ParameterError::XmlProcessingError(format!("{:?}", e)))?;
    let document = package.as_document();

    let root_element = document.root().children().into_iter()
        .find_map(|e| e.element())
        .ok_or_else(|| ParameterError::XmlProcessingError("No root element found".into()))?;

    let mut joints = Vec::new();
    collect_joints(root_element, &mut joints)?;
    Ok(joints)
}

// Recursive, joints may be nested inside xacro macros
fn collect_joints(element: dom::Element, joints: &mut Vec<JointData>) -> Result<(), ParameterError> {
    let joint_tag = QName::new("joint");

    for child in element.children().into_iter().filter_map(|e| e.element()) {
        if child.name() == joint_tag {
            joints.push(read_joint(child)?);
        }
        collect_joints(child, joints)?;
    }
    Ok(())
}

fn child_element<'d>(element: dom::Element<'d>, tag: &str) -> Option<dom::Element<'d>> {
    let tag = QName::new(tag);
    element.children().into_iter()
        .find_map(|e| e.element().filter(|el| el.name() == tag))
}

fn read_joint(element: dom::Element) -> Result<JointData, ParameterError> {
    let name = element.attribute("name")
        .map(|attr| attr.value().to_string())
        .unwrap_or_else(|| "Unnamed".to_string());

    let joint_type = match element.attribute("type").map(|a| a.value()) {
        Some("revolute") => UrdfJointType::Revolute,
        Some("continuous") => UrdfJointType::Continuous,
        Some("prismatic") => UrdfJointType::Prismatic,
        Some("fixed") => UrdfJointType::Fixed,
        Some(other) => {
            return Err(ParameterError::ParseError(format!(
                "Joint {}: unsupported joint type '{}'", name, other
            )));
        }
        None => return Err(ParameterError::MissingField(format!("type of joint {}", name))),
    };

    let link = |tag: &str| -> Result<String, ParameterError> {
        child_element(element, tag)
            .and_then(|e| e.attribute("link"))
            .map(|a| a.value().to_string())
            .ok_or_else(|| ParameterError::MissingField(format!("{} link of joint {}", tag, name)))
    };
    let parent = link("parent")?;
    let child = link("child")?;

    let origin = child_element(element, "origin");
    let xyz = match origin.and_then(|o| o.attribute("xyz")) {
        Some(attr) => parse_triple(attr.value())?,
        None => Vector3::zeros(),
    };
    let rpy = match origin.and_then(|o| o.attribute("rpy")) {
        Some(attr) => parse_triple(attr.value())?,
        None => Vector3::zeros(),
    };
    // URDF default axis is X
    let axis = match child_element(element, "axis").and_then(|a| a.attribute("xyz")) {
        Some(attr) => parse_triple(attr.value())?,
        None => Vector3::x(),
    };
    if !matches!(joint_type, UrdfJointType::Fixed) && (axis.norm() == 0.0 || !axis.iter().all(|v| v.is_finite())) {
        return Err(ParameterError::ParseError(format!("Joint {}: zero axis", name)));
    }

    let limits = match child_element(element, "limit").map(get_limits).transpose() {
        Ok(limits) => limits,
        Err(e) => {
            warn!("Joint limits defined but not readable for {}: {}", name, e);
            None
        }
    };

    Ok(JointData { name, joint_type, parent, child, xyz, rpy, axis, limits })
}

fn parse_triple(value: &str) -> Result<Vector3<f64>, ParameterError> {
    let coords: Vec<f64> = value.split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .map_err(|e| ParameterError::ParseError(format!("'{}': {}", value, e)))?;

    if coords.len() != 3 {
        return Err(ParameterError::InvalidLength { expected: 3, found: coords.len() });
    }
    Ok(Vector3::new(coords[0], coords[1], coords[2]))
}

fn parse_angle(attr_value: &str) -> Result<f64, ParameterError> {
    // Regular expression to match the ${radians(<number>)} format that is common in xacro
    let re = Regex::new(r"^\$\{radians\((-?\d+(\.\d+)?)\)\}$")
        .map_err(|_| ParameterError::ParseError("Invalid regex pattern".to_string()))?;

    if let Some(caps) = re.captures(attr_value.trim()) {
        let degrees_str = caps.get(1)
            .ok_or(ParameterError::WrongAngle(format!("Bad representation: {}", attr_value)))?
            .as_str();
        let degrees: f64 = degrees_str.parse()
            .map_err(|_| ParameterError::WrongAngle(attr_value.to_string()))?;
        Ok(degrees.to_radians())
    } else {
        // Plain number, radians
        attr_value.trim().parse()
            .map_err(|_| ParameterError::WrongAngle(attr_value.to_string()))
    }
}

fn get_limits(element: dom::Element) -> Result<(f64, f64), ParameterError> {
    let lower_attr = element.attribute("lower")
        .ok_or_else(|| ParameterError::MissingField("lower limit not found".into()))?
        .value();
    let upper_attr = element.attribute("upper")
        .ok_or_else(|| ParameterError::MissingField("upper limit not found".into()))?
        .value();
    Ok((parse_angle(lower_attr)?, parse_angle(upper_attr)?))
}

/// Walks from the tip link up to the base link and builds the chain base first.
fn build_chain(joints: &[JointData], base_link: &str, tip_link: &str) -> Result<SerialChain, ParameterError> {
    let mut by_child: HashMap<&str, &JointData> = HashMap::new();
    for joint in joints {
        if let Some(existing) = by_child.insert(joint.child.as_str(), joint) {
            if existing != joint {
                return Err(ParameterError::XmlProcessingError(format!(
                    "Link {} is the child of both {} and {}", joint.child, existing.name, joint.name
                )));
            }
        }
    }

    let not_found = || ParameterError::ChainNotFound {
        base: base_link.to_string(),
        tip: tip_link.to_string(),
    };

    let mut path = Vec::new();
    let mut link = tip_link;
    while link != base_link {
        let joint = by_child.get(link).ok_or_else(not_found)?;
        if path.len() > joints.len() {
            return Err(not_found()); // Cycle
        }
        path.push(*joint);
        link = joint.parent.as_str();
    }
    path.reverse();

    let mut chain_joints = Vec::new();
    let mut ranges = Vec::new();
    let mut accumulated_fixed = Isometry3::identity();
    for joint in path {
        let origin = accumulated_fixed * joint.origin();
        let (kind_joint, range) = match joint.joint_type {
            UrdfJointType::Fixed => {
                accumulated_fixed = origin;
                continue;
            }
            UrdfJointType::Revolute => (
                ChainJoint::revolute(&joint.name, origin, joint.axis),
                joint.limits.unwrap_or((-PI, PI)),
            ),
            UrdfJointType::Continuous => (
                ChainJoint::revolute(&joint.name, origin, joint.axis),
                (-PI, PI),
            ),
            UrdfJointType::Prismatic => (
                ChainJoint::prismatic(&joint.name, origin, joint.axis),
                joint.limits.unwrap_or((-1.0, 1.0)),
            ),
        };
        accumulated_fixed = Isometry3::identity();
        chain_joints.push(kind_joint);
        ranges.push(range.0..=range.1);
    }

    if chain_joints.is_empty() {
        return Err(ParameterError::MissingField(format!(
            "actuated joints between '{}' and '{}'", base_link, tip_link
        )));
    }
    let limits = JointLimits::from_radians(ranges)?;
    Ok(SerialChain::new(chain_joints, accumulated_fixed, limits)?)
}
