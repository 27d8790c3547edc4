//! Joint limits

use crate::kinematic_traits::JointConfiguration;
use rand::Rng;
use std::ops::RangeInclusive;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LimitsError {
    #[error("joint {joint}: lower limit {lower} exceeds upper limit {upper}")]
    Inverted { joint: usize, lower: f64, upper: f64 },

    #[error("joint {joint}: limits must be finite")]
    NonFinite { joint: usize },

    #[error("{lower} lower limits but {upper} upper limits")]
    LengthMismatch { lower: usize, upper: usize },
}

/// Lower and upper limit of every joint, stored in degrees as operators and
/// robot datasheets give them. Joint values everywhere else are radians; the
/// conversion happens only at the clipping boundary (`clip`, `compliant`).
/// Limits of prismatic joints go through the same conversion, so meters
/// stored with `from_radians` come back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct JointLimits {
    /// Lower limits, degrees
    pub from: Vec<f64>,

    /// Upper limits, degrees
    pub to: Vec<f64>,
}

impl JointLimits {
    /// Creates limits from degree ranges, one per joint.
    ///
    /// ```
    /// use rs_numeric_ik::constraints::JointLimits;
    /// let limits = JointLimits::from_degrees(vec![-180.0..=180.0, -90.0..=90.0]).unwrap();
    /// assert_eq!(limits.len(), 2);
    /// ```
    pub fn from_degrees(ranges: Vec<RangeInclusive<f64>>) -> Result<Self, LimitsError> {
        let (from, to): (Vec<f64>, Vec<f64>) =
            ranges.into_iter().map(|r| (*r.start(), *r.end())).unzip();
        Self::new(from, to)
    }

    /// Creates limits from radian ranges (as found in URDF files).
    pub fn from_radians(ranges: Vec<RangeInclusive<f64>>) -> Result<Self, LimitsError> {
        Self::from_degrees(
            ranges
                .into_iter()
                .map(|r| r.start().to_degrees()..=r.end().to_degrees())
                .collect(),
        )
    }

    /// Limits in degrees, `from[i] <= to[i]` is required.
    pub fn new(from: Vec<f64>, to: Vec<f64>) -> Result<Self, LimitsError> {
        if from.len() != to.len() {
            return Err(LimitsError::LengthMismatch { lower: from.len(), upper: to.len() });
        }
        for (joint, (&lower, &upper)) in from.iter().zip(to.iter()).enumerate() {
            if !lower.is_finite() || !upper.is_finite() {
                return Err(LimitsError::NonFinite { joint });
            }
            if lower > upper {
                return Err(LimitsError::Inverted { joint, lower, upper });
            }
        }
        Ok(JointLimits { from, to })
    }

    /// Same limits for all joints, degrees.
    pub fn uniform(dof: usize, range: RangeInclusive<f64>) -> Result<Self, LimitsError> {
        Self::from_degrees(vec![range; dof])
    }

    pub fn len(&self) -> usize {
        self.from.len()
    }

    pub fn is_empty(&self) -> bool {
        self.from.is_empty()
    }

    pub fn lower_radians(&self, joint: usize) -> f64 {
        self.from[joint].to_radians()
    }

    pub fn upper_radians(&self, joint: usize) -> f64 {
        self.to[joint].to_radians()
    }

    /// Clamps every joint independently into its interval. This is a plain per-axis
    /// clamp, not a projection along the step direction.
    pub fn clip(&self, joints: &JointConfiguration) -> JointConfiguration {
        JointConfiguration::from_fn(joints.len(), |i, _| {
            if i < self.len() {
                joints[i].clamp(self.lower_radians(i), self.upper_radians(i))
            } else {
                joints[i]
            }
        })
    }

    /// True if all joints are within their limits.
    pub fn compliant(&self, joints: &JointConfiguration) -> bool {
        joints.len() == self.len()
            && joints.iter().enumerate().all(|(i, &q)| {
                q >= self.lower_radians(i) && q <= self.upper_radians(i)
            })
    }

    /// Midpoints of all ranges, radians.
    pub fn centers(&self) -> JointConfiguration {
        JointConfiguration::from_fn(self.len(), |i, _| {
            (self.lower_radians(i) + self.upper_radians(i)) / 2.0
        })
    }

    /// Random joint configuration within limits, radians.
    pub fn random_angles<R: Rng>(&self, rng: &mut R) -> JointConfiguration {
        JointConfiguration::from_fn(self.len(), |i, _| {
            let (lower, upper) = (self.lower_radians(i), self.upper_radians(i));
            if lower == upper { lower } else { rng.gen_range(lower..=upper) }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::f64::consts::PI;

    #[test]
    fn test_clip_converts_degrees() {
        let limits = JointLimits::from_degrees(vec![-90.0..=90.0, 0.0..=45.0]).unwrap();
        let clipped = limits.clip(&JointConfiguration::from_vec(vec![2.0, -0.1]));
        assert!((clipped[0] - PI / 2.0).abs() < 1e-12);
        assert_eq!(clipped[1], 0.0);
    }

    #[test]
    fn test_clip_is_per_joint() {
        let limits = JointLimits::uniform(3, -10.0..=10.0).unwrap();
        let inside = 5_f64.to_radians();
        let clipped = limits.clip(&JointConfiguration::from_vec(vec![inside, 1.0, -1.0]));
        assert_eq!(clipped[0], inside, "Joint within limits must not change");
        assert!((clipped[1] - 10_f64.to_radians()).abs() < 1e-12);
        assert!((clipped[2] + 10_f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn test_compliant() {
        let limits = JointLimits::uniform(2, -180.0..=180.0).unwrap();
        assert!(limits.compliant(&JointConfiguration::from_vec(vec![0.0, 3.14])));
        assert!(!limits.compliant(&JointConfiguration::from_vec(vec![0.0, 3.2])));
        assert!(!limits.compliant(&JointConfiguration::from_vec(vec![0.0])));
    }

    #[test]
    fn test_from_radians_round_trip() {
        let limits = JointLimits::from_radians(vec![-PI..=PI]).unwrap();
        assert!((limits.from[0] + 180.0).abs() < 1e-9);
        assert!((limits.upper_radians(0) - PI).abs() < 1e-12);
    }

    #[test]
    fn test_inverted_rejected() {
        let result = JointLimits::from_degrees(vec![0.0..=10.0, 20.0..=10.0]);
        assert_eq!(result, Err(LimitsError::Inverted { joint: 1, lower: 20.0, upper: 10.0 }));
        assert!(JointLimits::from_degrees(vec![f64::NAN..=1.0]).is_err());
    }

    #[test]
    fn test_random_angles_compliant() {
        let limits = JointLimits::from_degrees(vec![-30.0..=30.0, 10.0..=10.0, 0.0..=170.0]).unwrap();
        let mut rng = StdRng::from_seed([0u8; 32]);
        for _ in 0..256 {
            let angles = limits.random_angles(&mut rng);
            assert!(limits.compliant(&angles), "Generated {:?} out of limits", angles);
        }
    }
}
