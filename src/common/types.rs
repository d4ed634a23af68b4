//! Common types used throughout goal_region_sampler

use nalgebra::{UnitQuaternion, Vector3};

/// 6-DOF pose (position + orientation)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose3D {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl Pose3D {
    pub fn new(position: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self { position, orientation }
    }

    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
        }
    }

    pub fn from_position_rpy(x: f64, y: f64, z: f64, roll: f64, pitch: f64, yaw: f64) -> Self {
        Self {
            position: Vector3::new(x, y, z),
            orientation: UnitQuaternion::from_euler_angles(roll, pitch, yaw),
        }
    }

    /// Decompose the orientation into (roll, pitch, yaw)
    pub fn rpy(&self) -> (f64, f64, f64) {
        self.orientation.euler_angles()
    }
}

/// Robot joint configuration (one value per joint)
#[derive(Debug, Clone, PartialEq)]
pub struct JointConfig {
    pub values: Vec<f64>,
}

impl JointConfig {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Euclidean distance in joint space
    pub fn distance(&self, other: &JointConfig) -> f64 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// Componentwise equality within `tol` (configuration-space equality primitive)
    pub fn approx_eq(&self, other: &JointConfig, tol: f64) -> bool {
        self.dim() == other.dim()
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|(a, b)| (a - b).abs() <= tol)
    }
}

impl From<Vec<f64>> for JointConfig {
    fn from(values: Vec<f64>) -> Self {
        Self { values }
    }
}

/// Solution path represented as a sequence of joint configurations
#[derive(Debug, Clone, PartialEq)]
pub struct JointPath {
    pub states: Vec<JointConfig>,
}

impl JointPath {
    pub fn new() -> Self {
        Self { states: Vec::new() }
    }

    pub fn from_states(states: Vec<JointConfig>) -> Self {
        Self { states }
    }

    pub fn push(&mut self, state: JointConfig) {
        self.states.push(state);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Last state of the path, if any
    pub fn terminal(&self) -> Option<&JointConfig> {
        self.states.last()
    }

    pub fn total_length(&self) -> f64 {
        if self.states.len() < 2 {
            return 0.0;
        }
        self.states.windows(2).map(|w| w[0].distance(&w[1])).sum()
    }
}

impl Default for JointPath {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_config_distance() {
        let a = JointConfig::new(vec![0.0, 0.0]);
        let b = JointConfig::new(vec![3.0, 4.0]);
        assert!((a.distance(&b) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_joint_config_approx_eq() {
        let a = JointConfig::new(vec![1.0, 2.0]);
        let b = JointConfig::new(vec![1.0 + 1e-12, 2.0 - 1e-12]);
        assert!(a.approx_eq(&b, 1e-9));
        assert!(!a.approx_eq(&JointConfig::new(vec![1.0]), 1e-9));
        assert!(!a.approx_eq(&JointConfig::new(vec![1.0, 2.1]), 1e-9));
    }

    #[test]
    fn test_pose_rpy_round_trip() {
        let pose = Pose3D::from_position_rpy(0.1, 0.2, 0.3, 0.4, -0.5, 0.6);
        let (roll, pitch, yaw) = pose.rpy();
        assert!((roll - 0.4).abs() < 1e-10);
        assert!((pitch + 0.5).abs() < 1e-10);
        assert!((yaw - 0.6).abs() < 1e-10);
    }

    #[test]
    fn test_joint_path_total_length() {
        let path = JointPath::from_states(vec![
            JointConfig::new(vec![0.0, 0.0]),
            JointConfig::new(vec![1.0, 0.0]),
            JointConfig::new(vec![1.0, 1.0]),
        ]);
        assert!((path.total_length() - 2.0).abs() < 1e-10);
        assert_eq!(path.terminal(), Some(&JointConfig::new(vec![1.0, 1.0])));
    }
}
