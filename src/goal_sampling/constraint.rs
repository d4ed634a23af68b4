//! Per-region symbolic goal constraint descriptor

use nalgebra::{UnitQuaternion, Vector3};

use crate::common::types::Pose3D;
use crate::goal_sampling::region::WorkspaceRegion;

/// Symbolic constraint on the end-effector: a position target and an
/// orientation target with tolerances.
///
/// One descriptor exists per goal region, index-aligned with the region
/// list. A sampling attempt clones the descriptor and retargets the clone
/// from the freshly sampled pose, so concurrent attempts never share a
/// mutable descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalConstraint {
    pub position_target: Vector3<f64>,
    pub orientation_target: UnitQuaternion<f64>,
    pub position_tolerance: f64,
    pub orientation_tolerance: f64,
}

impl GoalConstraint {
    pub fn new(
        position_target: Vector3<f64>,
        orientation_target: UnitQuaternion<f64>,
        position_tolerance: f64,
        orientation_tolerance: f64,
    ) -> Self {
        Self {
            position_target,
            orientation_target,
            position_tolerance,
            orientation_tolerance,
        }
    }

    /// Initial descriptor for a region: targets the box center with the
    /// reference orientation
    pub fn for_region(
        region: &WorkspaceRegion,
        position_tolerance: f64,
        orientation_tolerance: f64,
    ) -> Self {
        Self {
            position_target: region.center(),
            orientation_target: region.reference_orientation(),
            position_tolerance,
            orientation_tolerance,
        }
    }

    /// Retarget the descriptor from a freshly sampled pose
    ///
    /// The position target always follows the pose. The orientation target
    /// is rewritten only when the region leaves some axis free; a fully
    /// fixed region keeps its original orientation target.
    pub fn retarget(&mut self, pose: &Pose3D, region: &WorkspaceRegion) {
        self.position_target = pose.position;
        if region.has_free_axis() {
            self.orientation_target = pose.orientation;
        }
    }
}
