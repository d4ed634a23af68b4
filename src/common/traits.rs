//! Collaborator interfaces consumed by the goal sampling components
//!
//! Kinematics, validity checking, constraint satisfaction, and the
//! planning problem are external capabilities; the sampler consumes them
//! through these narrow traits via dependency injection.

use rand::RngCore;

use crate::common::types::{JointConfig, Pose3D};
use crate::goal_sampling::constraint::GoalConstraint;

/// Forward kinematics of the robot model
pub trait ForwardKinematics: Send + Sync {
    /// Pose of the end-effector link for the given joint configuration
    fn end_effector_pose(&self, joints: &JointConfig) -> Pose3D;
}

/// Whole-state validity (collision + bounds)
pub trait StateValidator: Send + Sync {
    fn is_state_valid(&self, state: &JointConfig, verbose: bool) -> bool;
}

/// Symbolic constraint evaluation against a targeted goal constraint
pub trait ConstraintModel: Send + Sync {
    /// Build the full constraint set for `goal` and decide whether `state`
    /// satisfies it
    fn satisfied(&self, goal: &GoalConstraint, state: &JointConfig, verbose: bool) -> bool;
}

/// Iterative projection of a seed configuration onto a constraint manifold
pub trait ConstraintSampler {
    /// Move `seed` onto a constraint-satisfying configuration, subject to
    /// the group validity callback. Returns true on success; `seed` then
    /// holds the projected configuration.
    fn project(
        &self,
        seed: &mut JointConfig,
        max_attempts: u32,
        validity: &mut dyn FnMut(&JointConfig) -> bool,
    ) -> bool;
}

/// Selects a constraint-aware sampler for a targeted goal constraint
pub trait ConstraintSamplerManager: Send + Sync {
    /// May return None when no sampler covers the constraint; callers then
    /// fall back to unconstrained configuration-space sampling
    fn select_sampler(&self, goal: &GoalConstraint) -> Option<Box<dyn ConstraintSampler + '_>>;
}

/// The underlying configuration space of the planning group
pub trait ConfigurationSpace: Send + Sync {
    fn dimension(&self) -> usize;

    /// Draw a configuration uniformly from the space bounds
    fn sample_uniform(&self, rng: &mut dyn RngCore) -> JointConfig;
}

/// View onto the owning planner's problem definition
pub trait PlanningStatus: Send + Sync {
    /// Whether the planner has already reported a solution
    fn has_solution(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test that the collaborator traits are object safe and implementable
    struct DummyValidator;

    impl StateValidator for DummyValidator {
        fn is_state_valid(&self, _state: &JointConfig, _verbose: bool) -> bool {
            true
        }
    }

    #[test]
    fn test_state_validator_trait() {
        let validator: Box<dyn StateValidator> = Box::new(DummyValidator);
        assert!(validator.is_state_valid(&JointConfig::new(vec![0.0]), false));
    }
}
