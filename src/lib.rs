//! goal_region_sampler - background goal-candidate generation for
//! sampling-based motion planning
//!
//! Given a robot's kinematics, a planning scene, and a set of workspace
//! goal regions, this crate continuously produces valid goal
//! configurations while the owning planner searches for a path, keeps
//! them in a weight-ordered pool, and can search a roadmap of previously
//! sampled goals for a cheaper terminal state once a first solution
//! exists.

// Core modules
pub mod common;

// Algorithm modules
pub mod goal_sampling;

// Re-export common types for convenience
pub use common::{JointConfig, JointPath, Pose3D};
pub use common::{
    ConfigurationSpace, ConstraintModel, ConstraintSampler, ConstraintSamplerManager,
    ForwardKinematics, PlanningStatus, StateValidator,
};
pub use common::{GoalSamplingError, GoalSamplingResult};
pub use goal_sampling::{
    AxisRange, Collaborators, ConstraintProjector, FreeAxis, GoalCandidatePool, GoalConstraint,
    GoalHandle, GoalRegionSampler, GoalRoadmap, RegionPoseSampler, SamplerState, SamplingStats,
    StopReason, WorkspaceRegion, DEFAULT_GOAL_WEIGHT,
};
