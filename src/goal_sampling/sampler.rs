//! Goal-region sampling scheduler
//!
//! Owns the weighted candidate pool and runs sampling passes over the
//! configured goal regions: sample a pose, retarget the region's
//! constraint, project, validate, pool. Passes are safe to invoke
//! concurrently from several threads; cancellation is cooperative and
//! checked between regions and between projection attempts.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use itertools::Itertools;
use parking_lot::{Mutex, RwLock};
use rand::thread_rng;
use tracing::debug;

use crate::common::error::{GoalSamplingError, GoalSamplingResult};
use crate::common::traits::{
    ConfigurationSpace, ConstraintModel, ConstraintSamplerManager, ForwardKinematics,
    PlanningStatus, StateValidator,
};
use crate::common::types::{JointConfig, JointPath};
use crate::goal_sampling::candidate_pool::{GoalCandidatePool, GoalHandle, DEFAULT_GOAL_WEIGHT};
use crate::goal_sampling::constraint::GoalConstraint;
use crate::goal_sampling::pose_sampler::RegionPoseSampler;
use crate::goal_sampling::projection::{
    ConstraintProjector, SamplingStats, GOAL_PROJECTION_ATTEMPTS,
};
use crate::goal_sampling::region::WorkspaceRegion;
use crate::goal_sampling::roadmap::GoalRoadmap;

/// Per-axis orientation mismatch below which a pose counts as inside a
/// region's orientation target
const ORIENTATION_MATCH_TOLERANCE: f64 = 0.02;

/// Why sampling stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    SolutionFound,
    Cancelled,
    BudgetExhausted,
}

/// Scheduler lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    Idle,
    Sampling,
    Stopped(StopReason),
}

/// External capabilities the sampler consumes, injected at construction
#[derive(Clone)]
pub struct Collaborators {
    pub kinematics: Arc<dyn ForwardKinematics>,
    pub validator: Arc<dyn StateValidator>,
    pub constraints: Arc<dyn ConstraintModel>,
    pub sampler_manager: Arc<dyn ConstraintSamplerManager>,
    pub space: Arc<dyn ConfigurationSpace>,
    pub problem: Arc<dyn PlanningStatus>,
}

/// One goal region with its constraint descriptor and pose sampler
struct RegionSlot {
    region: WorkspaceRegion,
    constraint: GoalConstraint,
    pose_sampler: RegionPoseSampler,
}

/// Immutable region data shared with in-flight passes. `reset` swaps the
/// whole set for an empty one; passes keep working on their own snapshot.
struct RegionSet {
    slots: Vec<RegionSlot>,
}

/// Background goal-candidate generator for a set of workspace goal regions
///
/// The owning planner drives `produce_candidates` from one or more worker
/// threads while its search runs, pulls goals through `best_candidate` /
/// `pop_best_candidate`, and may call `improve_solution` once after the
/// first solution.
pub struct GoalRegionSampler {
    regions: RwLock<Arc<RegionSet>>,
    pool: GoalCandidatePool,
    projector: ConstraintProjector,
    kinematics: Arc<dyn ForwardKinematics>,
    problem: Arc<dyn PlanningStatus>,
    roadmap: Option<Arc<GoalRoadmap>>,
    seed_state: JointConfig,
    max_sampled_goals: usize,
    state: Mutex<SamplerState>,
    sampling: AtomicBool,
    verbose_display: AtomicUsize,
}

impl GoalRegionSampler {
    /// Build a sampler over index-aligned region and constraint lists
    ///
    /// `seed_state` is the complete initial robot state used to seed each
    /// projection; `max_sampled_goals` bounds the pool. An optional
    /// roadmap enables the better-solution search.
    pub fn new(
        regions: Vec<WorkspaceRegion>,
        constraints: Vec<GoalConstraint>,
        seed_state: JointConfig,
        max_sampled_goals: usize,
        collaborators: Collaborators,
        roadmap: Option<Arc<GoalRoadmap>>,
    ) -> GoalSamplingResult<Self> {
        if regions.len() != constraints.len() {
            return Err(GoalSamplingError::InvalidParameter(format!(
                "{} goal regions but {} constraint descriptors",
                regions.len(),
                constraints.len()
            )));
        }
        if seed_state.dim() != collaborators.space.dimension() {
            return Err(GoalSamplingError::DimensionMismatch {
                expected: collaborators.space.dimension(),
                actual: seed_state.dim(),
            });
        }

        let slots: Vec<RegionSlot> = regions
            .into_iter()
            .zip_eq(constraints)
            .enumerate()
            .map(|(i, (region, constraint))| {
                debug!(region = i + 1, "creating workspace pose sampler for goal region");
                RegionSlot {
                    pose_sampler: RegionPoseSampler::new(region.clone()),
                    region,
                    constraint,
                }
            })
            .collect();

        let projector = ConstraintProjector::new(
            collaborators.constraints,
            collaborators.sampler_manager,
            collaborators.validator,
            collaborators.space,
        );

        Ok(Self {
            regions: RwLock::new(Arc::new(RegionSet { slots })),
            pool: GoalCandidatePool::new(),
            projector,
            kinematics: collaborators.kinematics,
            problem: collaborators.problem,
            roadmap,
            seed_state,
            max_sampled_goals,
            state: Mutex::new(SamplerState::Idle),
            sampling: AtomicBool::new(false),
            verbose_display: AtomicUsize::new(0),
        })
    }

    /// Enter the `Sampling` state; passes run until stopped
    pub fn start_sampling(&self) {
        *self.state.lock() = SamplerState::Sampling;
        self.sampling.store(true, Ordering::Release);
    }

    /// Cooperative cancellation; in-flight passes exit at the next check
    pub fn cancel(&self) {
        self.stop(StopReason::Cancelled);
    }

    pub fn state(&self) -> SamplerState {
        *self.state.lock()
    }

    /// Polled by passes between regions and between projection attempts
    pub fn is_sampling(&self) -> bool {
        self.sampling.load(Ordering::Acquire)
    }

    fn stop(&self, reason: StopReason) {
        let mut state = self.state.lock();
        if *state == SamplerState::Sampling {
            *state = SamplerState::Stopped(reason);
        }
        self.sampling.store(false, Ordering::Release);
    }

    /// Run one sampling pass over every configured region
    ///
    /// Returns true when at least one region produced a pooled candidate.
    /// The outer re-invocation cadence belongs to the owning scheduling
    /// primitive; this routine may be called from several threads at once,
    /// each pass working on its own scratch seed configuration.
    pub fn produce_candidates(&self) -> bool {
        if !self.is_sampling() {
            return false;
        }
        if self.problem.has_solution() {
            self.stop(StopReason::SolutionFound);
            return false;
        }
        if self.pool.len() >= self.max_sampled_goals {
            self.stop(StopReason::BudgetExhausted);
            return false;
        }

        // Snapshot the region set so a concurrent reset cannot free the
        // data under this pass.
        let regions = Arc::clone(&self.regions.read());
        let mut rng = thread_rng();
        let mut work_state = self.seed_state.clone();
        let mut produced = false;

        for slot in &regions.slots {
            // Cooperative short-circuit once the planner has a solution;
            // checked per region, never mid-projection.
            if self.problem.has_solution() {
                continue;
            }

            let pose = slot.pose_sampler.sample(&mut rng);
            let mut goal = slot.constraint.clone();
            goal.retarget(&pose, &slot.region);

            let keep_sampling = || self.is_sampling();
            let pool = &self.pool;
            let verbose_display = &self.verbose_display;
            let mut want_verbose = |attempt: u32| {
                // First-failure visibility: at most one verbose sample
                // overall, taken while the pool is still empty after half
                // the attempt budget.
                attempt >= GOAL_PROJECTION_ATTEMPTS / 2
                    && pool.is_empty()
                    && verbose_display
                        .compare_exchange(0, 1, Ordering::Relaxed, Ordering::Relaxed)
                        .is_ok()
            };

            if let Some(accepted) = self.projector.project(
                &goal,
                &mut work_state,
                GOAL_PROJECTION_ATTEMPTS,
                &keep_sampling,
                &mut want_verbose,
            ) {
                self.pool.insert(accepted, DEFAULT_GOAL_WEIGHT);
                produced = true;
            }
        }

        produced
    }

    /// Best pooled candidate without removing it
    pub fn best_candidate(&self) -> Option<JointConfig> {
        self.pool.peek_best()
    }

    /// Remove and return the best pooled candidate
    pub fn pop_best_candidate(&self) -> Option<JointConfig> {
        self.pool.pop_best()
    }

    pub fn pool(&self) -> &GoalCandidatePool {
        &self.pool
    }

    pub fn sampled_goal_count(&self) -> usize {
        self.pool.len()
    }

    pub fn stats(&self) -> &SamplingStats {
        self.projector.stats()
    }

    pub fn region_count(&self) -> usize {
        self.regions.read().slots.len()
    }

    pub fn roadmap(&self) -> Option<&Arc<GoalRoadmap>> {
        self.roadmap.as_ref()
    }

    /// Pool an externally produced goal state with the default weight
    pub fn register_goal_state(&self, config: JointConfig) -> GoalSamplingResult<GoalHandle> {
        if config.dim() != self.seed_state.dim() {
            return Err(GoalSamplingError::DimensionMismatch {
                expected: self.seed_state.dim(),
                actual: config.dim(),
            });
        }
        Ok(self.pool.insert(config, DEFAULT_GOAL_WEIGHT))
    }

    /// Distance from a configuration to the goal regions
    ///
    /// Zero when the end-effector pose lies inside some region's box with
    /// every fixed orientation axis matched within tolerance (trivially so
    /// when all axes are free); otherwise the joint-space distance to the
    /// nearest pooled candidate, infinite while the pool is empty.
    pub fn distance_to_goal(&self, state: &JointConfig) -> f64 {
        let pose = self.kinematics.end_effector_pose(state);
        let regions = Arc::clone(&self.regions.read());

        for slot in &regions.slots {
            let region = &slot.region;
            if !region.contains_position(&pose.position) {
                continue;
            }
            if region.all_axes_free() {
                return 0.0;
            }

            let (roll, pitch, yaw) = pose.rpy();
            let (roll_ref, pitch_ref, yaw_ref) = region.reference_orientation().euler_angles();
            let roll_ok = region.roll.free || (roll - roll_ref).abs() <= ORIENTATION_MATCH_TOLERANCE;
            let pitch_ok =
                region.pitch.free || (pitch - pitch_ref).abs() <= ORIENTATION_MATCH_TOLERANCE;
            let yaw_ok = region.yaw.free || (yaw - yaw_ref).abs() <= ORIENTATION_MATCH_TOLERANCE;
            if roll_ok && pitch_ok && yaw_ok {
                return 0.0;
            }
        }

        self.pool.nearest_distance(state)
    }

    /// Search the roadmap for a cheaper terminal state for `path`
    ///
    /// Intended to be called at most once, after the main search reports
    /// its first solution. Returns None when no roadmap is configured or
    /// no improvement exists; the original path then stands.
    pub fn improve_solution(&self, path: &JointPath) -> Option<JointPath> {
        let roadmap = self.roadmap.as_ref()?;
        let regions = Arc::clone(&self.regions.read());
        let region_list: Vec<WorkspaceRegion> =
            regions.slots.iter().map(|slot| slot.region.clone()).collect();
        roadmap.improve_solution(path, self.kinematics.as_ref(), &region_list)
    }

    /// Reset to pre-construction emptiness
    ///
    /// Drops pooled candidates, the region list, constraint descriptors
    /// and pose-sampling resources, and returns the state machine to
    /// `Idle`. Passes already in flight finish against their own snapshot
    /// and insert into the freshly emptied pool.
    pub fn reset(&self) {
        {
            let mut regions = self.regions.write();
            *regions = Arc::new(RegionSet { slots: Vec::new() });
        }
        self.sampling.store(false, Ordering::Release);
        *self.state.lock() = SamplerState::Idle;
        self.pool.clear();
        self.projector.stats().reset();
        self.verbose_display.store(0, Ordering::Relaxed);
        if let Some(roadmap) = &self.roadmap {
            roadmap.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::traits::ConstraintSampler;
    use crate::common::types::Pose3D;
    use crate::goal_sampling::region::{AxisRange, FreeAxis};
    use nalgebra::{UnitQuaternion, Vector3};
    use rand::RngCore;
    use std::sync::atomic::AtomicBool as StdAtomicBool;
    use std::thread;

    /// Maps a three-joint configuration directly to its end-effector
    /// position with identity orientation
    struct IdentityKinematics;
    impl ForwardKinematics for IdentityKinematics {
        fn end_effector_pose(&self, joints: &JointConfig) -> Pose3D {
            Pose3D::new(
                Vector3::new(joints.values[0], joints.values[1], joints.values[2]),
                UnitQuaternion::identity(),
            )
        }
    }

    struct AcceptAll;
    impl StateValidator for AcceptAll {
        fn is_state_valid(&self, _state: &JointConfig, _verbose: bool) -> bool {
            true
        }
    }

    /// Satisfied when the end-effector position (identity mapping) is
    /// within the position tolerance of the target
    struct PositionModel;
    impl ConstraintModel for PositionModel {
        fn satisfied(&self, goal: &GoalConstraint, state: &JointConfig, _verbose: bool) -> bool {
            let position = Vector3::new(state.values[0], state.values[1], state.values[2]);
            (position - goal.position_target).norm() <= goal.position_tolerance
        }
    }

    /// Perfect inverse kinematics for the identity mapping: writes the
    /// target position into the seed
    struct IdentityIkAt {
        target: Vector3<f64>,
    }
    impl ConstraintSampler for IdentityIkAt {
        fn project(
            &self,
            seed: &mut JointConfig,
            _max_attempts: u32,
            validity: &mut dyn FnMut(&JointConfig) -> bool,
        ) -> bool {
            seed.values = vec![self.target.x, self.target.y, self.target.z];
            validity(seed)
        }
    }

    struct IdentityIkManager;
    impl ConstraintSamplerManager for IdentityIkManager {
        fn select_sampler(&self, goal: &GoalConstraint) -> Option<Box<dyn ConstraintSampler + '_>> {
            Some(Box::new(IdentityIkAt { target: goal.position_target }))
        }
    }

    struct UnitCubeSpace;
    impl ConfigurationSpace for UnitCubeSpace {
        fn dimension(&self) -> usize {
            3
        }
        fn sample_uniform(&self, rng: &mut dyn RngCore) -> JointConfig {
            use rand::Rng;
            JointConfig::new(vec![
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            ])
        }
    }

    struct SolutionFlag(StdAtomicBool);
    impl PlanningStatus for SolutionFlag {
        fn has_solution(&self) -> bool {
            self.0.load(Ordering::Relaxed)
        }
    }

    fn box_region() -> WorkspaceRegion {
        WorkspaceRegion::new(
            AxisRange::new(0.4, 0.5),
            AxisRange::new(-0.1, 0.1),
            AxisRange::new(0.3, 0.4),
            FreeAxis::fixed(0.0),
            FreeAxis::fixed(0.0),
            FreeAxis::fixed(0.0),
        )
    }

    fn collaborators(problem: Arc<SolutionFlag>) -> Collaborators {
        Collaborators {
            kinematics: Arc::new(IdentityKinematics),
            validator: Arc::new(AcceptAll),
            constraints: Arc::new(PositionModel),
            sampler_manager: Arc::new(IdentityIkManager),
            space: Arc::new(UnitCubeSpace),
            problem,
        }
    }

    fn sampler(max_goals: usize, roadmap: Option<Arc<GoalRoadmap>>) -> Arc<GoalRegionSampler> {
        let region = box_region();
        let constraint = GoalConstraint::for_region(&region, 1e-6, 1e-3);
        Arc::new(
            GoalRegionSampler::new(
                vec![region],
                vec![constraint],
                JointConfig::new(vec![0.0, 0.0, 0.0]),
                max_goals,
                collaborators(Arc::new(SolutionFlag(StdAtomicBool::new(false)))),
                roadmap,
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_construction_rejects_mismatched_lists() {
        let region = box_region();
        let err = GoalRegionSampler::new(
            vec![region],
            Vec::new(),
            JointConfig::new(vec![0.0, 0.0, 0.0]),
            10,
            collaborators(Arc::new(SolutionFlag(StdAtomicBool::new(false)))),
            None,
        );
        assert!(matches!(err, Err(GoalSamplingError::InvalidParameter(_))));
    }

    #[test]
    fn test_construction_rejects_wrong_seed_dimension() {
        let region = box_region();
        let constraint = GoalConstraint::for_region(&region, 1e-6, 1e-3);
        let err = GoalRegionSampler::new(
            vec![region],
            vec![constraint],
            JointConfig::new(vec![0.0]),
            10,
            collaborators(Arc::new(SolutionFlag(StdAtomicBool::new(false)))),
            None,
        );
        assert!(matches!(
            err,
            Err(GoalSamplingError::DimensionMismatch { expected: 3, actual: 1 })
        ));
    }

    #[test]
    fn test_pass_produces_candidate_inside_box() {
        let sampler = sampler(100, None);
        sampler.start_sampling();

        assert!(sampler.produce_candidates());
        let goal = sampler.best_candidate().unwrap();
        let pose = IdentityKinematics.end_effector_pose(&goal);
        assert!(box_region().contains_position(&pose.position));
        assert!(pose.orientation.angle_to(&UnitQuaternion::identity()) < 1e-6);
    }

    #[test]
    fn test_pass_refused_while_idle() {
        let sampler = sampler(100, None);
        assert_eq!(sampler.state(), SamplerState::Idle);
        assert!(!sampler.produce_candidates());
        assert!(sampler.pool().is_empty());
    }

    #[test]
    fn test_solution_found_stops_sampling() {
        let problem = Arc::new(SolutionFlag(StdAtomicBool::new(true)));
        let region = box_region();
        let constraint = GoalConstraint::for_region(&region, 1e-6, 1e-3);
        let sampler = GoalRegionSampler::new(
            vec![region],
            vec![constraint],
            JointConfig::new(vec![0.0, 0.0, 0.0]),
            100,
            collaborators(problem),
            None,
        )
        .unwrap();

        sampler.start_sampling();
        assert!(!sampler.produce_candidates());
        assert_eq!(sampler.state(), SamplerState::Stopped(StopReason::SolutionFound));
    }

    #[test]
    fn test_budget_exhaustion_stops_sampling() {
        let sampler = sampler(1, None);
        sampler.start_sampling();

        assert!(sampler.produce_candidates());
        assert_eq!(sampler.sampled_goal_count(), 1);
        assert!(!sampler.produce_candidates());
        assert_eq!(
            sampler.state(),
            SamplerState::Stopped(StopReason::BudgetExhausted)
        );
    }

    #[test]
    fn test_cancel_stops_passes() {
        let sampler = sampler(100, None);
        sampler.start_sampling();
        sampler.cancel();
        assert!(!sampler.produce_candidates());
        assert_eq!(sampler.state(), SamplerState::Stopped(StopReason::Cancelled));
    }

    #[test]
    fn test_concurrent_passes_lose_no_updates() {
        let sampler = sampler(usize::MAX, None);
        sampler.start_sampling();

        let threads = 4;
        let passes = 25;
        let mut handles = Vec::new();
        for _ in 0..threads {
            let sampler = Arc::clone(&sampler);
            handles.push(thread::spawn(move || {
                let mut produced = 0usize;
                for _ in 0..passes {
                    if sampler.produce_candidates() {
                        produced += 1;
                    }
                }
                produced
            }));
        }

        let produced: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        // One region per pass, and the mock projection always succeeds
        assert_eq!(produced, threads * passes);
        assert_eq!(sampler.sampled_goal_count(), threads * passes);
    }

    #[test]
    fn test_register_goal_state() {
        let sampler = sampler(100, None);
        let handle = sampler
            .register_goal_state(JointConfig::new(vec![0.45, 0.0, 0.35]))
            .unwrap();
        assert_eq!(sampler.sampled_goal_count(), 1);
        assert_eq!(
            sampler.pool().remove(handle),
            Some(JointConfig::new(vec![0.45, 0.0, 0.35]))
        );

        let err = sampler.register_goal_state(JointConfig::new(vec![0.0]));
        assert!(matches!(err, Err(GoalSamplingError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_distance_to_goal() {
        let sampler = sampler(100, None);

        // Inside the box with the fixed identity orientation matched
        let inside = JointConfig::new(vec![0.45, 0.0, 0.35]);
        assert_eq!(sampler.distance_to_goal(&inside), 0.0);

        // Outside the box with an empty pool
        let outside = JointConfig::new(vec![0.0, 0.0, 0.0]);
        assert!(sampler.distance_to_goal(&outside).is_infinite());

        // Outside the box with a pooled candidate: joint-space distance
        sampler
            .register_goal_state(JointConfig::new(vec![1.0, 0.0, 0.0]))
            .unwrap();
        assert!((sampler.distance_to_goal(&outside) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_improve_solution_through_roadmap() {
        let roadmap = Arc::new(GoalRoadmap::new());
        let far = JointConfig::new(vec![0.8, 0.0, 0.35]);
        let near = JointConfig::new(vec![0.45, 0.0, 0.35]);
        let anchor = roadmap.add_vertex(far.clone());
        let better = roadmap.add_vertex(near.clone());
        roadmap.add_edge(anchor, better, 1.0);

        let sampler = sampler(100, Some(roadmap));
        let solution =
            JointPath::from_states(vec![JointConfig::new(vec![0.0, 0.0, 0.0]), far]);
        let improved = sampler.improve_solution(&solution).unwrap();
        assert_eq!(improved.terminal(), Some(&near));
    }

    #[test]
    fn test_improve_solution_without_roadmap() {
        let sampler = sampler(100, None);
        let solution = JointPath::from_states(vec![JointConfig::new(vec![0.0, 0.0, 0.0])]);
        assert!(sampler.improve_solution(&solution).is_none());
    }

    #[test]
    fn test_reset_returns_to_empty_idle() {
        let sampler = sampler(100, None);
        sampler.start_sampling();
        assert!(sampler.produce_candidates());
        assert!(!sampler.pool().is_empty());

        sampler.reset();
        assert_eq!(sampler.state(), SamplerState::Idle);
        assert_eq!(sampler.region_count(), 0);
        assert!(sampler.pool().is_empty());
        assert_eq!(sampler.stats().attempts(), 0);
        assert!(!sampler.produce_candidates());
    }
}
