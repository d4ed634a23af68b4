//! Constraint projection of sampled poses onto valid configurations

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rand::thread_rng;
use tracing::warn;

use crate::common::traits::{
    ConfigurationSpace, ConstraintModel, ConstraintSamplerManager, StateValidator,
};
use crate::common::types::JointConfig;
use crate::goal_sampling::constraint::GoalConstraint;

/// Projection attempts granted per sampled pose
pub const GOAL_PROJECTION_ATTEMPTS: u32 = 2;
/// Internal attempts granted to the constraint sampler per projection
pub const STATE_SAMPLING_ATTEMPTS: u32 = 2;

/// Advisory projection statistics
///
/// Counters are relaxed atomics shared across sampling threads; races are
/// benign since the numbers are diagnostic only.
#[derive(Debug, Default)]
pub struct SamplingStats {
    attempts: AtomicUsize,
    invalid_sampled_constraints: AtomicUsize,
    warned_invalid_samples: AtomicBool,
}

impl SamplingStats {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn invalid_sampled_constraints(&self) -> usize {
        self.invalid_sampled_constraints.load(Ordering::Relaxed)
    }

    pub fn warned(&self) -> bool {
        self.warned_invalid_samples.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.attempts.store(0, Ordering::Relaxed);
        self.invalid_sampled_constraints.store(0, Ordering::Relaxed);
        self.warned_invalid_samples.store(false, Ordering::Relaxed);
    }

    fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    fn record_constraint_violation(&self) {
        let invalid = self.invalid_sampled_constraints.fetch_add(1, Ordering::Relaxed) + 1;
        let attempts = self.attempts();
        // Flag once when more than 80% of sampled goal states violate the
        // constraints; a rate this high usually means the region or the
        // constraint set is misconfigured.
        if invalid * 10 >= attempts * 8 && !self.warned_invalid_samples.swap(true, Ordering::Relaxed)
        {
            warn!(
                invalid,
                attempts,
                "most sampled goal states violate the goal constraints; \
                 check the goal region and constraint configuration"
            );
        }
    }
}

/// Thin facade over the external constraint-satisfaction collaborators
///
/// Turns a retargeted goal constraint plus a seed configuration into an
/// accepted goal configuration, or nothing.
pub struct ConstraintProjector {
    constraints: Arc<dyn ConstraintModel>,
    sampler_manager: Arc<dyn ConstraintSamplerManager>,
    validator: Arc<dyn StateValidator>,
    space: Arc<dyn ConfigurationSpace>,
    stats: Arc<SamplingStats>,
}

impl ConstraintProjector {
    pub fn new(
        constraints: Arc<dyn ConstraintModel>,
        sampler_manager: Arc<dyn ConstraintSamplerManager>,
        validator: Arc<dyn StateValidator>,
        space: Arc<dyn ConfigurationSpace>,
    ) -> Self {
        Self {
            constraints,
            sampler_manager,
            validator,
            space,
            stats: Arc::new(SamplingStats::default()),
        }
    }

    pub fn stats(&self) -> &SamplingStats {
        &self.stats
    }

    /// Attempt to project `work_state` onto the constraint manifold of `goal`
    ///
    /// Up to `max_attempts` projections are tried, polling `keep_sampling`
    /// before each so a cancelled scheduler exits without spending the
    /// remaining budget; `want_verbose` decides per-attempt diagnostic
    /// verbosity. A projected configuration is accepted only if it also
    /// satisfies the full constraint set and passes whole-state validity.
    ///
    /// When the manager yields no constraint-aware sampler, a configuration
    /// is drawn uniformly from the space instead and filtered on validity
    /// first, then constraint satisfaction.
    pub fn project(
        &self,
        goal: &GoalConstraint,
        work_state: &mut JointConfig,
        max_attempts: u32,
        keep_sampling: &dyn Fn() -> bool,
        want_verbose: &mut dyn FnMut(u32) -> bool,
    ) -> Option<JointConfig> {
        let sampler = self.sampler_manager.select_sampler(goal);
        let mut rng = thread_rng();

        for attempt in 0..max_attempts {
            if !keep_sampling() {
                break;
            }
            let verbose = want_verbose(attempt);
            self.stats.record_attempt();

            match &sampler {
                Some(projecting) => {
                    // The constraint sampler also performs the validity
                    // callback on each internal candidate.
                    let validator = &self.validator;
                    let mut group_validity =
                        |state: &JointConfig| validator.is_state_valid(state, verbose);
                    if projecting.project(work_state, STATE_SAMPLING_ATTEMPTS, &mut group_validity)
                    {
                        if self.constraints.satisfied(goal, work_state, verbose) {
                            if self.validator.is_state_valid(work_state, verbose) {
                                return Some(work_state.clone());
                            }
                        } else {
                            self.stats.record_constraint_violation();
                        }
                    }
                }
                None => {
                    let candidate = self.space.sample_uniform(&mut rng);
                    if self.validator.is_state_valid(&candidate, verbose)
                        && self.constraints.satisfied(goal, &candidate, verbose)
                    {
                        return Some(candidate);
                    }
                }
            }
        }

        None
    }
}
