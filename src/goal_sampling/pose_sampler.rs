//! Uniform pose sampling inside a workspace goal region

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::common::types::Pose3D;
use crate::goal_sampling::region::{AxisRange, WorkspaceRegion};

/// Draws uniformly random 6-DOF poses inside one region's bounds
#[derive(Debug, Clone)]
pub struct RegionPoseSampler {
    region: WorkspaceRegion,
}

impl RegionPoseSampler {
    pub fn new(region: WorkspaceRegion) -> Self {
        Self { region }
    }

    pub fn region(&self) -> &WorkspaceRegion {
        &self.region
    }

    /// Sample a pose inside the region
    ///
    /// Position is uniform in the box. If any orientation axis is free, a
    /// uniform random orientation is drawn and mixed with the reference
    /// orientation axis by axis: free axes keep the sampled angle, fixed
    /// axes keep the reference angle. A fully fixed region returns the
    /// reference orientation unchanged. Always returns a pose.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Pose3D {
        let position = Vector3::new(
            sample_axis(rng, &self.region.x),
            sample_axis(rng, &self.region.y),
            sample_axis(rng, &self.region.z),
        );

        let orientation = if self.region.has_free_axis() {
            let sampled = random_orientation(rng);
            let (roll_sampled, pitch_sampled, yaw_sampled) = sampled.euler_angles();
            let (roll_ref, pitch_ref, yaw_ref) =
                self.region.reference_orientation().euler_angles();
            UnitQuaternion::from_euler_angles(
                if self.region.roll.free { roll_sampled } else { roll_ref },
                if self.region.pitch.free { pitch_sampled } else { pitch_ref },
                if self.region.yaw.free { yaw_sampled } else { yaw_ref },
            )
        } else {
            self.region.reference_orientation()
        };

        Pose3D::new(position, orientation)
    }
}

fn sample_axis<R: Rng + ?Sized>(rng: &mut R, range: &AxisRange) -> f64 {
    if range.span() > 0.0 {
        rng.gen_range(range.min..range.max)
    } else {
        range.min
    }
}

/// Uniform random orientation: a normalized 4-D standard normal draw is
/// uniform on the unit quaternion sphere
fn random_orientation<R: Rng + ?Sized>(rng: &mut R) -> UnitQuaternion<f64> {
    let w: f64 = rng.sample(StandardNormal);
    let x: f64 = rng.sample(StandardNormal);
    let y: f64 = rng.sample(StandardNormal);
    let z: f64 = rng.sample(StandardNormal);
    UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z))
}
