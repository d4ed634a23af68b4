//! Workspace goal-region description

use nalgebra::{UnitQuaternion, Vector3};

/// Closed interval of admissible values along one position axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// One orientation axis: either locked to a reference angle or free to vary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeAxis {
    /// Reference angle in radians, used while the axis is not free
    pub value: f64,
    pub free: bool,
}

impl FreeAxis {
    /// Axis locked to `value`
    pub fn fixed(value: f64) -> Self {
        Self { value, free: false }
    }

    /// Axis free to take any angle
    pub fn unconstrained() -> Self {
        Self { value: 0.0, free: true }
    }
}

/// Declarative goal region: a position box plus per-axis orientation freedom
/// and a reference orientation. Immutable after construction; regions are
/// independent of each other.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceRegion {
    pub x: AxisRange,
    pub y: AxisRange,
    pub z: AxisRange,
    pub roll: FreeAxis,
    pub pitch: FreeAxis,
    pub yaw: FreeAxis,
}

impl WorkspaceRegion {
    pub fn new(
        x: AxisRange,
        y: AxisRange,
        z: AxisRange,
        roll: FreeAxis,
        pitch: FreeAxis,
        yaw: FreeAxis,
    ) -> Self {
        Self { x, y, z, roll, pitch, yaw }
    }

    /// Midpoint of the position box
    pub fn center(&self) -> Vector3<f64> {
        Vector3::new(self.x.center(), self.y.center(), self.z.center())
    }

    /// Reference orientation assembled from the per-axis reference angles
    pub fn reference_orientation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_euler_angles(self.roll.value, self.pitch.value, self.yaw.value)
    }

    pub fn has_free_axis(&self) -> bool {
        self.roll.free || self.pitch.free || self.yaw.free
    }

    pub fn all_axes_free(&self) -> bool {
        self.roll.free && self.pitch.free && self.yaw.free
    }

    pub fn contains_position(&self, position: &Vector3<f64>) -> bool {
        self.x.contains(position.x) && self.y.contains(position.y) && self.z.contains(position.z)
    }
}
