//! Incremental pose tracking for surfaces.

use patchcraft_math::{Point3, Transform, Vec3};

/// Pose the control points currently reflect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Baseline {
    /// Nothing has been propagated yet; points sit in local coordinates,
    /// equivalent to a pose at the origin with zero rotation.
    Uninitialized,
    /// Points were last moved to this pose.
    Tracking {
        /// Position at the last propagation.
        position: Point3,
        /// Euler angles at the last propagation.
        rotation: Vec3,
    },
}

impl Baseline {
    fn pose(&self) -> (Point3, Vec3) {
        match *self {
            Baseline::Uninitialized => (Point3::origin(), Vec3::zeros()),
            Baseline::Tracking { position, rotation } => (position, rotation),
        }
    }
}

/// Position, rotation and scale of a surface plus the baseline they were
/// last propagated from.
///
/// Propagation only ever applies the delta since the baseline, so points
/// edited individually keep their offsets when the whole surface moves.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformState {
    /// Target position.
    pub position: Point3,
    /// Target Euler angles `(x, y, z)` in radians.
    pub rotation: Vec3,
    /// Scale applied once when the surface was built.
    pub scale: Vec3,
    baseline: Baseline,
    model_matrix: Transform,
}

impl TransformState {
    /// State whose points are still in local coordinates.
    pub fn new(position: Point3, rotation: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
            baseline: Baseline::Uninitialized,
            model_matrix: Transform::identity(),
        }
    }

    /// State whose points are already placed at `position` / `rotation`.
    pub fn tracking(position: Point3, rotation: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale: Vec3::repeat(1.0),
            baseline: Baseline::Tracking { position, rotation },
            model_matrix: Transform::identity(),
        }
    }

    /// The last propagated pose.
    pub fn baseline(&self) -> Baseline {
        self.baseline
    }

    /// Product of every step applied so far.
    pub fn model_matrix(&self) -> &Transform {
        &self.model_matrix
    }

    /// Whether the target pose differs from the baseline.
    pub fn is_dirty(&self) -> bool {
        match self.baseline {
            Baseline::Uninitialized => true,
            Baseline::Tracking { position, rotation } => {
                position != self.position || rotation != self.rotation
            }
        }
    }

    /// Advance the baseline to the target pose and return the step `M`
    /// to apply to every owned point.
    ///
    /// `M = T(position) · R(rotation - old_rotation) · T(-old_position)`.
    pub fn step(&mut self) -> Transform {
        let (old_position, old_rotation) = self.baseline.pose();
        let m = Transform::rigid_step(&self.position, &(self.rotation - old_rotation), &old_position);
        self.model_matrix = m.then(&self.model_matrix);
        self.baseline = Baseline::Tracking {
            position: self.position,
            rotation: self.rotation,
        };
        m
    }
}
