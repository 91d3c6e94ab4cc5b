#![warn(missing_docs)]

//! Control points and single patches for patchcraft.
//!
//! A single patch is one bicubic surface unit over a 4x4 control grid.
//! Three kinds share the [`Patch`] interface:
//!
//! - [`BezierPatch`]: Bernstein basis, neighbours join C0
//! - [`BSplinePatch`]: uniform B-spline basis, neighbours join C2
//! - [`GregoryPatch`]: corner-blended inner points, used for G1 hole fills
//!
//! Tensor patches reference their control points by [`PointId`] in a
//! [`ControlPoints`] arena and never copy positions, so edits to a shared
//! point show up in every patch using it.

mod gregory;
mod point;
mod tensor;

pub use gregory::{GregoryCorner, GregoryPatch, INNER_POINTS};
pub use point::{ControlPoint, ControlPoints, PointId, SurfaceId};
pub use tensor::{BSplinePatch, BezierPatch, TensorBasis, TensorPatch};

use std::fmt;

use patchcraft_math::{Point3, Vec3};
use patchcraft_trim::TrimPredicate;
use thiserror::Error;

/// Errors from patch evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PatchError {
    /// The patch kind does not define this operation.
    #[error("{operation} is not supported by {kind} patches")]
    Unsupported {
        /// Name of the rejected operation.
        operation: &'static str,
        /// Kind of the patch that rejected it.
        kind: PatchKind,
    },
}

/// Result type for patch operations.
pub type Result<T> = std::result::Result<T, PatchError>;

/// The kind of a single patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchKind {
    /// Cubic Bézier patch.
    Bezier,
    /// Uniform cubic B-spline patch.
    BSpline,
    /// Gregory corner-blend patch.
    Gregory,
}

impl fmt::Display for PatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PatchKind::Bezier => "bezier",
            PatchKind::BSpline => "b-spline",
            PatchKind::Gregory => "gregory",
        })
    }
}

/// Everything a renderer needs at one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    /// Position on the surface.
    pub position: Point3,
    /// Partial derivative in u.
    pub du: Vec3,
    /// Partial derivative in v.
    pub dv: Vec3,
    /// Unit normal, or zero where the derivatives are parallel.
    pub normal: Vec3,
}

/// Normalized `du × dv`; zero when degenerate.
pub fn unit_normal(du: &Vec3, dv: &Vec3) -> Vec3 {
    let n = du.cross(dv);
    let len = n.norm();
    if len < 1e-15 {
        Vec3::zeros()
    } else {
        n / len
    }
}

/// A single bicubic surface unit.
pub trait Patch {
    /// Which kind of patch this is.
    fn kind(&self) -> PatchKind;

    /// The trimming predicate clipping this patch.
    fn trim(&self) -> &TrimPredicate;

    /// Position at `(u, v) ∈ [0, 1]²`.
    fn evaluate(&self, points: &ControlPoints, u: f64, v: f64) -> Point3;

    /// Partial derivative in u.
    fn evaluate_du(&self, points: &ControlPoints, u: f64, v: f64) -> Result<Vec3>;

    /// Partial derivative in v.
    fn evaluate_dv(&self, points: &ControlPoints, u: f64, v: f64) -> Result<Vec3>;

    /// Position at `(u, v)`, or `None` when the trimming predicate rejects it.
    fn evaluate_trimmed(&self, points: &ControlPoints, u: f64, v: f64) -> Option<Point3> {
        self.trim()
            .accepts(u, v)
            .then(|| self.evaluate(points, u, v))
    }

    /// Unit normal at `(u, v)`.
    fn normal(&self, points: &ControlPoints, u: f64, v: f64) -> Result<Vec3> {
        let du = self.evaluate_du(points, u, v)?;
        let dv = self.evaluate_dv(points, u, v)?;
        Ok(unit_normal(&du, &dv))
    }

    /// Full sample at `(u, v)`, or `None` when trimmed away.
    fn sample(&self, points: &ControlPoints, u: f64, v: f64) -> Result<Option<SurfaceSample>> {
        if !self.trim().accepts(u, v) {
            return Ok(None);
        }
        let du = self.evaluate_du(points, u, v)?;
        let dv = self.evaluate_dv(points, u, v)?;
        Ok(Some(SurfaceSample {
            position: self.evaluate(points, u, v),
            du,
            dv,
            normal: unit_normal(&du, &dv),
        }))
    }
}

/// Any of the three patch kinds.
#[derive(Debug, Clone)]
pub enum SinglePatch {
    /// Bézier patch.
    Bezier(BezierPatch),
    /// B-spline patch.
    BSpline(BSplinePatch),
    /// Gregory patch.
    Gregory(GregoryPatch),
}

impl SinglePatch {
    fn inner(&self) -> &dyn Patch {
        match self {
            SinglePatch::Bezier(p) => p,
            SinglePatch::BSpline(p) => p,
            SinglePatch::Gregory(p) => p,
        }
    }

    /// Control points referenced by this patch; Gregory patches own theirs.
    pub fn point_ids(&self) -> Option<&[[PointId; 4]; 4]> {
        match self {
            SinglePatch::Bezier(p) => Some(p.points()),
            SinglePatch::BSpline(p) => Some(p.points()),
            SinglePatch::Gregory(_) => None,
        }
    }

    /// Replace every reference to `old` with `new`; returns the count.
    pub fn substitute(&mut self, old: PointId, new: PointId) -> usize {
        match self {
            SinglePatch::Bezier(p) => p.substitute(old, new),
            SinglePatch::BSpline(p) => p.substitute(old, new),
            SinglePatch::Gregory(_) => 0,
        }
    }
}

impl Patch for SinglePatch {
    fn kind(&self) -> PatchKind {
        self.inner().kind()
    }

    fn trim(&self) -> &TrimPredicate {
        self.inner().trim()
    }

    fn evaluate(&self, points: &ControlPoints, u: f64, v: f64) -> Point3 {
        self.inner().evaluate(points, u, v)
    }

    fn evaluate_du(&self, points: &ControlPoints, u: f64, v: f64) -> Result<Vec3> {
        self.inner().evaluate_du(points, u, v)
    }

    fn evaluate_dv(&self, points: &ControlPoints, u: f64, v: f64) -> Result<Vec3> {
        self.inner().evaluate_dv(points, u, v)
    }
}

impl From<BezierPatch> for SinglePatch {
    fn from(p: BezierPatch) -> Self {
        SinglePatch::Bezier(p)
    }
}

impl From<BSplinePatch> for SinglePatch {
    fn from(p: BSplinePatch) -> Self {
        SinglePatch::BSpline(p)
    }
}

impl From<GregoryPatch> for SinglePatch {
    fn from(p: GregoryPatch) -> Self {
        SinglePatch::Gregory(p)
    }
}
