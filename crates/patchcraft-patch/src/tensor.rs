//! Bicubic tensor-product patches over a 4x4 window of shared control points.

use std::marker::PhantomData;

use patchcraft_basis::{Basis, Bernstein, UniformBSpline};
use patchcraft_math::{Point3, Vec3, Vec4};
use patchcraft_trim::TrimPredicate;

use crate::{ControlPoints, Patch, PatchKind, PointId, Result};

/// A basis that drives a [`TensorPatch`].
pub trait TensorBasis: Basis {
    /// Kind reported by patches using this basis.
    const KIND: PatchKind;
}

impl TensorBasis for Bernstein {
    const KIND: PatchKind = PatchKind::Bezier;
}

impl TensorBasis for UniformBSpline {
    const KIND: PatchKind = PatchKind::BSpline;
}

/// Bicubic Bézier patch. Neighbours sharing a boundary row join C0.
pub type BezierPatch = TensorPatch<Bernstein>;

/// Uniform bicubic B-spline patch. Neighbours whose windows overlap by
/// three rows join C2.
pub type BSplinePatch = TensorPatch<UniformBSpline>;

/// A tensor-product patch `Σ N_i(u) N_j(v) P[i][j]`.
///
/// `points[i][j]` references the arena; `i` runs along u, `j` along v.
#[derive(Debug, Clone)]
pub struct TensorPatch<B: TensorBasis> {
    points: [[PointId; 4]; 4],
    trim: TrimPredicate,
    _basis: PhantomData<B>,
}

impl<B: TensorBasis> TensorPatch<B> {
    /// Untrimmed patch over `points`.
    pub fn new(points: [[PointId; 4]; 4]) -> Self {
        Self::with_trim(points, TrimPredicate::always())
    }

    /// Patch over `points` clipped by `trim`.
    pub fn with_trim(points: [[PointId; 4]; 4], trim: TrimPredicate) -> Self {
        Self {
            points,
            trim,
            _basis: PhantomData,
        }
    }

    /// The referenced control points.
    pub fn points(&self) -> &[[PointId; 4]; 4] {
        &self.points
    }

    /// Replace every reference to `old` with `new`; returns the count.
    pub fn substitute(&mut self, old: PointId, new: PointId) -> usize {
        let mut count = 0;
        for id in self.points.iter_mut().flatten() {
            if *id == old {
                *id = new;
                count += 1;
            }
        }
        count
    }

    /// Install a new trimming predicate.
    pub fn set_trim(&mut self, trim: TrimPredicate) {
        self.trim = trim;
    }

    fn gather(&self, points: &ControlPoints) -> [[Vec4; 4]; 4] {
        self.points.map(|row| row.map(|id| points[id].homogeneous()))
    }

    /// Homogeneous position at `(u, v)` with the weight forced to 1.
    pub fn evaluate_homogeneous(&self, points: &ControlPoints, u: f64, v: f64) -> Vec4 {
        let p = self.gather(points);
        let wu = B::weights(u);
        let wv = B::weights(v);
        let mut acc = Vec4::zeros();
        for i in 0..4 {
            for j in 0..4 {
                acc += p[i][j] * (wu[i] * wv[j]);
            }
        }
        acc.w = 1.0;
        acc
    }

    /// Blend along v into four curves in u, then apply `du_weights` along u.
    fn blend_u(p: &[[Vec4; 4]; 4], du_weights: [f64; 4], wv: [f64; 4]) -> Vec3 {
        let mut acc = Vec4::zeros();
        for i in 0..4 {
            let mut curve = Vec4::zeros();
            for j in 0..4 {
                curve += p[i][j] * wv[j];
            }
            acc += curve * du_weights[i];
        }
        acc.w = 0.0;
        acc.xyz()
    }

    /// Blend along u into four curves in v, then apply `dv_weights` along v.
    fn blend_v(p: &[[Vec4; 4]; 4], wu: [f64; 4], dv_weights: [f64; 4]) -> Vec3 {
        let mut acc = Vec4::zeros();
        for j in 0..4 {
            let mut curve = Vec4::zeros();
            for i in 0..4 {
                curve += p[i][j] * wu[i];
            }
            acc += curve * dv_weights[j];
        }
        acc.w = 0.0;
        acc.xyz()
    }

    /// Second derivative in u.
    pub fn evaluate_duu(&self, points: &ControlPoints, u: f64, v: f64) -> Vec3 {
        Self::blend_u(&self.gather(points), B::second_derivatives(u), B::weights(v))
    }

    /// Second derivative in v.
    pub fn evaluate_dvv(&self, points: &ControlPoints, u: f64, v: f64) -> Vec3 {
        Self::blend_v(&self.gather(points), B::weights(u), B::second_derivatives(v))
    }

    /// Mixed derivative.
    pub fn evaluate_duv(&self, points: &ControlPoints, u: f64, v: f64) -> Vec3 {
        Self::blend_u(&self.gather(points), B::derivatives(u), B::derivatives(v))
    }
}

impl<B: TensorBasis> Patch for TensorPatch<B> {
    fn kind(&self) -> PatchKind {
        B::KIND
    }

    fn trim(&self) -> &TrimPredicate {
        &self.trim
    }

    fn evaluate(&self, points: &ControlPoints, u: f64, v: f64) -> Point3 {
        Point3::from(self.evaluate_homogeneous(points, u, v).xyz())
    }

    fn evaluate_du(&self, points: &ControlPoints, u: f64, v: f64) -> Result<Vec3> {
        Ok(Self::blend_u(&self.gather(points), B::derivatives(u), B::weights(v)))
    }

    fn evaluate_dv(&self, points: &ControlPoints, u: f64, v: f64) -> Result<Vec3> {
        Ok(Self::blend_v(&self.gather(points), B::weights(u), B::derivatives(v)))
    }
}
