//! Gregory patches for G1 fills around irregular vertices.

use patchcraft_basis::{Basis, GregoryBlend, GREGORY_ORDER};
use patchcraft_math::{Point3, Vec3};
use patchcraft_trim::TrimPredicate;

use crate::{ControlPoints, Patch, PatchError, PatchKind, Result};

/// Grid positions of the four inner control points, in corner order
/// `(u, v) = (0, 0), (0, 1), (1, 0), (1, 1)`.
pub const INNER_POINTS: [(usize, usize); 4] = [(1, 1), (1, 2), (2, 1), (2, 2)];

/// The two twins of one inner control point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GregoryCorner {
    /// Twin that shapes the cross derivative over the adjacent `v = const`
    /// boundary. It wins as `v` approaches that boundary.
    pub v_boundary: Point3,
    /// Twin that shapes the cross derivative over the adjacent `u = const`
    /// boundary.
    pub u_boundary: Point3,
}

impl GregoryCorner {
    /// Both twins at the same position.
    pub fn single(p: Point3) -> Self {
        Self {
            v_boundary: p,
            u_boundary: p,
        }
    }
}

/// A bicubic Gregory patch.
///
/// Unlike tensor patches it owns its positions: they are derived from the
/// surfaces around a hole, not edited directly. The inner grid points are
/// ignored and rebuilt from the corner twins on every evaluation.
#[derive(Debug, Clone)]
pub struct GregoryPatch {
    grid: [[Point3; 4]; 4],
    corners: [GregoryCorner; 4],
    trim: TrimPredicate,
}

impl GregoryPatch {
    /// Patch over `grid` with inner twins `corners` (see [`INNER_POINTS`]).
    pub fn new(grid: [[Point3; 4]; 4], corners: [GregoryCorner; 4]) -> Self {
        Self {
            grid,
            corners,
            trim: TrimPredicate::always(),
        }
    }

    /// The boundary grid.
    pub fn grid(&self) -> &[[Point3; 4]; 4] {
        &self.grid
    }

    /// The inner twins.
    pub fn corners(&self) -> &[GregoryCorner; 4] {
        &self.corners
    }

    /// Install a trimming predicate.
    pub fn set_trim(&mut self, trim: TrimPredicate) {
        self.trim = trim;
    }

    /// Inner point `k` blended for `(u, v)`.
    ///
    /// `(du·a + dv·b) / (du + dv)` where `du`, `dv` are the distances to the
    /// corner's boundaries. At the corner itself the result is the zero vector.
    pub fn inner_point(&self, k: usize, u: f64, v: f64) -> Vec3 {
        let (i, j) = INNER_POINTS[k];
        let du = if i == 1 { u } else { 1.0 - u };
        let dv = if j == 1 { v } else { 1.0 - v };
        let denom = du + dv;
        if denom.abs() < f64::EPSILON {
            return Vec3::zeros();
        }
        let c = &self.corners[k];
        (c.v_boundary.coords * du + c.u_boundary.coords * dv) / denom
    }

    fn blended_grid(&self, u: f64, v: f64) -> [[Vec3; 4]; 4] {
        let mut g = self.grid.map(|row| row.map(|p| p.coords));
        for (k, &(i, j)) in INNER_POINTS.iter().enumerate() {
            g[i][j] = self.inner_point(k, u, v);
        }
        g
    }
}

impl Patch for GregoryPatch {
    fn kind(&self) -> PatchKind {
        PatchKind::Gregory
    }

    fn trim(&self) -> &TrimPredicate {
        &self.trim
    }

    fn evaluate(&self, _points: &ControlPoints, u: f64, v: f64) -> Point3 {
        let g = self.blended_grid(u, v);
        let hu = GregoryBlend::weights(u);
        let hv = GregoryBlend::weights(v);
        let mut acc = Vec3::zeros();
        for (k, &i) in GREGORY_ORDER.iter().enumerate() {
            for (l, &j) in GREGORY_ORDER.iter().enumerate() {
                acc += g[i][j] * (hu[k] * hv[l]);
            }
        }
        Point3::from(acc)
    }

    fn evaluate_du(&self, _points: &ControlPoints, _u: f64, _v: f64) -> Result<Vec3> {
        Err(PatchError::Unsupported {
            operation: "evaluate_du",
            kind: PatchKind::Gregory,
        })
    }

    fn evaluate_dv(&self, _points: &ControlPoints, _u: f64, _v: f64) -> Result<Vec3> {
        Err(PatchError::Unsupported {
            operation: "evaluate_dv",
            kind: PatchKind::Gregory,
        })
    }
}
