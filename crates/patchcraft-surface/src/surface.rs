//! Multi-patch surfaces over a shared control grid.

use patchcraft_math::{Point3, Vec3};
use patchcraft_patch::{
    BSplinePatch, BezierPatch, ControlPoints, Patch, PointId, SinglePatch,
};
use patchcraft_trim::{TrimComposer, TrimGrid};

use crate::grid::{GridIndex, PointGrid, SurfaceKind};
use crate::transform::TransformState;
use crate::{Result, SurfaceError};

/// Parameter direction along a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Along {
    U,
    V,
}

/// Where a border query lands on the patch grid.
#[derive(Debug, Clone, Copy)]
struct BorderLocation {
    patch_u: usize,
    patch_v: usize,
    u: f64,
    v: f64,
    along: Along,
    /// d(patch param)/dt, signed by the walking direction.
    tangent_scale: f64,
    /// +1 when increasing the cross parameter leaves the surface.
    outward: f64,
}

/// A surface made of a grid of bicubic patches.
///
/// The grid holds ids into the model's [`ControlPoints`]; single patches
/// are derived from it and rebuilt whenever the grid or the trims change.
#[derive(Debug, Clone)]
pub struct Surface {
    kind: SurfaceKind,
    grid: PointGrid,
    resolution: (usize, usize),
    trims: Vec<TrimGrid>,
    patches: Vec<SinglePatch>,
    transform: TransformState,
}

impl Surface {
    pub(crate) fn new(
        kind: SurfaceKind,
        grid: PointGrid,
        transform: TransformState,
        resolution: (usize, usize),
    ) -> Self {
        let mut surface = Self {
            kind,
            grid,
            resolution: (resolution.0.max(1), resolution.1.max(1)),
            trims: Vec::new(),
            patches: Vec::new(),
            transform,
        };
        surface.rebuild();
        surface
    }

    /// Bézier or B-spline.
    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    /// The control grid.
    pub fn grid(&self) -> &PointGrid {
        &self.grid
    }

    /// Patches along u and v.
    pub fn patch_counts(&self) -> (usize, usize) {
        (
            self.kind.patch_count(self.grid.rows()),
            self.kind.patch_count(self.grid.cols()),
        )
    }

    /// All derived patches, `patch_u`-major.
    pub fn patches(&self) -> &[SinglePatch] {
        &self.patches
    }

    /// Patch at `(patch_u, patch_v)`.
    pub fn patch(&self, patch_u: usize, patch_v: usize) -> Option<&SinglePatch> {
        let (nu, nv) = self.patch_counts();
        if patch_u >= nu || patch_v >= nv {
            return None;
        }
        self.patches.get(patch_u * nv + patch_v)
    }

    /// Tessellation segments per patch.
    pub fn resolution(&self) -> (usize, usize) {
        self.resolution
    }

    pub(crate) fn set_resolution(&mut self, u: usize, v: usize) -> bool {
        if u == 0 || v == 0 {
            log::warn!("resolution {u}x{v} clamped to at least 1");
        }
        let resolution = (u.max(1), v.max(1));
        let changed = resolution != self.resolution;
        self.resolution = resolution;
        changed
    }

    /// Trimming grids.
    pub fn trims(&self) -> &[TrimGrid] {
        &self.trims
    }

    pub(crate) fn set_trims(&mut self, trims: Vec<TrimGrid>) {
        self.trims = trims;
        self.rebuild();
    }

    /// Pose and baseline.
    pub fn transform(&self) -> &TransformState {
        &self.transform
    }

    pub(crate) fn transform_mut(&mut self) -> &mut TransformState {
        &mut self.transform
    }

    /// Derive single patches from the grid and trims.
    pub(crate) fn rebuild(&mut self) {
        let (nu, nv) = self.patch_counts();
        let composer = TrimComposer::new(self.trims.clone(), nu, nv);
        let mut patches = Vec::with_capacity(nu * nv);
        for pu in 0..nu {
            for pv in 0..nv {
                let window = self
                    .grid
                    .window(self.kind.window_start(pu), self.kind.window_start(pv));
                let trim = composer.predicate(pu, pv);
                patches.push(match self.kind {
                    SurfaceKind::Bezier => BezierPatch::with_trim(window, trim).into(),
                    SurfaceKind::BSpline => BSplinePatch::with_trim(window, trim).into(),
                });
            }
        }
        self.patches = patches;
    }

    /// Replace `old` with `new` in the grid and every patch.
    pub(crate) fn substitute(&mut self, old: PointId, new: PointId) -> usize {
        let count = self.grid.substitute(old, new);
        for patch in &mut self.patches {
            patch.substitute(old, new);
        }
        count
    }

    /// Position of `point` in the grid, or `None` if this surface does not
    /// reference it.
    pub fn grid_index_of(&self, point: PointId) -> Option<GridIndex> {
        self.grid.index_of(point)
    }

    /// Sum of the grid positions divided by 16.
    ///
    /// This equals the mean only for a single 4x4 patch; larger grids give a
    /// proportionally scaled reference point.
    pub fn centroid(&self, points: &ControlPoints) -> Point3 {
        let sum = self
            .grid
            .ids()
            .iter()
            .filter_map(|&id| points.position(id))
            .fold(Vec3::zeros(), |acc, p| acc + p.coords);
        Point3::from(sum / 16.0)
    }

    fn locate_border(&self, from: GridIndex, to: GridIndex, t: f64) -> Result<BorderLocation> {
        if self.kind != SurfaceKind::Bezier {
            return Err(SurfaceError::Unsupported {
                operation: "border query",
                kind: self.kind,
            });
        }
        for index in [from, to] {
            if !self.grid.contains(index) {
                return Err(SurfaceError::IndexOutOfRange(index));
            }
        }
        let max = self.grid.max_index();
        let (nu, nv) = self.patch_counts();
        let t = t.clamp(0.0, 1.0);

        // (fixed patch, fixed param, outward sign) for a boundary at `index` of `last`
        let fixed = |index: usize, last: usize, count: usize| {
            if index == 0 {
                (0, 0.0, -1.0)
            } else {
                debug_assert_eq!(index, last);
                (count - 1, 1.0, 1.0)
            }
        };
        // (patch, local param, signed span) walking from `a` to `b`
        let walk = |a: usize, b: usize, count: usize| {
            let forward = a < b;
            let (lo, hi) = if forward { (a, b) } else { (b, a) };
            let lo = lo as f64 / 3.0;
            let hi = hi as f64 / 3.0;
            let param = if forward { t } else { 1.0 - t };
            let s = lo + param * (hi - lo);
            let patch = (s.floor().max(0.0) as usize).min(count - 1);
            let sign = if forward { 1.0 } else { -1.0 };
            (patch, s - patch as f64, sign * (hi - lo))
        };

        if from.row == to.row && from.col != to.col && (from.row == 0 || from.row == max.row) {
            let (patch_u, u, outward) = fixed(from.row, max.row, nu);
            let (patch_v, v, tangent_scale) = walk(from.col, to.col, nv);
            Ok(BorderLocation {
                patch_u,
                patch_v,
                u,
                v,
                along: Along::V,
                tangent_scale,
                outward,
            })
        } else if from.col == to.col && from.row != to.row && (from.col == 0 || from.col == max.col) {
            let (patch_v, v, outward) = fixed(from.col, max.col, nv);
            let (patch_u, u, tangent_scale) = walk(from.row, to.row, nu);
            Ok(BorderLocation {
                patch_u,
                patch_v,
                u,
                v,
                along: Along::U,
                tangent_scale,
                outward,
            })
        } else {
            Err(SurfaceError::NotABoundary { from, to })
        }
    }

    fn border_patch(&self, loc: &BorderLocation) -> Result<&SinglePatch> {
        self.patch(loc.patch_u, loc.patch_v)
            .ok_or(SurfaceError::PatchOutOfRange {
                patch_u: loc.patch_u,
                patch_v: loc.patch_v,
            })
    }

    /// Position on the boundary edge from `from` to `to` at `t ∈ [0, 1]`.
    ///
    /// `t = 0` is at `from`. The edge may span several patches.
    pub fn border_value(
        &self,
        points: &ControlPoints,
        from: GridIndex,
        to: GridIndex,
        t: f64,
    ) -> Result<Point3> {
        let loc = self.locate_border(from, to, t)?;
        Ok(self.border_patch(&loc)?.evaluate(points, loc.u, loc.v))
    }

    /// Derivative along the edge with respect to `t`.
    pub fn border_tangent(
        &self,
        points: &ControlPoints,
        from: GridIndex,
        to: GridIndex,
        t: f64,
    ) -> Result<Vec3> {
        let loc = self.locate_border(from, to, t)?;
        let patch = self.border_patch(&loc)?;
        let d = match loc.along {
            Along::U => patch.evaluate_du(points, loc.u, loc.v)?,
            Along::V => patch.evaluate_dv(points, loc.u, loc.v)?,
        };
        Ok(d * loc.tangent_scale)
    }

    /// Cross-boundary derivative at `t`, pointing away from the surface.
    pub fn border_derivative(
        &self,
        points: &ControlPoints,
        from: GridIndex,
        to: GridIndex,
        t: f64,
    ) -> Result<Vec3> {
        let loc = self.locate_border(from, to, t)?;
        let patch = self.border_patch(&loc)?;
        let d = match loc.along {
            Along::U => patch.evaluate_dv(points, loc.u, loc.v)?,
            Along::V => patch.evaluate_du(points, loc.u, loc.v)?,
        };
        Ok(d * loc.outward)
    }
}
