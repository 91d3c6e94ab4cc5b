//! Gregory fills for triangular holes between Bézier surfaces.
//!
//! Three borders, each one patch edge long, close a hole when each ends
//! where the next starts. The fill splits every border at its midpoint and
//! builds one Gregory patch per hole corner:
//!
//! ```text
//!            C2
//!           /  \
//!      P0_1      P0_2        P0_k  midpoint of border k
//!       / \ p2 / \           P     center
//!      /    P     \          patch k sits at C_k, the end of border k
//!     / p0  |  p1  \
//!   C0 --- P0_0 --- C1
//! ```
//!
//! Boundary curves come from the surfaces' border queries, so positions
//! match exactly; inner twins come from their cross derivatives.

use patchcraft_math::{Point3, Vec3};
use patchcraft_patch::{ControlPoints, GregoryCorner, GregoryPatch, SurfaceId};
use slotmap::{new_key_type, SlotMap};

use crate::grid::GridIndex;
use crate::settings::SurfaceSettings;
use crate::surface::Surface;
use crate::{Result, SurfaceError};

new_key_type! {
    /// Handle to a Gregory fill in a model.
    pub struct FillId;
}

/// One boundary edge of a surface, walked from `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderRef {
    /// Surface the edge belongs to.
    pub surface: SurfaceId,
    /// Grid index where the edge starts.
    pub from: GridIndex,
    /// Grid index where the edge ends.
    pub to: GridIndex,
}

impl BorderRef {
    /// Border of `surface` from `from` to `to`.
    pub fn new(surface: SurfaceId, from: GridIndex, to: GridIndex) -> Self {
        Self { surface, from, to }
    }

    fn span(&self) -> usize {
        self.from.row.abs_diff(self.to.row) + self.from.col.abs_diff(self.to.col)
    }
}

/// A set of Gregory patches filling the hole bounded by three borders.
#[derive(Debug, Clone)]
pub struct GregoryFill {
    borders: [BorderRef; 3],
    patches: Vec<GregoryPatch>,
}

impl GregoryFill {
    pub(crate) fn new(borders: [BorderRef; 3], patches: Vec<GregoryPatch>) -> Self {
        Self { borders, patches }
    }

    /// The bounding borders, in hole order.
    pub fn borders(&self) -> &[BorderRef; 3] {
        &self.borders
    }

    /// One patch per hole corner; empty while the hole is broken.
    pub fn patches(&self) -> &[GregoryPatch] {
        &self.patches
    }

    /// Whether `surface` bounds this hole.
    pub fn depends_on(&self, surface: SurfaceId) -> bool {
        self.borders.iter().any(|b| b.surface == surface)
    }

    pub(crate) fn set_patches(&mut self, patches: Vec<GregoryPatch>) {
        self.patches = patches;
    }
}

/// Split a cubic Bézier at 1/2 (de Casteljau).
fn split_cubic(c: &[Point3; 4]) -> ([Point3; 4], [Point3; 4]) {
    let m01 = nalgebra::center(&c[0], &c[1]);
    let m12 = nalgebra::center(&c[1], &c[2]);
    let m23 = nalgebra::center(&c[2], &c[3]);
    let a = nalgebra::center(&m01, &m12);
    let b = nalgebra::center(&m12, &m23);
    let mid = nalgebra::center(&a, &b);
    ([c[0], m01, a, mid], [mid, b, m23, c[3]])
}

/// What the fill needs to know about one border.
struct BorderSide {
    left: [Point3; 4],
    right: [Point3; 4],
    /// Cross derivative into the hole at `t = i / 6`, scaled to a control
    /// offset.
    cross: [Vec3; 7],
}

fn border_side(
    border: &BorderRef,
    surfaces: &SlotMap<SurfaceId, Surface>,
    points: &ControlPoints,
    scale: f64,
) -> Result<BorderSide> {
    let surface = surfaces
        .get(border.surface)
        .ok_or(SurfaceError::SurfaceNotFound(border.surface))?;
    if border.span() != 3 {
        return Err(SurfaceError::InvalidBorder {
            from: border.from,
            to: border.to,
        });
    }
    let (from, to) = (border.from, border.to);
    let b0 = surface.border_value(points, from, to, 0.0)?;
    let b3 = surface.border_value(points, from, to, 1.0)?;
    let t0 = surface.border_tangent(points, from, to, 0.0)?;
    let t1 = surface.border_tangent(points, from, to, 1.0)?;
    let (left, right) = split_cubic(&[b0, b0 + t0 / 3.0, b3 - t1 / 3.0, b3]);

    let mut cross = [Vec3::zeros(); 7];
    for (i, d) in cross.iter_mut().enumerate() {
        *d = surface.border_derivative(points, from, to, i as f64 / 6.0)? * scale;
    }
    Ok(BorderSide { left, right, cross })
}

/// Build the three Gregory patches for the hole bounded by `borders`.
pub(crate) fn build_fill(
    borders: &[BorderRef; 3],
    surfaces: &SlotMap<SurfaceId, Surface>,
    points: &ControlPoints,
    settings: &SurfaceSettings,
) -> Result<Vec<GregoryPatch>> {
    let mut sides = Vec::with_capacity(3);
    for border in borders {
        sides.push(border_side(border, surfaces, points, settings.cross_derivative_scale)?);
    }

    for k in 0..3 {
        let end = sides[k].right[3];
        let start = sides[(k + 1) % 3].left[0];
        let gap = (end - start).norm();
        if gap > settings.closure_tolerance {
            return Err(SurfaceError::HoleNotClosed { border: k, gap });
        }
    }

    // radial curves from each border midpoint to the center
    let mut p0 = [Point3::origin(); 3];
    let mut p1 = [Point3::origin(); 3];
    let mut q = [Vec3::zeros(); 3];
    for (k, side) in sides.iter().enumerate() {
        p0[k] = side.left[3];
        p1[k] = p0[k] + side.cross[3];
        q[k] = (p1[k].coords * 3.0 - p0[k].coords) / 2.0;
    }
    let center = Point3::from((q[0] + q[1] + q[2]) / 3.0);
    let p2: [Point3; 3] = std::array::from_fn(|k| Point3::from((q[k] * 2.0 + center.coords) / 3.0));

    let mut patches = Vec::with_capacity(3);
    for k in 0..3 {
        let j = (k + 1) % 3;
        let (here, next) = (&sides[k], &sides[j]);
        let mut g = [[Point3::origin(); 4]; 4];
        for i in 0..4 {
            g[i][0] = next.left[i];
            g[0][i] = here.right[3 - i];
        }
        g[3] = [p0[j], p1[j], p2[j], center];
        for (i, p) in [p0[k], p1[k], p2[k], center].into_iter().enumerate() {
            g[i][3] = p;
        }

        let corners = [
            GregoryCorner {
                v_boundary: g[1][0] + next.cross[1],
                u_boundary: g[0][1] + here.cross[5],
            },
            GregoryCorner {
                v_boundary: g[1][3] + (g[0][2] - g[0][3]),
                u_boundary: g[0][2] + here.cross[4],
            },
            GregoryCorner {
                v_boundary: g[2][0] + next.cross[2],
                u_boundary: g[3][1] + (g[2][0] - g[3][0]),
            },
            GregoryCorner {
                v_boundary: g[2][3] + (g[3][2] - g[3][3]),
                u_boundary: g[3][2] + (g[2][3] - g[3][3]),
            },
        ];
        for (c, (i, jj)) in corners.iter().zip(patchcraft_patch::INNER_POINTS) {
            g[i][jj] = nalgebra::center(&c.v_boundary, &c.u_boundary);
        }
        patches.push(GregoryPatch::new(g, corners));
    }
    log::debug!("built gregory fill with center {center}");
    Ok(patches)
}
