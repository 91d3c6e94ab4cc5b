//! Parametric construction of surfaces.

use std::f64::consts::TAU;

use patchcraft_math::{Point3, Transform, Vec3};

use crate::grid::SurfaceKind;

/// Base shape of a new surface, in local coordinates centred on the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceShape {
    /// Rectangle in the XZ plane; u runs along x, v along z.
    Flat {
        /// Extent along x.
        width: f64,
        /// Extent along z.
        depth: f64,
    },
    /// Open tube around the y axis; u runs along y, v around the axis.
    /// The seam is closed by sharing control points.
    Cylinder {
        /// Distance of the control points from the axis.
        radius: f64,
        /// Extent along y.
        height: f64,
    },
}

/// Everything needed to build a surface from scratch.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceDescriptor {
    /// Bézier or B-spline.
    pub kind: SurfaceKind,
    /// Base shape.
    pub shape: SurfaceShape,
    /// Patches along u.
    pub patches_u: usize,
    /// Patches along v.
    pub patches_v: usize,
    /// World position of the local origin.
    pub position: Point3,
    /// Euler angles in radians.
    pub rotation: Vec3,
    /// Per-axis scale applied to the local grid.
    pub scale: Vec3,
    /// Tessellation resolution; the model default when `None`.
    pub resolution: Option<(usize, usize)>,
}

impl SurfaceDescriptor {
    /// Flat sheet of `patches_u × patches_v` patches.
    pub fn flat(kind: SurfaceKind, patches_u: usize, patches_v: usize, width: f64, depth: f64) -> Self {
        Self::with_shape(kind, SurfaceShape::Flat { width, depth }, patches_u, patches_v)
    }

    /// Cylinder of `patches_u` rings of `patches_v` patches.
    pub fn cylinder(kind: SurfaceKind, patches_u: usize, patches_v: usize, radius: f64, height: f64) -> Self {
        Self::with_shape(kind, SurfaceShape::Cylinder { radius, height }, patches_u, patches_v)
    }

    fn with_shape(kind: SurfaceKind, shape: SurfaceShape, patches_u: usize, patches_v: usize) -> Self {
        Self {
            kind,
            shape,
            patches_u,
            patches_v,
            position: Point3::origin(),
            rotation: Vec3::zeros(),
            scale: Vec3::repeat(1.0),
            resolution: None,
        }
    }

    /// Place at `position`.
    pub fn at(mut self, position: Point3) -> Self {
        self.position = position;
        self
    }

    /// Rotate by Euler angles `rotation`.
    pub fn rotated(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    /// Scale the local grid.
    pub fn scaled(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Override the tessellation resolution.
    pub fn with_resolution(mut self, u: usize, v: usize) -> Self {
        self.resolution = Some((u, v));
        self
    }

    /// Patch counts after clamping to what the shape supports.
    pub fn patch_counts(&self) -> (usize, usize) {
        let min_v = match (self.shape, self.kind) {
            // a closed B-spline ring needs three distinct columns
            (SurfaceShape::Cylinder { .. }, SurfaceKind::BSpline) => 3,
            _ => 1,
        };
        (self.patches_u.max(1), self.patches_v.max(min_v))
    }

    /// Local control grid: `(rows, cols, positions, distinct_cols)`.
    ///
    /// `positions` holds `rows × distinct_cols` points row-major; column `c`
    /// of the grid uses distinct column `c % distinct_cols`, so closed
    /// shapes share their seam.
    pub(crate) fn local_grid(&self) -> LocalGrid {
        let (pu, pv) = self.patch_counts();
        if (pu, pv) != (self.patches_u, self.patches_v) {
            log::warn!(
                "patch counts {}x{} clamped to {pu}x{pv}",
                self.patches_u,
                self.patches_v
            );
        }
        let rows = self.kind.dimension_for(pu);
        let cols = self.kind.dimension_for(pv);
        let scaling = Transform::scale(self.scale.x, self.scale.y, self.scale.z);
        let scale = |p: Point3| scaling.apply_point(&p);

        match self.shape {
            SurfaceShape::Flat { width, depth } => {
                let mut positions = Vec::with_capacity(rows * cols);
                for i in 0..rows {
                    let x = width * (i as f64 / (rows - 1) as f64 - 0.5);
                    for j in 0..cols {
                        let z = depth * (j as f64 / (cols - 1) as f64 - 0.5);
                        positions.push(scale(Point3::new(x, 0.0, z)));
                    }
                }
                LocalGrid {
                    rows,
                    cols,
                    distinct_cols: cols,
                    positions,
                }
            }
            SurfaceShape::Cylinder { radius, height } => {
                let distinct_cols = match self.kind {
                    SurfaceKind::Bezier => 3 * pv,
                    SurfaceKind::BSpline => pv,
                };
                let mut positions = Vec::with_capacity(rows * distinct_cols);
                for i in 0..rows {
                    let y = height * (i as f64 / (rows - 1) as f64 - 0.5);
                    for j in 0..distinct_cols {
                        let angle = TAU * j as f64 / distinct_cols as f64;
                        positions.push(scale(Point3::new(radius * angle.cos(), y, radius * angle.sin())));
                    }
                }
                LocalGrid {
                    rows,
                    cols,
                    distinct_cols,
                    positions,
                }
            }
        }
    }
}

pub(crate) struct LocalGrid {
    pub rows: usize,
    pub cols: usize,
    pub distinct_cols: usize,
    pub positions: Vec<Point3>,
}
