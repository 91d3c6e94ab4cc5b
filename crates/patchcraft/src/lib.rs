#![warn(missing_docs)]

//! Parametric surface patches: Bézier, B-spline and Gregory.
//!
//! Surfaces are grids of bicubic patches over shared control points. Points
//! of different surfaces can be fused into one, surfaces can be trimmed by
//! boolean grids, moved and rotated as a whole, and triangular holes
//! between three Bézier surfaces can be closed with Gregory patches.
//!
//! # Example
//!
//! ```
//! use patchcraft::prelude::*;
//!
//! let mut model = SurfaceModel::new();
//! let sheet = model.add_surface(&SurfaceDescriptor::flat(SurfaceKind::Bezier, 1, 1, 3.0, 3.0));
//! let tube = model.add_surface(
//!     &SurfaceDescriptor::cylinder(SurfaceKind::BSpline, 2, 4, 1.0, 2.0).at(Point3::new(0.0, 2.0, 0.0)),
//! );
//!
//! // cut away the half of the sheet with u < 0.5
//! model.add_trim(sheet, TrimGrid::from_fn(2, |x, _| x == 1)).unwrap();
//! assert_eq!(model.evaluate(sheet, 0, 0, 0.25, 0.5).unwrap(), None);
//!
//! model.set_rotation(tube, Vec3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2)).unwrap();
//! let mesh = model.tessellate(tube).unwrap();
//! assert_eq!(mesh.num_triangles(), 2 * 4 * 8 * 8 * 2);
//! ```

pub use patchcraft_basis;
pub use patchcraft_math;
pub use patchcraft_patch;
pub use patchcraft_surface;
pub use patchcraft_trim;

pub use patchcraft_math::{Point2, Point3, Transform, Vec3};
pub use patchcraft_patch::{
    ControlPoint, ControlPoints, GregoryPatch, Patch, PatchError, PatchKind, PointId, SinglePatch,
    SurfaceId, SurfaceSample,
};
pub use patchcraft_surface::{
    BorderRef, ChangeEvent, ChangeKind, ChangeSource, FillId, GridIndex, ListenerId, Surface,
    SurfaceDescriptor, SurfaceError, SurfaceKind, SurfaceMesh, SurfaceModel, SurfaceSettings,
    SurfaceShape,
};
pub use patchcraft_trim::{TrimComposer, TrimGrid, TrimPredicate};

/// The types most programs need.
pub mod prelude {
    pub use patchcraft_math::{Point2, Point3, Vec3};
    pub use patchcraft_patch::{Patch, PointId, SurfaceId};
    pub use patchcraft_surface::{
        BorderRef, ChangeEvent, ChangeKind, GridIndex, SurfaceDescriptor, SurfaceKind,
        SurfaceModel, SurfaceSettings,
    };
    pub use patchcraft_trim::TrimGrid;
}
