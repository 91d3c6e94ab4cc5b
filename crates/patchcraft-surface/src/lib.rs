#![warn(missing_docs)]

//! Multi-patch surfaces for patchcraft.
//!
//! A [`SurfaceModel`] owns every control point, surface and hole fill of a
//! scene. Surfaces reference points by id, so fusing two points is a
//! substitution of ids and the joined surfaces share one point afterwards.
//!
//! # Example
//!
//! ```
//! use patchcraft_math::Point3;
//! use patchcraft_surface::{SurfaceDescriptor, SurfaceKind, SurfaceModel};
//!
//! let mut model = SurfaceModel::new();
//! let id = model.add_surface(
//!     &SurfaceDescriptor::flat(SurfaceKind::Bezier, 2, 1, 6.0, 3.0).at(Point3::new(0.0, 1.0, 0.0)),
//! );
//! let mesh = model.tessellate(id).unwrap();
//! assert_eq!(mesh.num_triangles(), 2 * 8 * 8 * 2);
//! ```

mod descriptor;
mod events;
mod fill;
mod grid;
mod model;
mod sampling;
mod settings;
mod surface;
mod transform;

pub use descriptor::{SurfaceDescriptor, SurfaceShape};
pub use events::{ChangeEvent, ChangeKind, ChangeSource, ListenerId, Notifier};
pub use fill::{BorderRef, FillId, GregoryFill};
pub use grid::{GridIndex, PointGrid, SurfaceKind};
pub use model::SurfaceModel;
pub use sampling::{sample_patch, tessellate_patch, tessellate_patches, SurfaceMesh};
pub use settings::SurfaceSettings;
pub use surface::Surface;
pub use transform::{Baseline, TransformState};

use patchcraft_patch::{PatchError, PointId, SurfaceId};
use thiserror::Error;

/// Errors from surface operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurfaceError {
    /// A single patch rejected an operation.
    #[error(transparent)]
    Patch(#[from] PatchError),

    /// No surface with this id.
    #[error("surface {0:?} not found")]
    SurfaceNotFound(SurfaceId),

    /// No control point with this id.
    #[error("control point {0:?} not found")]
    PointNotFound(PointId),

    /// No fill with this id.
    #[error("fill {0:?} not found")]
    FillNotFound(FillId),

    /// Grid index outside the control grid.
    #[error("grid index ({}, {}) out of range", .0.row, .0.col)]
    IndexOutOfRange(GridIndex),

    /// Patch index outside the surface.
    #[error("patch ({patch_u}, {patch_v}) out of range")]
    PatchOutOfRange {
        /// Patch index along u.
        patch_u: usize,
        /// Patch index along v.
        patch_v: usize,
    },

    /// The two indices do not bound an edge on the grid boundary.
    #[error("({}, {}) -> ({}, {}) is not a boundary edge", .from.row, .from.col, .to.row, .to.col)]
    NotABoundary {
        /// Start of the rejected edge.
        from: GridIndex,
        /// End of the rejected edge.
        to: GridIndex,
    },

    /// The surface kind does not define this operation.
    #[error("{operation} is not supported by {kind:?} surfaces")]
    Unsupported {
        /// Name of the rejected operation.
        operation: &'static str,
        /// Kind of the surface that rejected it.
        kind: SurfaceKind,
    },

    /// A hole border does not span exactly one patch edge.
    #[error("border ({}, {}) -> ({}, {}) must span one patch edge", .from.row, .from.col, .to.row, .to.col)]
    InvalidBorder {
        /// Start of the rejected border.
        from: GridIndex,
        /// End of the rejected border.
        to: GridIndex,
    },

    /// Consecutive hole borders do not meet.
    #[error("border {border} ends {gap} away from the next border")]
    HoleNotClosed {
        /// Index of the border whose end misses the next start.
        border: usize,
        /// Distance between the two.
        gap: f64,
    },

    /// Fewer than four control points along an axis.
    #[error("control grid {rows}x{cols} is smaller than 4x4")]
    GridTooSmall {
        /// Rows supplied.
        rows: usize,
        /// Shortest row supplied.
        cols: usize,
    },

    /// Settings failed validation.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// Result type for surface operations.
pub type Result<T> = std::result::Result<T, SurfaceError>;
