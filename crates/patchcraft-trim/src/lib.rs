#![warn(missing_docs)]

//! Trimming for patchcraft surfaces.
//!
//! A surface carries zero or more [`TrimGrid`]s, square boolean occupancy
//! matrices over the surface's whole parameter domain. A cell set to `true`
//! is kept, `false` is cut away. The [`TrimComposer`] turns the grids of a
//! surface into one [`TrimPredicate`] per patch, which answers whether a
//! patch-local `(u, v)` survives every grid.

mod grid;

pub use grid::TrimGrid;

use std::sync::Arc;

/// Map a patch-local coordinate to a trimming-grid cell along one axis.
///
/// `floor(((total - 1 - patch_index) + coord) / total * resolution)`,
/// clamped to `[0, resolution - 1]`. Patch indices run against the grid
/// axis: patch `total - 1` covers the start of the grid.
pub fn cell_index(total: usize, patch_index: usize, coord: f64, resolution: usize) -> usize {
    if resolution == 0 {
        return 0;
    }
    let total = total.max(1);
    let offset = (total - 1).saturating_sub(patch_index) as f64;
    let scaled = ((offset + coord) / total as f64 * resolution as f64).floor();
    if scaled.is_nan() || scaled < 0.0 {
        0
    } else {
        (scaled as usize).min(resolution - 1)
    }
}

/// Builds per-patch trimming predicates for one surface.
#[derive(Debug, Clone)]
pub struct TrimComposer {
    grids: Arc<[TrimGrid]>,
    patches_u: usize,
    patches_v: usize,
}

impl TrimComposer {
    /// Composer over `grids` for a surface with `patches_u × patches_v` patches.
    pub fn new(grids: impl Into<Arc<[TrimGrid]>>, patches_u: usize, patches_v: usize) -> Self {
        Self {
            grids: grids.into(),
            patches_u: patches_u.max(1),
            patches_v: patches_v.max(1),
        }
    }

    /// Composer without any trimming grid.
    pub fn untrimmed(patches_u: usize, patches_v: usize) -> Self {
        Self::new(Vec::new(), patches_u, patches_v)
    }

    /// The grids this composer combines.
    pub fn grids(&self) -> &[TrimGrid] {
        &self.grids
    }

    /// Predicate for the patch at `(patch_u, patch_v)`.
    pub fn predicate(&self, patch_u: usize, patch_v: usize) -> TrimPredicate {
        TrimPredicate {
            grids: Arc::clone(&self.grids),
            patch_u,
            patch_v,
            total_u: self.patches_u,
            total_v: self.patches_v,
        }
    }
}

/// Inclusion test over patch-local `(u, v) ∈ [0, 1]²`.
///
/// Accepts a parameter only if every grid keeps the cell it falls in, so the
/// regions cut by the individual grids add up.
#[derive(Debug, Clone)]
pub struct TrimPredicate {
    grids: Arc<[TrimGrid]>,
    patch_u: usize,
    patch_v: usize,
    total_u: usize,
    total_v: usize,
}

impl TrimPredicate {
    /// Predicate that accepts every parameter.
    pub fn always() -> Self {
        Self {
            grids: Arc::from(Vec::new()),
            patch_u: 0,
            patch_v: 0,
            total_u: 1,
            total_v: 1,
        }
    }

    /// Whether no grid takes part in this predicate.
    pub fn is_trivial(&self) -> bool {
        self.grids.is_empty()
    }

    /// Whether `(u, v)` survives every trimming grid.
    pub fn accepts(&self, u: f64, v: f64) -> bool {
        self.grids.iter().all(|grid| {
            let res = grid.resolution();
            let x = cell_index(self.total_u, self.patch_u, u, res);
            let y = cell_index(self.total_v, self.patch_v, v, res);
            grid.get(x, y)
        })
    }

    /// Borrow this predicate as a closure.
    pub fn as_fn(&self) -> impl Fn(f64, f64) -> bool + '_ {
        move |u, v| self.accepts(u, v)
    }
}

impl Default for TrimPredicate {
    fn default() -> Self {
        Self::always()
    }
}
