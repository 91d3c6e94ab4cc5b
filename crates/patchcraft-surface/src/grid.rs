//! Control-point grids and the rules that split them into patches.

use std::collections::HashSet;

use patchcraft_patch::{PatchKind, PointId};

/// Position of a control point in a surface grid.
///
/// `row` runs along u, `col` along v.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridIndex {
    /// Row index (u direction).
    pub row: usize,
    /// Column index (v direction).
    pub col: usize,
}

impl GridIndex {
    /// Index at `(row, col)`.
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// How a surface cuts its grid into patches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    /// Bézier patches on disjoint windows sharing boundary rows (C0).
    /// Dimensions are `3k + 1`.
    Bezier,
    /// B-spline patches on windows advancing by one row (C2).
    /// Dimensions are at least 4.
    BSpline,
}

impl SurfaceKind {
    /// Kind of the single patches this surface derives.
    pub fn patch_kind(self) -> PatchKind {
        match self {
            SurfaceKind::Bezier => PatchKind::Bezier,
            SurfaceKind::BSpline => PatchKind::BSpline,
        }
    }

    /// Patches along an axis with `dimension` control points.
    pub fn patch_count(self, dimension: usize) -> usize {
        match self {
            SurfaceKind::Bezier => dimension.saturating_sub(1) / 3,
            SurfaceKind::BSpline => dimension.saturating_sub(3),
        }
    }

    /// Control points needed along an axis for `patches` patches.
    pub fn dimension_for(self, patches: usize) -> usize {
        match self {
            SurfaceKind::Bezier => 3 * patches + 1,
            SurfaceKind::BSpline => patches + 3,
        }
    }

    /// First grid row/column of patch `patch`'s window.
    pub fn window_start(self, patch: usize) -> usize {
        match self {
            SurfaceKind::Bezier => 3 * patch,
            SurfaceKind::BSpline => patch,
        }
    }

    /// Largest valid dimension not exceeding `available`, or `None` below 4.
    pub fn fit_dimension(self, available: usize) -> Option<usize> {
        if available < 4 {
            return None;
        }
        Some(match self {
            SurfaceKind::Bezier => available - (available - 1) % 3,
            SurfaceKind::BSpline => available,
        })
    }
}

/// Row-major grid of control-point ids.
///
/// The flattened id list is the surface's point list; the same id may
/// appear more than once (closed seams, points fused within one surface).
#[derive(Debug, Clone, PartialEq)]
pub struct PointGrid {
    rows: usize,
    cols: usize,
    ids: Vec<PointId>,
}

impl PointGrid {
    /// Grid of `rows × cols` ids in row-major order.
    ///
    /// # Panics
    /// Panics if `ids.len() != rows * cols`.
    pub fn new(rows: usize, cols: usize, ids: Vec<PointId>) -> Self {
        assert_eq!(
            ids.len(),
            rows * cols,
            "grid id count mismatch: {} != {} * {}",
            ids.len(),
            rows,
            cols
        );
        Self { rows, cols, ids }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Last valid index.
    pub fn max_index(&self) -> GridIndex {
        GridIndex::new(self.rows - 1, self.cols - 1)
    }

    /// Whether `index` lies inside the grid.
    pub fn contains(&self, index: GridIndex) -> bool {
        index.row < self.rows && index.col < self.cols
    }

    /// Id at `index`.
    pub fn get(&self, index: GridIndex) -> Option<PointId> {
        self.contains(index)
            .then(|| self.ids[index.row * self.cols + index.col])
    }

    /// Flattened ids, row-major.
    pub fn ids(&self) -> &[PointId] {
        &self.ids
    }

    /// Each id once, in first-occurrence order.
    pub fn unique_ids(&self) -> Vec<PointId> {
        let mut seen = HashSet::new();
        self.ids.iter().copied().filter(|id| seen.insert(*id)).collect()
    }

    /// First position of `id`, scanning row-major.
    pub fn index_of(&self, id: PointId) -> Option<GridIndex> {
        self.ids
            .iter()
            .position(|&p| p == id)
            .map(|k| GridIndex::new(k / self.cols, k % self.cols))
    }

    /// The 4x4 window whose first entry is `(row, col)`.
    ///
    /// # Panics
    /// Panics if the window leaves the grid.
    pub fn window(&self, row: usize, col: usize) -> [[PointId; 4]; 4] {
        std::array::from_fn(|i| std::array::from_fn(|j| self.ids[(row + i) * self.cols + col + j]))
    }

    /// Replace every occurrence of `old` with `new`; returns the count.
    pub fn substitute(&mut self, old: PointId, new: PointId) -> usize {
        let mut count = 0;
        for id in &mut self.ids {
            if *id == old {
                *id = new;
                count += 1;
            }
        }
        count
    }
}
