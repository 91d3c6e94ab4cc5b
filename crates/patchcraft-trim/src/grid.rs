//! Square boolean occupancy grids.

use std::collections::VecDeque;

use patchcraft_math::Point2;

/// A square boolean matrix over the parameter domain `[0, 1]²` of a surface.
///
/// Cell `(x, y)` covers `[x / res, (x + 1) / res) × [y / res, (y + 1) / res)`,
/// with `x` along u and `y` along v. `true` keeps the cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimGrid {
    resolution: usize,
    cells: Vec<bool>,
}

impl TrimGrid {
    /// Grid with every cell set to `value`.
    ///
    /// A zero resolution is clamped to 1.
    pub fn filled(resolution: usize, value: bool) -> Self {
        let resolution = clamp_resolution(resolution);
        Self {
            resolution,
            cells: vec![value; resolution * resolution],
        }
    }

    /// Grid whose cell `(x, y)` is `f(x, y)`.
    pub fn from_fn(resolution: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let resolution = clamp_resolution(resolution);
        let mut cells = Vec::with_capacity(resolution * resolution);
        for x in 0..resolution {
            for y in 0..resolution {
                cells.push(f(x, y));
            }
        }
        Self { resolution, cells }
    }

    /// Number of cells along each axis.
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Cell value; out-of-range cells read as cut away.
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.resolution || y >= self.resolution {
            return false;
        }
        self.cells[x * self.resolution + y]
    }

    /// Set a cell; out-of-range writes are ignored.
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        if x < self.resolution && y < self.resolution {
            self.cells[x * self.resolution + y] = value;
        }
    }

    /// Number of kept cells.
    pub fn kept_cells(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Swap kept and cut cells.
    pub fn invert(&mut self) {
        for c in &mut self.cells {
            *c = !*c;
        }
    }

    /// The cell containing parameter point `p`, clamped into the grid.
    pub fn cell_at(&self, p: Point2) -> (usize, usize) {
        (self.axis_cell(p.x), self.axis_cell(p.y))
    }

    fn axis_cell(&self, t: f64) -> usize {
        let scaled = (t * self.resolution as f64).floor();
        if scaled.is_nan() || scaled < 0.0 {
            0
        } else {
            (scaled as usize).min(self.resolution - 1)
        }
    }

    /// Set every cell crossed by the polyline through `points` to `value`.
    ///
    /// Segments are walked in half-cell steps so consecutive marked cells
    /// stay 4-connected, which keeps a closed curve watertight for
    /// [`flood_fill`](Self::flood_fill).
    pub fn rasterize_polyline(&mut self, points: &[Point2], value: bool) {
        if let [only] = points {
            let (x, y) = self.cell_at(*only);
            self.set(x, y, value);
            return;
        }
        for seg in points.windows(2) {
            let (a, b) = (seg[0], seg[1]);
            let cells = (b - a).abs().max() * self.resolution as f64;
            let steps = (cells * 2.0).ceil().max(1.0) as usize;
            let mut prev = self.cell_at(a);
            self.set(prev.0, prev.1, value);
            for k in 1..=steps {
                let p = a + (b - a) * (k as f64 / steps as f64);
                let cur = self.cell_at(p);
                if cur.0 != prev.0 && cur.1 != prev.1 {
                    // diagonal step: close the corner
                    self.set(cur.0, prev.1, value);
                }
                self.set(cur.0, cur.1, value);
                prev = cur;
            }
        }
    }

    /// Set the 4-connected region of equal cells containing `seed` to `value`.
    ///
    /// Returns the number of cells changed.
    pub fn flood_fill(&mut self, seed: Point2, value: bool) -> usize {
        let start = self.cell_at(seed);
        let target = self.get(start.0, start.1);
        if target == value {
            return 0;
        }
        let res = self.resolution;
        let mut changed = 0;
        let mut queue = VecDeque::from([start]);
        self.set(start.0, start.1, value);
        while let Some((x, y)) = queue.pop_front() {
            changed += 1;
            let neighbors = [
                (x.wrapping_sub(1), y),
                (x + 1, y),
                (x, y.wrapping_sub(1)),
                (x, y + 1),
            ];
            for (nx, ny) in neighbors {
                if nx < res && ny < res && self.get(nx, ny) == target {
                    self.set(nx, ny, value);
                    queue.push_back((nx, ny));
                }
            }
        }
        log::debug!("flood fill from {:?} changed {} cells", start, changed);
        changed
    }
}

fn clamp_resolution(resolution: usize) -> usize {
    if resolution == 0 {
        log::warn!("trimming grid resolution 0 clamped to 1");
        1
    } else {
        resolution
    }
}
