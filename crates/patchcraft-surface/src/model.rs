//! The model: control points, surfaces and fills plus every mutation that
//! keeps them consistent.

use std::collections::HashMap;

use patchcraft_math::{Point3, Transform, Vec3};
use patchcraft_patch::{ControlPoint, ControlPoints, Patch, PointId, SurfaceId, SurfaceSample};
use patchcraft_trim::TrimGrid;
use slotmap::SlotMap;

use crate::descriptor::SurfaceDescriptor;
use crate::events::{ChangeEvent, ChangeKind, ListenerId, Notifier};
use crate::fill::{build_fill, BorderRef, FillId, GregoryFill};
use crate::grid::{GridIndex, PointGrid, SurfaceKind};
use crate::sampling::{sample_patch, tessellate_patches, SurfaceMesh};
use crate::settings::SurfaceSettings;
use crate::surface::Surface;
use crate::transform::{Baseline, TransformState};
use crate::{Result, SurfaceError};

/// Owner of every control point, surface and hole fill.
///
/// Mutations go through the model so that shared points, derived patches,
/// fills and listeners stay in step. Events for one mutation are emitted in
/// order: the point or surface that changed, then the surfaces referencing
/// it, then the fills bounded by those surfaces.
#[derive(Debug)]
pub struct SurfaceModel {
    settings: SurfaceSettings,
    points: ControlPoints,
    surfaces: SlotMap<SurfaceId, Surface>,
    fills: SlotMap<FillId, GregoryFill>,
    /// Ids retired by fusion, mapped to the live point that replaced them.
    replaced: HashMap<PointId, PointId>,
    notifier: Notifier,
}

impl Default for SurfaceModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceModel {
    /// Empty model with default settings.
    pub fn new() -> Self {
        Self::with_settings(SurfaceSettings::default())
    }

    /// Empty model; invalid settings are normalized.
    pub fn with_settings(settings: SurfaceSettings) -> Self {
        Self {
            settings: settings.normalized(),
            points: ControlPoints::new(),
            surfaces: SlotMap::with_key(),
            fills: SlotMap::with_key(),
            replaced: HashMap::new(),
            notifier: Notifier::new(),
        }
    }

    /// Settings in effect.
    pub fn settings(&self) -> &SurfaceSettings {
        &self.settings
    }

    /// Every live control point.
    pub fn points(&self) -> &ControlPoints {
        &self.points
    }

    /// The point `id` refers to, following fusions.
    pub fn point(&self, id: PointId) -> Result<&ControlPoint> {
        let id = self.resolve(id);
        self.points.get(id).ok_or(SurfaceError::PointNotFound(id))
    }

    /// The live id standing in for `id` after any number of fusions.
    pub fn resolve(&self, mut id: PointId) -> PointId {
        while let Some(&next) = self.replaced.get(&id) {
            id = next;
        }
        id
    }

    /// Look up a surface.
    pub fn surface(&self, id: SurfaceId) -> Result<&Surface> {
        self.surfaces.get(id).ok_or(SurfaceError::SurfaceNotFound(id))
    }

    fn surface_mut(&mut self, id: SurfaceId) -> Result<&mut Surface> {
        self.surfaces.get_mut(id).ok_or(SurfaceError::SurfaceNotFound(id))
    }

    /// Every surface.
    pub fn surfaces(&self) -> impl Iterator<Item = (SurfaceId, &Surface)> {
        self.surfaces.iter()
    }

    /// Look up a fill.
    pub fn fill(&self, id: FillId) -> Result<&GregoryFill> {
        self.fills.get(id).ok_or(SurfaceError::FillNotFound(id))
    }

    /// Every fill.
    pub fn fills(&self) -> impl Iterator<Item = (FillId, &GregoryFill)> {
        self.fills.iter()
    }

    /// Register a change listener.
    pub fn subscribe(&mut self, listener: impl FnMut(&ChangeEvent) + 'static) -> ListenerId {
        self.notifier.subscribe(listener)
    }

    /// Remove a change listener.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.notifier.unsubscribe(id)
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Build a surface from a parametric description and place it.
    pub fn add_surface(&mut self, descriptor: &SurfaceDescriptor) -> SurfaceId {
        let local = descriptor.local_grid();
        let distinct: Vec<PointId> = local
            .positions
            .iter()
            .map(|&p| self.points.insert_at(p))
            .collect();
        let ids = (0..local.rows)
            .flat_map(|i| (0..local.cols).map(move |j| (i, j)))
            .map(|(i, j)| distinct[i * local.distinct_cols + j % local.distinct_cols])
            .collect();
        let grid = PointGrid::new(local.rows, local.cols, ids);
        let resolution = descriptor
            .resolution
            .unwrap_or((self.settings.resolution_u, self.settings.resolution_v));
        let transform = TransformState::new(descriptor.position, descriptor.rotation, descriptor.scale);
        let id = self
            .surfaces
            .insert(Surface::new(descriptor.kind, grid, transform, resolution));
        for &p in &distinct {
            if let Some(point) = self.points.get_mut(p) {
                point.add_owner(id);
            }
        }
        self.propagate(id);
        log::debug!(
            "added {:?} surface {id:?} with {}x{} control points",
            descriptor.kind,
            local.rows,
            local.cols
        );
        id
    }

    /// Build a surface from world-space control positions, one `Vec` per row.
    ///
    /// Rows and columns beyond the largest valid grid are dropped.
    pub fn add_surface_from_positions(
        &mut self,
        kind: SurfaceKind,
        positions: &[Vec<Point3>],
    ) -> Result<SurfaceId> {
        let available = positions.iter().map(Vec::len).min().unwrap_or(0);
        let (rows, cols) = match (kind.fit_dimension(positions.len()), kind.fit_dimension(available)) {
            (Some(rows), Some(cols)) => (rows, cols),
            _ => {
                return Err(SurfaceError::GridTooSmall {
                    rows: positions.len(),
                    cols: available,
                })
            }
        };
        if rows != positions.len() || positions.iter().any(|row| row.len() != cols) {
            log::warn!("control grid truncated to {rows}x{cols}");
        }
        let ids: Vec<PointId> = positions[..rows]
            .iter()
            .flat_map(|row| &row[..cols])
            .map(|&p| self.points.insert_at(p))
            .collect();
        let grid = PointGrid::new(rows, cols, ids.clone());
        let resolution = (self.settings.resolution_u, self.settings.resolution_v);
        let transform = TransformState::tracking(Point3::origin(), Vec3::zeros());
        let id = self
            .surfaces
            .insert(Surface::new(kind, grid, transform, resolution));
        for p in ids {
            if let Some(point) = self.points.get_mut(p) {
                point.add_owner(id);
            }
        }
        Ok(id)
    }

    /// Remove a surface, its exclusive points and the fills it bounds.
    pub fn remove_surface(&mut self, id: SurfaceId) -> Result<()> {
        let surface = self
            .surfaces
            .remove(id)
            .ok_or(SurfaceError::SurfaceNotFound(id))?;
        for p in surface.grid().unique_ids() {
            let orphaned = self
                .points
                .get_mut(p)
                .map(|point| point.remove_owner(id))
                .unwrap_or(false);
            if orphaned {
                self.points.remove(p);
                self.notifier.emit(ChangeEvent::point(p, ChangeKind::Removed));
            }
        }
        let points = &self.points;
        self.replaced.retain(|_, target| points.contains(*target));

        let fills: Vec<FillId> = self
            .fills
            .iter()
            .filter(|(_, fill)| fill.depends_on(id))
            .map(|(fill_id, _)| fill_id)
            .collect();
        for fill in fills {
            self.fills.remove(fill);
            self.notifier.emit(ChangeEvent::fill(fill, ChangeKind::Removed));
        }
        self.notifier.emit(ChangeEvent::surface(id, ChangeKind::Removed));
        log::debug!("removed surface {id:?}");
        Ok(())
    }

    // =========================================================================
    // Transforms
    // =========================================================================

    /// Apply the step from the baseline pose to the target pose to every
    /// owned point. Returns the step; unknown ids are ignored.
    fn propagate(&mut self, id: SurfaceId) -> Option<Transform> {
        let surface = self.surfaces.get_mut(id)?;
        let step = surface.transform_mut().step();
        log::trace!("propagating transform of surface {id:?}");
        for p in surface.grid().unique_ids() {
            if let Some(point) = self.points.get_mut(p) {
                point.apply_transform(&step);
            }
        }
        surface.rebuild();
        Some(step)
    }

    /// Set the target pose of a surface without moving its points.
    ///
    /// The points follow on the next [`update_model_matrix`](Self::update_model_matrix).
    pub fn stage_pose(&mut self, id: SurfaceId, position: Point3, rotation: Vec3) -> Result<()> {
        let transform = self.surface_mut(id)?.transform_mut();
        transform.position = position;
        transform.rotation = rotation;
        Ok(())
    }

    /// Bring the control points in line with the surface's staged position
    /// and rotation. Returns the step applied; identity when nothing was
    /// staged.
    pub fn update_model_matrix(&mut self, id: SurfaceId) -> Result<Transform> {
        let transform = self.surface(id)?.transform();
        let (moved, rotated) = match transform.baseline() {
            Baseline::Uninitialized => (true, true),
            Baseline::Tracking { position, rotation } => {
                (position != transform.position, rotation != transform.rotation)
            }
        };
        let step = self
            .propagate(id)
            .ok_or(SurfaceError::SurfaceNotFound(id))?;
        if moved {
            self.notifier.emit(ChangeEvent::surface(id, ChangeKind::Position));
        }
        if rotated {
            self.notifier.emit(ChangeEvent::surface(id, ChangeKind::Rotation));
        }
        if moved || rotated {
            self.refresh_neighbours(id);
        }
        Ok(step)
    }

    /// Move a surface; its points follow.
    pub fn set_position(&mut self, id: SurfaceId, position: Point3) -> Result<()> {
        self.surface_mut(id)?.transform_mut().position = position;
        self.propagate(id);
        self.notifier.emit(ChangeEvent::surface(id, ChangeKind::Position));
        self.refresh_neighbours(id);
        Ok(())
    }

    /// Rotate a surface about its position; its points follow.
    pub fn set_rotation(&mut self, id: SurfaceId, rotation: Vec3) -> Result<()> {
        self.surface_mut(id)?.transform_mut().rotation = rotation;
        self.propagate(id);
        self.notifier.emit(ChangeEvent::surface(id, ChangeKind::Rotation));
        self.refresh_neighbours(id);
        Ok(())
    }

    // =========================================================================
    // Points
    // =========================================================================

    /// Move one control point; every surface referencing it follows.
    pub fn set_point_position(&mut self, id: PointId, position: Point3) -> Result<()> {
        let id = self.resolve(id);
        let point = self
            .points
            .get_mut(id)
            .ok_or(SurfaceError::PointNotFound(id))?;
        point.position = position;
        let owners = point.owners().to_vec();

        self.notifier.emit(ChangeEvent::point(id, ChangeKind::Position));
        for &owner in &owners {
            if let Some(surface) = self.surfaces.get_mut(owner) {
                surface.rebuild();
            }
            self.notifier
                .emit(ChangeEvent::surface(owner, ChangeKind::ControlPoint));
        }
        self.refresh_fills(&owners);
        Ok(())
    }

    /// Move one control point by `delta`.
    pub fn translate_point(&mut self, id: PointId, delta: Vec3) -> Result<()> {
        let position = self.point(id)?.position + delta;
        self.set_point_position(id, position)
    }

    /// Merge two points into a new one at their midpoint.
    ///
    /// Every surface referencing either point references the new one
    /// afterwards and the old ids resolve to it. Fusing points that are
    /// already one is a no-op.
    pub fn fuse_points(&mut self, a: PointId, b: PointId) -> Result<PointId> {
        let (a, b) = (self.resolve(a), self.resolve(b));
        let pa = self.points.get(a).ok_or(SurfaceError::PointNotFound(a))?;
        let pb = self.points.get(b).ok_or(SurfaceError::PointNotFound(b))?;
        if a == b {
            return Ok(a);
        }

        let mut fused = ControlPoint::fused(nalgebra::center(&pa.position, &pb.position));
        fused.weight = (pa.weight + pb.weight) / 2.0;
        let mut owners = pa.owners().to_vec();
        for &owner in pb.owners() {
            if !owners.contains(&owner) {
                owners.push(owner);
            }
        }
        for &owner in &owners {
            fused.add_owner(owner);
        }

        let new = self.points.insert(fused);
        for &owner in &owners {
            if let Some(surface) = self.surfaces.get_mut(owner) {
                surface.substitute(a, new);
                surface.substitute(b, new);
            }
        }
        self.points.remove(a);
        self.points.remove(b);
        // every alias points straight at a live id
        for target in self.replaced.values_mut() {
            if *target == a || *target == b {
                *target = new;
            }
        }
        self.replaced.insert(a, new);
        self.replaced.insert(b, new);
        log::debug!("fused {a:?} and {b:?} into {new:?}");

        self.notifier.emit(ChangeEvent::point(new, ChangeKind::Fusion));
        for &owner in &owners {
            self.notifier.emit(ChangeEvent::surface(owner, ChangeKind::Fusion));
        }
        self.refresh_fills(&owners);
        Ok(new)
    }

    // =========================================================================
    // Surface settings
    // =========================================================================

    /// Change the tessellation resolution; zero is clamped to one.
    pub fn set_resolution(&mut self, id: SurfaceId, u: usize, v: usize) -> Result<()> {
        if self.surface_mut(id)?.set_resolution(u, v) {
            self.notifier.emit(ChangeEvent::surface(id, ChangeKind::Resolution));
        }
        Ok(())
    }

    /// Replace all trimming grids of a surface.
    pub fn set_trims(&mut self, id: SurfaceId, trims: Vec<TrimGrid>) -> Result<()> {
        self.surface_mut(id)?.set_trims(trims);
        self.notifier.emit(ChangeEvent::surface(id, ChangeKind::Trimming));
        Ok(())
    }

    /// Add one trimming grid; its cut adds to the existing ones.
    pub fn add_trim(&mut self, id: SurfaceId, trim: TrimGrid) -> Result<()> {
        let mut trims = self.surface(id)?.trims().to_vec();
        trims.push(trim);
        self.set_trims(id, trims)
    }

    /// Drop every trimming grid of a surface.
    pub fn clear_trims(&mut self, id: SurfaceId) -> Result<()> {
        self.set_trims(id, Vec::new())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Grid position of a point in a surface, `None` if not referenced.
    pub fn grid_index_of(&self, surface: SurfaceId, point: PointId) -> Result<Option<GridIndex>> {
        let point = self.resolve(point);
        Ok(self.surface(surface)?.grid_index_of(point))
    }

    /// Sum of the surface's grid positions divided by 16.
    pub fn centroid(&self, id: SurfaceId) -> Result<Point3> {
        Ok(self.surface(id)?.centroid(&self.points))
    }

    /// Position on patch `(patch_u, patch_v)`, `None` where trimmed.
    pub fn evaluate(
        &self,
        id: SurfaceId,
        patch_u: usize,
        patch_v: usize,
        u: f64,
        v: f64,
    ) -> Result<Option<Point3>> {
        let surface = self.surface(id)?;
        let patch = surface
            .patch(patch_u, patch_v)
            .ok_or(SurfaceError::PatchOutOfRange { patch_u, patch_v })?;
        Ok(patch.evaluate_trimmed(&self.points, u, v))
    }

    /// Position, derivatives and normal on patch `(patch_u, patch_v)`.
    pub fn sample(
        &self,
        id: SurfaceId,
        patch_u: usize,
        patch_v: usize,
        u: f64,
        v: f64,
    ) -> Result<Option<SurfaceSample>> {
        let surface = self.surface(id)?;
        let patch = surface
            .patch(patch_u, patch_v)
            .ok_or(SurfaceError::PatchOutOfRange { patch_u, patch_v })?;
        Ok(patch.sample(&self.points, u, v)?)
    }

    /// See [`Surface::border_value`].
    pub fn border_value(&self, id: SurfaceId, from: GridIndex, to: GridIndex, t: f64) -> Result<Point3> {
        self.surface(id)?.border_value(&self.points, from, to, t)
    }

    /// See [`Surface::border_tangent`].
    pub fn border_tangent(&self, id: SurfaceId, from: GridIndex, to: GridIndex, t: f64) -> Result<Vec3> {
        self.surface(id)?.border_tangent(&self.points, from, to, t)
    }

    /// See [`Surface::border_derivative`].
    pub fn border_derivative(&self, id: SurfaceId, from: GridIndex, to: GridIndex, t: f64) -> Result<Vec3> {
        self.surface(id)?.border_derivative(&self.points, from, to, t)
    }

    /// Triangle mesh of every patch at the surface's resolution.
    pub fn tessellate(&self, id: SurfaceId) -> Result<SurfaceMesh> {
        let surface = self.surface(id)?;
        let (res_u, res_v) = surface.resolution();
        Ok(tessellate_patches(
            surface.patches(),
            &self.points,
            res_u,
            res_v,
            self.settings.derivative_step,
        ))
    }

    /// Samples of one patch on its resolution grid.
    pub fn sample_grid(
        &self,
        id: SurfaceId,
        patch_u: usize,
        patch_v: usize,
    ) -> Result<Vec<Option<SurfaceSample>>> {
        let surface = self.surface(id)?;
        let patch = surface
            .patch(patch_u, patch_v)
            .ok_or(SurfaceError::PatchOutOfRange { patch_u, patch_v })?;
        let (res_u, res_v) = surface.resolution();
        Ok(sample_patch(patch, &self.points, res_u, res_v, self.settings.derivative_step))
    }

    // =========================================================================
    // Hole fills
    // =========================================================================

    /// Fill the triangular hole bounded by three Bézier borders.
    ///
    /// The fill follows later edits of the bounding surfaces.
    pub fn fill_hole(&mut self, borders: [BorderRef; 3]) -> Result<FillId> {
        let patches = build_fill(&borders, &self.surfaces, &self.points, &self.settings)?;
        let id = self.fills.insert(GregoryFill::new(borders, patches));
        log::debug!("filled hole {id:?}");
        Ok(id)
    }

    /// Remove a fill.
    pub fn remove_fill(&mut self, id: FillId) -> Result<()> {
        self.fills.remove(id).ok_or(SurfaceError::FillNotFound(id))?;
        self.notifier.emit(ChangeEvent::fill(id, ChangeKind::Removed));
        Ok(())
    }

    /// Triangle mesh of a fill at the default resolution.
    pub fn tessellate_fill(&self, id: FillId) -> Result<SurfaceMesh> {
        let fill = self.fill(id)?;
        Ok(tessellate_patches(
            fill.patches(),
            &self.points,
            self.settings.resolution_u,
            self.settings.resolution_v,
            self.settings.derivative_step,
        ))
    }

    fn rebuild_fill(&mut self, id: FillId) {
        let Some(fill) = self.fills.get(id) else {
            return;
        };
        let borders = *fill.borders();
        let patches = match build_fill(&borders, &self.surfaces, &self.points, &self.settings) {
            Ok(patches) => patches,
            Err(e) => {
                log::warn!("fill {id:?} cleared: {e}");
                Vec::new()
            }
        };
        if let Some(fill) = self.fills.get_mut(id) {
            fill.set_patches(patches);
        }
    }

    /// Rebuild and announce every fill bounded by one of `changed`.
    fn refresh_fills(&mut self, changed: &[SurfaceId]) {
        let fills: Vec<FillId> = self
            .fills
            .iter()
            .filter(|(_, fill)| changed.iter().any(|&s| fill.depends_on(s)))
            .map(|(id, _)| id)
            .collect();
        for id in fills {
            self.rebuild_fill(id);
            self.notifier.emit(ChangeEvent::fill(id, ChangeKind::ControlPoint));
        }
    }

    /// After surface `id` moved its points: rebuild and announce the other
    /// surfaces sharing them, then the fills of all of them.
    fn refresh_neighbours(&mut self, id: SurfaceId) {
        let mut changed = vec![id];
        if let Some(surface) = self.surfaces.get(id) {
            for p in surface.grid().unique_ids() {
                for &owner in self.points.get(p).map(|point| point.owners()).unwrap_or(&[]) {
                    if !changed.contains(&owner) {
                        changed.push(owner);
                    }
                }
            }
        }
        for &neighbour in &changed[1..] {
            if let Some(surface) = self.surfaces.get_mut(neighbour) {
                surface.rebuild();
            }
            self.notifier
                .emit(ChangeEvent::surface(neighbour, ChangeKind::ControlPoint));
        }
        self.refresh_fills(&changed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::f64::consts::FRAC_PI_4;
    use std::rc::Rc;

    use approx::assert_abs_diff_eq;
    use patchcraft_patch::SinglePatch;

    use crate::events::ChangeSource;

    fn rows(f: impl Fn(usize, usize) -> Point3) -> Vec<Vec<Point3>> {
        (0..4).map(|i| (0..4).map(|j| f(i, j)).collect()).collect()
    }

    fn record(model: &mut SurfaceModel) -> Rc<RefCell<Vec<ChangeEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        model.subscribe(move |e| sink.borrow_mut().push(*e));
        events
    }

    fn point_at(model: &SurfaceModel, id: SurfaceId, row: usize, col: usize) -> PointId {
        model
            .surface(id)
            .unwrap()
            .grid()
            .get(GridIndex::new(row, col))
            .unwrap()
    }

    /// Two 4x4 Bézier sheets sharing the plane x = 3; the seam is not fused.
    fn two_sheets(model: &mut SurfaceModel) -> (SurfaceId, SurfaceId) {
        let a = model
            .add_surface_from_positions(SurfaceKind::Bezier, &rows(|i, j| Point3::new(i as f64, 0.0, j as f64)))
            .unwrap();
        let b = model
            .add_surface_from_positions(SurfaceKind::Bezier, &rows(|i, j| Point3::new(3.0 + i as f64, 0.0, j as f64)))
            .unwrap();
        (a, b)
    }

    fn fuse_seam(model: &mut SurfaceModel, a: SurfaceId, b: SurfaceId) -> Vec<PointId> {
        (0..4)
            .map(|j| {
                let pa = point_at(model, a, 3, j);
                let pb = point_at(model, b, 0, j);
                model.fuse_points(pa, pb).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_add_surface_places_points() {
        let mut model = SurfaceModel::new();
        let id = model.add_surface(&SurfaceDescriptor::flat(SurfaceKind::Bezier, 1, 1, 2.0, 2.0).at(Point3::new(1.0, 2.0, 3.0)));
        assert_abs_diff_eq!(model.centroid(id).unwrap(), Point3::new(1.0, 2.0, 3.0), epsilon = 1e-12);
        assert_eq!(model.points().len(), 16);
        let p = point_at(&model, id, 0, 0);
        assert_eq!(model.point(p).unwrap().owners(), &[id]);
    }

    #[test]
    fn test_cylinder_seam_is_shared_and_closed() {
        let mut model = SurfaceModel::new();
        let id = model.add_surface(&SurfaceDescriptor::cylinder(SurfaceKind::Bezier, 1, 2, 1.0, 2.0));
        let surface = model.surface(id).unwrap();
        assert_eq!(surface.grid().ids().len(), 28);
        assert_eq!(model.points().len(), 24);
        for u in [0.0, 0.5, 1.0] {
            let start = model.evaluate(id, 0, 0, u, 0.0).unwrap().unwrap();
            let end = model.evaluate(id, 0, 1, u, 1.0).unwrap().unwrap();
            assert_abs_diff_eq!(start, end, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_moving_a_closed_surface_moves_each_point_once() {
        let mut model = SurfaceModel::new();
        let id = model.add_surface(&SurfaceDescriptor::cylinder(SurfaceKind::BSpline, 1, 3, 1.0, 2.0));
        let before: Vec<(PointId, Point3)> = model.points().iter().map(|(id, p)| (id, p.position)).collect();
        model.set_position(id, Point3::new(0.0, 0.0, 5.0)).unwrap();
        for (p, old) in before {
            let moved = model.point(p).unwrap().position;
            assert_abs_diff_eq!(moved, old + Vec3::new(0.0, 0.0, 5.0), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_incremental_rotation_matches_single_step() {
        let mut model = SurfaceModel::new();
        let desc = SurfaceDescriptor::flat(SurfaceKind::Bezier, 1, 1, 2.0, 2.0).at(Point3::new(1.0, 0.0, -2.0));
        let a = model.add_surface(&desc);
        let b = model.add_surface(&desc);
        model.set_rotation(a, Vec3::new(0.0, FRAC_PI_4, 0.0)).unwrap();
        model.set_rotation(a, Vec3::new(0.0, 2.0 * FRAC_PI_4, 0.0)).unwrap();
        model.set_rotation(b, Vec3::new(0.0, 2.0 * FRAC_PI_4, 0.0)).unwrap();

        let ta = model.surface(a).unwrap().transform().model_matrix().clone();
        let tb = model.surface(b).unwrap().transform().model_matrix().clone();
        assert!(ta.max_difference(&tb) < 1e-12);
        for (pa, pb) in model.surface(a).unwrap().grid().ids().iter().zip(model.surface(b).unwrap().grid().ids()) {
            assert_abs_diff_eq!(model.points()[*pa].position, model.points()[*pb].position, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_point_edits_survive_surface_moves() {
        let mut model = SurfaceModel::new();
        let id = model.add_surface(&SurfaceDescriptor::flat(SurfaceKind::Bezier, 1, 1, 3.0, 3.0));
        let p = point_at(&model, id, 1, 1);
        model.translate_point(p, Vec3::new(0.0, 1.0, 0.0)).unwrap();
        let edited = model.point(p).unwrap().position;
        model.set_position(id, Point3::new(2.0, 0.0, 0.0)).unwrap();
        assert_abs_diff_eq!(model.point(p).unwrap().position, edited + Vec3::new(2.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_update_model_matrix_without_change_is_identity() {
        let mut model = SurfaceModel::new();
        let id = model.add_surface(&SurfaceDescriptor::flat(SurfaceKind::Bezier, 1, 1, 1.0, 1.0).at(Point3::new(0.0, 4.0, 0.0)));
        let events = record(&mut model);
        let step = model.update_model_matrix(id).unwrap();
        assert!(step.max_difference(&Transform::identity()) < 1e-12);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_staged_pose_applies_on_update() {
        let mut model = SurfaceModel::new();
        let (a, b) = two_sheets(&mut model);
        let shared = fuse_seam(&mut model, a, b);
        let corner = point_at(&model, a, 0, 0);
        let before = model.point(corner).unwrap().position;

        model.stage_pose(a, Point3::new(0.0, 2.0, 0.0), Vec3::zeros()).unwrap();
        assert_eq!(model.point(corner).unwrap().position, before);

        let events = record(&mut model);
        let step = model.update_model_matrix(a).unwrap();
        assert_abs_diff_eq!(step.apply_point(&before), before + Vec3::new(0.0, 2.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(model.point(corner).unwrap().position, before + Vec3::new(0.0, 2.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(model.point(shared[0]).unwrap().position.y, 2.0, epsilon = 1e-12);
        assert_eq!(
            &*events.borrow(),
            &[
                ChangeEvent::surface(a, ChangeKind::Position),
                ChangeEvent::surface(b, ChangeKind::ControlPoint),
            ]
        );
    }

    #[test]
    fn test_fusion_shares_points() {
        let mut model = SurfaceModel::new();
        let (a, b) = two_sheets(&mut model);
        let events = record(&mut model);
        let fused = fuse_seam(&mut model, a, b);
        assert_eq!(model.points().len(), 28);

        for (j, &p) in fused.iter().enumerate() {
            assert_eq!(model.grid_index_of(a, p).unwrap(), Some(GridIndex::new(3, j)));
            assert_eq!(model.grid_index_of(b, p).unwrap(), Some(GridIndex::new(0, j)));
            let point = model.point(p).unwrap();
            assert!(point.is_fused());
            assert_eq!(point.owners(), &[a, b]);
        }
        assert_eq!(
            &events.borrow()[..3],
            &[
                ChangeEvent::point(fused[0], ChangeKind::Fusion),
                ChangeEvent::surface(a, ChangeKind::Fusion),
                ChangeEvent::surface(b, ChangeKind::Fusion),
            ]
        );
    }

    #[test]
    fn test_fusion_is_idempotent() {
        let mut model = SurfaceModel::new();
        let (a, b) = two_sheets(&mut model);
        let pa = point_at(&model, a, 3, 0);
        let pb = point_at(&model, b, 0, 0);
        let first = model.fuse_points(pa, pb).unwrap();
        let count = model.points().len();
        let events = record(&mut model);
        assert_eq!(model.fuse_points(pa, pb).unwrap(), first);
        assert_eq!(model.fuse_points(first, pb).unwrap(), first);
        assert_eq!(model.points().len(), count);
        assert!(events.borrow().is_empty());
        assert_eq!(model.resolve(pa), first);
    }

    #[test]
    fn test_fusion_chain_survives_surface_removal() {
        let mut model = SurfaceModel::new();
        let (a, b) = two_sheets(&mut model);
        let c = model
            .add_surface_from_positions(SurfaceKind::Bezier, &rows(|i, j| Point3::new(6.0 + i as f64, 0.0, j as f64)))
            .unwrap();
        let pa = point_at(&model, a, 3, 0);
        let pb = point_at(&model, b, 0, 0);
        let pc = point_at(&model, c, 0, 0);
        let first = model.fuse_points(pa, pb).unwrap();
        let second = model.fuse_points(first, pc).unwrap();
        assert!(model.replaced.values().all(|&target| target == second));

        let unrelated = model.add_surface(&SurfaceDescriptor::flat(SurfaceKind::Bezier, 1, 1, 1.0, 1.0));
        model.remove_surface(unrelated).unwrap();

        assert_eq!(model.resolve(pa), second);
        assert_eq!(model.resolve(first), second);
        assert_eq!(model.fuse_points(pa, pb).unwrap(), second);
        assert_eq!(model.grid_index_of(a, pa).unwrap(), Some(GridIndex::new(3, 0)));
        assert_eq!(model.point(pc).unwrap().owners(), &[a, b, c]);
    }

    #[test]
    fn test_fusion_moves_to_midpoint() {
        let mut model = SurfaceModel::new();
        let (a, b) = two_sheets(&mut model);
        let pa = point_at(&model, a, 3, 0);
        let pb = point_at(&model, b, 0, 0);
        model.set_point_position(pb, Point3::new(3.0, 2.0, 0.0)).unwrap();
        let fused = model.fuse_points(pa, pb).unwrap();
        assert_abs_diff_eq!(model.point(fused).unwrap().position, Point3::new(3.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_fuse_unknown_point_fails() {
        let mut model = SurfaceModel::new();
        let (a, b) = two_sheets(&mut model);
        let pa = point_at(&model, a, 0, 0);
        let pb = point_at(&model, b, 0, 0);
        model.remove_surface(b).unwrap();
        assert_eq!(model.fuse_points(pa, pb), Err(SurfaceError::PointNotFound(pb)));
    }

    #[test]
    fn test_shared_point_edit_reaches_both_surfaces() {
        let mut model = SurfaceModel::new();
        let (a, b) = two_sheets(&mut model);
        let fused = fuse_seam(&mut model, a, b);
        let events = record(&mut model);
        model.set_point_position(fused[0], Point3::new(3.0, 1.0, 0.0)).unwrap();

        let on_a = model.evaluate(a, 0, 0, 1.0, 0.0).unwrap().unwrap();
        let on_b = model.evaluate(b, 0, 0, 0.0, 0.0).unwrap().unwrap();
        assert_abs_diff_eq!(on_a, Point3::new(3.0, 1.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(on_b, on_a, epsilon = 1e-12);
        assert_eq!(
            &*events.borrow(),
            &[
                ChangeEvent::point(fused[0], ChangeKind::Position),
                ChangeEvent::surface(a, ChangeKind::ControlPoint),
                ChangeEvent::surface(b, ChangeKind::ControlPoint),
            ]
        );
    }

    #[test]
    fn test_bspline_surfaces_join_c2_after_fusing_three_rows() {
        let f = |i: usize, j: usize| {
            let x = i as f64;
            Point3::new(x, (0.7 * x).sin() + 0.2 * (j as f64).powi(2), j as f64)
        };
        let mut model = SurfaceModel::new();
        let a = model
            .add_surface_from_positions(SurfaceKind::BSpline, &rows(f))
            .unwrap();
        let b = model
            .add_surface_from_positions(SurfaceKind::BSpline, &rows(|i, j| f(i + 1, j)))
            .unwrap();
        for r in 0..3 {
            for j in 0..4 {
                let pa = point_at(&model, a, r + 1, j);
                let pb = point_at(&model, b, r, j);
                model.fuse_points(pa, pb).unwrap();
            }
        }

        let (Some(SinglePatch::BSpline(pa)), Some(SinglePatch::BSpline(pb))) =
            (model.surface(a).unwrap().patch(0, 0), model.surface(b).unwrap().patch(0, 0))
        else {
            panic!("expected b-spline patches");
        };
        let pts = model.points();
        for v in [0.0, 0.25, 0.6, 1.0] {
            assert_abs_diff_eq!(pa.evaluate(pts, 1.0, v), pb.evaluate(pts, 0.0, v), epsilon = 1e-9);
            assert_abs_diff_eq!(
                pa.evaluate_du(pts, 1.0, v).unwrap(),
                pb.evaluate_du(pts, 0.0, v).unwrap(),
                epsilon = 1e-9
            );
            assert_abs_diff_eq!(pa.evaluate_duu(pts, 1.0, v), pb.evaluate_duu(pts, 0.0, v), epsilon = 1e-9);
            assert_abs_diff_eq!(
                pa.evaluate_dv(pts, 1.0, v).unwrap(),
                pb.evaluate_dv(pts, 0.0, v).unwrap(),
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_from_positions_validates_and_truncates() {
        let mut model = SurfaceModel::new();
        let small = vec![vec![Point3::origin(); 4]; 3];
        assert_eq!(
            model.add_surface_from_positions(SurfaceKind::Bezier, &small),
            Err(SurfaceError::GridTooSmall { rows: 3, cols: 4 })
        );
        let ragged: Vec<Vec<Point3>> = (0..5)
            .map(|i| vec![Point3::new(i as f64, 0.0, 0.0); 6 + i])
            .collect();
        let id = model
            .add_surface_from_positions(SurfaceKind::Bezier, &ragged)
            .unwrap();
        let grid = model.surface(id).unwrap().grid();
        assert_eq!((grid.rows(), grid.cols()), (4, 4));
        assert_eq!(model.points().len(), 16);
    }

    #[test]
    fn test_remove_surface_keeps_shared_points() {
        let mut model = SurfaceModel::new();
        let (a, b) = two_sheets(&mut model);
        let fused = fuse_seam(&mut model, a, b);
        let events = record(&mut model);
        model.remove_surface(a).unwrap();
        assert_eq!(model.points().len(), 16);
        assert_eq!(model.point(fused[0]).unwrap().owners(), &[b]);
        assert!(model.surface(a).is_err());
        assert_eq!(
            events.borrow().last(),
            Some(&ChangeEvent::surface(a, ChangeKind::Removed))
        );
        let removed_points = events
            .borrow()
            .iter()
            .filter(|e| matches!(e.source, ChangeSource::Point(_)))
            .count();
        assert_eq!(removed_points, 12);
    }

    #[test]
    fn test_resolution_and_trim_events() {
        let mut model = SurfaceModel::new();
        let id = model.add_surface(&SurfaceDescriptor::flat(SurfaceKind::Bezier, 1, 1, 1.0, 1.0).with_resolution(2, 2));
        let events = record(&mut model);
        model.set_resolution(id, 0, 4).unwrap();
        model.set_resolution(id, 1, 4).unwrap();
        assert_eq!(model.surface(id).unwrap().resolution(), (1, 4));
        assert_eq!(model.tessellate(id).unwrap().num_triangles(), 8);

        model.set_resolution(id, 4, 4).unwrap();
        model.add_trim(id, TrimGrid::from_fn(2, |x, _| x == 0)).unwrap();
        assert_eq!(model.surface(id).unwrap().trims().len(), 1);
        // u in {0, 0.25} survive: one strip of four quads
        assert_eq!(model.tessellate(id).unwrap().num_triangles(), 8);
        assert_eq!(model.evaluate(id, 0, 0, 0.9, 0.5).unwrap(), None);
        model.clear_trims(id).unwrap();
        assert_eq!(model.tessellate(id).unwrap().num_triangles(), 32);

        let kinds: Vec<ChangeKind> = events.borrow().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [
                ChangeKind::Resolution,
                ChangeKind::Resolution,
                ChangeKind::Trimming,
                ChangeKind::Trimming
            ]
        );
    }

    #[test]
    fn test_unknown_ids_are_errors() {
        let mut model = SurfaceModel::new();
        let id = model.add_surface(&SurfaceDescriptor::flat(SurfaceKind::Bezier, 1, 1, 1.0, 1.0));
        model.remove_surface(id).unwrap();
        assert_eq!(model.set_position(id, Point3::origin()), Err(SurfaceError::SurfaceNotFound(id)));
        assert_eq!(model.remove_surface(id), Err(SurfaceError::SurfaceNotFound(id)));
        assert!(model.tessellate(id).is_err());
        let other = model.add_surface(&SurfaceDescriptor::flat(SurfaceKind::Bezier, 1, 1, 1.0, 1.0));
        assert_eq!(
            model.evaluate(other, 1, 0, 0.5, 0.5),
            Err(SurfaceError::PatchOutOfRange { patch_u: 1, patch_v: 0 })
        );
    }

    // -------------------------------------------------------------------------
    // Hole fills
    // -------------------------------------------------------------------------

    /// Strip from `a` to `b` extending away from the hole along `outward`.
    fn strip(model: &mut SurfaceModel, a: Point3, b: Point3, outward: Vec3) -> BorderRef {
        let positions = rows(|i, j| a + (b - a) * (i as f64 / 3.0) + outward * j as f64);
        let id = model
            .add_surface_from_positions(SurfaceKind::Bezier, &positions)
            .unwrap();
        BorderRef::new(id, GridIndex::new(0, 0), GridIndex::new(3, 0))
    }

    fn triangle_hole(model: &mut SurfaceModel) -> [BorderRef; 3] {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(3.0, 0.0, 0.0);
        let c = Point3::new(0.0, 3.0, 0.0);
        [
            strip(model, a, b, Vec3::new(0.0, -1.0, 0.0)),
            strip(model, b, c, Vec3::new(1.0, 1.0, 0.0).normalize()),
            strip(model, c, a, Vec3::new(-1.0, 0.0, 0.0)),
        ]
    }

    #[test]
    fn test_fill_matches_borders_exactly() {
        let mut model = SurfaceModel::new();
        let borders = triangle_hole(&mut model);
        let fill = model.fill_hole(borders).unwrap();
        let patches = model.fill(fill).unwrap().patches();
        assert_eq!(patches.len(), 3);
        let pts = model.points();

        for k in 0..3 {
            let here = borders[k];
            let next = borders[(k + 1) % 3];
            for s in [0.0, 0.2, 0.5, 0.8, 1.0] {
                let along_next = model.border_value(next.surface, next.from, next.to, s / 2.0).unwrap();
                assert_abs_diff_eq!(patches[k].evaluate(pts, s, 0.0), along_next, epsilon = 1e-12);
                let along_here = model.border_value(here.surface, here.from, here.to, 1.0 - s / 2.0).unwrap();
                assert_abs_diff_eq!(patches[k].evaluate(pts, 0.0, s), along_here, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_fill_patches_share_radial_edges() {
        let mut model = SurfaceModel::new();
        let borders = triangle_hole(&mut model);
        let fill = model.fill_hole(borders).unwrap();
        let patches = model.fill(fill).unwrap().patches();
        let pts = model.points();
        let center = patches[0].evaluate(pts, 1.0, 1.0);
        for k in 0..3 {
            let j = (k + 1) % 3;
            assert_abs_diff_eq!(patches[k].evaluate(pts, 1.0, 1.0), center, epsilon = 1e-12);
            for t in [0.0, 0.3, 0.7] {
                assert_abs_diff_eq!(patches[k].evaluate(pts, 1.0, t), patches[j].evaluate(pts, t, 1.0), epsilon = 1e-12);
            }
        }
        // a planar hole gives a planar fill
        for (u, v) in [(0.3, 0.3), (0.5, 0.9), (0.9, 0.1)] {
            assert_abs_diff_eq!(patches[1].evaluate(pts, u, v).z, 0.0, epsilon = 1e-12);
        }
        assert_eq!(model.tessellate_fill(fill).unwrap().num_triangles(), 3 * 8 * 8 * 2);
    }

    /// Bézier grid of the paraboloid `z = (x² + y²) / 5` over the
    /// parallelogram `origin + u·along + v·across`. A quadratic height field
    /// is bicubic in `(u, v)`, so the grid is exact.
    fn paraboloid_piece(origin: (f64, f64), along: (f64, f64), across: (f64, f64)) -> Vec<Vec<Point3>> {
        // Bernstein coefficients of (o + a·u + b·v)²
        let square = |o: f64, a: f64, b: f64, i: usize, j: usize| {
            let (u, v) = (i as f64 / 3.0, j as f64 / 3.0);
            let uu = (i * i.saturating_sub(1)) as f64 / 6.0;
            let vv = (j * j.saturating_sub(1)) as f64 / 6.0;
            o * o + a * a * uu + b * b * vv + 2.0 * o * a * u + 2.0 * o * b * v + 2.0 * a * b * u * v
        };
        rows(|i, j| {
            let (u, v) = (i as f64 / 3.0, j as f64 / 3.0);
            Point3::new(
                origin.0 + along.0 * u + across.0 * v,
                origin.1 + along.1 * u + across.1 * v,
                (square(origin.0, along.0, across.0, i, j) + square(origin.1, along.1, across.1, i, j)) / 5.0,
            )
        })
    }

    #[test]
    fn test_fill_is_tangent_continuous_on_curved_surroundings() {
        let mut model = SurfaceModel::new();
        let corners = [(0.5, -0.5), (3.5, 0.0), (1.5, 2.5)];
        let edge = |k: usize| {
            let (from, to) = (corners[k], corners[(k + 1) % 3]);
            (to.0 - from.0, to.1 - from.1)
        };
        // each surface leans back along the edge that ends at its start, so
        // the surfaces agree at the hole corners
        let borders: Vec<BorderRef> = (0..3)
            .map(|k| {
                let (px, py) = edge((k + 2) % 3);
                let positions = paraboloid_piece(corners[k], edge(k), (px / 2.0, py / 2.0));
                let id = model
                    .add_surface_from_positions(SurfaceKind::Bezier, &positions)
                    .unwrap();
                BorderRef::new(id, GridIndex::new(0, 0), GridIndex::new(3, 0))
            })
            .collect();
        let fill = model.fill_hole([borders[0], borders[1], borders[2]]).unwrap();
        let patches = model.fill(fill).unwrap().patches();
        let pts = model.points();
        let h = 1e-6;

        for k in 0..3 {
            let next = borders[(k + 1) % 3];
            for s in [0.2, 0.5, 0.8] {
                let along = (patches[k].evaluate(pts, s + h, 0.0) - patches[k].evaluate(pts, s - h, 0.0)) / (2.0 * h);
                let across = (patches[k].evaluate(pts, s, h) - patches[k].evaluate(pts, s, 0.0)) / h;
                let fill_normal = along.cross(&across).normalize();
                let sample = model.sample(next.surface, 0, 0, s / 2.0, 0.0).unwrap().unwrap();
                assert_abs_diff_eq!(fill_normal.dot(&sample.normal).abs(), 1.0, epsilon = 1e-5);
            }
        }
        // the surroundings are curved, so this is not the planar case
        let mid = model.sample(borders[0].surface, 0, 0, 0.5, 0.0).unwrap().unwrap();
        assert!(mid.normal.dot(&Vec3::z()).abs() < 0.999);
    }

    #[test]
    fn test_fill_follows_bordering_surface() {
        let mut model = SurfaceModel::new();
        let borders = triangle_hole(&mut model);
        let fill = model.fill_hole(borders).unwrap();
        let events = record(&mut model);
        let inner = point_at(&model, borders[0].surface, 1, 1);
        model.translate_point(inner, Vec3::new(0.0, 0.0, 1.0)).unwrap();

        let lifted = model.fill(fill).unwrap().patches()[0].evaluate(model.points(), 0.4, 0.6);
        assert!(lifted.z.abs() > 1e-6);
        assert_eq!(
            &*events.borrow(),
            &[
                ChangeEvent::point(inner, ChangeKind::Position),
                ChangeEvent::surface(borders[0].surface, ChangeKind::ControlPoint),
                ChangeEvent::fill(fill, ChangeKind::ControlPoint),
            ]
        );
    }

    #[test]
    fn test_fill_rejects_open_holes() {
        let mut model = SurfaceModel::new();
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(3.0, 0.0, 0.0);
        let c = Point3::new(0.0, 3.0, 0.0);
        let borders = [
            strip(&mut model, a, b, Vec3::new(0.0, -1.0, 0.0)),
            strip(&mut model, b + Vec3::new(0.0, 0.0, 0.5), c, Vec3::new(1.0, 1.0, 0.0)),
            strip(&mut model, c, a, Vec3::new(-1.0, 0.0, 0.0)),
        ];
        match model.fill_hole(borders) {
            Err(SurfaceError::HoleNotClosed { border, gap }) => {
                assert_eq!(border, 0);
                assert_abs_diff_eq!(gap, 0.5, epsilon = 1e-12);
            }
            other => panic!("expected HoleNotClosed, got {other:?}"),
        }
        assert_eq!(model.fills().count(), 0);
    }

    #[test]
    fn test_fill_rejects_bad_borders() {
        let mut model = SurfaceModel::new();
        let mut borders = triangle_hole(&mut model);
        borders[1].to = GridIndex::new(2, 0);
        assert_eq!(
            model.fill_hole(borders),
            Err(SurfaceError::InvalidBorder {
                from: GridIndex::new(0, 0),
                to: GridIndex::new(2, 0)
            })
        );

        let spline = model
            .add_surface_from_positions(
                SurfaceKind::BSpline,
                &rows(|i, j| Point3::new(i as f64, j as f64, 0.0)),
            )
            .unwrap();
        let mut borders = triangle_hole(&mut model);
        borders[2].surface = spline;
        assert!(matches!(
            model.fill_hole(borders),
            Err(SurfaceError::Unsupported { kind: SurfaceKind::BSpline, .. })
        ));
    }

    #[test]
    fn test_removing_a_border_surface_removes_fill() {
        let mut model = SurfaceModel::new();
        let borders = triangle_hole(&mut model);
        let fill = model.fill_hole(borders).unwrap();
        let events = record(&mut model);
        model.remove_surface(borders[1].surface).unwrap();
        assert!(model.fill(fill).is_err());
        assert!(events
            .borrow()
            .contains(&ChangeEvent::fill(fill, ChangeKind::Removed)));
    }
}
