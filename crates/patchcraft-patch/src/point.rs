//! Control points and the arena that owns them.

use std::ops::Index;

use patchcraft_math::{homogeneous, Point3, Transform, Vec4};
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle to a control point in a [`ControlPoints`] arena.
    pub struct PointId;

    /// Handle to a multi-patch surface that owns control points.
    pub struct SurfaceId;
}

/// A positioned, transformable vertex of a control grid.
///
/// A point may be referenced by several surfaces; `owners` lists them by id
/// so a point can find the surfaces to refresh, but it never keeps a
/// surface alive.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlPoint {
    /// Position in world space.
    pub position: Point3,
    /// Homogeneous weight.
    pub weight: f64,
    fused: bool,
    owners: Vec<SurfaceId>,
}

impl ControlPoint {
    /// Unit-weight point at `position` with no owners.
    pub fn new(position: Point3) -> Self {
        Self {
            position,
            weight: 1.0,
            fused: false,
            owners: Vec::new(),
        }
    }

    /// Point produced by fusing others; it takes part in a join.
    pub fn fused(position: Point3) -> Self {
        Self {
            fused: true,
            ..Self::new(position)
        }
    }

    /// Whether this point joins two or more surfaces.
    pub fn is_fused(&self) -> bool {
        self.fused
    }

    /// `(x, y, z, weight)`.
    pub fn homogeneous(&self) -> Vec4 {
        homogeneous(&self.position, self.weight)
    }

    /// Surfaces referencing this point.
    pub fn owners(&self) -> &[SurfaceId] {
        &self.owners
    }

    /// Record `surface` as an owner (no duplicates).
    pub fn add_owner(&mut self, surface: SurfaceId) {
        if !self.owners.contains(&surface) {
            self.owners.push(surface);
        }
    }

    /// Forget `surface`; returns true when no owner is left.
    pub fn remove_owner(&mut self, surface: SurfaceId) -> bool {
        self.owners.retain(|&s| s != surface);
        self.owners.is_empty()
    }

    /// Move this point by `t`.
    pub fn apply_transform(&mut self, t: &Transform) {
        self.position = t.apply_point(&self.position);
    }
}

/// Arena owning every control point of a model.
///
/// Surfaces hold [`PointId`]s into it, so two surfaces sharing a point see
/// each other's edits immediately.
#[derive(Debug, Clone, Default)]
pub struct ControlPoints {
    arena: SlotMap<PointId, ControlPoint>,
}

impl ControlPoints {
    /// Empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a point.
    pub fn insert(&mut self, point: ControlPoint) -> PointId {
        self.arena.insert(point)
    }

    /// Add a unit-weight point at `position`.
    pub fn insert_at(&mut self, position: Point3) -> PointId {
        self.insert(ControlPoint::new(position))
    }

    /// Remove a point.
    pub fn remove(&mut self, id: PointId) -> Option<ControlPoint> {
        self.arena.remove(id)
    }

    /// Look up a point.
    pub fn get(&self, id: PointId) -> Option<&ControlPoint> {
        self.arena.get(id)
    }

    /// Look up a point mutably.
    pub fn get_mut(&mut self, id: PointId) -> Option<&mut ControlPoint> {
        self.arena.get_mut(id)
    }

    /// Position of a point.
    pub fn position(&self, id: PointId) -> Option<Point3> {
        self.arena.get(id).map(|p| p.position)
    }

    /// Whether `id` refers to a live point.
    pub fn contains(&self, id: PointId) -> bool {
        self.arena.contains_key(id)
    }

    /// Number of live points.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Iterate over all points.
    pub fn iter(&self) -> impl Iterator<Item = (PointId, &ControlPoint)> {
        self.arena.iter()
    }
}

impl Index<PointId> for ControlPoints {
    type Output = ControlPoint;

    fn index(&self, id: PointId) -> &ControlPoint {
        &self.arena[id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn surface(n: u64) -> SurfaceId {
        SurfaceId::from(KeyData::from_ffi(n))
    }

    #[test]
    fn test_owners_are_unique() {
        let mut p = ControlPoint::new(Point3::origin());
        let s = surface(1);
        p.add_owner(s);
        p.add_owner(s);
        assert_eq!(p.owners(), &[s]);
        assert!(p.remove_owner(s));
    }

    #[test]
    fn test_remove_owner_reports_remaining() {
        let mut p = ControlPoint::new(Point3::origin());
        p.add_owner(surface(1));
        p.add_owner(surface(2));
        assert!(!p.remove_owner(surface(1)));
        assert_eq!(p.owners().len(), 1);
    }

    #[test]
    fn test_homogeneous_carries_weight() {
        let mut p = ControlPoint::new(Point3::new(1.0, 2.0, 3.0));
        p.weight = 0.5;
        assert_eq!(p.homogeneous(), Vec4::new(1.0, 2.0, 3.0, 0.5));
    }

    #[test]
    fn test_arena_insert_and_remove() {
        let mut pts = ControlPoints::new();
        let a = pts.insert_at(Point3::new(1.0, 0.0, 0.0));
        let b = pts.insert(ControlPoint::fused(Point3::new(0.0, 1.0, 0.0)));
        assert_eq!(pts.len(), 2);
        assert!(pts[b].is_fused());
        assert_eq!(pts.position(a), Some(Point3::new(1.0, 0.0, 0.0)));
        pts.remove(a);
        assert!(!pts.contains(a));
        assert_eq!(pts.position(a), None);
    }

    #[test]
    fn test_apply_transform() {
        let mut p = ControlPoint::new(Point3::new(1.0, 1.0, 1.0));
        p.apply_transform(&Transform::translation(1.0, 0.0, -1.0));
        assert_eq!(p.position, Point3::new(2.0, 1.0, 0.0));
    }
}
