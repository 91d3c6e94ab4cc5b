//! Uniform sampling and triangle meshes for renderers.

use patchcraft_math::{Point3, Vec3};
use patchcraft_patch::{unit_normal, ControlPoints, Patch, PatchError, SurfaceSample};

/// A triangle mesh with flat `f32` buffers, ready for upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceMesh {
    /// Vertex positions `[x0, y0, z0, x1, ...]`.
    pub vertices: Vec<f32>,
    /// Per-vertex unit normals, same layout as `vertices`.
    pub normals: Vec<f32>,
    /// Triangle indices, three per triangle.
    pub indices: Vec<u32>,
}

impl SurfaceMesh {
    /// Empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Whether the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    fn push_vertex(&mut self, p: &Point3, n: &Vec3) -> u32 {
        let index = self.num_vertices() as u32;
        self.vertices.extend([p.x as f32, p.y as f32, p.z as f32]);
        self.normals.extend([n.x as f32, n.y as f32, n.z as f32]);
        index
    }

    /// Append `other`, offsetting its indices.
    pub fn merge(&mut self, other: &SurfaceMesh) {
        let offset = self.num_vertices() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.normals.extend_from_slice(&other.normals);
        self.indices.extend(other.indices.iter().map(|i| i + offset));
    }
}

/// Derivatives at `(u, v)`, by central differences where the patch does
/// not provide them.
fn derivatives(patch: &dyn Patch, points: &ControlPoints, u: f64, v: f64, h: f64) -> (Vec3, Vec3) {
    let difference = |a: (f64, f64), b: (f64, f64), span: f64| {
        (patch.evaluate(points, b.0, b.1) - patch.evaluate(points, a.0, a.1)) / span
    };
    let du = match patch.evaluate_du(points, u, v) {
        Ok(d) => d,
        Err(PatchError::Unsupported { .. }) => {
            let (lo, hi) = ((u - h).max(0.0), (u + h).min(1.0));
            difference((lo, v), (hi, v), hi - lo)
        }
    };
    let dv = match patch.evaluate_dv(points, u, v) {
        Ok(d) => d,
        Err(PatchError::Unsupported { .. }) => {
            let (lo, hi) = ((v - h).max(0.0), (v + h).min(1.0));
            difference((u, lo), (u, hi), hi - lo)
        }
    };
    (du, dv)
}

/// Sample `patch` on a `(res_u + 1) × (res_v + 1)` parameter grid,
/// `u`-major. Trimmed parameters give `None`.
///
/// `step` is the finite-difference step used for patches without analytic
/// derivatives.
pub fn sample_patch(
    patch: &dyn Patch,
    points: &ControlPoints,
    res_u: usize,
    res_v: usize,
    step: f64,
) -> Vec<Option<SurfaceSample>> {
    let (res_u, res_v) = (res_u.max(1), res_v.max(1));
    let mut samples = Vec::with_capacity((res_u + 1) * (res_v + 1));
    for i in 0..=res_u {
        let u = i as f64 / res_u as f64;
        for j in 0..=res_v {
            let v = j as f64 / res_v as f64;
            if !patch.trim().accepts(u, v) {
                samples.push(None);
                continue;
            }
            let (du, dv) = derivatives(patch, points, u, v, step);
            samples.push(Some(SurfaceSample {
                position: patch.evaluate(points, u, v),
                du,
                dv,
                normal: unit_normal(&du, &dv),
            }));
        }
    }
    samples
}

/// Triangulate one patch. Quads with a trimmed corner are dropped.
pub fn tessellate_patch(
    patch: &dyn Patch,
    points: &ControlPoints,
    res_u: usize,
    res_v: usize,
    step: f64,
) -> SurfaceMesh {
    let (res_u, res_v) = (res_u.max(1), res_v.max(1));
    let samples = sample_patch(patch, points, res_u, res_v, step);
    let mut mesh = SurfaceMesh::new();
    let vertex: Vec<Option<u32>> = samples
        .iter()
        .map(|s| s.as_ref().map(|s| mesh.push_vertex(&s.position, &s.normal)))
        .collect();

    let at = |i: usize, j: usize| vertex[i * (res_v + 1) + j];
    for i in 0..res_u {
        for j in 0..res_v {
            if let (Some(a), Some(b), Some(c), Some(d)) =
                (at(i, j), at(i + 1, j), at(i + 1, j + 1), at(i, j + 1))
            {
                mesh.indices.extend([a, b, c, a, c, d]);
            }
        }
    }
    mesh
}

/// Triangulate several patches into one mesh.
pub fn tessellate_patches<'a, P>(
    patches: impl IntoIterator<Item = &'a P>,
    points: &ControlPoints,
    res_u: usize,
    res_v: usize,
    step: f64,
) -> SurfaceMesh
where
    P: Patch + 'a,
{
    let mut mesh = SurfaceMesh::new();
    for patch in patches {
        mesh.merge(&tessellate_patch(patch, points, res_u, res_v, step));
    }
    mesh
}
