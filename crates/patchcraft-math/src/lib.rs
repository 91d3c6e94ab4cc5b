#![warn(missing_docs)]

//! Math types for patchcraft.
//!
//! Thin wrappers around nalgebra: points, vectors, homogeneous vectors,
//! and the 4x4 affine transforms used to place and move whole surfaces.

use nalgebra::{Matrix4, Vector3, Vector4};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A homogeneous vector `(x, y, z, w)`.
///
/// `w = 1` marks a position, `w = 0` a direction.
pub type Vec4 = Vector4<f64>;

/// A point in 2D parameter space.
pub type Point2 = nalgebra::Point2<f64>;

/// Lift a point into homogeneous coordinates with weight `w`.
pub fn homogeneous(p: &Point3, w: f64) -> Vec4 {
    Vec4::new(p.x, p.y, p.z, w)
}

/// A 4x4 affine transformation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = dx;
        m[(1, 3)] = dy;
        m[(2, 3)] = dz;
        Self { matrix: m }
    }

    /// Translation that moves the origin to `p`.
    pub fn translate_to(p: &Point3) -> Self {
        Self::translation(p.x, p.y, p.z)
    }

    /// Non-uniform scale by `(sx, sy, sz)`.
    pub fn scale(sx: f64, sy: f64, sz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 0)] = sx;
        m[(1, 1)] = sy;
        m[(2, 2)] = sz;
        Self { matrix: m }
    }

    /// Rotation about the X axis by `angle` radians.
    pub fn rotation_x(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(1, 1)] = c;
        m[(1, 2)] = -s;
        m[(2, 1)] = s;
        m[(2, 2)] = c;
        Self { matrix: m }
    }

    /// Rotation about the Y axis by `angle` radians.
    pub fn rotation_y(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(0, 0)] = c;
        m[(0, 2)] = s;
        m[(2, 0)] = -s;
        m[(2, 2)] = c;
        Self { matrix: m }
    }

    /// Rotation about the Z axis by `angle` radians.
    pub fn rotation_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(0, 0)] = c;
        m[(0, 1)] = -s;
        m[(1, 0)] = s;
        m[(1, 1)] = c;
        Self { matrix: m }
    }

    /// Euler rotation `Rx(angles.x) · Ry(angles.y) · Rz(angles.z)`.
    pub fn rotation_xyz(angles: &Vec3) -> Self {
        Self::rotation_x(angles.x)
            .then(&Self::rotation_y(angles.y))
            .then(&Self::rotation_z(angles.z))
    }

    /// Rigid step from a previous pose to the current one:
    /// `T(position) · Rx(Δx) · Ry(Δy) · Rz(Δz) · T(-previous_position)`.
    ///
    /// Points already placed relative to `previous_position` are rotated by
    /// `rotation_delta` about it and carried over to `position`.
    pub fn rigid_step(position: &Point3, rotation_delta: &Vec3, previous_position: &Point3) -> Self {
        Self::translate_to(position)
            .then(&Self::rotation_xyz(rotation_delta))
            .then(&Self::translation(
                -previous_position.x,
                -previous_position.y,
                -previous_position.z,
            ))
    }

    /// Compose: `self` then `other` (self * other).
    ///
    /// `a.then(&b)` applied to a point is `a(b(p))`.
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * homogeneous(p, 1.0);
        Point3::new(v.x, v.y, v.z)
    }

    /// Largest absolute entry difference to `other`.
    pub fn max_difference(&self, other: &Transform) -> f64 {
        (self.matrix - other.matrix).amax()
    }
}
