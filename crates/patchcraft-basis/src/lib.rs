#![warn(missing_docs)]

//! Cubic blending functions for patchcraft patches.
//!
//! Every set has four functions indexed `0..=3` over `t ∈ [0, 1]` and forms
//! a partition of unity:
//!
//! - [`bernstein`]: cubic Bernstein polynomials (Bézier patches, C0 joins)
//! - [`bspline`]: uniform cubic B-spline blending functions (C2 joins)
//! - [`gregory_blend`]: Hermite-ordered weights used by Gregory patches
//!
//! Indices outside `0..=3` evaluate to zero, i.e. outside the support.

// =============================================================================
// Bernstein
// =============================================================================

/// Cubic Bernstein polynomial `B_i(t)`.
pub fn bernstein(i: usize, t: f64) -> f64 {
    let s = 1.0 - t;
    match i {
        0 => s * s * s,
        1 => 3.0 * t * s * s,
        2 => 3.0 * t * t * s,
        3 => t * t * t,
        _ => 0.0,
    }
}

/// First derivative `B_i'(t)`.
pub fn bernstein_derivative(i: usize, t: f64) -> f64 {
    let s = 1.0 - t;
    match i {
        0 => -3.0 * s * s,
        1 => 3.0 * s * s - 6.0 * t * s,
        2 => 6.0 * t * s - 3.0 * t * t,
        3 => 3.0 * t * t,
        _ => 0.0,
    }
}

/// Second derivative `B_i''(t)`.
pub fn bernstein_second_derivative(i: usize, t: f64) -> f64 {
    match i {
        0 => 6.0 * (1.0 - t),
        1 => 18.0 * t - 12.0,
        2 => 6.0 - 18.0 * t,
        3 => 6.0 * t,
        _ => 0.0,
    }
}

// =============================================================================
// Uniform cubic B-spline
// =============================================================================

/// Uniform cubic B-spline blending function `N_i(t)` over one span.
///
/// Consecutive spans of one control polygon share three of their four
/// points, which makes the joined curve C2.
pub fn bspline(i: usize, t: f64) -> f64 {
    let s = 1.0 - t;
    match i {
        0 => s * s * s / 6.0,
        1 => (3.0 * t * t * t - 6.0 * t * t + 4.0) / 6.0,
        2 => (-3.0 * t * t * t + 3.0 * t * t + 3.0 * t + 1.0) / 6.0,
        3 => t * t * t / 6.0,
        _ => 0.0,
    }
}

/// First derivative `N_i'(t)`.
pub fn bspline_derivative(i: usize, t: f64) -> f64 {
    let s = 1.0 - t;
    match i {
        0 => -0.5 * s * s,
        1 => 1.5 * t * t - 2.0 * t,
        2 => -1.5 * t * t + t + 0.5,
        3 => 0.5 * t * t,
        _ => 0.0,
    }
}

/// Second derivative `N_i''(t)`.
pub fn bspline_second_derivative(i: usize, t: f64) -> f64 {
    match i {
        0 => 1.0 - t,
        1 => 3.0 * t - 2.0,
        2 => 1.0 - 3.0 * t,
        3 => t,
        _ => 0.0,
    }
}

// =============================================================================
// Gregory blend
// =============================================================================

/// Position in the Bernstein set of each Gregory blend index.
///
/// Gregory weights list the two end weights first, then the two interior
/// (tangent) weights: `h0 = B0`, `h1 = B3`, `h2 = B1`, `h3 = B2`.
pub const GREGORY_ORDER: [usize; 4] = [0, 3, 1, 2];

/// Gregory blend weight `h_i(t)`.
///
/// `h0(0) = 1`, `h1(1) = 1`; `h2` and `h3` vanish at both ends and carry
/// the tangent behaviour at `t = 0` and `t = 1` respectively.
pub fn gregory_blend(i: usize, t: f64) -> f64 {
    GREGORY_ORDER
        .get(i)
        .map_or(0.0, |&b| bernstein(b, t))
}

/// First derivative `h_i'(t)`.
pub fn gregory_blend_derivative(i: usize, t: f64) -> f64 {
    GREGORY_ORDER
        .get(i)
        .map_or(0.0, |&b| bernstein_derivative(b, t))
}

// =============================================================================
// Basis trait
// =============================================================================

/// A set of four cubic blending functions.
pub trait Basis: Copy + Default + std::fmt::Debug + Send + Sync + 'static {
    /// Short name used in diagnostics.
    const NAME: &'static str;

    /// Value of function `i` at `t`.
    fn value(i: usize, t: f64) -> f64;

    /// First derivative of function `i` at `t`.
    fn derivative(i: usize, t: f64) -> f64;

    /// Second derivative of function `i` at `t`.
    fn second_derivative(i: usize, t: f64) -> f64;

    /// All four values at `t`.
    fn weights(t: f64) -> [f64; 4] {
        std::array::from_fn(|i| Self::value(i, t))
    }

    /// All four first derivatives at `t`.
    fn derivatives(t: f64) -> [f64; 4] {
        std::array::from_fn(|i| Self::derivative(i, t))
    }

    /// All four second derivatives at `t`.
    fn second_derivatives(t: f64) -> [f64; 4] {
        std::array::from_fn(|i| Self::second_derivative(i, t))
    }
}

/// Cubic Bernstein basis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bernstein;

impl Basis for Bernstein {
    const NAME: &'static str = "bezier";

    fn value(i: usize, t: f64) -> f64 {
        bernstein(i, t)
    }

    fn derivative(i: usize, t: f64) -> f64 {
        bernstein_derivative(i, t)
    }

    fn second_derivative(i: usize, t: f64) -> f64 {
        bernstein_second_derivative(i, t)
    }
}

/// Uniform cubic B-spline basis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UniformBSpline;

impl Basis for UniformBSpline {
    const NAME: &'static str = "bspline";

    fn value(i: usize, t: f64) -> f64 {
        bspline(i, t)
    }

    fn derivative(i: usize, t: f64) -> f64 {
        bspline_derivative(i, t)
    }

    fn second_derivative(i: usize, t: f64) -> f64 {
        bspline_second_derivative(i, t)
    }
}

/// Hermite-ordered Gregory blend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GregoryBlend;

impl Basis for GregoryBlend {
    const NAME: &'static str = "gregory";

    fn value(i: usize, t: f64) -> f64 {
        gregory_blend(i, t)
    }

    fn derivative(i: usize, t: f64) -> f64 {
        gregory_blend_derivative(i, t)
    }

    fn second_derivative(i: usize, t: f64) -> f64 {
        GREGORY_ORDER
            .get(i)
            .map_or(0.0, |&b| bernstein_second_derivative(b, t))
    }
}
