//! Model-wide settings.

use serde::{Deserialize, Serialize};

use crate::{Result, SurfaceError};

/// Tunables shared by every surface of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceSettings {
    /// Tessellation segments per patch along u for new surfaces and fills.
    pub resolution_u: usize,
    /// Tessellation segments per patch along v for new surfaces and fills.
    pub resolution_v: usize,
    /// Largest gap between consecutive hole borders still treated as closed.
    pub closure_tolerance: f64,
    /// Factor from a cross-boundary derivative to a Gregory control offset.
    pub cross_derivative_scale: f64,
    /// Parameter step for finite-difference derivatives.
    pub derivative_step: f64,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            resolution_u: 8,
            resolution_v: 8,
            closure_tolerance: 1e-4,
            cross_derivative_scale: 1.0 / 3.0,
            derivative_step: 1e-4,
        }
    }
}

impl SurfaceSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.resolution_u == 0 || self.resolution_v == 0 {
            return Err(SurfaceError::InvalidSettings(
                "resolution must be at least 1".into(),
            ));
        }
        if !(self.closure_tolerance > 0.0) {
            return Err(SurfaceError::InvalidSettings(
                "closure_tolerance must be positive".into(),
            ));
        }
        if !self.cross_derivative_scale.is_finite() || self.cross_derivative_scale <= 0.0 {
            return Err(SurfaceError::InvalidSettings(
                "cross_derivative_scale must be positive".into(),
            ));
        }
        if !(self.derivative_step > 0.0 && self.derivative_step < 0.5) {
            return Err(SurfaceError::InvalidSettings(
                "derivative_step must be in (0, 0.5)".into(),
            ));
        }
        Ok(())
    }

    /// Copy with every invalid field replaced by a valid value.
    pub fn normalized(&self) -> Self {
        if let Err(e) = self.validate() {
            log::warn!("normalizing surface settings: {e}");
        }
        let defaults = Self::default();
        Self {
            resolution_u: self.resolution_u.max(1),
            resolution_v: self.resolution_v.max(1),
            closure_tolerance: if self.closure_tolerance > 0.0 {
                self.closure_tolerance
            } else {
                defaults.closure_tolerance
            },
            cross_derivative_scale: if self.cross_derivative_scale.is_finite()
                && self.cross_derivative_scale > 0.0
            {
                self.cross_derivative_scale
            } else {
                defaults.cross_derivative_scale
            },
            derivative_step: if self.derivative_step > 0.0 && self.derivative_step < 0.5 {
                self.derivative_step
            } else {
                defaults.derivative_step
            },
        }
    }
}
