//! Processor configuration.
//!
//! [`ProcessorSettings`] gathers the tunable constants of the pipeline passes
//! (skin weight threshold, minimum sphere radius, UV overlap tolerances).
//! A [`Scene`](crate::scene::Scene) carries one instance; all passes read it
//! from there.

use serde::{Deserialize, Serialize};

use crate::bounds::fit::FitMode;
use crate::errors::{Result, SceneError};

// ---------------------------------------------------------------------------
// ProcessorSettings
// ---------------------------------------------------------------------------

/// Tunable constants for the scene processing passes.
///
/// # Fields
///
/// | Field                   | Description                                   | Default                  |
/// |-------------------------|-----------------------------------------------|--------------------------|
/// | `skin_weight_threshold` | Minimum influence weight that counts a joint  | `0.1`                    |
/// | `min_sphere_radius`     | Fitted spheres below this radius are dropped  | `0.0005`                 |
/// | `fit_mode`              | Bounding sphere fitting strategy              | `OptimizedPrincipalAxis` |
/// | `uv_scale`              | UV magnification before overlap testing       | `100.0`                  |
/// | `uv_shrink_factor`      | Triangle shrink toward centroid               | `0.99`                   |
/// | `identity_epsilon`      | Tolerance when testing for identity matrices  | `1e-6`                   |
///
/// # Example
///
/// ```rust,ignore
/// use content_scene::settings::ProcessorSettings;
///
/// let settings = ProcessorSettings {
///     min_sphere_radius: 0.01,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorSettings {
    /// Minimum weight for a joint influence to be considered significant.
    ///
    /// Used both to mark joints as required for the joint ordering and to
    /// assign vertices to per-joint bounding sphere buckets.
    pub skin_weight_threshold: f32,

    /// Bounding spheres with a radius strictly below this value are discarded.
    pub min_sphere_radius: f32,

    /// Strategy for fitting a sphere to a point set.
    pub fit_mode: FitMode,

    /// UV coordinates are multiplied by this factor before the narrow phase
    /// to keep the separating-axis arithmetic away from tiny magnitudes.
    pub uv_scale: f32,

    /// Each triangle is scaled by this factor about its centroid before the
    /// narrow phase so that shared edges and vertices do not count as overlap.
    pub uv_shrink_factor: f32,

    /// Matrices closer than this (per element) to identity are treated as
    /// identity by the optimizer.
    pub identity_epsilon: f32,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            skin_weight_threshold: 0.1,
            min_sphere_radius: 0.0005,
            fit_mode: FitMode::OptimizedPrincipalAxis,
            uv_scale: 100.0,
            uv_shrink_factor: 0.99,
            identity_epsilon: 1e-6,
        }
    }
}

impl ProcessorSettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses settings from a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    #[must_use]
    pub fn with_skin_weight_threshold(mut self, threshold: f32) -> Self {
        self.skin_weight_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_min_sphere_radius(mut self, radius: f32) -> Self {
        self.min_sphere_radius = radius;
        self
    }

    #[must_use]
    pub fn with_fit_mode(mut self, mode: FitMode) -> Self {
        self.fit_mode = mode;
        self
    }

    /// Checks that every field is inside its meaningful range.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.skin_weight_threshold) {
            return Err(SceneError::InvalidSettings(format!(
                "skin_weight_threshold must be in [0, 1], got {}",
                self.skin_weight_threshold
            )));
        }
        if self.min_sphere_radius < 0.0 || !self.min_sphere_radius.is_finite() {
            return Err(SceneError::InvalidSettings(format!(
                "min_sphere_radius must be a non-negative finite value, got {}",
                self.min_sphere_radius
            )));
        }
        if self.uv_scale <= 0.0 || !self.uv_scale.is_finite() {
            return Err(SceneError::InvalidSettings(format!(
                "uv_scale must be positive, got {}",
                self.uv_scale
            )));
        }
        if !(self.uv_shrink_factor > 0.0 && self.uv_shrink_factor <= 1.0) {
            return Err(SceneError::InvalidSettings(format!(
                "uv_shrink_factor must be in (0, 1], got {}",
                self.uv_shrink_factor
            )));
        }
        if self.identity_epsilon < 0.0 {
            return Err(SceneError::InvalidSettings(format!(
                "identity_epsilon must be non-negative, got {}",
                self.identity_epsilon
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = ProcessorSettings::default();
        assert!(settings.validate().is_ok());
        assert!((settings.skin_weight_threshold - 0.1).abs() < f32::EPSILON);
        assert!((settings.min_sphere_radius - 0.0005).abs() < f32::EPSILON);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let settings = ProcessorSettings::from_json_str(r#"{ "min_sphere_radius": 0.25 }"#).unwrap();
        assert!((settings.min_sphere_radius - 0.25).abs() < f32::EPSILON);
        assert!((settings.uv_scale - 100.0).abs() < f32::EPSILON);
        assert_eq!(settings.fit_mode, FitMode::OptimizedPrincipalAxis);
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let err = ProcessorSettings::from_json_str(r#"{ "skin_weight_threshold": 1.5 }"#);
        assert!(matches!(err, Err(SceneError::InvalidSettings(_))));
    }
}
