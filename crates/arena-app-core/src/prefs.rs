// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared viewer preferences (camera framing, auto-rotate, optimizer knobs).

use serde::{Deserialize, Serialize};

/// Saved preferences for a model viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ViewerPrefs {
    /// Camera framing.
    pub camera: CameraPrefs,
    /// Auto-rotate and inactivity behavior.
    pub interaction: InteractionPrefs,
    /// Load-time mesh optimization.
    pub optimizer: OptimizerPrefs,
}

/// Camera projection and framing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraPrefs {
    /// Vertical field of view (radians).
    pub fov_y: f32,
    /// Multiplier on the fit-to-view distance.
    pub offset_factor: f32,
    /// Use an orthographic projection instead of perspective.
    pub orthographic: bool,
}

impl Default for CameraPrefs {
    fn default() -> Self {
        Self {
            fov_y: 45f32.to_radians(),
            offset_factor: 1.8,
            orthographic: false,
        }
    }
}

/// Auto-rotate behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionPrefs {
    /// Rotate the model when the user is idle.
    pub auto_rotate: bool,
    /// Idle time after the last interaction before rotation resumes.
    pub inactivity_ms: u64,
    /// Lower clamp on auto-rotate speed (2.0 = one orbit per 30 s).
    pub min_speed: f32,
    /// Upper clamp on auto-rotate speed.
    pub max_speed: f32,
}

impl Default for InteractionPrefs {
    fn default() -> Self {
        Self {
            auto_rotate: true,
            inactivity_ms: 5_000,
            min_speed: 1.0,
            max_speed: 4.0,
        }
    }
}

/// Instancing optimizer knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerPrefs {
    /// Merge identical meshes into instanced draw objects.
    pub instancing: bool,
    /// Depth-bias slope factor for opaque duplicated materials.
    pub polygon_offset_factor: f32,
    /// Depth-bias constant units for opaque duplicated materials.
    pub polygon_offset_units: f32,
    /// Opacity below which a material is drawn as transparent.
    pub opacity_threshold: f32,
}

impl Default for OptimizerPrefs {
    fn default() -> Self {
        Self {
            instancing: true,
            polygon_offset_factor: 1.0,
            polygon_offset_units: 1.0,
            opacity_threshold: 0.99,
        }
    }
}
