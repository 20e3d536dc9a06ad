// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Initial camera placement derived from model size.

use core::f32::consts::{FRAC_PI_4, FRAC_PI_6, PI};

use arena_app_core::prefs::CameraPrefs;
use arena_assets::Metadata;
use arena_scene::{CameraState, ProjectionKind};
use glam::Vec3;

/// Default multiplier on the fitted distance.
pub const DEFAULT_OFFSET_FACTOR: f32 = 1.8;

/// Lower bound for the near plane.
pub const NEAR_EPSILON: f32 = 0.01;

/// Max-dimension substituted when metadata reports a non-positive or
/// non-finite size.
const FALLBACK_MAX_DIMENSION: f32 = 2.0;

/// Minimum clearance: the camera never starts closer than this multiple of
/// max-dimension.
const MIN_SAFE_FACTOR: f32 = 1.2;

/// Elevation above the horizon for framed views.
pub const ELEVATION: f32 = FRAC_PI_6;

/// Azimuth around +Y, measured from +X toward +Z.
pub const AZIMUTH: f32 = FRAC_PI_4;

/// Projection used when framing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Perspective with a vertical field of view in radians.
    Perspective {
        /// Vertical field of view (radians). Clamped into (0, π).
        fov_y: f32,
    },
    /// Orthographic; distance only affects clipping.
    Orthographic,
}

impl Projection {
    /// The perspective default (45° vertical).
    pub const DEFAULT: Self = Self::Perspective { fov_y: FRAC_PI_4 };

    /// Projection selected by saved camera preferences.
    pub fn from_prefs(prefs: &CameraPrefs) -> Self {
        if prefs.orthographic {
            Self::Orthographic
        } else {
            Self::Perspective { fov_y: prefs.fov_y }
        }
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Result of [`frame`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Framing {
    /// Camera position.
    pub position: Vec3,
    /// Look-at target (always the origin; scenes are centered on load).
    pub look_at: Vec3,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
    /// Distance from `position` to `look_at`.
    pub distance: f32,
    /// Projection the framing was computed for.
    pub projection: Projection,
}

impl Framing {
    /// Camera state for a [`RenderSurface`](arena_scene::RenderSurface).
    pub fn camera_state(&self) -> CameraState {
        let (projection, fov_y_radians) = match self.projection {
            Projection::Perspective { fov_y } => (ProjectionKind::Perspective, clamp_fov(fov_y)),
            Projection::Orthographic => (ProjectionKind::Orthographic, CameraState::default().fov_y_radians),
        };
        CameraState {
            position: self.position,
            target: self.look_at,
            up: Vec3::Y,
            projection,
            fov_y_radians,
            near: self.near,
            far: self.far,
        }
    }
}

/// Usable max-dimension: non-positive or non-finite values become 2.0.
pub fn effective_max_dimension(max_dimension: f32) -> f32 {
    if max_dimension.is_finite() && max_dimension > 0.0 {
        max_dimension
    } else {
        FALLBACK_MAX_DIMENSION
    }
}

/// Usable offset factor: non-positive or non-finite values become
/// [`DEFAULT_OFFSET_FACTOR`].
pub fn effective_offset_factor(offset_factor: f32) -> f32 {
    if offset_factor.is_finite() && offset_factor > 0.0 {
        offset_factor
    } else {
        DEFAULT_OFFSET_FACTOR
    }
}

fn clamp_fov(fov_y: f32) -> f32 {
    if fov_y.is_finite() {
        fov_y.clamp(1e-3, PI - 1e-3)
    } else {
        FRAC_PI_4
    }
}

/// Distance from the origin at which a model of `max_dimension` fits.
pub fn fit_distance(max_dimension: f32, projection: Projection, offset_factor: f32) -> f32 {
    let max_dimension = effective_max_dimension(max_dimension);
    let offset_factor = effective_offset_factor(offset_factor);
    match projection {
        Projection::Perspective { fov_y } => {
            let half_fov = clamp_fov(fov_y) / 2.0;
            let standard = (max_dimension / 2.0) / half_fov.tan() * offset_factor;
            standard.max(max_dimension * MIN_SAFE_FACTOR)
        }
        Projection::Orthographic => max_dimension * 2.0 * offset_factor,
    }
}

/// Clip planes for a camera at `distance`.
pub fn clip_planes(distance: f32) -> (f32, f32) {
    ((distance / 100.0).max(NEAR_EPSILON), distance * 100.0)
}

/// Point at `distance` from the origin, 30° up and 45° around.
pub fn orbit_position(distance: f32) -> Vec3 {
    let (sin_el, cos_el) = ELEVATION.sin_cos();
    let (sin_az, cos_az) = AZIMUTH.sin_cos();
    Vec3::new(
        distance * cos_el * cos_az,
        distance * sin_el,
        distance * cos_el * sin_az,
    )
}

/// Frame a centered model.
///
/// Pure: the same inputs always produce the same framing, and metadata is
/// only read. For a fixed projection and offset factor the distance is
/// non-decreasing in `metadata.max_dimension`.
pub fn frame(metadata: &Metadata, projection: Projection, offset_factor: f32) -> Framing {
    let distance = fit_distance(metadata.max_dimension, projection, offset_factor);
    let (near, far) = clip_planes(distance);
    Framing {
        position: orbit_position(distance),
        look_at: Vec3::ZERO,
        near,
        far,
        distance,
        projection,
    }
}
