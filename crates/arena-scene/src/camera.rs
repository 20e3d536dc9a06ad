// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Camera state types for scene rendering.

use core::f32::consts::FRAC_PI_4;
use glam::Vec3;

/// Camera projection type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProjectionKind {
    /// Perspective projection (objects farther away appear smaller).
    Perspective,
    /// Orthographic projection (no perspective distortion).
    Orthographic,
}

/// Camera state for rendering.
///
/// Defines the view and projection parameters for a viewer's camera. The
/// target is the world origin for every framed model because loaded scenes
/// are re-centered on their geometric center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    /// Camera position in world space.
    pub position: Vec3,
    /// Look-at target in world space.
    pub target: Vec3,
    /// Up vector.
    pub up: Vec3,
    /// Projection type.
    pub projection: ProjectionKind,
    /// Field of view in radians (for perspective).
    pub fov_y_radians: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
}

impl CameraState {
    /// Distance from the camera to its target.
    pub fn distance(&self) -> f32 {
        self.position.distance(self.target)
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            projection: ProjectionKind::Perspective,
            fov_y_radians: FRAC_PI_4, // 45 degrees
            near: 0.1,
            far: 1000.0,
        }
    }
}
