// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Renderer-facing ports.

use std::rc::Rc;

use crate::{CameraState, ResourceId, Scene, SurfaceError};

/// Renderer-side resource release.
///
/// Implementors free whatever buffers, programs and images they created for
/// a resource id. Callers guarantee each id is released at most once; an
/// implementation may treat a repeat as a bug.
pub trait GpuPort {
    /// Free vertex/index buffers for a geometry.
    fn release_geometry(&mut self, id: ResourceId);

    /// Free pipeline/program state for a material.
    fn release_material(&mut self, id: ResourceId);

    /// Free image memory for a texture.
    fn release_texture(&mut self, id: ResourceId);
}

/// Render surface port.
///
/// A viewer owns one surface. The surface draws the attached scene from the
/// last camera it was given; it owns no timing and no camera logic.
pub trait RenderSurface {
    /// Attach the scene to draw. Replaces any previous scene.
    fn attach_scene(&mut self, scene: Rc<Scene>);

    /// Drop the reference to the current scene without releasing resources.
    fn detach_scene(&mut self);

    /// Set camera state for subsequent frames.
    fn set_camera(&mut self, camera: &CameraState);

    /// Draw one frame.
    fn render(&mut self);

    /// Resize the drawable area.
    fn resize(&mut self, width: u32, height: u32, dpr: f32);

    /// Enter or leave fullscreen. Hosts may refuse.
    fn set_fullscreen(&mut self, on: bool) -> Result<(), SurfaceError>;
}
