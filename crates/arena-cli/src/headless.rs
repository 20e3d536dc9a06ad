// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Renderer ports for running a viewer without a window.

use std::rc::Rc;

use arena_scene::{CameraState, GpuPort, RenderSurface, ResourceId, Scene, SurfaceError};

/// Surface that keeps the last camera and counts frames.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    scene: Option<Rc<Scene>>,
    camera: Option<CameraState>,
    frames: u64,
}

impl HeadlessSurface {
    pub fn camera(&self) -> Option<&CameraState> {
        self.camera.as_ref()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn scene(&self) -> Option<&Rc<Scene>> {
        self.scene.as_ref()
    }
}

impl RenderSurface for HeadlessSurface {
    fn attach_scene(&mut self, scene: Rc<Scene>) {
        self.scene = Some(scene);
    }

    fn detach_scene(&mut self) {
        self.scene = None;
    }

    fn set_camera(&mut self, camera: &CameraState) {
        self.camera = Some(*camera);
    }

    fn render(&mut self) {
        self.frames += 1;
    }

    fn resize(&mut self, _width: u32, _height: u32, _dpr: f32) {}

    fn set_fullscreen(&mut self, _on: bool) -> Result<(), SurfaceError> {
        Err(SurfaceError::FullscreenDenied("headless surface".into()))
    }
}

/// GPU port that only counts releases.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReleaseCounter {
    pub geometries: usize,
    pub materials: usize,
    pub textures: usize,
}

impl GpuPort for ReleaseCounter {
    fn release_geometry(&mut self, _id: ResourceId) {
        self.geometries += 1;
    }

    fn release_material(&mut self, _id: ResourceId) {
        self.materials += 1;
    }

    fn release_texture(&mut self, _id: ResourceId) {
        self.textures += 1;
    }
}
