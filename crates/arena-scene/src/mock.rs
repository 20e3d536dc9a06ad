// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Headless doubles for the renderer ports.
//!
//! [`MockGpu`] records every release and counts repeats; [`MockSurface`]
//! records what a viewer pushed to it. Neither touches a GPU.

use std::collections::HashSet;
use std::rc::Rc;

use crate::{CameraState, GpuPort, RenderSurface, ResourceId, Scene, SurfaceError};

/// Mock GPU resource tracker.
///
/// Releases are recorded in call order. A second release of the same id is
/// counted in [`MockGpu::double_releases`] instead of being recorded again.
#[derive(Debug, Default)]
pub struct MockGpu {
    /// Geometry ids released, in call order.
    pub geometries: Vec<ResourceId>,
    /// Material ids released, in call order.
    pub materials: Vec<ResourceId>,
    /// Texture ids released, in call order.
    pub textures: Vec<ResourceId>,
    /// Number of releases of an id that was already released.
    pub double_releases: u32,
    seen: HashSet<ResourceId>,
}

impl MockGpu {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `id` has been released through any method.
    pub fn was_released(&self, id: ResourceId) -> bool {
        self.seen.contains(&id)
    }

    /// Total number of distinct releases.
    pub fn release_count(&self) -> usize {
        self.seen.len()
    }

    fn record(&mut self, id: ResourceId) -> bool {
        if self.seen.insert(id) {
            true
        } else {
            self.double_releases += 1;
            false
        }
    }
}

impl GpuPort for MockGpu {
    fn release_geometry(&mut self, id: ResourceId) {
        if self.record(id) {
            self.geometries.push(id);
        }
    }

    fn release_material(&mut self, id: ResourceId) {
        if self.record(id) {
            self.materials.push(id);
        }
    }

    fn release_texture(&mut self, id: ResourceId) {
        if self.record(id) {
            self.textures.push(id);
        }
    }
}

/// Mock render surface for testing viewers.
#[derive(Debug, Default)]
pub struct MockSurface {
    /// Currently attached scene.
    pub scene: Option<Rc<Scene>>,
    /// Last camera state pushed.
    pub camera: Option<CameraState>,
    /// Number of camera updates received.
    pub camera_updates: u32,
    /// Number of render calls.
    pub render_count: u32,
    /// Current viewport dimensions.
    pub viewport: (u32, u32, f32),
    /// Current fullscreen state.
    pub fullscreen: bool,
    /// When set, fullscreen requests fail.
    pub deny_fullscreen: bool,
}

impl MockSurface {
    /// Create a new mock surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a scene is attached.
    pub fn has_scene(&self) -> bool {
        self.scene.is_some()
    }
}

impl RenderSurface for MockSurface {
    fn attach_scene(&mut self, scene: Rc<Scene>) {
        self.scene = Some(scene);
    }

    fn detach_scene(&mut self) {
        self.scene = None;
    }

    fn set_camera(&mut self, camera: &CameraState) {
        self.camera = Some(*camera);
        self.camera_updates += 1;
    }

    fn render(&mut self) {
        self.render_count += 1;
    }

    fn resize(&mut self, width: u32, height: u32, dpr: f32) {
        self.viewport = (width, height, dpr);
    }

    fn set_fullscreen(&mut self, on: bool) -> Result<(), SurfaceError> {
        if self.deny_fullscreen {
            return Err(SurfaceError::FullscreenDenied("blocked by host".into()));
        }
        self.fullscreen = on;
        Ok(())
    }
}
