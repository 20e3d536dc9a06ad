// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Mutable state of one mounted viewer.

use std::time::Instant;

use arena_app_core::prefs::ViewerPrefs;
use arena_assets::{Metadata, Namespace};
use arena_scene::CameraState;
use glam::{Quat, Vec3};
use tracing::{debug, info};

use crate::framing::{clip_planes, frame, Projection};
use crate::interaction::{radians_per_second, InteractionController, InteractionEvent};
use crate::presets::{pose, ViewMode, ViewPreset};

/// View mode, auto-rotate state and camera of one viewer.
///
/// Created on mount and dropped on unmount; never shared between viewers.
/// Presets requested before metadata is known stay pending until it is.
#[derive(Debug, Clone)]
pub struct ViewerSession {
    namespace: Namespace,
    path: String,
    mode: ViewMode,
    controller: InteractionController,
    metadata: Option<Metadata>,
    camera: CameraState,
    projection: Projection,
    offset_factor: f32,
    last_tick: Instant,
}

impl ViewerSession {
    /// Start a session for `path` under `namespace`.
    pub fn new(namespace: Namespace, path: impl Into<String>, prefs: &ViewerPrefs, now: Instant) -> Self {
        Self {
            namespace,
            path: path.into(),
            mode: ViewMode::Free,
            controller: InteractionController::new(&prefs.interaction),
            metadata: None,
            camera: CameraState::default(),
            projection: Projection::from_prefs(&prefs.camera),
            offset_factor: prefs.camera.offset_factor,
            last_tick: now,
        }
    }

    /// Namespace this session loads under.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Asset path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current view mode.
    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    /// Current camera.
    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    /// Metadata, once the asset is ready.
    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    /// Auto-rotate controller.
    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    /// Returns `true` while the camera auto-rotates.
    pub fn is_rotating(&self) -> bool {
        self.controller.is_rotating()
    }

    /// Install metadata and place the camera at the framed view.
    pub fn set_metadata(&mut self, metadata: Metadata) {
        let framing = frame(&metadata, self.projection, self.offset_factor);
        self.camera = framing.camera_state();
        self.controller.set_max_dimension(metadata.max_dimension);
        info!(
            namespace = %self.namespace,
            path = %self.path,
            distance = framing.distance,
            speed = self.controller.speed(),
            "camera framed"
        );
        self.metadata = Some(metadata);
    }

    /// Queue a preset for the next [`ViewerSession::apply_pending`].
    pub fn request_view(&mut self, preset: ViewPreset) {
        self.mode = ViewMode::Directed(preset);
    }

    /// Feed one input event.
    pub fn on_input(&mut self, event: InteractionEvent, now: Instant) {
        self.controller.on_event(event, now);
    }

    /// Apply a pending preset if metadata is available. Returns the preset
    /// applied, if any; the mode is back to [`ViewMode::Free`] afterwards.
    pub fn apply_pending(&mut self) -> Option<ViewPreset> {
        let ViewMode::Directed(preset) = self.mode else {
            return None;
        };
        let metadata = self.metadata.as_ref()?;
        let p = pose(preset, metadata.max_dimension, self.projection, self.offset_factor);
        let (near, far) = clip_planes(p.position.length());
        self.camera.position = p.position;
        self.camera.up = p.up;
        self.camera.near = near;
        self.camera.far = far;
        if preset == ViewPreset::Reset {
            self.controller.resume();
        }
        self.mode = ViewMode::Free;
        debug!(namespace = %self.namespace, %preset, "view preset applied");
        Some(preset)
    }

    /// Advance timers and orbit the camera if rotating. Returns `true` if the
    /// camera moved.
    pub fn advance(&mut self, now: Instant) -> bool {
        let dt = now.saturating_duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;
        self.controller.tick(now);
        if !self.controller.is_rotating() || self.metadata.is_none() || dt <= 0.0 {
            return false;
        }
        let angle = radians_per_second(self.controller.speed()) * dt;
        let rotation = Quat::from_rotation_y(angle);
        self.camera.position = rotation * self.camera.position;
        if self.camera.up != Vec3::Y {
            self.camera.up = rotation * self.camera.up;
        }
        true
    }
}
