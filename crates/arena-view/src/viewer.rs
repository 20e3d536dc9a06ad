// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Viewer container: cache + session + render surface.

use std::rc::Rc;
use std::time::Instant;

use arena_app_core::prefs::ViewerPrefs;
use arena_assets::{AssetCache, DisposalReport, LoadError, LoadedAsset, Namespace};
use arena_scene::{GpuPort, RenderSurface};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::interaction::InteractionEvent;
use crate::presets::ViewPreset;
use crate::session::ViewerSession;

/// Errors from [`Viewer`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewerError {
    /// The operation needs a mounted viewer.
    #[error("[VIEWER_NOT_MOUNTED] {namespace}/{path}")]
    NotMounted {
        /// Namespace of the viewer.
        namespace: String,
        /// Asset path of the viewer.
        path: String,
    },
    /// The asset failed to load.
    #[error("[VIEWER_LOAD] {0}")]
    Load(#[from] LoadError),
}

/// What [`Viewer::unmount`] releases from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Teardown {
    /// Leave the asset cached for other viewers or a later remount.
    #[default]
    Keep,
    /// Clean up this viewer's (namespace, path) entry.
    Path,
    /// Clean up every entry in this viewer's namespace.
    Namespace,
}

/// One mounted model viewer.
///
/// Drives a [`RenderSurface`] from an [`AssetCache`] entry. The surface only
/// ever sees a scene whose metadata is ready, and the camera is always framed
/// from that metadata before the first render.
pub struct Viewer<S: RenderSurface> {
    cache: AssetCache,
    surface: S,
    namespace: Namespace,
    path: String,
    prefs: ViewerPrefs,
    session: Option<ViewerSession>,
    asset: Option<Rc<LoadedAsset>>,
    fullscreen: bool,
}

impl<S: RenderSurface> Viewer<S> {
    /// Create an unmounted viewer for `path` under `namespace`.
    pub fn new(
        cache: AssetCache,
        surface: S,
        namespace: Namespace,
        path: impl Into<String>,
        prefs: ViewerPrefs,
    ) -> Self {
        Self {
            cache,
            surface,
            namespace,
            path: path.into(),
            prefs,
            session: None,
            asset: None,
            fullscreen: false,
        }
    }

    /// The render surface.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// The session, while mounted.
    pub fn session(&self) -> Option<&ViewerSession> {
        self.session.as_ref()
    }

    /// The loaded asset, once [`Viewer::load`] succeeded.
    pub fn asset(&self) -> Option<&Rc<LoadedAsset>> {
        self.asset.as_ref()
    }

    /// Returns `true` between [`Viewer::mount`] and [`Viewer::unmount`].
    pub fn is_mounted(&self) -> bool {
        self.session.is_some()
    }

    /// Whether the surface is fullscreen.
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Create the session. Mounting twice keeps the existing session.
    pub fn mount(&mut self, now: Instant) {
        if self.session.is_some() {
            return;
        }
        self.session = Some(ViewerSession::new(
            self.namespace.clone(),
            self.path.clone(),
            &self.prefs,
            now,
        ));
        info!(namespace = %self.namespace, path = %self.path, "viewer mounted");
    }

    /// Load the asset, wait for its metadata, attach the scene and frame it.
    ///
    /// Shares the cache entry with any other viewer of the same
    /// (namespace, path).
    #[instrument(skip(self), fields(namespace = %self.namespace, path = %self.path))]
    pub async fn load(&mut self) -> Result<Rc<LoadedAsset>, ViewerError> {
        if self.session.is_none() {
            return Err(self.not_mounted());
        }
        let asset = self.cache.preload(&self.namespace, &self.path).await?;
        let metadata = self.cache.metadata(&self.namespace, &self.path).await?;

        let Some(session) = self.session.as_mut() else {
            return Err(self.not_mounted());
        };
        session.set_metadata(metadata);
        self.surface.attach_scene(Rc::clone(&asset.scene));
        self.surface.set_camera(session.camera());
        self.asset = Some(Rc::clone(&asset));
        Ok(asset)
    }

    /// Forward one input event to the auto-rotate controller.
    pub fn handle_input(&mut self, event: InteractionEvent, now: Instant) {
        if let Some(session) = self.session.as_mut() {
            session.on_input(event, now);
        }
    }

    /// Queue a preset; it is applied on the next [`Viewer::tick`] once
    /// metadata is available.
    pub fn request_view(&mut self, preset: ViewPreset) {
        if let Some(session) = self.session.as_mut() {
            session.request_view(preset);
        }
    }

    /// One frame: apply a pending preset, advance the inactivity timer and
    /// orbit, push the camera, render. Does nothing until a scene is loaded.
    pub fn tick(&mut self, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.apply_pending();
        session.advance(now);
        if self.asset.is_none() {
            return;
        }
        self.surface.set_camera(session.camera());
        self.surface.render();
    }

    /// Toggle fullscreen. A refused request is logged and leaves the state
    /// unchanged. Returns the resulting state.
    pub fn toggle_fullscreen(&mut self) -> bool {
        let target = !self.fullscreen;
        match self.surface.set_fullscreen(target) {
            Ok(()) => self.fullscreen = target,
            Err(err) => {
                warn!(namespace = %self.namespace, error = %err, "fullscreen request failed");
            }
        }
        self.fullscreen
    }

    /// Resize the surface.
    pub fn resize(&mut self, width: u32, height: u32, dpr: f32) {
        self.surface.resize(width, height, dpr);
    }

    /// Detach the scene, drop the session and optionally clean up the cache.
    ///
    /// An in-flight load is not cancelled; with [`Teardown::Path`] or
    /// [`Teardown::Namespace`] its result is discarded when it lands.
    pub fn unmount(&mut self, teardown: Teardown, gpu: &mut dyn GpuPort) -> DisposalReport {
        if self.asset.take().is_some() {
            self.surface.detach_scene();
        }
        self.session = None;
        let report = match teardown {
            Teardown::Keep => DisposalReport::default(),
            Teardown::Path => self.cache.cleanup_one(&self.namespace, &self.path, gpu),
            Teardown::Namespace => self.cache.cleanup_namespace(&self.namespace, gpu),
        };
        info!(
            namespace = %self.namespace,
            path = %self.path,
            ?teardown,
            released = report.resources(),
            "viewer unmounted"
        );
        report
    }

    fn not_mounted(&self) -> ViewerError {
        ViewerError::NotMounted {
            namespace: self.namespace.to_string(),
            path: self.path.clone(),
        }
    }
}
