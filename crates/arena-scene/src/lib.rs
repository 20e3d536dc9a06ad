// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scene contract for Arena model viewers.
//!
//! This crate defines the in-memory scene graph a decoded model lives in and
//! the two ports a renderer implements. It has no loading, caching or camera
//! logic. That lives in `arena-assets` and `arena-view`.
//!
//! # Design Principles
//!
//! - **Resources carry identity**: every geometry, material and texture has a
//!   process-unique [`ResourceId`]. Sharing an `Rc` shares the id; calling
//!   `duplicate()` mints a new one. Release is keyed by id.
//! - **Materials are a closed set**: [`MaterialKind`] is a tagged union over
//!   the variants the viewer supports; there are no optional-field lookups.
//! - **Renderers are dumb**: a [`RenderSurface`] receives a scene and a
//!   camera and draws. It owns no timing and no domain logic.
//!
//! # Crate Features
//!
//! - `test-utils`: exposes [`mock::MockGpu`] and [`mock::MockSurface`].

use thiserror::Error;

mod bounds;
mod camera;
mod canon;
mod port;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use bounds::{Aabb, BoundingSphere};
pub use camera::{CameraState, ProjectionKind};
pub use canon::{canonical_bits, canonicalize_f32};
pub use port::{GpuPort, RenderSurface};
pub use types::{
    Color, Geometry, InstancedMesh, Material, MaterialKind, Mesh, Node, NodeContent,
    PolygonOffset, RenderState, ResourceId, Scene, Texture,
};

/// Error type for render surface requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// The host refused a fullscreen transition.
    #[error("[SURFACE_FULLSCREEN_DENIED] {0}")]
    FullscreenDenied(String),
    /// The surface is gone (window closed, canvas detached).
    #[error("[SURFACE_LOST] {0}")]
    Lost(String),
}
