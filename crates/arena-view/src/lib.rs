// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Camera and interaction layer for Arena model viewers.
//!
//! Everything here is deterministic given its inputs: framing is a pure
//! function of metadata, and the auto-rotate controller takes `now` instead
//! of reading a clock. [`Viewer`] ties a session to an
//! [`AssetCache`](arena_assets::AssetCache) entry and a
//! [`RenderSurface`](arena_scene::RenderSurface).
//!
//! # Ordering
//!
//! A viewer never frames or applies a preset before the asset's metadata is
//! ready. Presets requested early stay pending in the [`ViewerSession`].

mod framing;
mod interaction;
mod presets;
mod session;
mod viewer;

pub use framing::{
    clip_planes, effective_max_dimension, effective_offset_factor, fit_distance, frame,
    orbit_position, Framing, Projection, AZIMUTH, DEFAULT_OFFSET_FACTOR, ELEVATION, NEAR_EPSILON,
};
pub use interaction::{radians_per_second, speed_for, InteractionController, InteractionEvent};
pub use presets::{pose, CameraPose, UnknownPreset, ViewMode, ViewPreset, CARDINAL_DISTANCE_FACTOR};
pub use session::ViewerSession;
pub use viewer::{Teardown, Viewer, ViewerError};
