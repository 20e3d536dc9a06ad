// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Model loading, optimization and release for Arena viewers.
//!
//! `arena-assets` owns everything between "a viewer wants asset P under
//! namespace N" and "the renderer may draw this scene". [`AssetCache`] is an
//! instantiable service; there is no global state. Each viewer session picks
//! a [`Namespace`], and entries in one namespace are never visible to, or
//! evicted by, another, even for the same path.
//!
//! # Load Pipeline
//!
//! fetch → decode → [`optimize`] → [`compute_metadata`] → [`center_scene`] →
//! `Ready`. Fetching and decoding are ports ([`AssetFetcher`],
//! [`SceneDecoder`]); this crate never parses a file format.
//!
//! # Signature Policy
//!
//! Instancing groups meshes by [`Signature`]: BLAKE3 over the complete
//! vertex/index buffers plus the material's visual properties. Buffers are
//! hashed in full; a prefix sample cannot tell apart meshes that only differ
//! past the sample.
//!
//! # Release Policy
//!
//! [`dispose`] releases each resource id once per call, and the cache removes
//! an entry before disposing it, so no scene is ever disposed twice.

mod cache;
mod dispose;
mod loader;
mod metadata;
mod optimize;
mod signature;

pub use cache::{AssetCache, AssetState, CacheStats, LoadedAsset, Namespace};
pub use dispose::{dispose, DisposalReport};
pub use loader::{
    ArtifactDescriptor, ArtifactKind, AssetFetcher, BucketUrlResolver, DecodeError, FetchError,
    SceneDecoder, UrlResolver,
};
pub use metadata::{center_scene, compute_metadata, scene_bounds, Metadata};
pub use optimize::{is_special, optimize, OptimizeStats};
pub use signature::{signature, Signature, SignatureCache};

/// Errors surfaced by [`AssetCache`] loads.
///
/// `Clone` because one failed load is delivered to every awaiter of the
/// shared in-flight future.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// The bytes could not be fetched.
    #[error("[ASSET_FETCH] {url}: {reason}")]
    Fetch {
        /// URL that was requested.
        url: String,
        /// Fetcher-provided reason.
        reason: String,
    },
    /// The bytes were fetched but did not decode into a scene.
    #[error("[ASSET_DECODE] {url}: {reason}")]
    Decode {
        /// URL the bytes came from.
        url: String,
        /// Decoder-provided reason.
        reason: String,
    },
    /// The entry was cleaned up before it became ready.
    #[error("[ASSET_EVICTED] {namespace}/{path}")]
    Evicted {
        /// Namespace of the entry.
        namespace: String,
        /// Asset path of the entry.
        path: String,
    },
}
