// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Ports the cache loads through: URL resolution, fetching and decoding.

use arena_scene::Scene;
use futures_util::future::LocalBoxFuture;
use thiserror::Error;

/// Fetcher-side failure (network, missing file, HTTP status).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct FetchError(pub String);

/// Decoder-side failure (malformed or unsupported bytes).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DecodeError(pub String);

/// Byte source for asset URLs.
///
/// One call per load attempt; the cache never retries on its own.
pub trait AssetFetcher {
    /// Fetch the bytes behind `url`.
    fn fetch(&self, url: &str) -> LocalBoxFuture<'static, Result<Vec<u8>, FetchError>>;
}

/// Turns fetched bytes into a scene graph.
pub trait SceneDecoder {
    /// Decode `bytes` fetched from `url`.
    fn decode(&self, url: &str, bytes: &[u8]) -> Result<Scene, DecodeError>;
}

/// Category of a stored artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// A renderable 3D model.
    Model,
    /// The raw build file the model was exported from.
    Source,
}

impl ArtifactKind {
    /// Path segment used by [`BucketUrlResolver`].
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Model => "models",
            Self::Source => "sources",
        }
    }
}

/// Storage coordinates of an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactDescriptor {
    /// Artifact category.
    pub kind: ArtifactKind,
    /// Storage bucket.
    pub bucket: String,
    /// Object key inside the bucket.
    pub key: String,
}

/// Maps artifact descriptors to the absolute URL the fetcher loads.
pub trait UrlResolver {
    /// Absolute URL for `artifact`.
    fn resolve(&self, artifact: &ArtifactDescriptor) -> String;
}

/// `{base}/{bucket}/{kind}/{key}` resolver for bucket-style object storage.
#[derive(Debug, Clone)]
pub struct BucketUrlResolver {
    base: String,
}

impl BucketUrlResolver {
    /// Create a resolver rooted at `base` (trailing slashes are ignored).
    pub fn new(base: impl Into<String>) -> Self {
        let base: String = base.into();
        Self {
            base: base.trim_end_matches('/').to_owned(),
        }
    }
}

impl UrlResolver for BucketUrlResolver {
    fn resolve(&self, artifact: &ArtifactDescriptor) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base,
            artifact.bucket.trim_matches('/'),
            artifact.kind.as_str(),
            artifact.key.trim_start_matches('/')
        )
    }
}
