// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Geometry-derived size facts about a loaded model.

use arena_scene::{Aabb, BoundingSphere, NodeContent, Scene};
use glam::{Mat4, Vec3};
use tracing::warn;

/// Bounds, sphere and extents of a model, in the scene's world frame before
/// centering.
///
/// Immutable once computed. Camera framing only reads
/// [`Metadata::max_dimension`]; the rest is for overlays and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metadata {
    /// World-space bounding box.
    pub bounds: Aabb,
    /// Sphere enclosing [`Metadata::bounds`].
    pub sphere: BoundingSphere,
    /// Geometric center (box center).
    pub center: Vec3,
    /// Per-axis extent.
    pub size: Vec3,
    /// `max(size.x, size.y, size.z)`.
    pub max_dimension: f32,
    /// `true` when the scene had no measurable geometry and these values are
    /// the fixed stand-in.
    pub fallback: bool,
}

impl Metadata {
    /// Stand-in for scenes with no measurable geometry: a 2×2×2 box at the
    /// origin.
    pub fn fallback() -> Self {
        let bounds = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE);
        Self {
            bounds,
            sphere: bounds.bounding_sphere(),
            center: Vec3::ZERO,
            size: Vec3::splat(2.0),
            max_dimension: 2.0,
            fallback: true,
        }
    }

    /// Derive metadata from a box. `None` if the box is empty, non-finite or
    /// has zero extent on every axis.
    pub fn from_bounds(bounds: Aabb) -> Option<Self> {
        if bounds.is_empty() || !bounds.is_finite() {
            return None;
        }
        let size = bounds.size();
        let max_dimension = size.max_element();
        if max_dimension <= f32::EPSILON {
            return None;
        }
        Some(Self {
            bounds,
            sphere: bounds.bounding_sphere(),
            center: bounds.center(),
            size,
            max_dimension,
            fallback: false,
        })
    }

    /// The bounding box after [`center_scene`] has been applied.
    pub fn centered_bounds(&self) -> Aabb {
        self.bounds.translated(-self.center)
    }
}

/// World-space box over every visible mesh and every instance.
pub fn scene_bounds(scene: &Scene) -> Aabb {
    let mut bounds = Aabb::EMPTY;
    scene.walk_visible(|node, world| match &node.content {
        NodeContent::Mesh(mesh) => {
            if let (Some(geometry), Some(_)) = (&mesh.geometry, &mesh.material) {
                bounds = bounds.union(&geometry.bounds().transformed(&world));
            }
        }
        NodeContent::Instanced(instanced) => {
            let local = instanced.geometry.bounds();
            for t in instanced.transforms() {
                let m: Mat4 = world * *t;
                bounds = bounds.union(&local.transformed(&m));
            }
        }
        NodeContent::Empty => {}
    });
    bounds
}

/// Compute metadata for an (optimized) scene.
///
/// Scenes without measurable geometry get [`Metadata::fallback`] and a
/// warning; this never fails.
pub fn compute_metadata(scene: &Scene) -> Metadata {
    let bounds = scene_bounds(scene);
    Metadata::from_bounds(bounds).unwrap_or_else(|| {
        warn!(
            empty = bounds.is_empty(),
            root = %scene.root.name,
            "degenerate model bounds; using fallback metadata"
        );
        Metadata::fallback()
    })
}

/// Translate the root so the model's geometric center sits at the origin.
pub fn center_scene(scene: &mut Scene, metadata: &Metadata) {
    if metadata.center == Vec3::ZERO {
        return;
    }
    scene.root.transform = Mat4::from_translation(-metadata.center) * scene.root.transform;
}
