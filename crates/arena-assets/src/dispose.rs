// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Renderer resource release for a scene subtree.

use std::collections::HashSet;
use std::ops::AddAssign;

use arena_scene::{Geometry, GpuPort, Material, NodeContent, ResourceId, Scene};
use tracing::debug;

/// What one disposal released.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DisposalReport {
    /// Cache entries removed (zero when disposing a bare scene).
    pub entries: usize,
    /// Geometries released.
    pub geometries: usize,
    /// Materials released.
    pub materials: usize,
    /// Textures released.
    pub textures: usize,
}

impl DisposalReport {
    /// Total resources released.
    pub fn resources(&self) -> usize {
        self.geometries + self.materials + self.textures
    }
}

impl AddAssign for DisposalReport {
    fn add_assign(&mut self, rhs: Self) {
        self.entries += rhs.entries;
        self.geometries += rhs.geometries;
        self.materials += rhs.materials;
        self.textures += rhs.textures;
    }
}

struct Releaser<'a> {
    gpu: &'a mut dyn GpuPort,
    seen: HashSet<ResourceId>,
    report: DisposalReport,
}

impl Releaser<'_> {
    fn geometry(&mut self, geometry: &Geometry) {
        if self.seen.insert(geometry.id()) {
            self.gpu.release_geometry(geometry.id());
            self.report.geometries += 1;
        }
    }

    fn material(&mut self, material: &Material) {
        if self.seen.insert(material.id()) {
            self.gpu.release_material(material.id());
            self.report.materials += 1;
        }
        if let Some(texture) = material.kind.texture() {
            if self.seen.insert(texture.id()) {
                self.gpu.release_texture(texture.id());
                self.report.textures += 1;
            }
        }
    }
}

/// Release every geometry, material and texture reachable from `scene`,
/// hidden nodes included, each exactly once.
///
/// Resources shared between meshes of the same scene are released once.
/// Resources of other scenes are untouched: optimized scenes only hold
/// duplicated geometry and materials, and each namespace decodes its own
/// copy of an asset.
pub fn dispose(scene: &Scene, gpu: &mut dyn GpuPort) -> DisposalReport {
    let mut releaser = Releaser {
        gpu,
        seen: HashSet::new(),
        report: DisposalReport::default(),
    };
    scene.walk(|node, _| match &node.content {
        NodeContent::Mesh(mesh) => {
            if let Some(geometry) = &mesh.geometry {
                releaser.geometry(geometry);
            }
            if let Some(material) = &mesh.material {
                releaser.material(material);
            }
        }
        NodeContent::Instanced(instanced) => {
            releaser.geometry(&instanced.geometry);
            releaser.material(&instanced.material);
        }
        NodeContent::Empty => {}
    });
    let report = releaser.report;
    debug!(
        root = %scene.root.name,
        geometries = report.geometries,
        materials = report.materials,
        textures = report.textures,
        "scene disposed"
    );
    report
}
