// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Instancing pass: merges meshes with identical signatures into one draw.

use std::collections::HashMap;
use std::rc::Rc;

use arena_app_core::prefs::OptimizerPrefs;
use arena_scene::{
    Geometry, InstancedMesh, Material, MaterialKind, Mesh, Node, NodeContent, PolygonOffset,
    ResourceId, Scene, Texture,
};
use glam::Mat4;
use tracing::{debug, info};

use crate::cache::Namespace;
use crate::signature::{Signature, SignatureCache};

/// Name fragments that mark foliage and glazing, which must keep their own
/// draw calls even when authored as opaque.
const SPECIAL_NAME_HINTS: &[&str] = &[
    "glass", "pane", "window", "water", "ice", "leaves", "leaf", "foliage", "grass", "vine",
];

/// Counts reported by one [`optimize`] pass. Informational only.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OptimizeStats {
    /// Visible, complete meshes found before the pass.
    pub total_meshes: usize,
    /// Draw objects afterwards (emitted objects plus special meshes).
    pub draw_objects: usize,
    /// Meshes folded into multi-instance objects.
    pub instanced_meshes: usize,
    /// Transparent/foliage meshes left untouched.
    pub special_meshes: usize,
}

/// Meshes sharing one signature, in first-encounter order.
struct InstanceGroup {
    signature: Signature,
    name: String,
    geometry: Rc<Geometry>,
    material: Rc<Material>,
    transforms: Vec<Mat4>,
}

/// Returns `true` for meshes that must be drawn individually: blended or
/// refractive materials, and anything named like glass or foliage.
pub fn is_special(mesh: &Mesh, prefs: &OptimizerPrefs) -> bool {
    let Some(material) = &mesh.material else {
        return false;
    };
    let by_kind = match &material.kind {
        MaterialKind::Opaque { .. } => false,
        MaterialKind::Transparent { opacity, .. } => *opacity < prefs.opacity_threshold,
        MaterialKind::Glass {
            opacity,
            transmission,
            ..
        } => *transmission > 0.0 || *opacity < prefs.opacity_threshold,
    };
    by_kind || has_special_hint(&mesh.name) || has_special_hint(&material.name)
}

/// Per-pass copies of decoder resources, one per source id.
///
/// Decoders may hand the same texture or material to several decodes; after
/// the pass a scene references only copies it owns, so disposing it can
/// never release a resource another cache entry still draws.
#[derive(Default)]
struct Duplicates {
    geometries: HashMap<ResourceId, Rc<Geometry>>,
    materials: HashMap<ResourceId, Rc<Material>>,
    textures: HashMap<ResourceId, Rc<Texture>>,
}

impl Duplicates {
    fn geometry(&mut self, geometry: &Geometry) -> Rc<Geometry> {
        Rc::clone(
            self.geometries
                .entry(geometry.id())
                .or_insert_with(|| Rc::new(geometry.duplicate())),
        )
    }

    fn texture(&mut self, texture: &Texture) -> Rc<Texture> {
        Rc::clone(
            self.textures
                .entry(texture.id())
                .or_insert_with(|| Rc::new(texture.duplicate())),
        )
    }

    /// A copy the caller may still mutate.
    fn material(&mut self, material: &Material) -> Material {
        let texture = material.kind.texture().map(|t| self.texture(t));
        material.duplicate_with_texture(texture)
    }

    fn shared_material(&mut self, material: &Material) -> Rc<Material> {
        if let Some(copy) = self.materials.get(&material.id()) {
            return Rc::clone(copy);
        }
        let copy = Rc::new(self.material(material));
        self.materials.insert(material.id(), Rc::clone(&copy));
        copy
    }

    /// Swap every resource left in the subtree, hidden nodes included, for
    /// its copy. Render state is carried over unchanged.
    fn replace_in(&mut self, node: &mut Node) {
        match &mut node.content {
            NodeContent::Mesh(mesh) => {
                if let Some(geometry) = mesh.geometry.take() {
                    mesh.geometry = Some(self.geometry(&geometry));
                }
                if let Some(material) = mesh.material.take() {
                    mesh.material = Some(self.shared_material(&material));
                }
            }
            NodeContent::Instanced(instanced) => {
                instanced.geometry = self.geometry(&instanced.geometry);
                instanced.material = self.shared_material(&instanced.material);
            }
            NodeContent::Empty => {}
        }
        for child in &mut node.children {
            self.replace_in(child);
        }
    }
}

fn has_special_hint(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SPECIAL_NAME_HINTS.iter().any(|hint| lower.contains(hint))
}

/// Rewrites `scene` so that meshes with equal signatures draw in one call.
///
/// Regular meshes are removed from their nodes and re-emitted under the
/// root: a group of one becomes a single mesh, a larger group becomes an
/// [`InstancedMesh`] whose instance `i` is the `i`-th member met in
/// pre-order. Emitted objects use duplicated geometry and materials, so the
/// pass never mutates a resource the decoder might share. Special meshes
/// (see [`is_special`]) stay where they are with their render state as
/// authored. Every resource the scene still references afterwards, textures
/// included, is a copy owned by this scene alone.
///
/// The removed originals never reached a renderer and are simply dropped.
pub fn optimize(namespace: &Namespace, scene: &mut Scene, prefs: &OptimizerPrefs) -> OptimizeStats {
    let mut stats = OptimizeStats::default();
    let mut duplicates = Duplicates::default();

    if !prefs.instancing {
        scene.walk_visible(|node, _| {
            if let NodeContent::Mesh(mesh) = &node.content {
                if mesh.is_complete() {
                    stats.total_meshes += 1;
                    if is_special(mesh, prefs) {
                        stats.special_meshes += 1;
                    }
                }
            }
        });
        stats.draw_objects = stats.total_meshes;
        duplicates.replace_in(&mut scene.root);
        debug!(namespace = %namespace, meshes = stats.total_meshes, "instancing disabled");
        return stats;
    }

    let mut signatures = SignatureCache::default();
    let mut groups: Vec<InstanceGroup> = Vec::new();
    let mut by_signature: HashMap<Signature, usize> = HashMap::new();

    scene.walk_visible_in_root_frame_mut(|node, world| {
        let NodeContent::Mesh(mesh) = &node.content else {
            return;
        };
        if !mesh.is_complete() {
            return;
        }
        stats.total_meshes += 1;
        if is_special(mesh, prefs) {
            stats.special_meshes += 1;
            return;
        }
        let sig = signatures.signature(mesh);
        let NodeContent::Mesh(mesh) = std::mem::take(&mut node.content) else {
            return;
        };
        let (Some(geometry), Some(material)) = (mesh.geometry, mesh.material) else {
            return;
        };
        if let Some(&i) = by_signature.get(&sig) {
            groups[i].transforms.push(world);
        } else {
            by_signature.insert(sig, groups.len());
            groups.push(InstanceGroup {
                signature: sig,
                name: mesh.name,
                geometry,
                material,
                transforms: vec![world],
            });
        }
    });

    scene.root.prune_empty();
    duplicates.replace_in(&mut scene.root);

    for group in groups {
        let geometry = duplicates.geometry(&group.geometry);
        let mut material = duplicates.material(&group.material);
        tune_render_state(&mut material, prefs);
        let material = Rc::new(material);

        let node = if group.transforms.len() == 1 {
            let transform = group.transforms[0];
            Node::mesh(
                group.name.clone(),
                Mesh::new(group.name, geometry, material),
            )
            .with_transform(transform)
        } else {
            stats.instanced_meshes += group.transforms.len();
            let name = format!("{}#{}", group.name, group.signature.short());
            Node::instanced(
                name.clone(),
                InstancedMesh::new(name, geometry, material, group.transforms),
            )
        };
        stats.draw_objects += 1;
        scene.root.children.push(node);
    }
    stats.draw_objects += stats.special_meshes;

    info!(
        namespace = %namespace,
        total = stats.total_meshes,
        draw_objects = stats.draw_objects,
        instanced = stats.instanced_meshes,
        special = stats.special_meshes,
        "instancing pass complete"
    );
    stats
}

/// Opaque duplicates get a depth bias against coplanar neighbours; blended
/// duplicates stop writing depth.
fn tune_render_state(material: &mut Material, prefs: &OptimizerPrefs) {
    match material.kind {
        MaterialKind::Opaque { .. } => {
            material.render_state.polygon_offset = Some(PolygonOffset {
                factor: prefs.polygon_offset_factor,
                units: prefs.polygon_offset_units,
            });
        }
        MaterialKind::Transparent { .. } | MaterialKind::Glass { .. } => {
            material.render_state.depth_write = false;
            material.render_state.polygon_offset = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn prefs() -> OptimizerPrefs {
        OptimizerPrefs::default()
    }

    fn ns() -> Namespace {
        Namespace::new("test")
    }

    #[test]
    fn special_detection_by_kind_and_name() {
        let g = Rc::new(Geometry::cuboid([0.5; 3]));
        let glass = Mesh::new(
            "block",
            Rc::clone(&g),
            Rc::new(Material::new(
                "m",
                MaterialKind::Glass {
                    color: [1.0; 3],
                    opacity: 1.0,
                    transmission: 0.9,
                    roughness: 0.0,
                },
            )),
        );
        assert!(is_special(&glass, &prefs()));

        let leaves = Mesh::new("oak_Leaves", Rc::clone(&g), Rc::new(Material::opaque("m", [0.2; 3])));
        assert!(is_special(&leaves, &prefs()));

        let cutout = Mesh::new(
            "fence",
            Rc::clone(&g),
            Rc::new(Material::new(
                "fence",
                MaterialKind::Transparent {
                    color: [1.0; 3],
                    opacity: 1.0,
                    map: None,
                    alpha_test: 0.5,
                },
            )),
        );
        assert!(!is_special(&cutout, &prefs()));

        let stone = Mesh::new("stone", g, Rc::new(Material::opaque("stone", [0.5; 3])));
        assert!(!is_special(&stone, &prefs()));
    }

    #[test]
    fn singleton_group_keeps_world_transform_and_gets_bias() {
        let g = Rc::new(Geometry::cuboid([0.5; 3]));
        let m = Rc::new(Material::opaque("stone", [0.5; 3]));
        let original_geometry = g.id();
        let mut scene = Scene::new(
            Node::group("root").with_child(
                Node::group("offset")
                    .with_transform(Mat4::from_translation(Vec3::new(0.0, 3.0, 0.0)))
                    .with_child(Node::mesh("stone", Mesh::new("stone", g, m))),
            ),
        );
        let stats = optimize(&ns(), &mut scene, &prefs());
        assert_eq!(stats.total_meshes, 1);
        assert_eq!(stats.draw_objects, 1);
        assert_eq!(stats.instanced_meshes, 0);

        assert_eq!(scene.root.children.len(), 1);
        let node = &scene.root.children[0];
        assert_eq!(node.transform.w_axis.truncate(), Vec3::new(0.0, 3.0, 0.0));
        let NodeContent::Mesh(mesh) = &node.content else {
            unreachable!("expected single mesh");
        };
        let geometry = mesh.geometry.as_ref().map(|g| g.id());
        assert_ne!(geometry, Some(original_geometry));
        let bias = mesh.material.as_ref().and_then(|m| m.render_state.polygon_offset);
        assert_eq!(
            bias,
            Some(PolygonOffset {
                factor: 1.0,
                units: 1.0
            })
        );
    }

    #[test]
    fn disabled_pass_leaves_scene_alone() {
        let g = Rc::new(Geometry::cuboid([0.5; 3]));
        let m = Rc::new(Material::opaque("stone", [0.5; 3]));
        let mut scene = Scene::new(
            Node::group("root")
                .with_child(Node::mesh("a", Mesh::new("a", Rc::clone(&g), Rc::clone(&m))))
                .with_child(Node::mesh("b", Mesh::new("b", g, m))),
        );
        let off = OptimizerPrefs {
            instancing: false,
            ..OptimizerPrefs::default()
        };
        let stats = optimize(&ns(), &mut scene, &off);
        assert_eq!(stats.total_meshes, 2);
        assert_eq!(stats.draw_objects, 2);
        assert_eq!(scene.draw_call_count(), 2);
    }

    #[test]
    fn mesh_with_children_keeps_its_subtree() {
        let g = Rc::new(Geometry::cuboid([0.5; 3]));
        let m = Rc::new(Material::opaque("stone", [0.5; 3]));
        let glass = Rc::new(Material::new(
            "glass",
            MaterialKind::Glass {
                color: [1.0; 3],
                opacity: 0.3,
                transmission: 1.0,
                roughness: 0.0,
            },
        ));
        let mut scene = Scene::new(
            Node::group("root").with_child(
                Node::mesh("base", Mesh::new("base", Rc::clone(&g), m))
                    .with_transform(Mat4::from_translation(Vec3::X))
                    .with_child(Node::mesh("pane", Mesh::new("pane", g, glass))),
            ),
        );
        let stats = optimize(&ns(), &mut scene, &prefs());
        assert_eq!(stats.special_meshes, 1);
        assert_eq!(stats.draw_objects, 2);
        // "base" became an empty group that still parents the pane.
        let base = &scene.root.children[0];
        assert!(matches!(base.content, NodeContent::Empty));
        assert_eq!(base.children.len(), 1);
        assert_eq!(scene.draw_call_count(), 2);
    }
}
