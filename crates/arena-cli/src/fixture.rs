// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON scene fixtures and the filesystem fetcher the CLI loads them with.
//!
//! ```json
//! {
//!   "textures":   { "planks": { "width": 16, "height": 16 } },
//!   "geometries": { "block": { "cuboid": [0.5, 0.5, 0.5] } },
//!   "materials":  { "oak": { "kind": "opaque", "color": [0.6, 0.4, 0.2], "map": "planks" } },
//!   "root": {
//!     "name": "hut",
//!     "children": [
//!       { "name": "wall", "translation": [1, 0, 0], "mesh": { "geometry": "block", "material": "oak" } }
//!     ]
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use arena_assets::{AssetFetcher, DecodeError, FetchError, SceneDecoder};
use arena_scene::{Geometry, Material, MaterialKind, Mesh, Node, Scene, Texture};
use futures_util::future::{FutureExt, LocalBoxFuture};
use glam::{Mat4, Quat, Vec3};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SceneDoc {
    #[serde(default)]
    textures: HashMap<String, TextureDoc>,
    #[serde(default)]
    geometries: HashMap<String, GeometryDoc>,
    #[serde(default)]
    materials: HashMap<String, MaterialDoc>,
    root: NodeDoc,
}

#[derive(Debug, Deserialize)]
struct TextureDoc {
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeometryDoc {
    Cuboid {
        cuboid: [f32; 3],
    },
    Buffers {
        positions: Vec<[f32; 3]>,
        #[serde(default)]
        normals: Vec<[f32; 3]>,
        #[serde(default)]
        uvs: Vec<[f32; 2]>,
        #[serde(default)]
        indices: Option<Vec<u32>>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum MaterialDoc {
    Opaque {
        color: [f32; 3],
        #[serde(default)]
        map: Option<String>,
    },
    Transparent {
        color: [f32; 3],
        opacity: f32,
        #[serde(default)]
        map: Option<String>,
        #[serde(default)]
        alpha_test: f32,
    },
    Glass {
        color: [f32; 3],
        #[serde(default = "one")]
        opacity: f32,
        transmission: f32,
        #[serde(default)]
        roughness: f32,
    },
}

const fn one() -> f32 {
    1.0
}

const fn yes() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeDoc {
    name: String,
    #[serde(default)]
    translation: Option<[f32; 3]>,
    /// Rotation around +Y, in degrees.
    #[serde(default)]
    yaw_degrees: Option<f32>,
    #[serde(default)]
    scale: Option<[f32; 3]>,
    #[serde(default = "yes")]
    visible: bool,
    #[serde(default)]
    mesh: Option<MeshRef>,
    #[serde(default)]
    children: Vec<NodeDoc>,
}

#[derive(Debug, Deserialize)]
struct MeshRef {
    geometry: String,
    material: String,
}

/// Resources built once per decode, so nodes naming the same key share them.
struct Library {
    geometries: HashMap<String, Rc<Geometry>>,
    materials: HashMap<String, Rc<Material>>,
}

impl Library {
    fn build(doc: &SceneDoc) -> Result<Self, DecodeError> {
        let textures: HashMap<&str, Rc<Texture>> = doc
            .textures
            .iter()
            .map(|(name, t)| (name.as_str(), Rc::new(Texture::new(name.clone(), t.width, t.height))))
            .collect();
        let texture = |key: &Option<String>| -> Result<Option<Rc<Texture>>, DecodeError> {
            key.as_deref()
                .map(|k| {
                    textures
                        .get(k)
                        .cloned()
                        .ok_or_else(|| DecodeError(format!("unknown texture '{k}'")))
                })
                .transpose()
        };

        let geometries = doc
            .geometries
            .iter()
            .map(|(name, g)| (name.clone(), Rc::new(build_geometry(g))))
            .collect();

        let mut materials = HashMap::new();
        for (name, m) in &doc.materials {
            let kind = match m {
                MaterialDoc::Opaque { color, map } => MaterialKind::Opaque {
                    color: *color,
                    map: texture(map)?,
                },
                MaterialDoc::Transparent {
                    color,
                    opacity,
                    map,
                    alpha_test,
                } => MaterialKind::Transparent {
                    color: *color,
                    opacity: *opacity,
                    map: texture(map)?,
                    alpha_test: *alpha_test,
                },
                MaterialDoc::Glass {
                    color,
                    opacity,
                    transmission,
                    roughness,
                } => MaterialKind::Glass {
                    color: *color,
                    opacity: *opacity,
                    transmission: *transmission,
                    roughness: *roughness,
                },
            };
            materials.insert(name.clone(), Rc::new(Material::new(name.clone(), kind)));
        }
        Ok(Self {
            geometries,
            materials,
        })
    }

    fn node(&self, doc: &NodeDoc) -> Result<Node, DecodeError> {
        let mut node = match &doc.mesh {
            Some(r) => {
                let geometry = self
                    .geometries
                    .get(&r.geometry)
                    .ok_or_else(|| DecodeError(format!("node '{}': unknown geometry '{}'", doc.name, r.geometry)))?;
                let material = self
                    .materials
                    .get(&r.material)
                    .ok_or_else(|| DecodeError(format!("node '{}': unknown material '{}'", doc.name, r.material)))?;
                Node::mesh(
                    doc.name.clone(),
                    Mesh::new(doc.name.clone(), Rc::clone(geometry), Rc::clone(material)),
                )
            }
            None => Node::group(doc.name.clone()),
        };
        node = node
            .with_transform(node_transform(doc))
            .with_visible(doc.visible);
        for child in &doc.children {
            node = node.with_child(self.node(child)?);
        }
        Ok(node)
    }
}

fn build_geometry(doc: &GeometryDoc) -> Geometry {
    match doc {
        GeometryDoc::Cuboid { cuboid } => Geometry::cuboid(*cuboid),
        GeometryDoc::Buffers {
            positions,
            normals,
            uvs,
            indices,
        } => {
            let mut g = Geometry::new(positions.clone())
                .with_normals(normals.clone())
                .with_uvs(uvs.clone());
            if let Some(indices) = indices {
                g = g.with_indices(indices.clone());
            }
            g
        }
    }
}

fn node_transform(doc: &NodeDoc) -> Mat4 {
    let translation = doc.translation.map_or(Vec3::ZERO, Vec3::from);
    let rotation = doc
        .yaw_degrees
        .map_or(Quat::IDENTITY, |deg| Quat::from_rotation_y(deg.to_radians()));
    let scale = doc.scale.map_or(Vec3::ONE, Vec3::from);
    Mat4::from_scale_rotation_translation(scale, rotation, translation)
}

/// Decodes the JSON scene fixtures described in the module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSceneDecoder;

impl SceneDecoder for JsonSceneDecoder {
    fn decode(&self, url: &str, bytes: &[u8]) -> Result<Scene, DecodeError> {
        let doc: SceneDoc = serde_json::from_slice(bytes)
            .map_err(|e| DecodeError(format!("{url}: invalid scene json: {e}")))?;
        let library = Library::build(&doc)?;
        Ok(Scene::new(library.node(&doc.root)?))
    }
}

/// Reads `file://` URLs and bare paths from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFetcher;

impl AssetFetcher for FsFetcher {
    fn fetch(&self, url: &str) -> LocalBoxFuture<'static, Result<Vec<u8>, FetchError>> {
        let path = PathBuf::from(url.strip_prefix("file://").unwrap_or(url));
        async move {
            tokio::fs::read(&path)
                .await
                .map_err(|e| FetchError(format!("{}: {e}", path.display())))
        }
        .boxed_local()
    }
}
