// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Core scene types: resources, meshes and the node hierarchy.
//!
//! These are pure domain objects. Nothing here talks to a GPU; renderers
//! upload what they find in a [`Scene`] and release it through
//! [`GpuPort`](crate::GpuPort) when told to.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Mat4;

use crate::bounds::Aabb;

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a geometry, material or texture.
///
/// Ids are never reused. Two handles with the same id refer to the same
/// renderer-side allocation.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(pub u64);

impl ResourceId {
    /// Mint a fresh id.
    pub fn next() -> Self {
        Self(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "res#{}", self.0)
    }
}

/// Linear RGB color.
pub type Color = [f32; 3];

/// Texture image reference. Pixel data stays with the renderer.
#[derive(Debug, PartialEq, Eq)]
pub struct Texture {
    id: ResourceId,
    /// Source name (file name or embedded image label).
    pub name: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Texture {
    /// Create a texture with a fresh id.
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: ResourceId::next(),
            name: name.into(),
            width,
            height,
        }
    }

    /// Resource id of this texture.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Copy with a fresh id.
    pub fn duplicate(&self) -> Self {
        Self::new(self.name.clone(), self.width, self.height)
    }
}

/// Vertex and index buffers for one drawable surface.
///
/// `normals` and `uvs` are either empty or parallel to `positions`.
#[derive(Debug, PartialEq)]
pub struct Geometry {
    id: ResourceId,
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    indices: Option<Vec<u32>>,
}

impl Geometry {
    /// Create a non-indexed geometry from positions.
    pub fn new(positions: Vec<[f32; 3]>) -> Self {
        Self {
            id: ResourceId::next(),
            positions,
            normals: Vec::new(),
            uvs: Vec::new(),
            indices: None,
        }
    }

    /// Attach per-vertex normals.
    pub fn with_normals(mut self, normals: Vec<[f32; 3]>) -> Self {
        self.normals = normals;
        self
    }

    /// Attach per-vertex texture coordinates.
    pub fn with_uvs(mut self, uvs: Vec<[f32; 2]>) -> Self {
        self.uvs = uvs;
        self
    }

    /// Attach an index buffer.
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    /// Axis-aligned unit cube (`±half`) with 24 vertices and 36 indices.
    pub fn cuboid(half: [f32; 3]) -> Self {
        let [x, y, z] = half;
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([1.0, 0.0, 0.0], [[x, -y, -z], [x, y, -z], [x, y, z], [x, -y, z]]),
            ([-1.0, 0.0, 0.0], [[-x, -y, z], [-x, y, z], [-x, y, -z], [-x, -y, -z]]),
            ([0.0, 1.0, 0.0], [[-x, y, -z], [-x, y, z], [x, y, z], [x, y, -z]]),
            ([0.0, -1.0, 0.0], [[-x, -y, z], [-x, -y, -z], [x, -y, -z], [x, -y, z]]),
            ([0.0, 0.0, 1.0], [[-x, -y, z], [x, -y, z], [x, y, z], [-x, y, z]]),
            ([0.0, 0.0, -1.0], [[x, -y, -z], [-x, -y, -z], [-x, y, -z], [x, y, -z]]),
        ];
        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut uvs = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, quad) in faces {
            let base = u32::try_from(positions.len()).unwrap_or(u32::MAX);
            positions.extend_from_slice(&quad);
            normals.extend_from_slice(&[normal; 4]);
            uvs.extend_from_slice(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        Self::new(positions)
            .with_normals(normals)
            .with_uvs(uvs)
            .with_indices(indices)
    }

    /// Resource id of this geometry.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Vertex positions.
    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    /// Vertex normals (empty when absent).
    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    /// Texture coordinates (empty when absent).
    pub fn uvs(&self) -> &[[f32; 2]] {
        &self.uvs
    }

    /// Index buffer, if the geometry is indexed.
    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of indices (zero for non-indexed geometry).
    pub fn index_count(&self) -> usize {
        self.indices.as_ref().map_or(0, Vec::len)
    }

    /// Local-space bounds of the vertex positions.
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.positions.iter().map(|p| glam::Vec3::from_array(*p)))
    }

    /// Deep copy with a fresh resource id.
    pub fn duplicate(&self) -> Self {
        Self {
            id: ResourceId::next(),
            positions: self.positions.clone(),
            normals: self.normals.clone(),
            uvs: self.uvs.clone(),
            indices: self.indices.clone(),
        }
    }
}

/// Depth-bias parameters applied while rasterizing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolygonOffset {
    /// Slope-scaled factor.
    pub factor: f32,
    /// Constant units.
    pub units: f32,
}

/// Fixed-function state a material draws with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderState {
    /// Whether fragments write depth.
    pub depth_write: bool,
    /// Optional depth bias.
    pub polygon_offset: Option<PolygonOffset>,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            depth_write: true,
            polygon_offset: None,
        }
    }
}

/// The closed set of surface models the viewer draws.
#[derive(Clone, Debug, PartialEq)]
pub enum MaterialKind {
    /// Opaque surface, optionally textured.
    Opaque {
        /// Base color.
        color: Color,
        /// Base color texture.
        map: Option<Rc<Texture>>,
    },
    /// Alpha-blended or alpha-tested surface.
    Transparent {
        /// Base color.
        color: Color,
        /// Surface opacity in `[0, 1]`.
        opacity: f32,
        /// Base color texture.
        map: Option<Rc<Texture>>,
        /// Alpha-test cutoff; fragments below it are discarded.
        alpha_test: f32,
    },
    /// Refractive surface (glass, water, ice).
    Glass {
        /// Tint color.
        color: Color,
        /// Surface opacity in `[0, 1]`.
        opacity: f32,
        /// Light transmission in `[0, 1]`.
        transmission: f32,
        /// Microfacet roughness in `[0, 1]`.
        roughness: f32,
    },
}

impl MaterialKind {
    /// Texture referenced by this variant, if any.
    pub fn texture(&self) -> Option<&Rc<Texture>> {
        match self {
            Self::Opaque { map, .. } | Self::Transparent { map, .. } => map.as_ref(),
            Self::Glass { .. } => None,
        }
    }

    /// Effective opacity (1.0 for opaque surfaces).
    pub fn opacity(&self) -> f32 {
        match self {
            Self::Opaque { .. } => 1.0,
            Self::Transparent { opacity, .. } | Self::Glass { opacity, .. } => *opacity,
        }
    }

    /// Light transmission (0.0 unless glass).
    pub fn transmission(&self) -> f32 {
        match self {
            Self::Glass { transmission, .. } => *transmission,
            Self::Opaque { .. } | Self::Transparent { .. } => 0.0,
        }
    }

    /// Base color.
    pub fn color(&self) -> Color {
        match self {
            Self::Opaque { color, .. }
            | Self::Transparent { color, .. }
            | Self::Glass { color, .. } => *color,
        }
    }
}

/// A named surface description plus its fixed-function state.
#[derive(Debug, PartialEq)]
pub struct Material {
    id: ResourceId,
    /// Material name as authored.
    pub name: String,
    /// Surface model.
    pub kind: MaterialKind,
    /// Depth write / bias state.
    pub render_state: RenderState,
}

impl Material {
    /// Create a material with a fresh id and default render state.
    pub fn new(name: impl Into<String>, kind: MaterialKind) -> Self {
        Self {
            id: ResourceId::next(),
            name: name.into(),
            kind,
            render_state: RenderState::default(),
        }
    }

    /// Shorthand for an untextured opaque material.
    pub fn opaque(name: impl Into<String>, color: Color) -> Self {
        Self::new(name, MaterialKind::Opaque { color, map: None })
    }

    /// Resource id of this material.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Copy with a fresh id. Referenced textures are shared, not copied.
    pub fn duplicate(&self) -> Self {
        Self {
            id: ResourceId::next(),
            name: self.name.clone(),
            kind: self.kind.clone(),
            render_state: self.render_state,
        }
    }

    /// Copy with a fresh id that samples `texture` instead of the original
    /// map. Ignored for variants without a map.
    pub fn duplicate_with_texture(&self, texture: Option<Rc<Texture>>) -> Self {
        let mut copy = self.duplicate();
        match &mut copy.kind {
            MaterialKind::Opaque { map, .. } | MaterialKind::Transparent { map, .. } => {
                *map = texture;
            }
            MaterialKind::Glass { .. } => {}
        }
        copy
    }
}

/// A single drawable: one geometry with one material.
///
/// Decoders may emit meshes with either half missing; such meshes are kept
/// in the graph but never drawn, grouped or measured.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    /// Mesh name as authored.
    pub name: String,
    /// Vertex data.
    pub geometry: Option<Rc<Geometry>>,
    /// Surface description.
    pub material: Option<Rc<Material>>,
}

impl Mesh {
    /// Create a complete mesh.
    pub fn new(name: impl Into<String>, geometry: Rc<Geometry>, material: Rc<Material>) -> Self {
        Self {
            name: name.into(),
            geometry: Some(geometry),
            material: Some(material),
        }
    }

    /// Returns `true` when both geometry and material are present.
    pub fn is_complete(&self) -> bool {
        self.geometry.is_some() && self.material.is_some()
    }
}

/// One geometry/material pair drawn at many transforms in a single call.
#[derive(Clone, Debug)]
pub struct InstancedMesh {
    /// Draw object name.
    pub name: String,
    /// Shared vertex data.
    pub geometry: Rc<Geometry>,
    /// Shared surface description.
    pub material: Rc<Material>,
    transforms: Vec<Mat4>,
}

impl InstancedMesh {
    /// Create an instanced draw object. Instance `i` draws at `transforms[i]`.
    pub fn new(
        name: impl Into<String>,
        geometry: Rc<Geometry>,
        material: Rc<Material>,
        transforms: Vec<Mat4>,
    ) -> Self {
        Self {
            name: name.into(),
            geometry,
            material,
            transforms,
        }
    }

    /// Per-instance transforms in draw order.
    pub fn transforms(&self) -> &[Mat4] {
        &self.transforms
    }

    /// Number of instances.
    pub fn instance_count(&self) -> usize {
        self.transforms.len()
    }
}

/// What a node draws, if anything.
#[derive(Clone, Debug, Default)]
pub enum NodeContent {
    /// Grouping node.
    #[default]
    Empty,
    /// Single mesh.
    Mesh(Mesh),
    /// Instanced draw object.
    Instanced(InstancedMesh),
}

/// A node in the scene hierarchy.
#[derive(Clone, Debug)]
pub struct Node {
    /// Node name as authored.
    pub name: String,
    /// Transform relative to the parent.
    pub transform: Mat4,
    /// Hidden nodes hide their whole subtree.
    pub visible: bool,
    /// Drawable payload.
    pub content: NodeContent,
    /// Child nodes in authored order.
    pub children: Vec<Node>,
}

impl Node {
    /// An empty grouping node with identity transform.
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Mat4::IDENTITY,
            visible: true,
            content: NodeContent::Empty,
            children: Vec::new(),
        }
    }

    /// A node carrying a single mesh.
    pub fn mesh(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            content: NodeContent::Mesh(mesh),
            ..Self::group(name)
        }
    }

    /// A node carrying an instanced draw object.
    pub fn instanced(name: impl Into<String>, instanced: InstancedMesh) -> Self {
        Self {
            content: NodeContent::Instanced(instanced),
            ..Self::group(name)
        }
    }

    /// Replace the local transform.
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    /// Append a child.
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Set the visibility flag.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Depth-first pre-order walk over this subtree, including hidden nodes.
    /// `parent` is the world transform of this node's parent.
    pub fn walk<F>(&self, parent: Mat4, f: &mut F)
    where
        F: FnMut(&Node, Mat4),
    {
        let world = parent * self.transform;
        f(self, world);
        for child in &self.children {
            child.walk(world, f);
        }
    }

    /// Like [`Node::walk`] but skips hidden subtrees.
    pub fn walk_visible<F>(&self, parent: Mat4, f: &mut F)
    where
        F: FnMut(&Node, Mat4),
    {
        if !self.visible {
            return;
        }
        let world = parent * self.transform;
        f(self, world);
        for child in &self.children {
            child.walk_visible(world, f);
        }
    }

    /// Mutable pre-order walk over visible nodes.
    pub fn walk_visible_mut<F>(&mut self, parent: Mat4, f: &mut F)
    where
        F: FnMut(&mut Node, Mat4),
    {
        if !self.visible {
            return;
        }
        let world = parent * self.transform;
        f(self, world);
        for child in &mut self.children {
            child.walk_visible_mut(world, f);
        }
    }

    /// Remove descendants that draw nothing and have no children.
    pub fn prune_empty(&mut self) {
        for child in &mut self.children {
            child.prune_empty();
        }
        self.children
            .retain(|c| !(matches!(c.content, NodeContent::Empty) && c.children.is_empty()));
    }
}

/// A decoded model: a single root node and everything below it.
#[derive(Clone, Debug)]
pub struct Scene {
    /// Root of the hierarchy.
    pub root: Node,
}

impl Scene {
    /// Wrap a root node.
    pub fn new(root: Node) -> Self {
        Self { root }
    }

    /// Visit every node with its world transform (root transform included).
    pub fn walk<F>(&self, mut f: F)
    where
        F: FnMut(&Node, Mat4),
    {
        self.root.walk(Mat4::IDENTITY, &mut f);
    }

    /// Visit visible nodes with their world transform.
    pub fn walk_visible<F>(&self, mut f: F)
    where
        F: FnMut(&Node, Mat4),
    {
        self.root.walk_visible(Mat4::IDENTITY, &mut f);
    }

    /// Visit visible nodes mutably with transforms relative to the root's own
    /// frame (the root transform is treated as identity).
    pub fn walk_visible_in_root_frame_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut Node, Mat4),
    {
        if !self.root.visible {
            return;
        }
        f(&mut self.root, Mat4::IDENTITY);
        for child in &mut self.root.children {
            child.walk_visible_mut(Mat4::IDENTITY, &mut f);
        }
    }

    /// Number of mesh nodes (instanced objects count once).
    pub fn mesh_count(&self) -> usize {
        let mut n = 0;
        self.walk(|node, _| {
            if !matches!(node.content, NodeContent::Empty) {
                n += 1;
            }
        });
        n
    }

    /// Number of draw calls a renderer issues for visible, complete content.
    pub fn draw_call_count(&self) -> usize {
        let mut n = 0;
        self.walk_visible(|node, _| match &node.content {
            NodeContent::Mesh(mesh) if mesh.is_complete() => n += 1,
            NodeContent::Instanced(_) => n += 1,
            NodeContent::Mesh(_) | NodeContent::Empty => {}
        });
        n
    }
}
