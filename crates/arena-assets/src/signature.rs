// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Content signatures for instancing decisions.

use std::collections::HashMap;

use arena_scene::{canonical_bits, Geometry, Material, MaterialKind, Mesh, ResourceId};

const GEOMETRY_DOMAIN: &[u8] = b"arena:signature:geometry:v1\0";
const MATERIAL_DOMAIN: &[u8] = b"arena:signature:material:v1\0";
const MESH_DOMAIN: &[u8] = b"arena:signature:mesh:v1\0";

/// A 32-byte BLAKE3 mesh signature.
///
/// Equal signatures mean equal vertex/index content and equal material
/// visual properties. The `Display` impl renders lowercase hex.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Signature(pub [u8; 32]);

impl Signature {
    /// Sentinel for meshes without geometry or material. Never grouped.
    pub const UNGROUPABLE: Self = Self([0; 32]);

    /// Returns `false` for [`Signature::UNGROUPABLE`].
    pub fn is_groupable(&self) -> bool {
        *self != Self::UNGROUPABLE
    }

    /// First eight hex digits, for names and log lines.
    pub fn short(&self) -> String {
        self.0[..4].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Compute the signature of `mesh` from scratch.
pub fn signature(mesh: &Mesh) -> Signature {
    SignatureCache::default().signature(mesh)
}

/// Memoizes per-resource digests for the duration of one optimization pass.
///
/// Decoders commonly share one geometry across many meshes; hashing its
/// buffers once per id instead of once per mesh keeps the pass linear in
/// unique content.
#[derive(Debug, Default)]
pub struct SignatureCache {
    geometries: HashMap<ResourceId, [u8; 32]>,
    materials: HashMap<ResourceId, [u8; 32]>,
}

impl SignatureCache {
    /// Signature of `mesh`, reusing cached digests of its resources.
    pub fn signature(&mut self, mesh: &Mesh) -> Signature {
        let (Some(geometry), Some(material)) = (&mesh.geometry, &mesh.material) else {
            return Signature::UNGROUPABLE;
        };
        let g = *self
            .geometries
            .entry(geometry.id())
            .or_insert_with(|| geometry_digest(geometry));
        let m = *self
            .materials
            .entry(material.id())
            .or_insert_with(|| material_digest(material));

        let mut hasher = blake3::Hasher::new();
        hasher.update(MESH_DOMAIN);
        hasher.update(&g);
        hasher.update(&m);
        Signature(*hasher.finalize().as_bytes())
    }

    /// Number of distinct geometries hashed so far.
    pub fn geometries_hashed(&self) -> usize {
        self.geometries.len()
    }
}

fn update_len(hasher: &mut blake3::Hasher, len: usize) {
    hasher.update(&(len as u64).to_le_bytes());
}

fn update_f32(hasher: &mut blake3::Hasher, v: f32) {
    hasher.update(&canonical_bits(v).to_le_bytes());
}

/// Digest over the full vertex and index buffers.
fn geometry_digest(geometry: &Geometry) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(GEOMETRY_DOMAIN);

    // Counts first so buffers of different shapes can never concatenate
    // into the same byte stream.
    update_len(&mut hasher, geometry.positions().len());
    update_len(&mut hasher, geometry.normals().len());
    update_len(&mut hasher, geometry.uvs().len());
    match geometry.indices() {
        Some(indices) => {
            hasher.update(&[1]);
            update_len(&mut hasher, indices.len());
        }
        None => {
            hasher.update(&[0]);
        }
    }

    for p in geometry.positions() {
        p.iter().for_each(|v| update_f32(&mut hasher, *v));
    }
    for n in geometry.normals() {
        n.iter().for_each(|v| update_f32(&mut hasher, *v));
    }
    for uv in geometry.uvs() {
        uv.iter().for_each(|v| update_f32(&mut hasher, *v));
    }
    if let Some(indices) = geometry.indices() {
        for i in indices {
            hasher.update(&i.to_le_bytes());
        }
    }
    *hasher.finalize().as_bytes()
}

/// Digest over the material's visual properties and texture identity.
///
/// The material's own id and name are not included: two separately decoded
/// but identical materials draw identically.
fn material_digest(material: &Material) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(MATERIAL_DOMAIN);
    let tag: u8 = match material.kind {
        MaterialKind::Opaque { .. } => 0,
        MaterialKind::Transparent { .. } => 1,
        MaterialKind::Glass { .. } => 2,
    };
    hasher.update(&[tag]);
    material
        .kind
        .color()
        .iter()
        .for_each(|c| update_f32(&mut hasher, *c));
    match &material.kind {
        MaterialKind::Opaque { .. } => {}
        MaterialKind::Transparent {
            opacity,
            alpha_test,
            ..
        } => {
            update_f32(&mut hasher, *opacity);
            update_f32(&mut hasher, *alpha_test);
        }
        MaterialKind::Glass {
            opacity,
            transmission,
            roughness,
            ..
        } => {
            update_f32(&mut hasher, *opacity);
            update_f32(&mut hasher, *transmission);
            update_f32(&mut hasher, *roughness);
        }
    }
    match material.kind.texture() {
        Some(texture) => {
            hasher.update(&[1]);
            hasher.update(&texture.id().0.to_le_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }
    hasher.update(&[u8::from(material.render_state.depth_write)]);
    *hasher.finalize().as_bytes()
}
