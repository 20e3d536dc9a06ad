// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use arena_app_core::prefs::OptimizerPrefs;
use arena_assets::{AssetCache, AssetFetcher, DecodeError, FetchError, SceneDecoder};
use arena_scene::{
    Geometry, Material, MaterialKind, Mesh, Node, NodeContent, ResourceId, Scene, Texture,
};
use futures_channel::oneshot;
use futures_util::future::{FutureExt, LocalBoxFuture};
use glam::{Mat4, Vec3};

// =============================================================================
// FETCHER
// =============================================================================

#[derive(Default)]
struct FetcherState {
    calls: RefCell<Vec<String>>,
    failing: RefCell<HashSet<String>>,
    gates: RefCell<HashMap<String, oneshot::Receiver<()>>>,
}

/// In-memory fetcher: the URL itself is the payload.
///
/// Every fetch yields to the executor at least once so concurrent callers
/// really do overlap. A gated URL stays pending until its gate is opened.
#[derive(Clone, Default)]
pub struct FixtureFetcher {
    state: Rc<FetcherState>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fetches issued so far.
    pub fn calls(&self) -> usize {
        self.state.calls.borrow().len()
    }

    /// Number of fetches issued for `url`.
    pub fn calls_for(&self, url: &str) -> usize {
        self.state.calls.borrow().iter().filter(|u| *u == url).count()
    }

    /// Make fetches of `url` fail until [`FixtureFetcher::heal`].
    pub fn fail(&self, url: &str) {
        self.state.failing.borrow_mut().insert(url.to_owned());
    }

    pub fn heal(&self, url: &str) {
        self.state.failing.borrow_mut().remove(url);
    }

    /// Hold the next fetch of `url` until the returned sender fires.
    pub fn gate(&self, url: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state.gates.borrow_mut().insert(url.to_owned(), rx);
        tx
    }
}

impl AssetFetcher for FixtureFetcher {
    fn fetch(&self, url: &str) -> LocalBoxFuture<'static, Result<Vec<u8>, FetchError>> {
        self.state.calls.borrow_mut().push(url.to_owned());
        let gate = self.state.gates.borrow_mut().remove(url);
        let failing = self.state.failing.borrow().contains(url);
        let payload = url.as_bytes().to_vec();
        async move {
            match gate {
                Some(gate) => {
                    let _ = gate.await;
                }
                None => tokio::task::yield_now().await,
            }
            if failing {
                Err(FetchError("503 service unavailable".into()))
            } else {
                Ok(payload)
            }
        }
        .boxed_local()
    }
}

// =============================================================================
// DECODER
// =============================================================================

/// Builds a scene from keywords in the URL. Each decode creates fresh
/// resources, the way a real loader would.
///
/// - `village6`: five identical houses and one tower
/// - `village7`: five identical houses, one tower and one well
/// - `glasshouse`: one stone block and a glass pane
/// - `empty`: a bare group
/// - `garbage`: decode error
/// - anything else: one unit cube
#[derive(Clone, Copy, Default)]
pub struct FixtureDecoder;

impl SceneDecoder for FixtureDecoder {
    fn decode(&self, _url: &str, bytes: &[u8]) -> Result<Scene, DecodeError> {
        let text = String::from_utf8_lossy(bytes);
        if text.contains("garbage") {
            return Err(DecodeError("unexpected magic bytes".into()));
        }
        let scene = if text.contains("village6") {
            village(false)
        } else if text.contains("village7") {
            village(true)
        } else if text.contains("glasshouse") {
            glasshouse()
        } else if text.contains("empty") {
            Scene::new(Node::group("empty"))
        } else {
            Scene::new(Node::group("root").with_child(block("cube", [0.5; 3], [0.8; 3], Vec3::ZERO)))
        };
        Ok(scene)
    }
}

/// Decoder backed by a texture cache: every decode references the same
/// texture from a row of opaque tiles, a translucent awning and a hidden
/// tile.
#[derive(Clone)]
pub struct TextureCacheDecoder {
    pub texture: Rc<Texture>,
}

impl TextureCacheDecoder {
    pub fn new() -> Self {
        Self {
            texture: Rc::new(Texture::new("atlas.png", 64, 64)),
        }
    }

    fn textured(&self, name: &str, opacity: Option<f32>, at: Vec3) -> Node {
        let map = Some(Rc::clone(&self.texture));
        let kind = match opacity {
            None => MaterialKind::Opaque { color: [1.0; 3], map },
            Some(opacity) => MaterialKind::Transparent {
                color: [1.0; 3],
                opacity,
                map,
                alpha_test: 0.0,
            },
        };
        Node::mesh(
            name,
            Mesh::new(
                name,
                Rc::new(Geometry::cuboid([0.5; 3])),
                Rc::new(Material::new(format!("{name}-mat"), kind)),
            ),
        )
        .with_transform(Mat4::from_translation(at))
    }
}

impl SceneDecoder for TextureCacheDecoder {
    fn decode(&self, _url: &str, _bytes: &[u8]) -> Result<Scene, DecodeError> {
        let mut root = Node::group("market");
        for i in 0..3u8 {
            root = root.with_child(self.textured("tile", None, Vec3::X * f32::from(i)));
        }
        root = root
            .with_child(self.textured("awning", Some(0.5), Vec3::Y * 2.0))
            .with_child(self.textured("spare", None, Vec3::Z * 3.0).with_visible(false));
        Ok(Scene::new(root))
    }
}

pub fn block(name: &str, half: [f32; 3], color: [f32; 3], at: Vec3) -> Node {
    Node::mesh(
        name,
        Mesh::new(
            name,
            Rc::new(Geometry::cuboid(half)),
            Rc::new(Material::opaque(format!("{name}-mat"), color)),
        ),
    )
    .with_transform(Mat4::from_translation(at))
}

pub fn village(with_well: bool) -> Scene {
    let mut root = Node::group("village");
    for i in 0..5u8 {
        root = root.with_child(block("house", [0.5; 3], [0.6; 3], Vec3::new(f32::from(i) * 2.0, 0.0, 0.0)));
    }
    root = root.with_child(block("tower", [0.5, 2.0, 0.5], [0.3; 3], Vec3::new(0.0, 0.0, 4.0)));
    if with_well {
        root = root.with_child(block("well", [0.5; 3], [0.1, 0.1, 0.9], Vec3::new(4.0, 0.0, 4.0)));
    }
    Scene::new(root)
}

pub fn glasshouse() -> Scene {
    let pane = Node::mesh(
        "pane",
        Mesh::new(
            "pane",
            Rc::new(Geometry::cuboid([1.0, 1.0, 0.05])),
            Rc::new(Material::new(
                "pane-mat",
                MaterialKind::Glass {
                    color: [0.9; 3],
                    opacity: 0.4,
                    transmission: 0.8,
                    roughness: 0.0,
                },
            )),
        ),
    );
    Scene::new(
        Node::group("glasshouse")
            .with_child(block("stone", [1.0; 3], [0.5; 3], Vec3::ZERO))
            .with_child(pane.with_transform(Mat4::from_translation(Vec3::new(0.0, 0.0, 1.5)))),
    )
}

// =============================================================================
// HELPERS
// =============================================================================

pub fn cache() -> (AssetCache, FixtureFetcher) {
    cache_with(OptimizerPrefs::default())
}

pub fn cache_with(prefs: OptimizerPrefs) -> (AssetCache, FixtureFetcher) {
    let fetcher = FixtureFetcher::new();
    let cache = AssetCache::new(fetcher.clone(), FixtureDecoder, prefs);
    (cache, fetcher)
}

/// Every geometry, material and texture id reachable from `scene`.
pub fn resource_ids(scene: &Scene) -> HashSet<ResourceId> {
    let mut ids = HashSet::new();
    scene.walk(|node, _| {
        let (geometry, material) = match &node.content {
            NodeContent::Mesh(mesh) => (
                mesh.geometry.as_ref().map(|g| g.id()),
                mesh.material.as_deref(),
            ),
            NodeContent::Instanced(inst) => (Some(inst.geometry.id()), Some(&*inst.material)),
            NodeContent::Empty => (None, None),
        };
        ids.extend(geometry);
        if let Some(material) = material {
            ids.insert(material.id());
            ids.extend(material.kind.texture().map(|t| t.id()));
        }
    });
    ids
}
