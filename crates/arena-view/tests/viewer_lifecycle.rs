// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use arena_app_core::prefs::{OptimizerPrefs, ViewerPrefs};
use arena_assets::{
    AssetCache, AssetFetcher, DecodeError, FetchError, LoadError, Namespace, SceneDecoder,
};
use arena_scene::mock::{MockGpu, MockSurface};
use arena_scene::{Geometry, Material, Mesh, Node, Scene};
use arena_view::{
    frame, InteractionEvent, Projection, Teardown, ViewMode, ViewPreset, Viewer, ViewerError,
    DEFAULT_OFFSET_FACTOR,
};
use futures_util::future::{FutureExt, LocalBoxFuture};
use glam::{Mat4, Vec3};

#[derive(Clone, Default)]
struct Fetcher {
    calls: Rc<Cell<u32>>,
}

impl AssetFetcher for Fetcher {
    fn fetch(&self, url: &str) -> LocalBoxFuture<'static, Result<Vec<u8>, FetchError>> {
        self.calls.set(self.calls.get() + 1);
        let url = url.to_owned();
        async move {
            tokio::task::yield_now().await;
            if url.contains("missing") {
                Err(FetchError("404 not found".into()))
            } else {
                Ok(url.into_bytes())
            }
        }
        .boxed_local()
    }
}

/// Two 1×1×1 cubes four units apart along X.
struct TwoCubes;

impl SceneDecoder for TwoCubes {
    fn decode(&self, _url: &str, _bytes: &[u8]) -> Result<Scene, DecodeError> {
        let cube = |name: &str, x: f32| {
            Node::mesh(
                name,
                Mesh::new(
                    name,
                    Rc::new(Geometry::cuboid([0.5; 3])),
                    Rc::new(Material::opaque("stone", [0.5; 3])),
                ),
            )
            .with_transform(Mat4::from_translation(Vec3::new(x, 0.0, 0.0)))
        };
        Ok(Scene::new(
            Node::group("root")
                .with_child(cube("a", 0.0))
                .with_child(cube("b", 4.0)),
        ))
    }
}

fn setup() -> (AssetCache, Fetcher) {
    let fetcher = Fetcher::default();
    let cache = AssetCache::new(fetcher.clone(), TwoCubes, OptimizerPrefs::default());
    (cache, fetcher)
}

fn viewer(cache: &AssetCache, ns: &str, path: &str) -> Viewer<MockSurface> {
    Viewer::new(
        cache.clone(),
        MockSurface::new(),
        Namespace::new(ns),
        path,
        ViewerPrefs::default(),
    )
}

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

#[tokio::test]
async fn camera_is_framed_before_the_first_render() {
    let (cache, _) = setup();
    let t0 = Instant::now();
    let mut v = viewer(&cache, "a", "castle.glb");
    v.mount(t0);
    v.request_view(ViewPreset::Front);

    v.tick(t0);
    assert_eq!(v.surface().render_count, 0);
    assert!(v.surface().camera.is_none());
    assert_eq!(v.session().unwrap().mode(), ViewMode::Directed(ViewPreset::Front));

    let asset = v.load().await.unwrap();
    assert!(v.surface().has_scene());
    let expected = frame(&asset.metadata, Projection::DEFAULT, DEFAULT_OFFSET_FACTOR);
    let cam = v.surface().camera.unwrap();
    assert!((cam.position - expected.position).length() < 1e-4);
    assert_eq!(v.surface().render_count, 0);

    v.tick(t0);
    assert_eq!(v.surface().render_count, 1);
    assert_eq!(v.session().unwrap().mode(), ViewMode::Free);
    let cam = v.surface().camera.unwrap();
    // Front view at 2.5 × max-dimension (5.0).
    assert!((cam.position - Vec3::new(0.0, 0.0, 12.5)).length() < 1e-4);
}

#[tokio::test]
async fn load_requires_mount() {
    let (cache, fetcher) = setup();
    let mut v = viewer(&cache, "a", "castle.glb");
    let err = v.load().await.unwrap_err();
    assert!(matches!(err, ViewerError::NotMounted { .. }));
    assert_eq!(fetcher.calls.get(), 0);
}

#[tokio::test]
async fn failed_load_leaves_surface_empty() {
    let (cache, _) = setup();
    let mut v = viewer(&cache, "a", "missing.glb");
    v.mount(Instant::now());
    let err = v.load().await.unwrap_err();
    assert!(matches!(err, ViewerError::Load(LoadError::Fetch { .. })));
    assert!(!v.surface().has_scene());
    assert!(v.asset().is_none());
}

#[tokio::test]
async fn viewers_in_one_namespace_share_the_entry() {
    let (cache, fetcher) = setup();
    let t0 = Instant::now();
    let mut a = viewer(&cache, "gallery", "castle.glb");
    let mut b = viewer(&cache, "gallery", "castle.glb");
    a.mount(t0);
    b.mount(t0);

    let (ra, rb) = futures_util::join!(a.load(), b.load());
    assert!(Rc::ptr_eq(&ra.unwrap(), &rb.unwrap()));
    assert_eq!(fetcher.calls.get(), 1);

    let mut gpu = MockGpu::new();
    let report = a.unmount(Teardown::Keep, &mut gpu);
    assert_eq!(report.resources(), 0);
    assert!(!a.surface().has_scene());
    assert!(b.surface().has_scene());
    assert_eq!(cache.len(), 1);

    let report = b.unmount(Teardown::Path, &mut gpu);
    assert_eq!(report.entries, 1);
    assert!(report.resources() > 0);
    assert_eq!(gpu.double_releases, 0);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn namespace_teardown_spares_side_by_side_viewer() {
    let (cache, _) = setup();
    let t0 = Instant::now();
    let mut left = viewer(&cache, "compare-left", "castle.glb");
    let mut right = viewer(&cache, "compare-right", "castle.glb");
    left.mount(t0);
    right.mount(t0);
    left.load().await.unwrap();
    right.load().await.unwrap();

    left.unmount(Teardown::Namespace, &mut MockGpu::new());
    assert_eq!(cache.namespaces(), vec![Namespace::new("compare-right")]);

    right.tick(t0 + secs(1));
    assert_eq!(right.surface().render_count, 1);
}

#[tokio::test]
async fn input_pauses_rotation_until_idle() {
    let (cache, _) = setup();
    let t0 = Instant::now();
    let mut v = viewer(&cache, "a", "castle.glb");
    v.mount(t0);
    v.load().await.unwrap();

    v.tick(t0 + secs(1));
    let rotated = v.surface().camera.unwrap().position;

    v.handle_input(InteractionEvent::PointerDown, t0 + secs(1));
    v.tick(t0 + secs(3));
    assert_eq!(v.surface().camera.unwrap().position, rotated);
    assert!(!v.session().unwrap().is_rotating());

    v.tick(t0 + secs(6));
    assert!(v.session().unwrap().is_rotating());
    assert_ne!(v.surface().camera.unwrap().position, rotated);
}

#[tokio::test]
async fn reset_resumes_rotation_for_its_own_viewer_only() {
    let (cache, _) = setup();
    let t0 = Instant::now();
    let mut a = viewer(&cache, "left", "castle.glb");
    let mut b = viewer(&cache, "right", "castle.glb");
    for v in [&mut a, &mut b] {
        v.mount(t0);
        v.load().await.unwrap();
        v.handle_input(InteractionEvent::Wheel, t0);
    }

    a.request_view(ViewPreset::Reset);
    a.tick(t0 + secs(1));
    b.tick(t0 + secs(1));
    assert!(a.session().unwrap().is_rotating());
    assert!(!b.session().unwrap().is_rotating());
}

#[test]
fn denied_fullscreen_is_logged_and_ignored() {
    let (cache, _) = setup();
    let surface = MockSurface {
        deny_fullscreen: true,
        ..MockSurface::default()
    };
    let mut v = Viewer::new(
        cache.clone(),
        surface,
        Namespace::new("a"),
        "castle.glb",
        ViewerPrefs::default(),
    );
    assert!(!v.toggle_fullscreen());
    assert!(!v.is_fullscreen());

    let mut ok = viewer(&cache, "b", "castle.glb");
    assert!(ok.toggle_fullscreen());
    assert!(ok.surface().fullscreen);
    assert!(!ok.toggle_fullscreen());
}

#[test]
fn resize_reaches_the_surface() {
    let (cache, _) = setup();
    let mut v = viewer(&cache, "a", "castle.glb");
    v.resize(800, 600, 2.0);
    assert_eq!(v.surface().viewport, (800, 600, 2.0));
}
