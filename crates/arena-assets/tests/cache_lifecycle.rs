// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::rc::Rc;

use arena_app_core::prefs::OptimizerPrefs;
use arena_assets::{
    ArtifactDescriptor, ArtifactKind, AssetCache, AssetState, BucketUrlResolver, LoadError,
    Namespace,
};
use arena_scene::mock::MockGpu;
use common::{cache, resource_ids, FixtureFetcher, TextureCacheDecoder};
use futures_util::join;

const CUBE: &str = "mem://cube.glb";

#[tokio::test]
async fn concurrent_preloads_share_one_fetch() {
    let (cache, fetcher) = cache();
    let ns = Namespace::new("viewer-a");

    let (a, b) = join!(cache.preload(&ns, CUBE), cache.preload(&ns, CUBE));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert!(Rc::ptr_eq(&a, &b));
    assert_eq!(fetcher.calls(), 1);
    let stats = cache.stats();
    assert_eq!(stats.fetches, 1);
    assert_eq!(stats.joins, 1);
    assert!(matches!(cache.get(&ns, CUBE), Some(AssetState::Ready(_))));
}

#[tokio::test]
async fn namespaces_hold_independent_copies() {
    let (cache, fetcher) = cache();
    let left = Namespace::share("42");
    let right = Namespace::sample("42");

    let a = cache.preload(&left, CUBE).await.unwrap();
    let b = cache.preload(&right, CUBE).await.unwrap();
    assert!(!Rc::ptr_eq(&a, &b));
    assert_eq!(fetcher.calls_for(CUBE), 2);

    let right_ids = resource_ids(&b.scene);
    let mut gpu = MockGpu::new();
    let report = cache.cleanup_namespace(&left, &mut gpu);
    assert_eq!(report.entries, 1);
    assert!(report.resources() > 0);

    assert!(cache.get(&left, CUBE).is_none());
    assert!(matches!(cache.get(&right, CUBE), Some(AssetState::Ready(_))));
    assert!(right_ids.iter().all(|id| !gpu.was_released(*id)));
    assert_eq!(cache.namespaces(), vec![right]);
}

#[tokio::test]
async fn cleanup_releases_every_resource_once_and_forgets_entry() {
    let (cache, fetcher) = cache();
    let ns = Namespace::new("viewer");
    let asset = cache.preload(&ns, "mem://village6.glb").await.unwrap();
    let ids = resource_ids(&asset.scene);

    let mut gpu = MockGpu::new();
    let report = cache.cleanup_one(&ns, "mem://village6.glb", &mut gpu);
    assert_eq!(report.entries, 1);
    assert_eq!(report.resources(), ids.len());
    assert_eq!(gpu.double_releases, 0);
    assert!(ids.iter().all(|id| gpu.was_released(*id)));

    assert!(cache.get(&ns, "mem://village6.glb").is_none());
    assert!(cache.is_empty());

    cache.preload(&ns, "mem://village6.glb").await.unwrap();
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(cache.stats().evictions, 1);
}

#[tokio::test]
async fn cleanup_namespace_removes_only_that_namespace() {
    let (cache, _) = cache();
    let a = Namespace::new("a");
    let b = Namespace::new("b");
    cache.preload(&a, CUBE).await.unwrap();
    cache.preload(&a, "mem://village6.glb").await.unwrap();
    cache.preload(&b, CUBE).await.unwrap();
    assert_eq!(cache.len(), 3);

    let mut gpu = MockGpu::new();
    let report = cache.cleanup_namespace(&a, &mut gpu);
    assert_eq!(report.entries, 2);
    assert_eq!(cache.len(), 1);
    assert!(cache.contains(&b, CUBE));
    assert!(!cache.contains(&a, CUBE));
}

#[tokio::test]
async fn failed_fetch_allows_retry() {
    let (cache, fetcher) = cache();
    let ns = Namespace::new("viewer");
    fetcher.fail(CUBE);

    let err = cache.preload(&ns, CUBE).await.unwrap_err();
    assert!(matches!(err, LoadError::Fetch { .. }));
    assert!(err.to_string().starts_with("[ASSET_FETCH]"));
    assert!(cache.get(&ns, CUBE).is_none());

    fetcher.heal(CUBE);
    cache.preload(&ns, CUBE).await.unwrap();
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(cache.stats().failures, 1);
}

#[tokio::test]
async fn concurrent_callers_all_see_the_failure() {
    let (cache, fetcher) = cache();
    let ns = Namespace::new("viewer");
    fetcher.fail(CUBE);
    let (a, b) = join!(cache.preload(&ns, CUBE), cache.preload(&ns, CUBE));
    assert_eq!(a.unwrap_err(), b.unwrap_err());
    assert_eq!(fetcher.calls(), 1);
    assert!(!cache.contains(&ns, CUBE));
}

#[tokio::test]
async fn metadata_waits_for_a_key_nobody_requested_yet() {
    let (cache, _) = cache();
    let ns = Namespace::new("viewer");

    let (meta, loaded) = join!(cache.metadata(&ns, "mem://village6.glb"), async {
        tokio::task::yield_now().await;
        cache.preload(&ns, "mem://village6.glb").await
    });
    let meta = meta.unwrap();
    assert_eq!(meta, loaded.unwrap().metadata);
    assert!(!meta.fallback);
    assert!((meta.max_dimension - 9.0).abs() < 1e-5);
}

#[tokio::test]
async fn metadata_waiter_is_evicted_by_cleanup() {
    let (cache, _) = cache();
    let ns = Namespace::new("viewer");

    let (meta, report) = join!(cache.metadata(&ns, CUBE), async {
        tokio::task::yield_now().await;
        cache.cleanup_namespace(&ns, &mut MockGpu::new())
    });
    assert_eq!(report.entries, 0);
    assert!(matches!(meta, Err(LoadError::Evicted { .. })));
}

#[tokio::test]
async fn cleanup_during_load_is_not_undone_by_the_late_result() {
    let (cache, fetcher) = cache();
    let ns = Namespace::new("viewer");
    let gate = fetcher.gate(CUBE);

    let (loaded, report) = join!(cache.preload(&ns, CUBE), async {
        tokio::task::yield_now().await;
        assert!(matches!(cache.get(&ns, CUBE), Some(AssetState::Loading)));
        let report = cache.cleanup_one(&ns, CUBE, &mut MockGpu::new());
        gate.send(()).unwrap();
        report
    });

    assert_eq!(report.entries, 1);
    assert_eq!(report.resources(), 0);
    let err = loaded.unwrap_err();
    assert_eq!(
        err,
        LoadError::Evicted {
            namespace: "viewer".into(),
            path: CUBE.into(),
        }
    );
    assert!(!cache.contains(&ns, CUBE));

    cache.preload(&ns, CUBE).await.unwrap();
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn artifact_preload_resolves_through_bucket_layout() {
    let (cache, fetcher) = cache();
    let ns = Namespace::new("viewer");
    let resolver = BucketUrlResolver::new("https://cdn.example.org");
    let artifact = ArtifactDescriptor {
        kind: ArtifactKind::Model,
        bucket: "builds".into(),
        key: "castle/cube.glb".into(),
    };
    let asset = cache
        .preload_artifact(&ns, &resolver, &artifact)
        .await
        .unwrap();
    assert_eq!(asset.path, "https://cdn.example.org/builds/models/castle/cube.glb");
    assert_eq!(fetcher.calls_for(&asset.path), 1);
}

#[tokio::test]
async fn empty_model_gets_fallback_metadata() {
    let (cache, _) = cache();
    let ns = Namespace::new("viewer");
    let meta = cache.preload(&ns, "mem://empty.glb").await.unwrap().metadata;
    assert!(meta.fallback);
    assert!((meta.max_dimension - 2.0).abs() < f32::EPSILON);
}

#[tokio::test]
async fn decode_error_is_reported_with_url() {
    let (cache, _) = cache();
    let ns = Namespace::new("viewer");
    let err = cache.preload(&ns, "mem://garbage.glb").await.unwrap_err();
    assert_eq!(
        err,
        LoadError::Decode {
            url: "mem://garbage.glb".into(),
            reason: "unexpected magic bytes".into(),
        }
    );
}

#[tokio::test]
async fn decoder_shared_texture_is_never_released_across_namespaces() {
    for instancing in [true, false] {
        let decoder = TextureCacheDecoder::new();
        let shared = decoder.texture.id();
        let prefs = OptimizerPrefs {
            instancing,
            ..OptimizerPrefs::default()
        };
        let cache = AssetCache::new(FixtureFetcher::new(), decoder, prefs);
        let (left, right) = (Namespace::new("left"), Namespace::new("right"));
        let market = "mem://market.glb";

        let a = cache.preload(&left, market).await.unwrap();
        let b = cache.preload(&right, market).await.unwrap();
        let (a_ids, b_ids) = (resource_ids(&a.scene), resource_ids(&b.scene));
        assert!(!a_ids.contains(&shared));
        assert!(!b_ids.contains(&shared));
        assert!(a_ids.is_disjoint(&b_ids));

        let mut gpu = MockGpu::new();
        cache.cleanup_namespace(&left, &mut gpu);
        assert!(a_ids.iter().all(|id| gpu.was_released(*id)));
        assert!(b_ids.iter().all(|id| !gpu.was_released(*id)));
        assert!(matches!(cache.get(&right, market), Some(AssetState::Ready(_))));

        cache.cleanup_namespace(&right, &mut gpu);
        assert!(b_ids.iter().all(|id| gpu.was_released(*id)));
        assert!(!gpu.was_released(shared));
        assert_eq!(gpu.double_releases, 0);
    }
}
