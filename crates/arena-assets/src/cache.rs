// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Namespaced asset cache with in-flight load dedup.
//!
//! [`AssetCache`] is a cheap-to-clone handle over single-threaded shared
//! state. Every entry is keyed first by [`Namespace`], then by asset path.
//!
//! # Entry Invariants
//!
//! - At most one load is in flight per (namespace, path). Concurrent
//!   [`preload`](AssetCache::preload) calls await the same shared future.
//! - A failed load removes its `Loading` slot, so the next call retries.
//! - Cleanup removes the slot before disposing it. A load that finishes after
//!   its slot was removed is discarded and its awaiters see
//!   [`LoadError::Evicted`]; it never re-inserts itself.
//! - No `RefCell` borrow is held across an `.await`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use arena_app_core::prefs::OptimizerPrefs;
use arena_scene::{GpuPort, Scene};
use futures_channel::oneshot;
use futures_util::future::{FutureExt, LocalBoxFuture, Shared};
use tracing::{debug, info, instrument, warn};

use crate::dispose::{dispose, DisposalReport};
use crate::loader::{ArtifactDescriptor, AssetFetcher, SceneDecoder, UrlResolver};
use crate::metadata::{center_scene, compute_metadata, Metadata};
use crate::optimize::{optimize, OptimizeStats};
use crate::LoadError;

/// Identifier of one logical viewer session.
///
/// Callers choose the string; two viewers showing the same asset side by side
/// use different namespaces so neither can evict the other's copy.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(String);

impl Namespace {
    /// Wrap a caller-chosen namespace string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Namespace for a shared-link view of a sample.
    pub fn share(sample_id: &str) -> Self {
        Self(format!("share-{sample_id}"))
    }

    /// Namespace for a sample detail view.
    pub fn sample(sample_id: &str) -> Self {
        Self(format!("sample-{sample_id}"))
    }

    /// The namespace string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Namespace {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A fully loaded, optimized and centered asset.
#[derive(Debug)]
pub struct LoadedAsset {
    /// Namespace the asset was loaded under.
    pub namespace: Namespace,
    /// Asset path (the URL that was fetched).
    pub path: String,
    /// Optimized scene, root translated so the model's center is the origin.
    pub scene: Rc<Scene>,
    /// Size facts, computed after optimization and before centering.
    pub metadata: Metadata,
    /// What the instancing pass did.
    pub stats: OptimizeStats,
}

/// Observable state of a cache entry.
#[derive(Debug, Clone)]
pub enum AssetState {
    /// A load is in flight.
    Loading,
    /// The asset is ready.
    Ready(Rc<LoadedAsset>),
}

/// Cache activity counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Loads started (each one fetch).
    pub fetches: u64,
    /// Preloads answered from a ready entry.
    pub hits: u64,
    /// Preloads that joined an in-flight load.
    pub joins: u64,
    /// Loads that failed.
    pub failures: u64,
    /// Entries removed by cleanup.
    pub evictions: u64,
}

type LoadResult = Result<Rc<LoadedAsset>, LoadError>;
type LoadFuture = Shared<LocalBoxFuture<'static, LoadResult>>;

enum Slot {
    Loading { ticket: u64, future: LoadFuture },
    Ready(Rc<LoadedAsset>),
}

enum Pending {
    Ready(Rc<LoadedAsset>),
    Load(LoadFuture),
    Notify(oneshot::Receiver<LoadResult>),
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<Namespace, HashMap<String, Slot>>,
    waiters: HashMap<Namespace, HashMap<String, Vec<oneshot::Sender<LoadResult>>>>,
    next_ticket: u64,
    stats: CacheStats,
}

impl CacheState {
    fn slot(&self, namespace: &Namespace, path: &str) -> Option<&Slot> {
        self.entries.get(namespace).and_then(|m| m.get(path))
    }

    fn existing(&mut self, namespace: &Namespace, path: &str) -> Option<Pending> {
        let pending = match self.slot(namespace, path)? {
            Slot::Ready(asset) => Pending::Ready(Rc::clone(asset)),
            Slot::Loading { future, .. } => Pending::Load(future.clone()),
        };
        Some(pending)
    }

    fn remove_slot(&mut self, namespace: &Namespace, path: &str) -> Option<Slot> {
        let paths = self.entries.get_mut(namespace)?;
        let slot = paths.remove(path);
        if paths.is_empty() {
            self.entries.remove(namespace);
        }
        slot
    }

    fn drop_waiters(&mut self, namespace: &Namespace, path: Option<&str>) {
        match path {
            Some(path) => {
                if let Some(paths) = self.waiters.get_mut(namespace) {
                    paths.remove(path);
                    if paths.is_empty() {
                        self.waiters.remove(namespace);
                    }
                }
            }
            None => {
                self.waiters.remove(namespace);
            }
        }
    }

    /// Forget waiters whose receiver was dropped before the key settled.
    fn prune_waiters(&mut self) {
        self.waiters.retain(|_, paths| {
            paths.retain(|_, senders| {
                senders.retain(|tx| !tx.is_canceled());
                !senders.is_empty()
            });
            !paths.is_empty()
        });
    }

    #[cfg(test)]
    fn waiter_count(&self) -> usize {
        self.waiters.values().flat_map(HashMap::values).map(Vec::len).sum()
    }

    fn take_waiters(
        &mut self,
        namespace: &Namespace,
        path: &str,
    ) -> Vec<oneshot::Sender<LoadResult>> {
        let Some(paths) = self.waiters.get_mut(namespace) else {
            return Vec::new();
        };
        let senders = paths.remove(path).unwrap_or_default();
        if paths.is_empty() {
            self.waiters.remove(namespace);
        }
        senders
    }

    /// Settle the load identified by `ticket`. Returns what its awaiters see.
    fn finish(
        &mut self,
        namespace: &Namespace,
        path: &str,
        ticket: u64,
        result: LoadResult,
    ) -> LoadResult {
        let current = matches!(
            self.slot(namespace, path),
            Some(Slot::Loading { ticket: t, .. }) if *t == ticket
        );
        if !current {
            debug!(namespace = %namespace, path, "load finished after cleanup; discarding");
            return Err(LoadError::Evicted {
                namespace: namespace.to_string(),
                path: path.to_owned(),
            });
        }

        match &result {
            Ok(asset) => {
                if let Some(paths) = self.entries.get_mut(namespace) {
                    paths.insert(path.to_owned(), Slot::Ready(Rc::clone(asset)));
                }
            }
            Err(err) => {
                self.stats.failures += 1;
                warn!(namespace = %namespace, path, error = %err, "asset load failed");
                self.remove_slot(namespace, path);
            }
        }
        for waiter in self.take_waiters(namespace, path) {
            // A dropped receiver just means that consumer went away.
            let _ = waiter.send(result.clone());
        }
        result
    }
}

struct Loader {
    fetcher: Box<dyn AssetFetcher>,
    decoder: Box<dyn SceneDecoder>,
    prefs: OptimizerPrefs,
}

impl Loader {
    #[instrument(skip(self, namespace), fields(namespace = %namespace))]
    async fn load(&self, namespace: &Namespace, path: &str) -> LoadResult {
        let bytes = self
            .fetcher
            .fetch(path)
            .await
            .map_err(|e| LoadError::Fetch {
                url: path.to_owned(),
                reason: e.to_string(),
            })?;
        let mut scene = self
            .decoder
            .decode(path, &bytes)
            .map_err(|e| LoadError::Decode {
                url: path.to_owned(),
                reason: e.to_string(),
            })?;

        let stats = optimize(namespace, &mut scene, &self.prefs);
        let metadata = compute_metadata(&scene);
        center_scene(&mut scene, &metadata);

        info!(
            bytes = bytes.len(),
            max_dimension = metadata.max_dimension,
            draw_objects = stats.draw_objects,
            "asset ready"
        );
        Ok(Rc::new(LoadedAsset {
            namespace: namespace.clone(),
            path: path.to_owned(),
            scene: Rc::new(scene),
            metadata,
            stats,
        }))
    }
}

/// Namespaced cache of loaded assets.
///
/// Clones share the same entries. Construct one per application (or per
/// test) and hand clones to every viewer.
#[derive(Clone)]
pub struct AssetCache {
    state: Rc<RefCell<CacheState>>,
    loader: Rc<Loader>,
}

impl AssetCache {
    /// Create an empty cache loading through `fetcher` and `decoder`.
    pub fn new<F, D>(fetcher: F, decoder: D, prefs: OptimizerPrefs) -> Self
    where
        F: AssetFetcher + 'static,
        D: SceneDecoder + 'static,
    {
        Self {
            state: Rc::new(RefCell::new(CacheState::default())),
            loader: Rc::new(Loader {
                fetcher: Box::new(fetcher),
                decoder: Box::new(decoder),
                prefs,
            }),
        }
    }

    /// Current state of an entry, or `None` if it was never requested or has
    /// been cleaned up.
    pub fn get(&self, namespace: &Namespace, path: &str) -> Option<AssetState> {
        let state = self.state.borrow();
        state.slot(namespace, path).map(|slot| match slot {
            Slot::Loading { .. } => AssetState::Loading,
            Slot::Ready(asset) => AssetState::Ready(Rc::clone(asset)),
        })
    }

    /// Returns `true` if an entry (loading or ready) exists.
    pub fn contains(&self, namespace: &Namespace, path: &str) -> bool {
        self.state.borrow().slot(namespace, path).is_some()
    }

    /// Total number of entries across all namespaces.
    pub fn len(&self) -> usize {
        self.state.borrow().entries.values().map(HashMap::len).sum()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.state.borrow().entries.is_empty()
    }

    /// Namespaces with at least one entry, sorted.
    pub fn namespaces(&self) -> Vec<Namespace> {
        let mut names: Vec<Namespace> = self.state.borrow().entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Activity counters.
    pub fn stats(&self) -> CacheStats {
        self.state.borrow().stats
    }

    /// Load `path` under `namespace` unless it is already loaded or loading.
    ///
    /// Ready entries resolve immediately. A call that finds a load in flight
    /// awaits that load instead of fetching again. Otherwise this call starts
    /// the load; the returned future must be polled for the load to progress.
    pub async fn preload(&self, namespace: &Namespace, path: &str) -> LoadResult {
        let pending = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            match state.existing(namespace, path) {
                Some(Pending::Ready(asset)) => {
                    state.stats.hits += 1;
                    debug!(namespace = %namespace, path, "cache hit");
                    return Ok(asset);
                }
                Some(pending) => {
                    state.stats.joins += 1;
                    debug!(namespace = %namespace, path, "joining in-flight load");
                    pending
                }
                None => Pending::Load(self.start_load(state, namespace, path)),
            }
        };
        self.settle(namespace, path, pending).await
    }

    /// Resolve `artifact` through `resolver` and [`preload`](Self::preload)
    /// the resulting URL.
    pub async fn preload_artifact(
        &self,
        namespace: &Namespace,
        resolver: &dyn UrlResolver,
        artifact: &ArtifactDescriptor,
    ) -> LoadResult {
        let url = resolver.resolve(artifact);
        self.preload(namespace, &url).await
    }

    /// Wait until the entry is ready, without starting a load.
    ///
    /// Resolves immediately for ready entries, joins an in-flight load, and
    /// otherwise waits for someone else to load the key. Fails with the load
    /// error, or with [`LoadError::Evicted`] if the key is cleaned up first.
    pub async fn ready(&self, namespace: &Namespace, path: &str) -> LoadResult {
        let pending = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            match state.existing(namespace, path) {
                Some(Pending::Ready(asset)) => return Ok(asset),
                Some(pending) => pending,
                None => {
                    state.prune_waiters();
                    let (tx, rx) = oneshot::channel();
                    state
                        .waiters
                        .entry(namespace.clone())
                        .or_default()
                        .entry(path.to_owned())
                        .or_default()
                        .push(tx);
                    Pending::Notify(rx)
                }
            }
        };
        self.settle(namespace, path, pending).await
    }

    /// Wait for the entry's metadata. See [`ready`](Self::ready).
    pub async fn metadata(&self, namespace: &Namespace, path: &str) -> Result<Metadata, LoadError> {
        self.ready(namespace, path).await.map(|asset| asset.metadata)
    }

    /// Dispose and remove one entry. No-op if absent.
    ///
    /// Removing a loading entry does not cancel the fetch; its awaiters see
    /// [`LoadError::Evicted`] when it completes.
    pub fn cleanup_one(
        &self,
        namespace: &Namespace,
        path: &str,
        gpu: &mut dyn GpuPort,
    ) -> DisposalReport {
        let removed = {
            let mut state = self.state.borrow_mut();
            state.drop_waiters(namespace, Some(path));
            let slot = state.remove_slot(namespace, path);
            if slot.is_some() {
                state.stats.evictions += 1;
            }
            slot
        };
        let report = removed.map_or_else(DisposalReport::default, |slot| {
            release_slot(namespace, path, slot, gpu)
        });
        if report.entries > 0 {
            info!(namespace = %namespace, path, resources = report.resources(), "entry cleaned up");
        }
        report
    }

    /// Dispose and remove every entry under `namespace`. Other namespaces,
    /// including entries for the same paths, are untouched.
    pub fn cleanup_namespace(&self, namespace: &Namespace, gpu: &mut dyn GpuPort) -> DisposalReport {
        let removed = {
            let mut state = self.state.borrow_mut();
            state.drop_waiters(namespace, None);
            let removed = state.entries.remove(namespace).unwrap_or_default();
            state.stats.evictions += removed.len() as u64;
            removed
        };
        let mut paths: Vec<(String, Slot)> = removed.into_iter().collect();
        paths.sort_by(|a, b| a.0.cmp(&b.0));

        let mut report = DisposalReport::default();
        for (path, slot) in paths {
            report += release_slot(namespace, &path, slot, gpu);
        }
        if report.entries > 0 {
            info!(
                namespace = %namespace,
                entries = report.entries,
                resources = report.resources(),
                "namespace cleaned up"
            );
        }
        report
    }

    fn start_load(&self, state: &mut CacheState, namespace: &Namespace, path: &str) -> LoadFuture {
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.stats.fetches += 1;

        let weak: Weak<RefCell<CacheState>> = Rc::downgrade(&self.state);
        let loader = Rc::clone(&self.loader);
        let ns = namespace.clone();
        let key = path.to_owned();
        let future = async move {
            let result = loader.load(&ns, &key).await;
            match weak.upgrade() {
                Some(state) => state.borrow_mut().finish(&ns, &key, ticket, result),
                None => result,
            }
        }
        .boxed_local()
        .shared();

        state
            .entries
            .entry(namespace.clone())
            .or_default()
            .insert(
                path.to_owned(),
                Slot::Loading {
                    ticket,
                    future: future.clone(),
                },
            );
        debug!(namespace = %namespace, path, ticket, "load started");
        future
    }

    async fn settle(&self, namespace: &Namespace, path: &str, pending: Pending) -> LoadResult {
        match pending {
            Pending::Ready(asset) => Ok(asset),
            Pending::Load(future) => future.await,
            Pending::Notify(rx) => rx.await.unwrap_or_else(|_canceled| {
                Err(LoadError::Evicted {
                    namespace: namespace.to_string(),
                    path: path.to_owned(),
                })
            }),
        }
    }
}

fn release_slot(namespace: &Namespace, path: &str, slot: Slot, gpu: &mut dyn GpuPort) -> DisposalReport {
    match slot {
        Slot::Ready(asset) => {
            let mut report = dispose(&asset.scene, gpu);
            report.entries = 1;
            report
        }
        Slot::Loading { ticket, .. } => {
            debug!(namespace = %namespace, path, ticket, "removed in-flight entry");
            DisposalReport {
                entries: 1,
                ..DisposalReport::default()
            }
        }
    }
}
