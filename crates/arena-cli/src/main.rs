// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Arena developer CLI.
//!
//! Runs the viewer core headless against JSON scene fixtures:
//!
//! - `arena inspect <file>` loads a fixture through the asset cache and
//!   reports instancing stats, metadata and the framed camera.
//! - `arena frame --max-dimension <d>` prints the framing for a model size.
//! - `arena prefs` prints the effective viewer preferences.
//!
//! Logs go to stderr and honour `RUST_LOG`. Exits non-zero on error.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod fixture;
mod headless;
mod report;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use arena_app_core::config::{ConfigService, ConfigStore, MemoryConfigStore};
use arena_app_core::prefs::ViewerPrefs;
use arena_assets::{AssetCache, Metadata, Namespace};
use arena_config_fs::FsConfigStore;
use arena_scene::Aabb;
use arena_view::{effective_max_dimension, frame, Projection, Teardown, ViewPreset, Viewer};
use clap::{Parser, Subcommand};
use glam::Vec3;
use serde::Serialize;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::fixture::{FsFetcher, JsonSceneDecoder};
use crate::headless::{HeadlessSurface, ReleaseCounter};
use crate::report::{FrameReport, InspectReport};

const PREFS_KEY: &str = "viewer";

#[derive(Debug, Parser)]
#[command(name = "arena", version, about = "Arena viewer core developer CLI")]
struct Cli {
    /// Directory holding viewer preferences (default: platform config dir).
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load a scene fixture and report optimization, metadata and framing.
    Inspect {
        /// Path to a JSON scene fixture.
        file: PathBuf,
        /// Cache namespace to load under.
        #[arg(long, default_value = "cli")]
        namespace: String,
        /// Apply a view preset (front, back, left, right, top, bottom, reset).
        #[arg(long)]
        preset: Option<ViewPreset>,
        /// Skip the instancing pass.
        #[arg(long)]
        no_instancing: bool,
        /// Use an orthographic camera.
        #[arg(long)]
        ortho: bool,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Print the framed camera for a model of the given size.
    Frame {
        /// Largest bounding-box extent of the model.
        #[arg(long)]
        max_dimension: f32,
        /// Vertical field of view in degrees (perspective only).
        #[arg(long)]
        fov_deg: Option<f32>,
        /// Framing offset factor.
        #[arg(long)]
        offset: Option<f32>,
        /// Use an orthographic camera.
        #[arg(long)]
        ortho: bool,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Print the effective viewer preferences as JSON.
    Prefs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut prefs = load_prefs(cli.config_dir.as_deref());

    match cli.command {
        Command::Inspect {
            file,
            namespace,
            preset,
            no_instancing,
            ortho,
            json,
        } => {
            if no_instancing {
                prefs.optimizer.instancing = false;
            }
            if ortho {
                prefs.camera.orthographic = true;
            }
            let report = inspect(&file, Namespace::new(namespace), preset, prefs).await?;
            emit(&report, json, || report.table().to_string())
        }
        Command::Frame {
            max_dimension,
            fov_deg,
            offset,
            ortho,
            json,
        } => {
            if let Some(deg) = fov_deg {
                prefs.camera.fov_y = deg.to_radians();
            }
            if let Some(offset) = offset {
                prefs.camera.offset_factor = offset;
            }
            if ortho {
                prefs.camera.orthographic = true;
            }
            let report = frame_report(max_dimension, &prefs);
            emit(&report, json, || report.table().to_string())
        }
        Command::Prefs => {
            println!("{}", serde_json::to_string_pretty(&prefs)?);
            Ok(())
        }
    }
}

/// Load the viewer through the cache, apply the preset, then tear it down.
async fn inspect(
    file: &Path,
    namespace: Namespace,
    preset: Option<ViewPreset>,
    prefs: ViewerPrefs,
) -> Result<InspectReport> {
    let cache = AssetCache::new(FsFetcher, JsonSceneDecoder, prefs.optimizer.clone());
    let url = file.display().to_string();
    let mut viewer = Viewer::new(
        cache.clone(),
        HeadlessSurface::default(),
        namespace,
        url,
        prefs,
    );

    let now = Instant::now();
    viewer.mount(now);
    let asset = viewer
        .load()
        .await
        .with_context(|| format!("failed to inspect {}", file.display()))?;
    if let Some(preset) = preset {
        viewer.request_view(preset);
    }
    viewer.tick(now);
    debug!(
        frames = viewer.surface().frames(),
        attached = viewer.surface().scene().is_some(),
        "rendered headless"
    );

    let camera = viewer
        .session()
        .map(|s| *s.camera())
        .unwrap_or_default();
    let speed = viewer.session().map_or(0.0, |s| s.controller().speed());

    let mut gpu = ReleaseCounter::default();
    let disposal = viewer.unmount(Teardown::Path, &mut gpu);
    debug!(
        geometries = gpu.geometries,
        materials = gpu.materials,
        textures = gpu.textures,
        "released"
    );

    Ok(InspectReport::new(
        &asset,
        preset.map(|p| p.to_string()),
        &camera,
        speed,
        cache.stats(),
        disposal,
    ))
}

fn frame_report(max_dimension: f32, prefs: &ViewerPrefs) -> FrameReport {
    let metadata = Metadata::from_bounds(Aabb::from_center_half_extents(
        Vec3::ZERO,
        Vec3::splat(max_dimension / 2.0),
    ))
    .unwrap_or_else(Metadata::fallback);
    let framing = frame(
        &metadata,
        Projection::from_prefs(&prefs.camera),
        prefs.camera.offset_factor,
    );
    FrameReport::new(
        max_dimension,
        effective_max_dimension(metadata.max_dimension),
        &framing,
    )
}

fn emit<T: Serialize>(report: &T, json: bool, table: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{}", table());
    }
    Ok(())
}

/// Best effort: an unreadable config dir falls back to defaults in memory.
fn load_prefs(config_dir: Option<&Path>) -> ViewerPrefs {
    let store = match config_dir {
        Some(dir) => FsConfigStore::at(dir),
        None => FsConfigStore::new(),
    };
    match store {
        Ok(store) => prefs_from(&ConfigService::new(store)),
        Err(err) => {
            warn!(error = %err, "config dir unavailable; using in-memory prefs");
            prefs_from(&ConfigService::new(MemoryConfigStore::new()))
        }
    }
}

fn prefs_from<S: ConfigStore>(service: &ConfigService<S>) -> ViewerPrefs {
    service.load_or_init(PREFS_KEY).unwrap_or_else(|err| {
        warn!(error = %err, "could not load viewer prefs; using defaults");
        ViewerPrefs::default()
    })
}
