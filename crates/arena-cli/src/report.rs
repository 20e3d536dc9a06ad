// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Serializable reports and their table rendering.

use arena_assets::{CacheStats, DisposalReport, LoadedAsset, Metadata};
use arena_scene::{CameraState, ProjectionKind};
use arena_view::Framing;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CameraReport {
    pub position: [f32; 3],
    pub up: [f32; 3],
    pub near: f32,
    pub far: f32,
    pub distance: f32,
    pub projection: &'static str,
}

impl From<&CameraState> for CameraReport {
    fn from(camera: &CameraState) -> Self {
        Self {
            position: camera.position.to_array(),
            up: camera.up.to_array(),
            near: camera.near,
            far: camera.far,
            distance: camera.distance(),
            projection: match camera.projection {
                ProjectionKind::Perspective => "perspective",
                ProjectionKind::Orthographic => "orthographic",
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetadataReport {
    pub bounds_min: [f32; 3],
    pub bounds_max: [f32; 3],
    pub center: [f32; 3],
    pub size: [f32; 3],
    pub max_dimension: f32,
    pub fallback: bool,
}

impl From<&Metadata> for MetadataReport {
    fn from(m: &Metadata) -> Self {
        Self {
            bounds_min: m.bounds.min().to_array(),
            bounds_max: m.bounds.max().to_array(),
            center: m.center.to_array(),
            size: m.size.to_array(),
            max_dimension: m.max_dimension,
            fallback: m.fallback,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub namespace: String,
    pub path: String,
    pub total_meshes: usize,
    pub draw_objects: usize,
    pub instanced_meshes: usize,
    pub special_meshes: usize,
    pub draw_calls: usize,
    pub metadata: MetadataReport,
    pub preset: Option<String>,
    pub camera: CameraReport,
    pub auto_rotate_speed: f32,
    pub fetches: u64,
    pub released: usize,
}

impl InspectReport {
    pub fn new(
        asset: &LoadedAsset,
        preset: Option<String>,
        camera: &CameraState,
        auto_rotate_speed: f32,
        stats: CacheStats,
        disposal: DisposalReport,
    ) -> Self {
        Self {
            namespace: asset.namespace.to_string(),
            path: asset.path.clone(),
            total_meshes: asset.stats.total_meshes,
            draw_objects: asset.stats.draw_objects,
            instanced_meshes: asset.stats.instanced_meshes,
            special_meshes: asset.stats.special_meshes,
            draw_calls: asset.scene.draw_call_count(),
            metadata: MetadataReport::from(&asset.metadata),
            preset,
            camera: CameraReport::from(camera),
            auto_rotate_speed,
            fetches: stats.fetches,
            released: disposal.resources(),
        }
    }

    pub fn table(&self) -> Table {
        let mut table = table();
        let m = &self.metadata;
        let c = &self.camera;
        let rows: Vec<(&str, String)> = vec![
            ("namespace", self.namespace.clone()),
            ("path", self.path.clone()),
            ("meshes", self.total_meshes.to_string()),
            ("draw objects", self.draw_objects.to_string()),
            ("instanced meshes", self.instanced_meshes.to_string()),
            ("special meshes", self.special_meshes.to_string()),
            ("draw calls", self.draw_calls.to_string()),
            ("bounds min", vec3(m.bounds_min)),
            ("bounds max", vec3(m.bounds_max)),
            ("center", vec3(m.center)),
            ("size", vec3(m.size)),
            ("max dimension", format!("{:.3}", m.max_dimension)),
            ("fallback bounds", m.fallback.to_string()),
            ("preset", self.preset.clone().unwrap_or_else(|| "-".into())),
            ("camera", vec3(c.position)),
            ("camera up", vec3(c.up)),
            ("distance", format!("{:.3}", c.distance)),
            ("near / far", format!("{:.3} / {:.3}", c.near, c.far)),
            ("projection", c.projection.to_owned()),
            ("auto-rotate speed", format!("{:.3}", self.auto_rotate_speed)),
            ("fetches", self.fetches.to_string()),
            ("released resources", self.released.to_string()),
        ];
        for (k, v) in rows {
            table.add_row(vec![k.to_owned(), v]);
        }
        table
    }
}

#[derive(Debug, Serialize)]
pub struct FrameReport {
    pub max_dimension: f32,
    pub effective_max_dimension: f32,
    pub camera: CameraReport,
}

impl FrameReport {
    pub fn new(max_dimension: f32, effective: f32, framing: &Framing) -> Self {
        Self {
            max_dimension,
            effective_max_dimension: effective,
            camera: CameraReport::from(&framing.camera_state()),
        }
    }

    pub fn table(&self) -> Table {
        let mut table = table();
        let c = &self.camera;
        table.add_row(vec!["max dimension".to_owned(), format!("{:.3}", self.max_dimension)]);
        table.add_row(vec![
            "effective".to_owned(),
            format!("{:.3}", self.effective_max_dimension),
        ]);
        table.add_row(vec!["camera".to_owned(), vec3(c.position)]);
        table.add_row(vec!["distance".to_owned(), format!("{:.3}", c.distance)]);
        table.add_row(vec![
            "near / far".to_owned(),
            format!("{:.3} / {:.3}", c.near, c.far),
        ]);
        table.add_row(vec!["projection".to_owned(), c.projection.to_owned()]);
        table
    }
}

fn table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Property", "Value"]);
    table
}

fn vec3(v: [f32; 3]) -> String {
    format!("({:.3}, {:.3}, {:.3})", v[0], v[1], v[2])
}
