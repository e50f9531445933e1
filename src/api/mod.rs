// src/api/mod.rs
// The data api the embedding renderer records into while re-rendering a
// pixel: a collection gate, a sample/depth cursor and the per-sample
// path records, plus the plugin registry and the heatmap facade.
// RELEVANT FILES:src/record/path.rs,src/api/heatmap_api.rs,src/server/mod.rs

mod heatmap_api;
mod plugin;

pub use heatmap_api::HeatmapApi;
pub use plugin::{Plugin, PluginRegistry};

use std::sync::Arc;

use crate::error::TraceResult;
use crate::record::{PathData, UserValue, INDEX_SENTINEL};
use crate::scene::{Camera, Mesh};
use crate::stream::ByteStream;
use crate::types::{Color4f, Point3f};

/// Recording facade handed to the renderer.
///
/// All mutators are no-ops while collection is disabled; mutators that
/// touch intersection state are additionally no-ops while the depth
/// cursor is unset. The renderer's sampling loop is expected to drive
/// one pixel at a time: set the sample cursor, then the depth cursor,
/// then record values.
pub struct DataApi {
    camera: Camera,
    meshes: Vec<Arc<Mesh>>,

    paths: Vec<PathData>,
    current_sample_idx: u32,
    current_depth_idx: u32,
    is_collecting: bool,

    pub plugins: PluginRegistry,
    pub heatmap: HeatmapApi,
}

impl Default for DataApi {
    fn default() -> Self {
        Self {
            camera: Camera::default(),
            meshes: Vec::new(),
            paths: Vec::new(),
            current_sample_idx: INDEX_SENTINEL,
            current_depth_idx: INDEX_SENTINEL,
            is_collecting: false,
            plugins: PluginRegistry::default(),
            heatmap: HeatmapApi::default(),
        }
    }
}

impl DataApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&mut self) {
        self.is_collecting = true;
    }

    pub fn disable(&mut self) {
        self.is_collecting = false;
    }

    pub fn is_collecting(&self) -> bool {
        self.is_collecting
    }

    /// Moves the cursor to the given sample, growing the path list as
    /// needed, and resets the depth cursor.
    pub fn set_sample_idx(&mut self, sample_idx: u32) {
        if !self.is_collecting {
            return;
        }
        self.current_sample_idx = sample_idx;
        self.current_depth_idx = INDEX_SENTINEL;
        let needed = sample_idx as usize + 1;
        if needed > self.paths.len() {
            self.paths.resize_with(needed, PathData::default);
        }
        self.paths[sample_idx as usize].activate(sample_idx);
    }

    pub fn set_depth_idx(&mut self, depth_idx: u32) {
        if !self.is_collecting || self.current_sample_idx == INDEX_SENTINEL {
            return;
        }
        self.current_depth_idx = depth_idx;
        self.paths[self.current_sample_idx as usize].set_depth_idx(depth_idx);
    }

    pub fn set_path_origin(&mut self, origin: Point3f) {
        if !self.is_collecting || self.current_sample_idx == INDEX_SENTINEL {
            return;
        }
        self.paths[self.current_sample_idx as usize].set_path_origin(origin);
    }

    pub fn set_final_estimate(&mut self, estimate: Color4f) {
        if !self.is_collecting || self.current_sample_idx == INDEX_SENTINEL {
            return;
        }
        self.paths[self.current_sample_idx as usize].set_final_estimate(estimate);
    }

    pub fn set_intersection_pos(&mut self, pos: Point3f) {
        if let Some(path) = self.current_intersection_path() {
            let depth = self.current_depth_idx;
            self.paths[path].intersection_at(depth).set_pos(pos);
        }
    }

    pub fn set_next_event_estimation_pos(&mut self, pos: Point3f, visible: bool) {
        if let Some(path) = self.current_intersection_path() {
            let depth = self.current_depth_idx;
            self.paths[path].intersection_at(depth).set_next_event_estimation(pos, visible);
        }
    }

    pub fn set_intersection_estimate(&mut self, estimate: Color4f) {
        if let Some(path) = self.current_intersection_path() {
            let depth = self.current_depth_idx;
            self.paths[path].intersection_at(depth).set_estimate(estimate);
        }
    }

    pub fn set_intersection_emission(&mut self, emission: Color4f) {
        if let Some(path) = self.current_intersection_path() {
            let depth = self.current_depth_idx;
            self.paths[path].intersection_at(depth).set_emission(emission);
        }
    }

    /// Attaches a labeled value to the current path.
    pub fn add_path_data(&mut self, label: impl Into<String>, value: impl Into<UserValue>) {
        if !self.is_collecting || self.current_sample_idx == INDEX_SENTINEL {
            return;
        }
        self.paths[self.current_sample_idx as usize].data.add(label, value);
    }

    /// Attaches a labeled value to the current intersection.
    pub fn add_intersection_data(&mut self, label: impl Into<String>, value: impl Into<UserValue>) {
        if let Some(path) = self.current_intersection_path() {
            let depth = self.current_depth_idx;
            self.paths[path].intersection_at(depth).add(label, value);
        }
    }

    fn current_intersection_path(&self) -> Option<usize> {
        if !self.is_collecting
            || self.current_sample_idx == INDEX_SENTINEL
            || self.current_depth_idx == INDEX_SENTINEL
        {
            return None;
        }
        Some(self.current_sample_idx as usize)
    }

    /// Drops the recorded paths so re-selecting the same pixel recomputes
    /// them. The cursors reset with them.
    pub fn clear(&mut self) {
        self.paths.clear();
        self.current_sample_idx = INDEX_SENTINEL;
        self.current_depth_idx = INDEX_SENTINEL;
    }

    pub fn paths(&self) -> &[PathData] {
        &self.paths
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn set_meshes(&mut self, meshes: Vec<Mesh>) {
        self.meshes = meshes.into_iter().map(Arc::new).collect();
    }

    pub(crate) fn set_shared_meshes(&mut self, meshes: Vec<Arc<Mesh>>) {
        self.meshes = meshes;
    }

    pub fn meshes(&self) -> &[Arc<Mesh>] {
        &self.meshes
    }

    /// Writes the number of active paths followed by each active path.
    pub fn serialize(&self, stream: &mut dyn ByteStream) -> TraceResult<()> {
        let num_paths = self.paths.iter().filter(|p| p.is_active()).count();
        stream.write_u32(num_paths as u32)?;
        for path in self.paths.iter().filter(|p| p.is_active()) {
            path.serialize(stream)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutators_are_gated_by_the_collection_flag() {
        let mut api = DataApi::new();
        api.set_sample_idx(0);
        api.set_path_origin(Point3f::new(1.0, 2.0, 3.0));
        assert!(api.paths().is_empty());

        api.enable();
        api.set_sample_idx(0);
        api.set_path_origin(Point3f::new(1.0, 2.0, 3.0));
        assert_eq!(api.paths().len(), 1);
        assert!(api.paths()[0].is_active());
    }

    #[test]
    fn intersection_mutators_require_a_depth_cursor() {
        let mut api = DataApi::new();
        api.enable();
        api.set_sample_idx(0);
        // no depth cursor yet: must be ignored
        api.set_intersection_pos(Point3f::new(1.0, 0.0, 0.0));
        assert!(api.paths()[0].intersections().is_empty());

        api.set_depth_idx(0);
        api.set_intersection_pos(Point3f::new(1.0, 0.0, 0.0));
        assert_eq!(
            api.paths()[0].intersections()[0].pos(),
            Some(Point3f::new(1.0, 0.0, 0.0))
        );
    }

    #[test]
    fn sample_cursor_grows_the_path_list_lazily() {
        let mut api = DataApi::new();
        api.enable();
        api.set_sample_idx(3);
        assert_eq!(api.paths().len(), 4);
        // only the selected sample is active
        let active: Vec<u32> =
            api.paths().iter().filter(|p| p.is_active()).map(|p| p.sample_idx()).collect();
        assert_eq!(active, [3]);
    }

    #[test]
    fn switching_samples_resets_the_depth_cursor() {
        let mut api = DataApi::new();
        api.enable();
        api.set_sample_idx(0);
        api.set_depth_idx(0);
        api.set_sample_idx(1);
        // depth cursor was reset, intersection data must be dropped
        api.set_intersection_pos(Point3f::new(0.0, 0.0, 0.0));
        assert!(api.paths()[1].intersections().is_empty());
    }
}
