// src/api/heatmap_api.rs
// Owns one HeatmapData per scene mesh plus the display options the
// client uses to draw the result (colormap name, colorbar, label).

use std::sync::Arc;

use crate::error::{TraceError, TraceResult};
use crate::heatmap::HeatmapData;
use crate::scene::Mesh;
use crate::types::{Color3f, Point3f};

pub struct HeatmapApi {
    data: Vec<HeatmapData>,
    is_collecting: bool,
    finalized: bool,

    // display options for the visualization client
    pub label: String,
    pub colormap: String,
    pub show_colorbar: bool,

    /// Replace the collected values by sample density during finalize.
    pub density_mode: bool,
}

impl Default for HeatmapApi {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            is_collecting: false,
            finalized: false,
            label: "unknown".to_string(),
            colormap: "plasma".to_string(),
            show_colorbar: true,
            density_mode: false,
        }
    }
}

impl HeatmapApi {
    /// Creates the collection structures for the given meshes. Pass an
    /// empty budget list to give every mesh the default subdivision
    /// budget, or exactly one budget per mesh.
    pub fn initialize(&mut self, meshes: &[Arc<Mesh>], subdivision_budgets: &[u32]) -> TraceResult<()> {
        if !subdivision_budgets.is_empty() && subdivision_budgets.len() != meshes.len() {
            return Err(TraceError::invalid("one subdivision budget is required per mesh"));
        }

        self.data.clear();
        self.finalized = false;

        self.data.reserve(meshes.len());
        for (i, mesh) in meshes.iter().enumerate() {
            let budget = subdivision_budgets
                .get(i)
                .copied()
                .unwrap_or(HeatmapData::DEFAULT_FACE_BUDGET);
            self.data.push(HeatmapData::new(Arc::clone(mesh), budget));
        }
        Ok(())
    }

    /// Splits a total face budget across meshes proportionally to their
    /// surface area, so equally-sized triangles refine equally fast.
    pub fn area_weighted_budgets(meshes: &[Arc<Mesh>], total_budget: u32) -> Vec<u32> {
        let total_area: f32 = meshes.iter().map(|m| m.surface_area).sum();
        if total_area <= 0.0 {
            return vec![total_budget / meshes.len().max(1) as u32; meshes.len()];
        }
        meshes
            .iter()
            .map(|m| (total_budget as f32 * (m.surface_area / total_area)) as u32)
            .collect()
    }

    /// Collection can only start while there is data to collect into and
    /// the result has not been finalized yet.
    pub fn enable(&mut self) {
        self.is_collecting = !self.finalized && !self.data.is_empty();
    }

    pub fn disable(&mut self) {
        self.is_collecting = false;
    }

    pub fn is_collecting(&self) -> bool {
        self.is_collecting
    }

    /// Records one sample; safe to call from parallel rendering threads.
    pub fn add_sample(&self, mesh_id: u32, p: Point3f, face_id: u32, value: Color3f, weight: f32) {
        if !self.is_collecting {
            return;
        }
        self.data[mesh_id as usize].add_sample(p, face_id, value.r, value.g, value.b, weight);
    }

    /// Propagates values of subdivided faces to their children (and
    /// replaces values by sample density if requested). Runs once; later
    /// calls are no-ops. Collection stops here for good.
    pub fn finalize(&mut self) {
        if self.data.is_empty() {
            return;
        }

        if !self.finalized {
            for heatmap in &self.data {
                heatmap.finalize(self.density_mode);
            }
        }

        self.finalized = true;
        self.is_collecting = false;
    }

    pub fn has_data(&self) -> bool {
        self.finalized
    }

    pub fn data(&self) -> TraceResult<&[HeatmapData]> {
        if !self.finalized {
            return Err(TraceError::invalid("finalize the heatmap data first"));
        }
        Ok(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vec3u;

    fn mesh_with_area(surface_area: f32) -> Arc<Mesh> {
        Arc::new(Mesh {
            vertices: vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            triangles: vec![Vec3u::new(0, 1, 2)],
            face_colors: Vec::new(),
            diffuse_color: Default::default(),
            specular_color: Default::default(),
            surface_area,
        })
    }

    #[test]
    fn budget_list_must_match_the_mesh_count() {
        let mut api = HeatmapApi::default();
        let meshes = vec![mesh_with_area(1.0), mesh_with_area(1.0)];
        assert!(api.initialize(&meshes, &[4]).is_err());
        assert!(api.initialize(&meshes, &[4, 8]).is_ok());
    }

    #[test]
    fn budgets_split_proportionally_to_surface_area() {
        let meshes = vec![mesh_with_area(3.0), mesh_with_area(1.0)];
        let budgets = HeatmapApi::area_weighted_budgets(&meshes, 1000);
        assert_eq!(budgets, [750, 250]);
    }

    #[test]
    fn collection_cannot_restart_after_finalize() {
        let mut api = HeatmapApi::default();
        api.initialize(&[mesh_with_area(0.5)], &[4]).unwrap();
        api.enable();
        assert!(api.is_collecting());

        api.finalize();
        assert!(!api.is_collecting());
        assert!(api.has_data());

        api.enable();
        assert!(!api.is_collecting(), "finalized data must stay frozen");
    }
}
