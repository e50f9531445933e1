// src/heatmap/mod.rs
// Low-memory heatmap collection on triangle meshes. A per-face running
// mean is kept while rendering; once a face has gathered enough samples
// it is subdivided internally and later samples land in the children.
// After collection, aggregates of subdivided faces are pushed down into
// their children and faces that never saw a sample inherit a damped
// estimate from their neighbors.
// RELEVANT FILES:src/heatmap/tessellation.rs,src/heatmap/mean.rs,src/api/heatmap_api.rs

mod mean;
pub mod ply;
mod tessellation;

pub use mean::{AtomicIncrementalMean, IncrementalMean};
pub use tessellation::DynamicTessellation;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::TraceResult;
use crate::scene::Mesh;
use crate::stream::ByteStream;
use crate::types::{Color3f, Point3f};

/// Sample weight at which a face is split into four children.
pub const MAX_SAMPLES_PER_FACE: f32 = 256.0;

/// Damping applied to values inpainted from neighboring faces.
const INPAINT_DAMPING: f32 = 32.0;

/// Heatmap accumulator for a single mesh.
pub struct HeatmapData {
    pub tessellation: DynamicTessellation,
    /// One slot per potential face id in the combined space; never
    /// resized while samples arrive.
    face_data: Vec<AtomicIncrementalMean>,
}

impl HeatmapData {
    /// Budget used when the embedding renderer does not pick one.
    pub const DEFAULT_FACE_BUDGET: u32 = 1 << 18;

    pub fn new(base: Arc<Mesh>, face_budget: u32) -> Self {
        let tessellation = DynamicTessellation::new(base, face_budget);
        let mut face_data = Vec::new();
        face_data.resize_with(tessellation.max_num_faces() as usize, AtomicIncrementalMean::default);
        Self { tessellation, face_data }
    }

    /// Raw accumulator slots, one per potential face id. Mostly useful
    /// for inspection; `compute_face_data` is the consumer-facing view.
    pub fn face_data(&self) -> &[AtomicIncrementalMean] {
        &self.face_data
    }

    /// Records one sample on `face` at world position `position`.
    ///
    /// Callable from any number of rendering threads concurrently. When
    /// the face crosses the sample threshold it is subdivided (bounded
    /// critical section); if the subdivision budget is exhausted the
    /// sample simply stays on the coarse face.
    pub fn add_sample(&self, position: Point3f, face: u32, r: f32, g: f32, b: f32, weight: f32) {
        let mut face = self.tessellation.tessellated_face(position, face);

        if self.face_data[face as usize].load().weight > MAX_SAMPLES_PER_FACE {
            // may return 0 if the capacity budget is exhausted, or the
            // children if another thread subdivided concurrently
            if self.tessellation.subdivide_face(face) > 0 {
                face = self.tessellation.tessellated_face(position, face);
            }
        }

        self.face_data[face as usize].accumulate(IncrementalMean::new(r, g, b, weight));
    }

    /// Pushes aggregates of subdivided faces down into their children and
    /// optionally replaces the collected values by sample density. Call
    /// exactly once, after data collection has finished.
    pub fn finalize(&self, replace_with_density: bool) {
        for i in 0..self.tessellation.num_faces() {
            let mut face_data = self.face_data[i as usize].load();

            let sub = self.tessellation.subdivision_of(i);
            if sub != 0 {
                let child_data = [
                    self.face_data[sub as usize].load(),
                    self.face_data[sub as usize + 1].load(),
                    self.face_data[sub as usize + 2].load(),
                    self.face_data[sub as usize + 3].load(),
                ];
                let child_weight_sum: f32 = child_data.iter().map(|d| d.weight).sum();

                if child_weight_sum > MAX_SAMPLES_PER_FACE {
                    // distribute proportionally to each child's share of
                    // the samples seen after the split
                    let weight_factor = face_data.weight / child_weight_sum;
                    for (offset, child) in child_data.into_iter().enumerate() {
                        face_data.weight = child.weight * weight_factor;
                        self.face_data[sub as usize + offset].store(child + face_data);
                    }
                } else {
                    // too few samples below to estimate a distribution
                    face_data.weight *= 0.25;
                    for (offset, child) in child_data.into_iter().enumerate() {
                        self.face_data[sub as usize + offset].store(child + face_data);
                    }
                }
                continue;
            }

            if replace_with_density {
                if face_data.weight > 0.0 {
                    let ids = self.tessellation.face(i);
                    let a = self.tessellation.vertex(ids.x).to_vec3();
                    let b = self.tessellation.vertex(ids.y).to_vec3();
                    let c = self.tessellation.vertex(ids.z).to_vec3();
                    let triangle_area = (b - a).cross(c - a).length() * 0.5;

                    let density = face_data.weight / triangle_area;
                    face_data.mean_r = density;
                    face_data.mean_g = density;
                    face_data.mean_b = density;
                } else {
                    face_data.mean_r = 0.0;
                    face_data.mean_g = 0.0;
                    face_data.mean_b = 0.0;
                }
                face_data.weight = 1.0;

                self.face_data[i as usize].store(face_data);
            }
        }
    }

    /// Per-leaf means in leaf order, with empty faces inpainted from
    /// their neighbors where possible.
    pub fn compute_face_data(&self) -> Vec<IncrementalMean> {
        let num_faces = self.tessellation.num_faces();

        // copy of the live data, gaps filled in below
        let mut filled: Vec<IncrementalMean> = Vec::with_capacity(num_faces as usize);
        // vertex id -> ids of unknown faces using it
        let mut unknown_vertices: HashMap<u32, Vec<u32>> = HashMap::new();
        let mut got_any_data = false;

        for i in 0..num_faces {
            if self.tessellation.is_subdivided(i) {
                filled.push(IncrementalMean::default());
                continue;
            }

            let face_data = self.face_data[i as usize].load();
            if face_data.is_empty() {
                for v in self.tessellation.face(i).indices() {
                    unknown_vertices.entry(v).or_default().push(i);
                }
                filled.push(IncrementalMean::default());
            } else {
                filled.push(face_data);
                got_any_data = true;
            }
        }

        if got_any_data && !unknown_vertices.is_empty() {
            // unknown face id -> leaf faces sharing a vertex with it
            let mut unknown_neighbors: HashMap<u32, Vec<u32>> = HashMap::new();
            for i in 0..num_faces {
                if self.tessellation.is_subdivided(i) {
                    continue;
                }
                for v in self.tessellation.face(i).indices() {
                    if let Some(unknowns) = unknown_vertices.get(&v) {
                        for &unknown in unknowns.iter().filter(|&&u| u != i) {
                            unknown_neighbors.entry(unknown).or_default().push(i);
                        }
                    }
                }
            }
            drop(unknown_vertices);

            for _pass in 0..3 {
                let mut pending: Vec<u32> = unknown_neighbors.keys().copied().collect();
                pending.sort_unstable();

                let mut filled_faces = 0u32;
                for unknown in pending {
                    let mut accumulated = IncrementalMean::default();
                    let mut num_valid = 0u32;
                    for &neighbor in &unknown_neighbors[&unknown] {
                        let neighbor_data = filled[neighbor as usize];
                        if neighbor_data.weight > 0.0 {
                            accumulated += neighbor_data;
                            num_valid += 1;
                        }
                    }
                    if num_valid > 0 {
                        // damp the estimate: it is hearsay, not data
                        accumulated.weight /= num_valid as f32 * INPAINT_DAMPING;
                        filled[unknown as usize] = accumulated;
                        unknown_neighbors.remove(&unknown);
                        filled_faces += 1;
                    }
                }

                log::info!("filled in the data of {filled_faces} faces using their neighbors");

                if filled_faces == 0 || unknown_neighbors.is_empty() {
                    break;
                }
            }
        }

        // emit leaves only; subdivided parents have been redistributed
        (0..num_faces)
            .filter(|&i| !self.tessellation.is_subdivided(i))
            .map(|i| filled[i as usize])
            .collect()
    }

    /// Accumulates the leaf face means into their vertices. Only used for
    /// the debug PLY export.
    pub fn compute_vertex_data(&self) -> Vec<IncrementalMean> {
        let num_faces = self.tessellation.num_faces();
        let num_vertices = self.tessellation.num_vertices();

        let mut vertex_data = vec![IncrementalMean::default(); num_vertices as usize];
        let face_data = self.compute_face_data();

        let mut leaf_idx = 0usize;
        for i in 0..num_faces {
            if self.tessellation.is_subdivided(i) {
                continue;
            }
            let data = face_data[leaf_idx];
            leaf_idx += 1;
            for v in self.tessellation.face(i).indices() {
                vertex_data[v as usize] += data;
            }
        }
        vertex_data
    }

    /// Sends the heatmap as a regular mesh with one face color per leaf,
    /// inheriting the base mesh's materials.
    pub fn serialize(&self, stream: &mut dyn ByteStream) -> TraceResult<()> {
        let face_data = self.compute_face_data();
        let proxy = Mesh {
            vertices: self.tessellation.compute_tessellated_vertices(),
            triangles: self.tessellation.compute_tessellated_faces(),
            face_colors: face_data
                .iter()
                .map(|d| Color3f::new(d.mean_r, d.mean_g, d.mean_b))
                .collect(),
            diffuse_color: self.tessellation.base().diffuse_color,
            specular_color: self.tessellation.base().specular_color,
            surface_area: 0.0,
        };
        proxy.serialize(stream)
    }
}
