// src/heatmap/tessellation.rs
// Thread-safe midpoint subdivision of a base triangle mesh. The renderer
// keeps sampling the coarse mesh while faces are refined internally;
// samples are routed to the refined face by barycentric descent.
//
// Concurrency protocol: the overflow slabs are preallocated and never
// reallocated. All growth happens under the `growth` mutex; a subdivision
// becomes visible to lock-free readers only through the release-store
// into `subdivisions`, which happens after its faces and midpoints have
// been written. Readers acquire-load `subdivisions` and may then touch
// exactly the slab entries reachable from the published id.
// RELEVANT FILES:src/heatmap/mod.rs,src/scene.rs

use std::cell::UnsafeCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::scene::Mesh;
use crate::types::{Point3f, Vec3u};

/// Fixed-capacity append-only storage shared across threads.
///
/// Cells are written only while holding the tessellation's growth mutex
/// and only at indices that no reader has been told about yet; once an
/// index is published (release-store of a subdivision id or a counter
/// read under the mutex) its cell is never written again.
struct SharedSlab<T> {
    cells: Box<[UnsafeCell<T>]>,
}

// Readers only access published (immutable-from-now-on) cells.
unsafe impl<T: Send + Sync> Sync for SharedSlab<T> {}

impl<T: Copy + Default> SharedSlab<T> {
    fn new(len: usize) -> Self {
        Self { cells: (0..len).map(|_| UnsafeCell::new(T::default())).collect() }
    }

    fn len(&self) -> usize {
        self.cells.len()
    }

    /// SAFETY: caller must hold the growth mutex and `idx` must not have
    /// been published to any reader.
    unsafe fn write(&self, idx: usize, value: T) {
        *self.cells[idx].get() = value;
    }

    /// SAFETY: caller must have observed the publication of `idx`.
    unsafe fn read(&self, idx: usize) -> T {
        *self.cells[idx].get()
    }
}

struct Growth {
    /// (low vertex id, high vertex id) -> midpoint vertex id, shared
    /// across adjacent faces so edges are split exactly once.
    midpoint_cache: HashMap<(u32, u32), u32>,
    num_vertices: u32,
    num_faces: u32,
}

/// A base mesh plus overflow storage for up to `face_budget` face
/// subdivisions. Face and vertex ids live in a combined space: ids below
/// the base counts refer to the base mesh, ids above index the slabs.
pub struct DynamicTessellation {
    base: Arc<Mesh>,
    vertices_extra: SharedSlab<Point3f>,
    faces_extra: SharedSlab<Vec3u>,
    /// Per face id: 0 if not subdivided, else the combined base id of its
    /// four replacement faces. Written only under the growth mutex.
    subdivisions: Box<[AtomicU32]>,
    growth: Mutex<Growth>,
}

impl DynamicTessellation {
    pub fn new(base: Arc<Mesh>, face_budget: u32) -> Self {
        let budget = face_budget as usize;
        let num_slots = base.triangles.len() + 4 * budget;
        let subdivisions = (0..num_slots).map(|_| AtomicU32::new(0)).collect();
        Self {
            vertices_extra: SharedSlab::new(3 * budget),
            faces_extra: SharedSlab::new(4 * budget),
            subdivisions,
            growth: Mutex::new(Growth {
                midpoint_cache: HashMap::with_capacity(3 * budget),
                num_vertices: 0,
                num_faces: 0,
            }),
            base,
        }
    }

    pub fn base(&self) -> &Mesh {
        &self.base
    }

    fn num_base_faces(&self) -> u32 {
        self.base.triangles.len() as u32
    }

    fn num_base_vertices(&self) -> u32 {
        self.base.vertices.len() as u32
    }

    pub fn is_subdivided(&self, face_id: u32) -> bool {
        self.subdivision_of(face_id) != 0
    }

    /// Combined base id of the four replacement faces, 0 for leaves.
    pub fn subdivision_of(&self, face_id: u32) -> u32 {
        self.subdivisions[face_id as usize].load(Ordering::Acquire)
    }

    /// Vertex ids of a face in the combined id space. The id must come
    /// from the base mesh or from a published subdivision.
    pub fn face(&self, id: u32) -> Vec3u {
        if id < self.num_base_faces() {
            self.base.triangles[id as usize]
        } else {
            // SAFETY: published face ids index fully-written cells.
            unsafe { self.faces_extra.read((id - self.num_base_faces()) as usize) }
        }
    }

    /// Position of a vertex in the combined id space.
    pub fn vertex(&self, id: u32) -> Point3f {
        if id < self.num_base_vertices() {
            self.base.vertices[id as usize]
        } else {
            // SAFETY: vertex ids reachable from published faces are
            // fully written before publication.
            unsafe { self.vertices_extra.read((id - self.num_base_vertices()) as usize) }
        }
    }

    /// Total face count including faces replaced by further subdivision.
    pub fn num_faces(&self) -> u32 {
        self.num_base_faces() + self.growth.lock().num_faces
    }

    pub fn num_vertices(&self) -> u32 {
        self.num_base_vertices() + self.growth.lock().num_vertices
    }

    /// Upper bound of the combined face id space (slab capacity included).
    pub fn max_num_faces(&self) -> u32 {
        self.num_base_faces() + self.faces_extra.len() as u32
    }

    /// Splits `face` into four by connecting its edge midpoints. Returns
    /// the combined base id of the four children `[near a, near b,
    /// near c, center]`, or 0 when the capacity budget is exhausted.
    /// Calling it again for an already-subdivided face returns the
    /// existing children without mutating anything.
    pub fn subdivide_face(&self, face: u32) -> u32 {
        let mut growth = self.growth.lock();

        // rendezvous with a subdivision some other thread already did
        let existing = self.subdivisions[face as usize].load(Ordering::Relaxed);
        if existing != 0 {
            return existing;
        }

        let sub = growth.num_faces;
        if sub as usize + 4 > self.faces_extra.len()
            || growth.num_vertices as usize + 3 > self.vertices_extra.len()
        {
            return 0;
        }

        let ids = self.face(face);

        // midpoints sit opposite the original face's vertices
        let mid_a = self.create_midpoint(&mut growth, ids.y, ids.z);
        let mid_b = self.create_midpoint(&mut growth, ids.z, ids.x);
        let mid_c = self.create_midpoint(&mut growth, ids.x, ids.y);

        // All children wind counter-clockwise to preserve the up-vector.
        // The order is load-bearing: child i is opposite vertex i of the
        // parent, child 3 is the center triangle; the descent in
        // tessellated_face relies on it.
        // SAFETY: sub..sub+4 lie beyond the published face count and the
        // growth mutex is held.
        unsafe {
            self.faces_extra.write(sub as usize, Vec3u::new(ids.x, mid_c, mid_b));
            self.faces_extra.write(sub as usize + 1, Vec3u::new(ids.y, mid_a, mid_c));
            self.faces_extra.write(sub as usize + 2, Vec3u::new(ids.z, mid_b, mid_a));
            self.faces_extra.write(sub as usize + 3, Vec3u::new(mid_a, mid_b, mid_c));
        }

        growth.num_faces += 4;

        let sub = sub + self.num_base_faces();

        // publish: everything above happens-before this store
        self.subdivisions[face as usize].store(sub, Ordering::Release);

        sub
    }

    /// Looks up or creates the vertex in the middle of `vertex_a` and
    /// `vertex_b`. Must be called with the growth mutex held.
    fn create_midpoint(&self, growth: &mut Growth, vertex_a: u32, vertex_b: u32) -> u32 {
        let key = (vertex_a.min(vertex_b), vertex_a.max(vertex_b));
        if let Some(&mid) = growth.midpoint_cache.get(&key) {
            return mid;
        }

        let a = self.vertex(vertex_a);
        let b = self.vertex(vertex_b);

        let mid_index = growth.num_vertices;
        // SAFETY: mid_index is beyond the published vertex count and the
        // growth mutex is held.
        unsafe {
            self.vertices_extra.write(mid_index as usize, Point3f::midpoint(a, b));
        }
        growth.num_vertices += 1;

        let mid_index = mid_index + self.num_base_vertices();
        growth.midpoint_cache.insert(key, mid_index);
        mid_index
    }

    /// Descends from `face` to the leaf whose triangle contains `p`.
    ///
    /// At each level the three signed areas of `p` against the center
    /// child select one of the four children; winding is guaranteed
    /// counter-clockwise by construction, so the face up-vector keeps a
    /// consistent orientation throughout the descent.
    pub fn tessellated_face(&self, p: Point3f, mut face: u32) -> u32 {
        let p = p.to_vec3();
        loop {
            let sub = self.subdivision_of(face);
            if sub == 0 {
                return face;
            }

            // vertices of the center child
            let ids = self.face(sub + 3);
            let a = self.vertex(ids.x).to_vec3();
            let b = self.vertex(ids.y).to_vec3();
            let c = self.vertex(ids.z).to_vec3();

            let ab = b - a;
            let ac = c - a;
            let up = ab.cross(ac);
            let ap = p - a;

            let cross_b = ap.cross(ac);
            let cross_c = ab.cross(ap);

            if up.dot(cross_b) < 0.0 {
                // outside near b: ap is left of ac
                face = sub + 1;
            } else if up.dot(cross_c) < 0.0 {
                // outside near c: ap is right of ab
                face = sub + 2;
            } else if cross_b.length() + cross_c.length() > up.length() {
                // the two sub-areas exceed the whole triangle, so p can
                // only be outside near a
                face = sub;
            } else {
                face = sub + 3;
            }
        }
    }

    /// Dense vertex array of the refined mesh: base vertices followed by
    /// the used prefix of the overflow slab.
    pub fn compute_tessellated_vertices(&self) -> Vec<Point3f> {
        let num_extra = self.growth.lock().num_vertices;
        let mut combined = Vec::with_capacity(self.base.vertices.len() + num_extra as usize);
        combined.extend_from_slice(&self.base.vertices);
        for i in 0..num_extra {
            // SAFETY: indices below the counter read under the mutex are
            // fully written.
            combined.push(unsafe { self.vertices_extra.read(i as usize) });
        }
        combined
    }

    /// Dense face array of the refined mesh: every leaf face in combined
    /// id order, subdivided faces replaced by their children.
    pub fn compute_tessellated_faces(&self) -> Vec<Vec3u> {
        let num_faces = self.num_faces();

        let mut num_subdivided = 0u32;
        let mut combined = Vec::with_capacity(num_faces as usize);
        for id in 0..num_faces {
            if self.is_subdivided(id) {
                num_subdivided += 1;
            } else {
                combined.push(self.face(id));
            }
        }

        // each subdivision replaces one face with four, net +3
        assert_eq!(
            combined.len(),
            (self.num_base_faces() + 3 * num_subdivided) as usize,
            "tessellated face bookkeeping is broken"
        );

        combined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Color4f;

    fn single_triangle() -> Arc<Mesh> {
        Arc::new(Mesh {
            vertices: vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            triangles: vec![Vec3u::new(0, 1, 2)],
            face_colors: Vec::new(),
            diffuse_color: Color4f::default(),
            specular_color: Color4f::default(),
            surface_area: 0.5,
        })
    }

    #[test]
    fn subdividing_one_face_adds_three_midpoints_and_four_children() {
        let tess = DynamicTessellation::new(single_triangle(), 4);
        let sub = tess.subdivide_face(0);
        assert_eq!(sub, 1); // first slab entry, offset by one base face
        assert_eq!(tess.num_faces(), 5);
        assert_eq!(tess.num_vertices(), 6);

        // center child connects the three midpoints
        let center = tess.face(sub + 3);
        assert_eq!(tess.vertex(center.z), Point3f::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn subdivision_is_idempotent() {
        let tess = DynamicTessellation::new(single_triangle(), 4);
        let first = tess.subdivide_face(0);
        let again = tess.subdivide_face(0);
        assert_eq!(first, again);
        assert_eq!(tess.num_faces(), 5);
    }

    #[test]
    fn zero_budget_never_subdivides() {
        let tess = DynamicTessellation::new(single_triangle(), 0);
        assert_eq!(tess.subdivide_face(0), 0);
        assert!(!tess.is_subdivided(0));
    }

    #[test]
    fn budget_of_one_allows_exactly_one_subdivision() {
        let tess = DynamicTessellation::new(single_triangle(), 1);
        let sub = tess.subdivide_face(0);
        assert!(sub > 0);
        // all four child slots are used up
        assert_eq!(tess.subdivide_face(sub), 0);
    }

    #[test]
    fn midpoints_are_shared_between_adjacent_faces() {
        let mesh = Arc::new(Mesh {
            vertices: vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
            ],
            triangles: vec![Vec3u::new(0, 1, 2), Vec3u::new(2, 1, 3)],
            face_colors: Vec::new(),
            diffuse_color: Color4f::default(),
            specular_color: Color4f::default(),
            surface_area: 1.0,
        });
        let tess = DynamicTessellation::new(mesh, 8);
        tess.subdivide_face(0);
        tess.subdivide_face(1);
        // edge (1,2) is shared: 3 + 3 midpoints minus the common one
        assert_eq!(tess.num_vertices(), 4 + 5);
    }

    #[test]
    fn descent_finds_the_containing_child() {
        let tess = DynamicTessellation::new(single_triangle(), 4);
        let sub = tess.subdivide_face(0);

        // near vertex a (the origin)
        assert_eq!(tess.tessellated_face(Point3f::new(0.1, 0.1, 0.0), 0), sub);
        // near vertex b
        assert_eq!(tess.tessellated_face(Point3f::new(0.8, 0.1, 0.0), 0), sub + 1);
        // near vertex c
        assert_eq!(tess.tessellated_face(Point3f::new(0.1, 0.8, 0.0), 0), sub + 2);
        // center
        assert_eq!(tess.tessellated_face(Point3f::new(0.3, 0.3, 0.0), 0), sub + 3);
    }

    #[test]
    fn leaf_extraction_replaces_subdivided_faces() {
        let tess = DynamicTessellation::new(single_triangle(), 4);
        tess.subdivide_face(0);
        let faces = tess.compute_tessellated_faces();
        assert_eq!(faces.len(), 4);
        let vertices = tess.compute_tessellated_vertices();
        assert_eq!(vertices.len(), 6);
    }
}
