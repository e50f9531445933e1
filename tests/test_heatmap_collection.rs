// tests/test_heatmap_collection.rs
// Heatmap aggregation scenarios: plain accumulation, threshold-driven
// subdivision, density mode, neighbor inpainting and weight conservation
// under concurrent sampling.

use std::sync::Arc;

use traceview::heatmap::{HeatmapData, IncrementalMean};
use traceview::scene::Mesh;
use traceview::types::{Color4f, Point3f, Vec3u};

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

fn two_triangles() -> Arc<Mesh> {
    Arc::new(Mesh {
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
    })
}

fn total_weight(face_data: &[IncrementalMean]) -> f32 {
    face_data.iter().map(|d| d.weight).sum()
}

#[test]
fn single_sample_without_subdivision() {
    let heatmap = HeatmapData::new(single_triangle(), 0);
    heatmap.add_sample(Point3f::new(0.3, 0.3, 0.0), 0, 1.0, 0.0, 0.0, 1.0);
    heatmap.finalize(false);

    let face_data = heatmap.compute_face_data();
    assert_eq!(face_data.len(), 1);
    assert_eq!(face_data[0], IncrementalMean::new(1.0, 0.0, 0.0, 1.0));
}

#[test]
fn crossing_the_sample_threshold_subdivides_the_face() {
    let heatmap = HeatmapData::new(single_triangle(), 1);
    for _ in 0..300 {
        heatmap.add_sample(Point3f::new(0.3, 0.3, 0.0), 0, 1.0, 1.0, 1.0, 1.0);
    }

    assert!(heatmap.tessellation.is_subdivided(0), "257 samples must trigger a subdivision");

    heatmap.finalize(false);
    let face_data = heatmap.compute_face_data();
    assert_eq!(face_data.len(), 4);

    let sum = total_weight(&face_data);
    assert!(
        (sum - 300.0).abs() / 300.0 < 1e-3,
        "leaf weights must sum to the input weight, got {sum}"
    );
    // values were all white, so every leaf mean stays white
    for data in &face_data {
        assert!((data.mean_r - 1.0).abs() < 1e-5);
    }
}

#[test]
fn proportional_redistribution_follows_the_children() {
    let heatmap = HeatmapData::new(single_triangle(), 1);
    // push the parent over the threshold, then spread further samples
    // unevenly: most of them land in the child near vertex b
    for _ in 0..257 {
        heatmap.add_sample(Point3f::new(0.3, 0.3, 0.0), 0, 1.0, 1.0, 1.0, 1.0);
    }
    for _ in 0..300 {
        heatmap.add_sample(Point3f::new(0.9, 0.05, 0.0), 0, 1.0, 1.0, 1.0, 1.0);
    }
    for point in [
        Point3f::new(0.05, 0.05, 0.0), // near a
        Point3f::new(0.05, 0.9, 0.0),  // near c
        Point3f::new(0.3, 0.3, 0.0),   // center
    ] {
        for _ in 0..20 {
            heatmap.add_sample(point, 0, 1.0, 1.0, 1.0, 1.0);
        }
    }

    heatmap.finalize(false);
    let face_data = heatmap.compute_face_data();
    assert_eq!(face_data.len(), 4);

    // 257 + 300 + 3 * 20 samples, no empty leaf so nothing is inpainted
    let sum = total_weight(&face_data);
    assert!((sum - 617.0).abs() / 617.0 < 1e-3, "expected 617 total weight, got {sum}");

    // children order: near a, near b, near c, center -- the b child saw
    // most post-split samples and must keep the biggest share
    let max_weight = face_data.iter().map(|d| d.weight).fold(0.0f32, f32::max);
    assert_eq!(face_data[1].weight, max_weight);
    assert!(face_data[1].weight > 300.0);
}

#[test]
fn density_mode_replaces_means_by_samples_per_area() {
    let heatmap = HeatmapData::new(single_triangle(), 0);
    for _ in 0..10 {
        heatmap.add_sample(Point3f::new(0.25, 0.25, 0.0), 0, 0.3, 0.7, 0.1, 1.0);
    }
    heatmap.finalize(true);

    let face_data = heatmap.compute_face_data();
    assert_eq!(face_data.len(), 1);
    // triangle area is 0.5 => density 10 / 0.5 = 20 on all channels
    assert!((face_data[0].mean_r - 20.0).abs() < 1e-4);
    assert_eq!(face_data[0].mean_r, face_data[0].mean_g);
    assert_eq!(face_data[0].mean_g, face_data[0].mean_b);
    assert_eq!(face_data[0].weight, 1.0);
}

#[test]
fn empty_faces_inherit_a_damped_neighbor_estimate() {
    let heatmap = HeatmapData::new(two_triangles(), 0);
    heatmap.add_sample(Point3f::new(0.2, 0.2, 0.0), 0, 1.0, 0.0, 0.0, 1.0);
    heatmap.finalize(false);

    let face_data = heatmap.compute_face_data();
    assert_eq!(face_data.len(), 2);

    // face 1 never saw a sample but shares vertices with face 0
    assert!(face_data[1].mean_r > 0.0, "inpainting must fill the empty face");
    assert_eq!(face_data[1].mean_g, 0.0);
    assert!(face_data[1].weight <= 1.0 / 32.0 + 1e-6);
    // the real data is untouched
    assert_eq!(face_data[0], IncrementalMean::new(1.0, 0.0, 0.0, 1.0));
}

#[test]
fn without_any_data_nothing_is_inpainted() {
    let heatmap = HeatmapData::new(two_triangles(), 0);
    heatmap.finalize(false);
    let face_data = heatmap.compute_face_data();
    assert_eq!(face_data.len(), 2);
    assert!(face_data.iter().all(|d| d.weight == 0.0));
}

#[test]
fn concurrent_sampling_conserves_the_total_weight() {
    let heatmap = HeatmapData::new(two_triangles(), 64);
    let num_threads = 8;
    let samples_per_thread = 4000;

    std::thread::scope(|scope| {
        for t in 0..num_threads {
            let heatmap = &heatmap;
            scope.spawn(move || {
                for i in 0..samples_per_thread {
                    // deterministic but scattered positions
                    let n = t * samples_per_thread + i;
                    let u = (n % 89) as f32 / 89.0;
                    let v = (n % 97) as f32 / 97.0;
                    if u + v < 1.0 {
                        heatmap.add_sample(Point3f::new(u, v, 0.0), 0, 0.5, 0.5, 0.5, 1.0);
                    } else {
                        heatmap.add_sample(Point3f::new(u, v, 0.0), 1, 0.5, 0.5, 0.5, 1.0);
                    }
                }
            });
        }
    });

    heatmap.finalize(false);

    // sum the raw leaf slots: inpainting must not distort this check
    let expected = (num_threads * samples_per_thread) as f32;
    let sum: f32 = (0..heatmap.tessellation.num_faces())
        .filter(|&i| !heatmap.tessellation.is_subdivided(i))
        .map(|i| heatmap.face_data()[i as usize].load().weight)
        .sum();
    assert!(
        (sum - expected).abs() / expected < 1e-3,
        "expected a total weight of {expected}, got {sum}"
    );
}

#[test]
fn ply_export_writes_the_refined_mesh() {
    let heatmap = HeatmapData::new(single_triangle(), 4);
    for _ in 0..300 {
        heatmap.add_sample(Point3f::new(0.3, 0.3, 0.0), 0, 1.0, 0.5, 0.25, 1.0);
    }
    heatmap.finalize(false);

    let path = std::env::temp_dir().join("traceview_heatmap_test.ply");
    traceview::heatmap::ply::export_ply(&heatmap, &path, true).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert!(contents.starts_with("ply\nformat ascii 1.0\n"));
    // one subdivision: 6 vertices, 4 leaf faces
    assert!(contents.contains("element vertex 6"));
    assert!(contents.contains("element face 4"));
    assert!(contents.lines().last().unwrap().starts_with('3'));
}

#[test]
fn subdivided_parents_are_never_emitted() {
    let heatmap = HeatmapData::new(single_triangle(), 8);
    for _ in 0..600 {
        heatmap.add_sample(Point3f::new(0.3, 0.3, 0.0), 0, 1.0, 1.0, 1.0, 1.0);
    }
    heatmap.finalize(false);

    let num_subdivided = (0..heatmap.tessellation.num_faces())
        .filter(|&i| heatmap.tessellation.is_subdivided(i))
        .count();
    assert!(num_subdivided >= 1);

    let face_data = heatmap.compute_face_data();
    let num_leaves = heatmap.tessellation.num_faces() as usize - num_subdivided;
    assert_eq!(face_data.len(), num_leaves);
}
