//! Debug PLY export of a collected heatmap.
//!
//! Writes the refined mesh with per-vertex colors accumulated from the
//! leaf faces. Ascii mode is convenient for eyeballing small meshes,
//! binary mode matches the little-endian wire convention.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::TraceResult;
use crate::heatmap::HeatmapData;

pub fn export_ply<P: AsRef<Path>>(heatmap: &HeatmapData, path: P, ascii_mode: bool) -> TraceResult<()> {
    let vertices = heatmap.tessellation.compute_tessellated_vertices();
    let faces = heatmap.tessellation.compute_tessellated_faces();
    let values = heatmap.compute_vertex_data();

    let file = File::create(path.as_ref())?;
    let mut w = BufWriter::new(file);

    writeln!(w, "ply")?;
    if ascii_mode {
        writeln!(w, "format ascii 1.0")?;
    } else {
        writeln!(w, "format binary_little_endian 1.0")?;
    }
    writeln!(w, "element vertex {}", vertices.len())?;
    writeln!(w, "property float x")?;
    writeln!(w, "property float y")?;
    writeln!(w, "property float z")?;
    writeln!(w, "property float red")?;
    writeln!(w, "property float green")?;
    writeln!(w, "property float blue")?;
    writeln!(w, "element face {}", faces.len())?;
    writeln!(w, "property list uchar uint32 vertex_indices")?;
    writeln!(w, "end_header")?;

    for (vertex, value) in vertices.iter().zip(values.iter()) {
        if ascii_mode {
            writeln!(
                w,
                "{} {} {} {} {} {}",
                vertex.x, vertex.y, vertex.z, value.mean_r, value.mean_g, value.mean_b
            )?;
        } else {
            for comp in [vertex.x, vertex.y, vertex.z, value.mean_r, value.mean_g, value.mean_b] {
                w.write_all(&comp.to_le_bytes())?;
            }
        }
    }

    for face in &faces {
        if ascii_mode {
            writeln!(w, "3 {} {} {}", face.x, face.y, face.z)?;
        } else {
            w.write_all(&[3u8])?;
            for index in face.indices() {
                w.write_all(&index.to_le_bytes())?;
            }
        }
    }

    Ok(())
}
