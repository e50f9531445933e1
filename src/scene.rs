// src/scene.rs
// Camera and shape value types with fixed wire layouts, shared between
// the renderer-facing API and the session engine. Deserializers exist for
// the client side of the protocol (tests and tooling).
// RELEVANT FILES:src/stream/mod.rs,src/heatmap/mod.rs,src/server/mod.rs

use crate::error::{TraceError, TraceResult};
use crate::stream::ByteStream;
use crate::types::{Color3f, Color4f, Point3f, Vec3f, Vec3u};

/// Shape tags understood by the visualization client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum ShapeType {
    TriangleMesh = 0,
    Sphere = 1,
}

/// Pinhole camera state of the current render.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Camera {
    pub origin: Point3f,
    pub direction: Vec3f,
    pub up: Vec3f,
    pub near_clip: f32,
    pub far_clip: f32,
    pub fov: f32,
}

impl Camera {
    pub fn serialize(&self, stream: &mut dyn ByteStream) -> TraceResult<()> {
        stream.write_f32_array(&[self.origin.x, self.origin.y, self.origin.z])?;
        stream.write_f32_array(&[self.direction.x, self.direction.y, self.direction.z])?;
        stream.write_f32_array(&[self.up.x, self.up.y, self.up.z])?;
        stream.write_f32(self.near_clip)?;
        stream.write_f32(self.far_clip)?;
        stream.write_f32(self.fov)
    }

    pub fn deserialize(stream: &mut dyn ByteStream) -> TraceResult<Camera> {
        Ok(Camera {
            origin: Point3f::new(stream.read_f32()?, stream.read_f32()?, stream.read_f32()?),
            direction: Vec3f::new(stream.read_f32()?, stream.read_f32()?, stream.read_f32()?),
            up: Vec3f::new(stream.read_f32()?, stream.read_f32()?, stream.read_f32()?),
            near_clip: stream.read_f32()?,
            far_clip: stream.read_f32()?,
            fov: stream.read_f32()?,
        })
    }
}

/// Triangle mesh as transferred to the client.
///
/// `face_colors` is either empty or carries exactly one color per
/// triangle. `surface_area` never goes over the wire; it exists so the
/// embedding renderer can budget heatmap subdivision per mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Point3f>,
    pub triangles: Vec<Vec3u>,
    pub face_colors: Vec<Color3f>,
    pub diffuse_color: Color4f,
    pub specular_color: Color4f,
    pub surface_area: f32,
}

impl Mesh {
    pub fn serialize(&self, stream: &mut dyn ByteStream) -> TraceResult<()> {
        if !self.face_colors.is_empty() && self.face_colors.len() != self.triangles.len() {
            return Err(TraceError::invalid(
                "the number of face colors does not match the number of faces",
            ));
        }

        stream.write_i16(ShapeType::TriangleMesh as i16)?;
        stream.write_u32(self.vertices.len() as u32)?;
        stream.write_f32_array(bytemuck::cast_slice(&self.vertices))?;
        stream.write_u32(self.triangles.len() as u32)?;
        stream.write_u32_array(bytemuck::cast_slice(&self.triangles))?;
        stream.write_u32(self.face_colors.len() as u32)?;
        stream.write_f32_array(bytemuck::cast_slice(&self.face_colors))?;
        stream.write_f32_array(&[
            self.diffuse_color.r,
            self.diffuse_color.g,
            self.diffuse_color.b,
            self.diffuse_color.a,
        ])?;
        stream.write_f32_array(&[
            self.specular_color.r,
            self.specular_color.g,
            self.specular_color.b,
            self.specular_color.a,
        ])
    }

    pub fn deserialize(stream: &mut dyn ByteStream) -> TraceResult<Mesh> {
        let shape = stream.read_i16()?;
        if shape != ShapeType::TriangleMesh as i16 {
            return Err(TraceError::protocol(format!(
                "expected a triangle mesh, got shape type {shape}"
            )));
        }

        let num_vertices = stream.read_u32()? as usize;
        let mut vertices = Vec::with_capacity(num_vertices);
        for _ in 0..num_vertices {
            vertices.push(Point3f::new(stream.read_f32()?, stream.read_f32()?, stream.read_f32()?));
        }

        let num_triangles = stream.read_u32()? as usize;
        let mut triangles = Vec::with_capacity(num_triangles);
        for _ in 0..num_triangles {
            triangles.push(Vec3u::new(stream.read_u32()?, stream.read_u32()?, stream.read_u32()?));
        }

        let num_colors = stream.read_u32()? as usize;
        let mut face_colors = Vec::with_capacity(num_colors);
        for _ in 0..num_colors {
            face_colors.push(Color3f::new(stream.read_f32()?, stream.read_f32()?, stream.read_f32()?));
        }

        let diffuse_color = Color4f::new(
            stream.read_f32()?,
            stream.read_f32()?,
            stream.read_f32()?,
            stream.read_f32()?,
        );
        let specular_color = Color4f::new(
            stream.read_f32()?,
            stream.read_f32()?,
            stream.read_f32()?,
            stream.read_f32()?,
        );

        Ok(Mesh {
            vertices,
            triangles,
            face_colors,
            diffuse_color,
            specular_color,
            surface_area: 0.0,
        })
    }

    /// Sum of the triangle areas; meshes loaded from a renderer usually
    /// carry this precomputed, the helper exists for tests and tools.
    pub fn compute_surface_area(&self) -> f32 {
        self.triangles
            .iter()
            .map(|tri| {
                let a = self.vertices[tri.x as usize].to_vec3();
                let b = self.vertices[tri.y as usize].to_vec3();
                let c = self.vertices[tri.z as usize].to_vec3();
                (b - a).cross(c - a).length() * 0.5
            })
            .sum()
    }
}

/// Analytic sphere shape, transferred as center and radius.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sphere {
    pub center: Point3f,
    pub radius: f32,
    pub diffuse_color: Color4f,
    pub specular_color: Color4f,
}

impl Sphere {
    pub fn serialize(&self, stream: &mut dyn ByteStream) -> TraceResult<()> {
        stream.write_i16(ShapeType::Sphere as i16)?;
        stream.write_f32(self.radius)?;
        stream.write_f32_array(&[self.center.x, self.center.y, self.center.z])?;
        stream.write_f32_array(&[
            self.diffuse_color.r,
            self.diffuse_color.g,
            self.diffuse_color.b,
            self.diffuse_color.a,
        ])?;
        stream.write_f32_array(&[
            self.specular_color.r,
            self.specular_color.g,
            self.specular_color.b,
            self.specular_color.a,
        ])
    }
}
