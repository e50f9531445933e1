// src/types.rs
// Wire-layout value types shared by the scene model, the sample records
// and the heatmap. All types are #[repr(C)] and Pod so contiguous arrays
// of them can be written to the client as raw little-endian bytes.
// RELEVANT FILES:src/scene.rs,src/stream/mod.rs,src/heatmap/tessellation.rs

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// World-space position, three floats in x,y,z order on the wire.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Point3f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3f {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Midpoint of the segment a-b, used when splitting triangle edges.
    pub fn midpoint(a: Point3f, b: Point3f) -> Point3f {
        Point3f::new((a.x + b.x) * 0.5, (a.y + b.y) * 0.5, (a.z + b.z) * 0.5)
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// Direction vector, three floats in x,y,z order on the wire.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vec3f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3f {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// Triangle as three vertex indices, counter-clockwise winding.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Vec3u {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Vec3u {
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    pub fn indices(self) -> [u32; 3] {
        [self.x, self.y, self.z]
    }
}

/// RGB color, used for per-face colors (three floats each on the wire).
/// Material colors carry an explicit alpha channel instead, see Color4f.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Color3f {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color3f {
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

/// RGBA color, four floats on the wire. The client currently ignores the
/// alpha channel but the layout reserves it.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Color4f {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color4f {
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}
