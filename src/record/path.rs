// src/record/path.rs
// Sampling history of a single pixel: one PathData per sample index, one
// IntersectionData per path depth. Slots exist eagerly (the intersection
// list is indexed by depth) but only become active once their index is
// set; inactive slots are skipped during serialization.

use crate::error::TraceResult;
use crate::record::{UserData, UserValue};
use crate::stream::ByteStream;
use crate::types::{Color4f, Point3f};

/// Reserved index meaning "slot is present but not enabled".
pub const INDEX_SENTINEL: u32 = u32::MAX;

/// Data recorded at one path vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionData {
    pub data: UserData,
    depth_idx: u32,
    pos: Option<Point3f>,
    /// Next-event-estimation target plus its visibility.
    pos_ne: Option<(Point3f, bool)>,
    estimate: Option<Color4f>,
    emission: Option<Color4f>,
}

impl Default for IntersectionData {
    fn default() -> Self {
        Self {
            data: UserData::default(),
            depth_idx: INDEX_SENTINEL,
            pos: None,
            pos_ne: None,
            estimate: None,
            emission: None,
        }
    }
}

impl IntersectionData {
    pub fn depth_idx(&self) -> u32 {
        self.depth_idx
    }

    pub fn is_active(&self) -> bool {
        self.depth_idx != INDEX_SENTINEL
    }

    pub fn set_pos(&mut self, pos: Point3f) {
        self.pos = Some(pos);
    }

    pub fn set_next_event_estimation(&mut self, pos: Point3f, visible: bool) {
        self.pos_ne = Some((pos, visible));
    }

    pub fn set_estimate(&mut self, estimate: Color4f) {
        self.estimate = Some(estimate);
    }

    pub fn set_emission(&mut self, emission: Color4f) {
        self.emission = Some(emission);
    }

    pub fn pos(&self) -> Option<Point3f> {
        self.pos
    }

    pub fn estimate(&self) -> Option<Color4f> {
        self.estimate
    }

    pub fn add(&mut self, label: impl Into<String>, value: impl Into<UserValue>) {
        self.data.add(label, value);
    }

    pub fn serialize(&self, stream: &mut dyn ByteStream) -> TraceResult<()> {
        self.data.serialize(stream)?;

        stream.write_u32(self.depth_idx)?;

        stream.write_bool(self.pos.is_some())?;
        if let Some(pos) = self.pos {
            stream.write_f32_array(&[pos.x, pos.y, pos.z])?;
        }

        stream.write_bool(self.pos_ne.is_some())?;
        if let Some((pos, visible)) = self.pos_ne {
            stream.write_f32_array(&[pos.x, pos.y, pos.z])?;
            stream.write_bool(visible)?;
        }

        stream.write_bool(self.estimate.is_some())?;
        if let Some(estimate) = self.estimate {
            stream.write_f32_array(&[estimate.r, estimate.g, estimate.b, estimate.a])?;
        }

        stream.write_bool(self.emission.is_some())?;
        if let Some(emission) = self.emission {
            stream.write_f32_array(&[emission.r, emission.g, emission.b, emission.a])?;
        }

        Ok(())
    }

    pub fn deserialize(stream: &mut dyn ByteStream) -> TraceResult<IntersectionData> {
        let data = UserData::deserialize(stream)?;
        let depth_idx = stream.read_u32()?;

        let pos = if stream.read_bool()? {
            Some(Point3f::new(stream.read_f32()?, stream.read_f32()?, stream.read_f32()?))
        } else {
            None
        };
        let pos_ne = if stream.read_bool()? {
            let p = Point3f::new(stream.read_f32()?, stream.read_f32()?, stream.read_f32()?);
            let visible = stream.read_bool()?;
            Some((p, visible))
        } else {
            None
        };
        let estimate = if stream.read_bool()? {
            Some(Color4f::new(
                stream.read_f32()?,
                stream.read_f32()?,
                stream.read_f32()?,
                stream.read_f32()?,
            ))
        } else {
            None
        };
        let emission = if stream.read_bool()? {
            Some(Color4f::new(
                stream.read_f32()?,
                stream.read_f32()?,
                stream.read_f32()?,
                stream.read_f32()?,
            ))
        } else {
            None
        };

        Ok(IntersectionData { data, depth_idx, pos, pos_ne, estimate, emission })
    }
}

/// One light path, indexed by sample id within the pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct PathData {
    pub data: UserData,
    sample_idx: u32,
    path_depth: u32,
    path_origin: Point3f,
    final_estimate: Option<Color4f>,
    intersections: Vec<IntersectionData>,
}

impl Default for PathData {
    fn default() -> Self {
        Self {
            data: UserData::default(),
            sample_idx: INDEX_SENTINEL,
            path_depth: INDEX_SENTINEL,
            path_origin: Point3f::default(),
            final_estimate: None,
            intersections: Vec::new(),
        }
    }
}

impl PathData {
    pub fn sample_idx(&self) -> u32 {
        self.sample_idx
    }

    pub fn is_active(&self) -> bool {
        self.sample_idx != INDEX_SENTINEL
    }

    pub(crate) fn activate(&mut self, sample_idx: u32) {
        self.sample_idx = sample_idx;
    }

    /// Highest depth index that was ever set on this path.
    pub fn path_depth(&self) -> u32 {
        self.path_depth
    }

    pub fn path_origin(&self) -> Point3f {
        self.path_origin
    }

    pub fn final_estimate(&self) -> Option<Color4f> {
        self.final_estimate
    }

    /// Grows the intersection list to cover `depth_idx` and activates the
    /// slot. Depths may be set out of order; `path_depth` tracks the max.
    pub fn set_depth_idx(&mut self, depth_idx: u32) {
        let needed = depth_idx as usize + 1;
        if needed > self.intersections.len() {
            self.intersections.resize_with(needed, IntersectionData::default);
            self.path_depth = depth_idx;
        }
        self.intersections[depth_idx as usize].depth_idx = depth_idx;
    }

    pub fn set_path_origin(&mut self, origin: Point3f) {
        self.path_origin = origin;
    }

    pub fn set_final_estimate(&mut self, estimate: Color4f) {
        self.final_estimate = Some(estimate);
    }

    pub fn intersection_at(&mut self, depth_idx: u32) -> &mut IntersectionData {
        &mut self.intersections[depth_idx as usize]
    }

    pub fn intersections(&self) -> &[IntersectionData] {
        &self.intersections
    }

    pub fn serialize(&self, stream: &mut dyn ByteStream) -> TraceResult<()> {
        self.data.serialize(stream)?;

        stream.write_u32(self.sample_idx)?;
        stream.write_u32(self.path_depth)?;
        stream.write_f32_array(&[self.path_origin.x, self.path_origin.y, self.path_origin.z])?;

        stream.write_bool(self.final_estimate.is_some())?;
        if let Some(estimate) = self.final_estimate {
            stream.write_f32_array(&[estimate.r, estimate.g, estimate.b, estimate.a])?;
        }

        let num_active = self.intersections.iter().filter(|i| i.is_active()).count();
        stream.write_u32(num_active as u32)?;
        for intersection in self.intersections.iter().filter(|i| i.is_active()) {
            intersection.serialize(stream)?;
        }
        Ok(())
    }

    pub fn deserialize(stream: &mut dyn ByteStream) -> TraceResult<PathData> {
        let data = UserData::deserialize(stream)?;
        let sample_idx = stream.read_u32()?;
        let path_depth = stream.read_u32()?;
        let path_origin = Point3f::new(stream.read_f32()?, stream.read_f32()?, stream.read_f32()?);
        let final_estimate = if stream.read_bool()? {
            Some(Color4f::new(
                stream.read_f32()?,
                stream.read_f32()?,
                stream.read_f32()?,
                stream.read_f32()?,
            ))
        } else {
            None
        };

        let num_active = stream.read_u32()?;
        let mut intersections: Vec<IntersectionData> = Vec::new();
        for _ in 0..num_active {
            let intersection = IntersectionData::deserialize(stream)?;
            let slot = intersection.depth_idx as usize;
            if slot >= intersections.len() {
                intersections.resize_with(slot + 1, IntersectionData::default);
            }
            intersections[slot] = intersection;
        }

        Ok(PathData {
            data,
            sample_idx,
            path_depth,
            path_origin,
            final_estimate,
            intersections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;

    #[test]
    fn only_active_intersections_are_emitted() {
        let mut path = PathData::default();
        path.activate(0);
        path.set_depth_idx(0);
        path.set_depth_idx(2);
        path.intersection_at(0).set_pos(Point3f::new(1.0, 0.0, 0.0));

        let mut stream = MemoryStream::new();
        path.serialize(&mut stream).unwrap();
        let decoded = PathData::deserialize(&mut stream).unwrap();

        let active: Vec<u32> =
            decoded.intersections().iter().filter(|i| i.is_active()).map(|i| i.depth_idx()).collect();
        assert_eq!(active, [0, 2]);
        assert_eq!(decoded.path_depth(), 2);
        assert_eq!(stream.remaining(), 0);
    }

    #[test]
    fn path_depth_tracks_the_maximum_depth_set() {
        let mut path = PathData::default();
        path.set_depth_idx(4);
        path.set_depth_idx(1);
        assert_eq!(path.path_depth(), 4);
    }

    #[test]
    fn optional_fields_round_trip() {
        let mut path = PathData::default();
        path.activate(3);
        path.set_path_origin(Point3f::new(0.5, 0.5, 2.0));
        path.set_final_estimate(Color4f::new(0.1, 0.2, 0.3, 1.0));
        path.set_depth_idx(0);
        path.intersection_at(0).set_next_event_estimation(Point3f::new(0.0, 5.0, 0.0), false);
        path.intersection_at(0).set_emission(Color4f::new(1.0, 1.0, 1.0, 1.0));

        let mut stream = MemoryStream::new();
        path.serialize(&mut stream).unwrap();
        let decoded = PathData::deserialize(&mut stream).unwrap();
        assert_eq!(decoded, path);
    }
}
