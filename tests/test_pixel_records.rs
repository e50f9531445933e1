// tests/test_pixel_records.rs
// DataApi recording and serialization as seen by the client: active-path
// counting, record layout and the collection gate.

use traceview::api::DataApi;
use traceview::record::PathData;
use traceview::stream::{ByteStream, MemoryStream};
use traceview::types::{Color4f, Point3f};

fn record_two_samples(api: &mut DataApi) {
    api.enable();
    for sample in 0..2u32 {
        api.set_sample_idx(sample);
        api.set_path_origin(Point3f::new(5.0, 7.0, 0.0));
        api.add_path_data("sampler", "independent");

        api.set_depth_idx(0);
        api.set_intersection_pos(Point3f::new(0.0, 0.0, -3.0));
        api.set_intersection_estimate(Color4f::new(0.25, 0.5, 0.75, 1.0));
        api.add_intersection_data("bsdf_pdf", 0.4f32);

        api.set_final_estimate(Color4f::new(0.1, 0.2, 0.3, 1.0));
    }
    api.disable();
}

#[test]
fn serialized_api_decodes_to_the_recorded_paths() {
    let mut api = DataApi::new();
    record_two_samples(&mut api);

    let mut stream = MemoryStream::new();
    api.serialize(&mut stream).unwrap();

    let num_paths = stream.read_u32().unwrap();
    assert_eq!(num_paths, 2);

    for expected_sample in 0..2u32 {
        let path = PathData::deserialize(&mut stream).unwrap();
        assert_eq!(path.sample_idx(), expected_sample);
        assert_eq!(path.path_origin(), Point3f::new(5.0, 7.0, 0.0));
        assert_eq!(path.final_estimate(), Some(Color4f::new(0.1, 0.2, 0.3, 1.0)));
        assert_eq!(path.path_depth(), 0);

        let active: Vec<_> = path.intersections().iter().filter(|i| i.is_active()).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].pos(), Some(Point3f::new(0.0, 0.0, -3.0)));
        assert_eq!(active[0].estimate(), Some(Color4f::new(0.25, 0.5, 0.75, 1.0)));
    }
    assert_eq!(stream.remaining(), 0);
}

#[test]
fn sparse_samples_serialize_only_active_paths() {
    let mut api = DataApi::new();
    api.enable();
    // samples 0 and 1 exist as padding, only 2 is active
    api.set_sample_idx(2);
    api.set_path_origin(Point3f::new(1.0, 1.0, 1.0));
    api.disable();

    let mut stream = MemoryStream::new();
    api.serialize(&mut stream).unwrap();

    assert_eq!(stream.read_u32().unwrap(), 1);
    let path = PathData::deserialize(&mut stream).unwrap();
    assert_eq!(path.sample_idx(), 2);
    assert_eq!(stream.remaining(), 0);
}

#[test]
fn clearing_drops_recorded_paths() {
    let mut api = DataApi::new();
    record_two_samples(&mut api);
    api.clear();

    let mut stream = MemoryStream::new();
    api.serialize(&mut stream).unwrap();
    assert_eq!(stream.read_u32().unwrap(), 0);
    assert_eq!(stream.remaining(), 0);
}

#[test]
fn nothing_is_recorded_while_collection_is_disabled() {
    let mut api = DataApi::new();
    // no enable() call
    api.set_sample_idx(0);
    api.set_path_origin(Point3f::new(5.0, 7.0, 0.0));
    api.add_path_data("ignored", 1i32);

    let mut stream = MemoryStream::new();
    api.serialize(&mut stream).unwrap();
    assert_eq!(stream.read_u32().unwrap(), 0);
}
