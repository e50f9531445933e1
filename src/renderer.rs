//! Contract between the session engine and the embedding renderer.
//!
//! The engine never renders anything itself; it asks the renderer to and
//! serves the results. Implementations are expected to route per-sample
//! events into the DataApi they are handed during render calls.

use crate::api::DataApi;
use crate::error::TraceResult;
use crate::scene::{Camera, Mesh};

pub trait Renderer: Send {
    /// Renders the full image at the configured sample count. The
    /// renderer's preprocessing decides whether heatmap collection is
    /// enabled for this render.
    fn render_image(&mut self, api: &mut DataApi) -> TraceResult<()>;

    /// Re-renders a single pixel, recording the complete sampling
    /// history through the api's cursor interface.
    fn render_pixel(&mut self, x: u32, y: u32, api: &mut DataApi) -> TraceResult<()>;

    fn renderer_name(&self) -> String;
    fn scene_name(&self) -> String;

    fn sample_count(&self) -> u32;
    fn set_sample_count(&mut self, sample_count: u32);

    fn camera(&self) -> Camera;
    fn meshes(&self) -> Vec<Mesh>;

    /// Filesystem path of the last rendered image, shared with a local
    /// client instead of transferring pixels.
    fn rendered_image_path(&self) -> String;
}
