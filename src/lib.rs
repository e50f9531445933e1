//! Introspection server library for Monte Carlo path tracers.
//!
//! Embedded inside a renderer, the library exposes its internals to an
//! external visualization client over a TCP connection: scene geometry,
//! camera state, rendered images and the complete sampling history of a
//! single pixel. While an image renders, per-face heatmap data can be
//! collected on adaptively refined triangle meshes.
//!
//! The embedding renderer implements [`renderer::Renderer`], records
//! through [`api::DataApi`] and hands both to [`server::TraceServer`]:
//!
//! ```no_run
//! # fn main() -> traceview::error::TraceResult<()> {
//! # struct MyRenderer;
//! # impl traceview::renderer::Renderer for MyRenderer {
//! #     fn render_image(&mut self, _: &mut traceview::api::DataApi) -> traceview::error::TraceResult<()> { Ok(()) }
//! #     fn render_pixel(&mut self, _: u32, _: u32, _: &mut traceview::api::DataApi) -> traceview::error::TraceResult<()> { Ok(()) }
//! #     fn renderer_name(&self) -> String { String::new() }
//! #     fn scene_name(&self) -> String { String::new() }
//! #     fn sample_count(&self) -> u32 { 0 }
//! #     fn set_sample_count(&mut self, _: u32) {}
//! #     fn camera(&self) -> traceview::scene::Camera { Default::default() }
//! #     fn meshes(&self) -> Vec<traceview::scene::Mesh> { Vec::new() }
//! #     fn rendered_image_path(&self) -> String { String::new() }
//! # }
//! # let mut renderer = MyRenderer;
//! use traceview::api::DataApi;
//! use traceview::server::{ServerConfig, TraceServer};
//!
//! let mut api = DataApi::new();
//! let mut server = TraceServer::new(&mut renderer, &mut api)?;
//! server.run(&ServerConfig::default())?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod error;
pub mod heatmap;
pub mod record;
pub mod renderer;
pub mod scene;
pub mod server;
pub mod stream;
pub mod types;

pub use api::DataApi;
pub use error::{TraceError, TraceResult};
pub use heatmap::HeatmapData;
pub use renderer::Renderer;
pub use scene::{Camera, Mesh, Sphere};
pub use server::{ServerConfig, TraceServer, DEFAULT_PORT};
pub use stream::ByteStream;
