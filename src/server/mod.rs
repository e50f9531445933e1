// src/server/mod.rs
// TCP session engine between the renderer and the visualization client.
// Single-threaded: one client at a time, lockstep request/response with
// no framing beyond the leading i16 message id. Rendering threads never
// touch the socket.
// RELEVANT FILES:src/server/message.rs,src/api/mod.rs,src/renderer.rs

pub mod message;

use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::api::DataApi;
use crate::error::{TraceError, TraceResult};
use crate::renderer::Renderer;
use crate::scene::Mesh;
use crate::server::message::Message;
use crate::stream::{ByteStream, SocketStream};

pub const DEFAULT_PORT: u16 = 50013;

/// Listen address of the session engine.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: DEFAULT_PORT }
    }
}

/// Lets another thread ask the accept loop to stop. Stopping is
/// idempotent and takes effect between sessions.
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

enum SessionEnd {
    Disconnect,
    Quit,
}

/// The server borrows the renderer and the data api; both outlive it and
/// stay usable by the embedding application afterwards.
pub struct TraceServer<'a> {
    renderer: &'a mut dyn Renderer,
    api: &'a mut DataApi,
    mesh_data: Vec<Arc<Mesh>>,
    shutdown: Arc<AtomicBool>,
}

impl<'a> TraceServer<'a> {
    /// Pulls the scene from the renderer and prepares heatmap collection
    /// structures for it.
    pub fn new(renderer: &'a mut dyn Renderer, api: &'a mut DataApi) -> TraceResult<Self> {
        let mesh_data: Vec<Arc<Mesh>> = renderer.meshes().into_iter().map(Arc::new).collect();
        api.set_shared_meshes(mesh_data.clone());
        api.heatmap.initialize(&mesh_data, &[])?;

        Ok(Self { renderer, api, mesh_data, shutdown: Arc::new(AtomicBool::new(false)) })
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle { flag: Arc::clone(&self.shutdown) }
    }

    /// Binds the listener for the given config. Bind failures are fatal.
    pub fn bind(config: &ServerConfig) -> TraceResult<TcpListener> {
        TcpListener::bind((config.host.as_str(), config.port)).map_err(|e| {
            TraceError::transport(format!(
                "failed to bind server to {}:{}: {e}",
                config.host, config.port
            ))
        })
    }

    /// Runs the accept loop until a client sends QUIT or the shutdown
    /// handle fires. Does not return while a session is in progress.
    pub fn run(&mut self, config: &ServerConfig) -> TraceResult<()> {
        let listener = Self::bind(config)?;
        self.serve(listener)
    }

    /// Accept loop over an already-bound listener (used with an OS-chosen
    /// port, where the caller needs `listener.local_addr()` first).
    pub fn serve(&mut self, listener: TcpListener) -> TraceResult<()> {
        // non-blocking accept so the shutdown flag is observed
        listener
            .set_nonblocking(true)
            .map_err(|e| TraceError::transport(format!("failed to configure listener: {e}")))?;

        log::info!("server is listening for connections on {:?}", listener.local_addr());

        while !self.shutdown.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((stream, addr)) => {
                    log::info!("client connected from {addr}");
                    // the accepted socket inherits non-blocking mode;
                    // the session wants blocking reads
                    if let Err(e) = stream.set_nonblocking(false) {
                        log::error!("failed to configure client socket: {e}");
                        continue;
                    }
                    match self.serve_client(stream) {
                        Ok(SessionEnd::Quit) => break,
                        Ok(SessionEnd::Disconnect) => {
                            log::info!("client disconnected");
                        }
                        Err(e) => log::error!("session aborted: {e}"),
                    }
                    log::info!("server is listening for connections ...");
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(e) => log::error!("accept error: {e}"),
            }
        }

        log::info!("stopped server");
        Ok(())
    }

    fn serve_client(&mut self, stream: TcpStream) -> TraceResult<SessionEnd> {
        let mut stream = SocketStream::new(stream);

        stream.write_i16(Message::Hello.id())?;
        let greeting = stream.read_i16()?;
        if greeting != Message::Hello.id() {
            return Err(TraceError::protocol(format!(
                "did not receive hello message, got 0x{greeting:04x}"
            )));
        }

        self.respond_supported_plugins(&mut stream)?;
        log::info!("handshake complete, starting data transfer");

        loop {
            let msg_id = stream.read_i16()?;
            log::debug!("received header msg 0x{msg_id:04x}");

            // plugin ids take precedence; the registry guarantees they
            // never shadow a protocol id
            if self.respond_plugin_request(&mut stream, msg_id)? {
                continue;
            }

            match Message::from_id(msg_id) {
                Some(Message::RequestRenderInfo) => {
                    isolate("render info", self.respond_render_info(&mut stream))?
                }
                Some(Message::RequestRenderImage) => {
                    isolate("render image", self.respond_render_image(&mut stream))?
                }
                Some(Message::RequestRenderPixel) => {
                    isolate("render pixel", self.respond_render_pixel(&mut stream))?
                }
                Some(Message::RequestCamera) => {
                    isolate("camera data", self.respond_camera_data(&mut stream))?
                }
                Some(Message::RequestScene) => {
                    isolate("scene data", self.respond_scene_data(&mut stream))?
                }
                Some(Message::Disconnect) => {
                    let _ = stream.write_i16(Message::Disconnect.id());
                    return Ok(SessionEnd::Disconnect);
                }
                Some(Message::Quit) => {
                    let _ = stream.write_i16(Message::Disconnect.id());
                    return Ok(SessionEnd::Quit);
                }
                _ => log::warn!("unknown message id 0x{msg_id:04x}"),
            }
        }
    }

    fn respond_supported_plugins(&mut self, stream: &mut SocketStream) -> TraceResult<()> {
        self.api.plugins.log_plugins();
        let ids = self.api.plugins.ids();
        stream.write_i16(Message::SupportedPlugins.id())?;
        stream.write_u32(ids.len() as u32)?;
        for id in ids {
            stream.write_i16(id)?;
        }
        Ok(())
    }

    fn respond_render_info(&mut self, stream: &mut SocketStream) -> TraceResult<()> {
        stream.write_i16(Message::ResponseRenderInfo.id())?;
        stream.write_string(&self.renderer.renderer_name())?;
        stream.write_string(&self.renderer.scene_name())?;
        stream.write_u32(self.renderer.sample_count())
    }

    fn respond_render_image(&mut self, stream: &mut SocketStream) -> TraceResult<()> {
        let sample_count = stream.read_u32()?;
        self.renderer.set_sample_count(sample_count);

        // enabling the heatmap is up to the preprocessing step during
        // rendering
        self.renderer.render_image(&mut *self.api)?;
        if self.api.heatmap.is_collecting() {
            self.api.heatmap.finalize();
        }

        stream.write_i16(Message::ResponseRenderImage.id())?;
        stream.write_string(&self.renderer.rendered_image_path())?;

        // send heatmap data, if there is any
        if self.api.heatmap.has_data() {
            self.respond_scene_data(stream)?;
        }
        Ok(())
    }

    fn respond_camera_data(&mut self, stream: &mut SocketStream) -> TraceResult<()> {
        stream.write_i16(Message::ResponseCamera.id())?;
        self.renderer.camera().serialize(stream)
    }

    fn respond_scene_data(&mut self, stream: &mut SocketStream) -> TraceResult<()> {
        stream.write_i16(Message::ResponseScene.id())?;

        let has_heatmap_data = self.api.heatmap.has_data();
        stream.write_bool(has_heatmap_data)?;

        if has_heatmap_data {
            stream.write_string(&self.api.heatmap.colormap)?;
            stream.write_bool(self.api.heatmap.show_colorbar)?;
            stream.write_string(&self.api.heatmap.label)?;

            let heatmap_data = self.api.heatmap.data()?;
            stream.write_u32(heatmap_data.len() as u32)?;
            for heatmap in heatmap_data {
                heatmap.serialize(stream)?;
            }
        } else {
            stream.write_u32(self.mesh_data.len() as u32)?;
            for mesh in &self.mesh_data {
                mesh.serialize(stream)?;
            }
        }
        Ok(())
    }

    fn respond_render_pixel(&mut self, stream: &mut SocketStream) -> TraceResult<()> {
        self.api.enable();
        let x = stream.read_u32()?;
        let y = stream.read_u32()?;
        let sample_count = stream.read_u32()?;

        self.renderer.set_sample_count(sample_count);

        log::info!("rendering path data of pixel ({x}, {y})");
        self.renderer.render_pixel(x, y, &mut *self.api)?;

        stream.write_i16(Message::ResponseRenderPixel.id())?;
        self.api.serialize(stream)?;
        self.api.disable();
        // drop the recorded paths - selecting the same pixel again will
        // recompute them
        self.api.clear();
        Ok(())
    }

    /// Dispatches `id` to a registered plugin if there is one. Plugin
    /// failures are isolated like any other request handler.
    fn respond_plugin_request(&mut self, stream: &mut SocketStream, id: i16) -> TraceResult<bool> {
        let Some(plugin) = self.api.plugins.get_by_id(id) else {
            return Ok(false);
        };

        let result = (|| {
            plugin.deserialize(stream)?;
            plugin.run()?;
            plugin.serialize(stream)
        })();
        isolate("plugin request", result)?;
        Ok(true)
    }
}

/// Per-request error isolation: transport failures abort the session,
/// everything else is logged and the request loop continues (the current
/// response may be truncated; the client treats desync as a disconnect).
fn isolate(what: &str, result: TraceResult<()>) -> TraceResult<()> {
    match result {
        Err(e) if e.is_transport() => Err(e),
        Err(e) => {
            log::error!("{what} error: {e}");
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}
