// src/api/plugin.rs
// Analysis plugins registered with the data api. The session engine
// dispatches any request whose id matches a registered plugin:
// deserialize reads the request parameters, run computes, serialize
// writes the response body (the engine adds no extra framing).

use std::collections::BTreeMap;

use crate::error::{TraceError, TraceResult};
use crate::server::message::Message;
use crate::stream::ByteStream;

pub trait Plugin: Send {
    fn name(&self) -> &str;
    fn id(&self) -> i16;

    fn run(&mut self) -> TraceResult<()>;
    fn serialize(&self, stream: &mut dyn ByteStream) -> TraceResult<()>;
    fn deserialize(&mut self, stream: &mut dyn ByteStream) -> TraceResult<()>;
}

/// Plugin id -> plugin. Populated before rendering starts, never mutated
/// while a session is active.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<i16, Box<dyn Plugin>>,
}

impl PluginRegistry {
    /// Registers a plugin. Fails if the id is occupied or collides with a
    /// reserved protocol message id.
    pub fn add(&mut self, plugin: Box<dyn Plugin>) -> TraceResult<()> {
        let id = plugin.id();
        if Message::is_reserved(id) {
            return Err(TraceError::invalid(format!(
                "plugin id 0x{id:04x} collides with a protocol message id"
            )));
        }
        if self.plugins.contains_key(&id) {
            return Err(TraceError::invalid(format!("plugin id 0x{id:04x} is already occupied")));
        }
        self.plugins.insert(id, plugin);
        Ok(())
    }

    pub fn get_by_id(&mut self, id: i16) -> Option<&mut (dyn Plugin + '_)> {
        match self.plugins.get_mut(&id) {
            Some(p) => Some(p.as_mut()),
            None => None,
        }
    }

    pub fn get_by_name(&mut self, name: &str) -> Option<&mut (dyn Plugin + '_)> {
        match self.plugins.values_mut().find(|p| p.name() == name) {
            Some(p) => Some(p.as_mut()),
            None => None,
        }
    }

    pub fn ids(&self) -> Vec<i16> {
        self.plugins.keys().copied().collect()
    }

    pub fn log_plugins(&self) {
        for (id, plugin) in &self.plugins {
            log::info!("plugin {} with id 0x{id:04x}", plugin.name());
        }
    }
}
