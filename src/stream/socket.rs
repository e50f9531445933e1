// src/stream/socket.rs
// ByteStream over a connected TCP socket. EOF on read and broken pipes on
// write surface as transport errors so the session engine can drop the
// client and return to listening.

use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;

use crate::error::{TraceError, TraceResult};
use crate::stream::ByteStream;

pub struct SocketStream {
    stream: TcpStream,
}

impl SocketStream {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }

    pub fn into_inner(self) -> TcpStream {
        self.stream
    }
}

impl ByteStream for SocketStream {
    fn read_bytes(&mut self, buf: &mut [u8]) -> TraceResult<()> {
        self.stream.read_exact(buf).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => TraceError::transport("read failed, remote has disconnected"),
            _ => TraceError::transport(format!("socket read failed: {e}")),
        })
    }

    fn write_bytes(&mut self, buf: &[u8]) -> TraceResult<()> {
        self.stream.write_all(buf).map_err(|e| match e.kind() {
            ErrorKind::BrokenPipe | ErrorKind::ConnectionReset => {
                TraceError::transport("write failed, remote has disconnected")
            }
            _ => TraceError::transport(format!("socket write failed: {e}")),
        })
    }
}
