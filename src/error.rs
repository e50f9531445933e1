//! Central error handling for the traceview server library.
//!
//! Provides a unified TraceError enum with consistent categorization;
//! subdivision-capacity exhaustion is deliberately not an error (the
//! heatmap keeps sampling the coarse face instead).

/// Centralized error type for all server-library operations
#[derive(thiserror::Error, Debug)]
pub enum TraceError {
    /// Socket open/bind/accept/read/write failures and remote disconnects.
    #[error("transport error: {0}")]
    Transport(String),

    /// The client violated the wire protocol (bad handshake, malformed body).
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Broken invariants on the caller's side (face-color count mismatch,
    /// plugin id collision, tessellation bookkeeping errors).
    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TraceError {
    /// Convenience constructors for common error types
    pub fn transport<T: ToString>(msg: T) -> Self {
        TraceError::Transport(msg.to_string())
    }

    pub fn protocol<T: ToString>(msg: T) -> Self {
        TraceError::Protocol(msg.to_string())
    }

    pub fn invalid<T: ToString>(msg: T) -> Self {
        TraceError::InvalidData(msg.to_string())
    }

    /// Transport failures abort the session; everything else is logged and
    /// the request loop continues.
    pub fn is_transport(&self) -> bool {
        matches!(self, TraceError::Transport(_))
    }
}

/// Result type alias for server-library operations
pub type TraceResult<T> = Result<T, TraceError>;
