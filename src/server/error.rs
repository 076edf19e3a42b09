//! Listener and session error types

use std::net::SocketAddr;

use thiserror::Error;

/// Failures of the listening side; fatal to the process
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("send interval must be non-zero")]
    ZeroInterval,

    #[error("server stopped accepting connections: {0}")]
    Serve(#[source] std::io::Error),
}

/// Failures scoped to a single client session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to send frame: {0}")]
    Send(#[source] axum::Error),
}

/// Why a session stopped streaming
#[derive(Debug)]
pub enum SessionEnd {
    /// Peer sent a close frame, or its half of the socket ended
    PeerClosed,
    SendFailed(SessionError),
}

impl SessionEnd {
    pub fn is_peer_closed(&self) -> bool {
        matches!(self, SessionEnd::PeerClosed)
    }
}
