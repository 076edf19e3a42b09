//! WebSocket server streaming the Moon's position to every connected client

pub mod config;
pub mod error;
pub mod registry;
pub mod session;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::Response,
    Router,
};
use futures::StreamExt;
use tokio::net::TcpListener;

pub use config::ServerConfig;
pub use error::{ServerError, SessionEnd, SessionError};
pub use registry::{ClientGuard, ClientId, ClientRegistry};
pub use session::run_session;

/// State handed to every upgrade
#[derive(Clone)]
struct AppState {
    registry: Arc<ClientRegistry>,
    interval: Duration,
}

/// Bound listener plus the registry of its clients
pub struct MoonServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    registry: Arc<ClientRegistry>,
    config: ServerConfig,
}

impl MoonServer {
    /// Bind the listening socket described by `config`
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        if config.interval.is_zero() {
            return Err(ServerError::ZeroInterval);
        }

        let addr = config.socket_addr();
        let bind_error = |source: std::io::Error| ServerError::Bind { addr, source };

        let listener = TcpListener::bind(addr).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        Ok(Self {
            listener,
            local_addr,
            registry: ClientRegistry::new(),
            config,
        })
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn registry(&self) -> Arc<ClientRegistry> {
        Arc::clone(&self.registry)
    }

    /// Accept connections until the listener fails.
    ///
    /// Every request path is upgraded; each client gets its own session task.
    pub async fn serve(self) -> Result<(), ServerError> {
        let state = AppState {
            registry: self.registry,
            interval: self.config.interval,
        };

        let app = Router::new().fallback(ws_handler).with_state(state);

        tracing::info!(
            "WebSocket server listening on ws://{} (one frame every {:?})",
            self.local_addr,
            self.config.interval
        );

        axum::serve(
            self.listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .map_err(ServerError::Serve)
    }
}

/// WebSocket upgrade handler.
async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, addr, state))
}

async fn handle_socket(socket: WebSocket, addr: SocketAddr, state: AppState) {
    let guard = state.registry.register(addr);
    let (sender, receiver) = socket.split();
    run_session(sender, receiver, guard, state.interval).await;
}
