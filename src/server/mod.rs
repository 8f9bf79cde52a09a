//! Server side: listener lifecycle, the session registry, and the console.

pub mod connection;
pub mod console;
pub mod registry;
pub mod session;

use crate::errors::server_error::ServerError;
use connection::serve_connection;
use log::{error, info};
use registry::Registry;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Port used when none is configured.
pub const DEFAULT_PORT: u16 = 5555;

struct ListenerTask {
    stop_tx: watch::Sender<bool>,
    local_port: u16,
}

struct ServerState {
    port: u16,
    listener: Option<ListenerTask>,
}

/// An explicitly constructed chat server: the configured port, the shared
/// session registry, and the accept-loop task when one is running. Handed to
/// the console layer as a value, never reached through a global.
pub struct ChatServer {
    registry: Arc<Registry>,
    state: Mutex<ServerState>,
}

impl ChatServer {
    pub fn new(port: u16) -> Self {
        ChatServer {
            registry: Arc::new(Registry::new()),
            state: Mutex::new(ServerState {
                port,
                listener: None,
            }),
        }
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// The port clients should use right now: the bound port while
    /// listening (which pins down a port-0 ephemeral bind), the configured
    /// one otherwise.
    pub fn port(&self) -> Result<u16, ServerError> {
        let state = self.state.lock().or(Err(ServerError::StateLock))?;
        Ok(state
            .listener
            .as_ref()
            .map(|l| l.local_port)
            .unwrap_or(state.port))
    }

    /// Reconfigures the port. The console only calls this while the server
    /// is not listening; a bind already in progress keeps its port.
    pub fn set_port(&self, port: u16) -> Result<(), ServerError> {
        self.state.lock().or(Err(ServerError::StateLock))?.port = port;
        Ok(())
    }

    pub fn is_listening(&self) -> Result<bool, ServerError> {
        Ok(self
            .state
            .lock()
            .or(Err(ServerError::StateLock))?
            .listener
            .is_some())
    }

    /// Binds the configured port and starts accepting connections, spawning
    /// one task per client. Idempotent while already listening. A failed
    /// bind is reported, not fatal.
    pub async fn listen(&self) -> Result<(), ServerError> {
        if self.is_listening()? {
            return Ok(());
        }

        let port = self.state.lock().or(Err(ServerError::StateLock))?.port;
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map_err(ServerError::Bind)?;
        let local_port = listener.local_addr().map_err(ServerError::Bind)?.port();
        info!("Server listening for connections on port {local_port}");

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let registry = self.registry.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    client = listener.accept() => {
                        let (socket, _) = match client {
                            Ok(c) => c,
                            Err(error) => {
                                error!("Could not get socket from accepted connection: {error}");
                                continue;
                            }
                        };

                        let registry = registry.clone();
                        tokio::spawn(async move {
                            if let Err(error) = serve_connection(registry, socket).await {
                                error!("{error}");
                            }
                        });
                    }

                    _ = stop_rx.changed() => break,
                }
            }
            info!("Server has stopped listening for connections.");
        });

        self.state.lock().or(Err(ServerError::StateLock))?.listener = Some(ListenerTask {
            stop_tx,
            local_port,
        });
        Ok(())
    }

    /// Stops accepting new connections; existing sessions stay up.
    pub fn stop_listening(&self) -> Result<(), ServerError> {
        let listener = self
            .state
            .lock()
            .or(Err(ServerError::StateLock))?
            .listener
            .take();
        if let Some(listener) = listener {
            let _ = listener.stop_tx.send(true);
        }
        Ok(())
    }

    /// Stops listening and tears down every session.
    pub fn close(&self) -> Result<(), ServerError> {
        self.stop_listening()?;
        self.registry.close_all()
    }
}
