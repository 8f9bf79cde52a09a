//! Client side: the connection agent and its console.

pub mod console;

use crate::command::LOGIN_TOKEN;
use crate::errors::client_error::ClientError;
use log::{info, trace};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::task::JoinHandle;

struct Connection {
    wr: OwnedWriteHalf,
    reader: JoinHandle<()>,
}

/// Connection agent for one client process. Host and port are mutable only
/// while disconnected; the login id is fixed for the life of the process and
/// re-used across reconnects.
pub struct ChatClient {
    host: String,
    port: u16,
    login_id: String,
    connection: Option<Connection>,
    connected: Arc<AtomicBool>,
}

impl ChatClient {
    pub fn new(host: String, port: u16, login_id: String) -> Self {
        ChatClient {
            host,
            port,
            login_id,
            connection: None,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn login_id(&self) -> &str {
        &self.login_id
    }

    pub fn set_host(&mut self, host: String) {
        self.host = host;
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    /// Whether the underlying connection is open. Flips to false when the
    /// reader task sees end-of-stream from the server.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some() && self.connected.load(Ordering::Acquire)
    }

    /// Opens a fresh connection to the stored host and port and performs the
    /// login handshake. Each call produces a new transport connection with
    /// the same login id.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        let socket = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(ClientError::ConnectionSetup)?;
        info!("Connected to {} on port {}", self.host, self.port);

        let (rd, wr) = socket.into_split();
        self.connected.store(true, Ordering::Release);
        let reader = tokio::spawn(read_loop(rd, self.connected.clone()));
        self.connection = Some(Connection { wr, reader });

        self.send(&format!("{LOGIN_TOKEN} {}", self.login_id)).await
    }

    /// Forwards one line to the server. Command-shaped text is not
    /// interpreted here; that happened at the console, before the agent.
    pub async fn send(&mut self, text: &str) -> Result<(), ClientError> {
        let connection = self.connection.as_mut().ok_or(ClientError::NotConnected)?;

        trace!("C: {text}");
        let result = async {
            connection.wr.write_all(text.as_bytes()).await?;
            connection.wr.write_all(b"\n").await
        }
        .await;

        if let Err(error) = result {
            self.disconnect().await;
            return Err(ClientError::Send(error));
        }
        Ok(())
    }

    /// Closes the connection and stops the reader. A second call is a no-op.
    pub async fn disconnect(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            let _ = connection.wr.shutdown().await;
            connection.reader.abort();
        }
        self.connected.store(false, Ordering::Release);
    }
}

async fn read_loop(rd: OwnedReadHalf, connected: Arc<AtomicBool>) {
    let mut lines = BufReader::new(rd).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        println!("> {line}");
    }

    connected.store(false, Ordering::Release);
    println!("Connection to server closed.");
}
