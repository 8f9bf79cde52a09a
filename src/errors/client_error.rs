use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Could not set up connection: {0}")]
    ConnectionSetup(io::Error),
    #[error("Not connected to a server")]
    NotConnected,
    #[error("Could not send to server: {0}")]
    Send(io::Error),
    #[error("Could not read from console: {0}")]
    Console(io::Error),
}
