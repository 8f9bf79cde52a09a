use crate::server::session::SessionId;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Could not bind listener: {0}")]
    Bind(io::Error),
    #[error("Login id already set for {0}")]
    LoginAlreadySet(SessionId),
    #[error("Could not get sessions, lock poisoned")]
    RegistryLock,
    #[error("Could not get server state, lock poisoned")]
    StateLock,
    #[error("Could not read from console: {0}")]
    Console(io::Error),
}
