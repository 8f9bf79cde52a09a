//! Administrative console for a running server. `#`-lines are interpreted as
//! commands; anything else is relayed to the clients as a server message.

use crate::command::{ServerCommand, is_command, parse_port};
use crate::errors::server_error::ServerError;
use crate::server::ChatServer;
use log::error;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Reads console lines until end-of-input or `#quit`.
pub async fn run(server: Arc<ChatServer>) -> Result<(), ServerError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.map_err(ServerError::Console)? {
        if is_command(&line) {
            if dispatch(&server, &line).await? == Flow::Quit {
                break;
            }
        } else {
            server.registry().server_broadcast(&line)?;
        }
    }

    Ok(())
}

async fn dispatch(server: &ChatServer, line: &str) -> Result<Flow, ServerError> {
    match ServerCommand::classify(line) {
        ServerCommand::Quit => {
            println!("Shutting down server.");
            server.registry().broadcast("The server has shut down")?;
            server.close()?;
            return Ok(Flow::Quit);
        }

        ServerCommand::Stop => server.stop_listening()?,

        ServerCommand::Close => {
            println!("Closing server.");
            server.registry().broadcast("The server has shut down")?;
            server.close()?;
        }

        ServerCommand::SetPort(value) => match parse_port(value.as_deref()) {
            Ok(port) => {
                if server.is_listening()? {
                    // Long-standing quirk: the change is announced as
                    // deferred but never actually scheduled. Stop, set,
                    // start applies it.
                    println!("Port set to {port}. Change will be affected once the server is close");
                } else {
                    server.set_port(port)?;
                    println!("Port set to {port}.");
                }
            }
            Err(error) => println!("{error}"),
        },

        ServerCommand::Start => {
            if let Err(error) = server.listen().await {
                error!("ERROR - Could not listen for clients! {error}");
            }
        }

        ServerCommand::GetPort => println!("{}", server.port()?),

        ServerCommand::Unknown => (),
    }

    Ok(Flow::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn setport_while_listening_defers_and_changes_nothing() {
        let server = ChatServer::new(0);
        server.listen().await.unwrap();
        let bound = server.port().unwrap();

        dispatch(&server, "#setport 7000").await.unwrap();
        assert_eq!(server.port().unwrap(), bound);

        // Stop first, then the same command applies.
        dispatch(&server, "#stop").await.unwrap();
        dispatch(&server, "#setport 7000").await.unwrap();
        assert_eq!(server.port().unwrap(), 7000);
    }

    #[tokio::test]
    async fn malformed_setport_leaves_the_port_alone() {
        let server = ChatServer::new(5555);
        dispatch(&server, "#setport many").await.unwrap();
        dispatch(&server, "#setport").await.unwrap();
        assert_eq!(server.port().unwrap(), 5555);
    }

    #[tokio::test]
    async fn stop_keeps_sessions_while_close_drops_them() {
        use crate::server::registry::SessionHandle;
        use crate::server::session::SessionId;
        use tokio::sync::{Notify, mpsc};

        let server = ChatServer::new(0);
        server.listen().await.unwrap();

        let (tx, _rx) = mpsc::channel(1);
        let registry = server.registry();
        registry
            .register(SessionId::next(), SessionHandle::new(tx, Arc::new(Notify::new())))
            .unwrap();

        dispatch(&server, "#stop").await.unwrap();
        assert!(!server.is_listening().unwrap());
        assert_eq!(registry.len().unwrap(), 1);

        dispatch(&server, "#close").await.unwrap();
        assert!(registry.is_empty().unwrap());
    }

    #[tokio::test]
    async fn quit_ends_the_console_loop() {
        let server = ChatServer::new(0);
        server.listen().await.unwrap();
        assert_eq!(dispatch(&server, "#quit").await.unwrap(), Flow::Quit);
        assert!(!server.is_listening().unwrap());
    }
}
