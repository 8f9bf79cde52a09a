//! One task per accepted connection: register with the registry, drain the
//! outbound queue into the socket from a writer task, and read lines until
//! the client goes away or the session is forcibly closed.

use crate::command::{LOGIN_TOKEN, WireMessage};
use crate::errors::server_error::ServerError;
use crate::server::registry::{OUTBOUND_QUEUE, Registry, SessionHandle};
use crate::server::session::{Session, SessionId};
use log::{error, info, trace, warn};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{Notify, mpsc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

pub async fn serve_connection(registry: Arc<Registry>, socket: TcpStream) -> Result<(), ServerError> {
    let mut session = Session::new(SessionId::next());
    let id = session.id();

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(OUTBOUND_QUEUE);
    let closed = Arc::new(Notify::new());
    registry.register(id, SessionHandle::new(outbound_tx, closed.clone()))?;
    info!("A new client has connected to the server.");

    let (rd, mut wr) = socket.into_split();

    // The writer drains the queue until every sender is gone, so a shutdown
    // notice enqueued just before teardown still reaches the client.
    let writer = tokio::spawn(async move {
        while let Some(line) = outbound_rx.recv().await {
            if wr.write_all(line.as_bytes()).await.is_err()
                || wr.write_all(b"\n").await.is_err()
            {
                break;
            }
        }
    });

    let mut lines = BufReader::new(rd).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        trace!("C: {line}");
                        if handle_wire_message(&registry, &mut session, &line)? == Flow::Close {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(error) => {
                        error!("Could not read from {id}: {error}");
                        break;
                    }
                }
            }
            _ = closed.notified() => break,
        }
    }

    session.close();
    registry.unregister(id)?;
    writer.await.ok();
    info!("{id} closed");
    Ok(())
}

fn handle_wire_message(
    registry: &Registry,
    session: &mut Session,
    line: &str,
) -> Result<Flow, ServerError> {
    match WireMessage::classify(line) {
        WireMessage::Login(login_id) => {
            if session.login_id().is_none() {
                let Some(login_id) = login_id else {
                    warn!("Malformed login from {}, closing connection", session.id());
                    return Ok(Flow::Close);
                };

                session.identify(&login_id)?;
                registry.broadcast(&format!("{login_id} has logged on"))?;
            } else if line.trim().len() > LOGIN_TOKEN.len() {
                warn!("loginID already set, closing connection to server");
                return Ok(Flow::Close);
            }
            // A bare repeated "#login" is ignored.
        }

        WireMessage::Quitting => {
            info!("{} disconnected", session.login_id().unwrap_or("<unidentified>"));
        }

        WireMessage::Logoff => return Ok(Flow::Close),

        WireMessage::Payload => {
            let login_id = session.login_id().unwrap_or("<unidentified>");
            info!("Message received: {line} from {login_id}");
            registry.broadcast(&format!("{login_id} > {line}"))?;
        }
    }

    Ok(Flow::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::Receiver;

    fn registered(registry: &Registry) -> (Session, Receiver<String>) {
        let session = Session::new(SessionId::next());
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE);
        registry
            .register(session.id(), SessionHandle::new(tx, Arc::new(Notify::new())))
            .unwrap();
        (session, rx)
    }

    #[test]
    fn login_identifies_and_announces_to_everyone() {
        let registry = Registry::new();
        let (mut session, mut rx) = registered(&registry);
        let (_other, mut other_rx) = registered(&registry);

        let flow = handle_wire_message(&registry, &mut session, "#login alice").unwrap();
        assert_eq!(flow, Flow::Continue);
        assert_eq!(session.login_id(), Some("alice"));

        // The announcement reaches every session, the sender included and
        // the still-unidentified peer too.
        assert_eq!(rx.try_recv().unwrap(), "alice has logged on");
        assert_eq!(other_rx.try_recv().unwrap(), "alice has logged on");
    }

    #[test]
    fn second_login_closes_without_touching_identity() {
        let registry = Registry::new();
        let (mut session, _rx) = registered(&registry);

        handle_wire_message(&registry, &mut session, "#login alice").unwrap();
        let flow = handle_wire_message(&registry, &mut session, "#login bob").unwrap();

        assert_eq!(flow, Flow::Close);
        assert_eq!(session.login_id(), Some("alice"));
    }

    #[test]
    fn bare_repeated_login_is_a_noop() {
        let registry = Registry::new();
        let (mut session, mut rx) = registered(&registry);

        handle_wire_message(&registry, &mut session, "#login alice").unwrap();
        rx.try_recv().unwrap();

        let flow = handle_wire_message(&registry, &mut session, "#login").unwrap();
        assert_eq!(flow, Flow::Continue);
        assert_eq!(session.login_id(), Some("alice"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn malformed_first_login_closes_the_connection() {
        let registry = Registry::new();
        let (mut session, _rx) = registered(&registry);

        let flow = handle_wire_message(&registry, &mut session, "#login").unwrap();
        assert_eq!(flow, Flow::Close);
        assert_eq!(session.login_id(), None);
    }

    #[test]
    fn payload_is_broadcast_with_the_sender_prefix() {
        let registry = Registry::new();
        let (mut session, mut rx) = registered(&registry);

        handle_wire_message(&registry, &mut session, "#login alice").unwrap();
        rx.try_recv().unwrap();

        handle_wire_message(&registry, &mut session, "hello").unwrap();
        assert_eq!(rx.try_recv().unwrap(), "alice > hello");
    }

    #[test]
    fn logoff_closes_and_quitting_does_not() {
        let registry = Registry::new();
        let (mut session, _rx) = registered(&registry);
        handle_wire_message(&registry, &mut session, "#login alice").unwrap();

        assert_eq!(
            handle_wire_message(&registry, &mut session, "#quitting").unwrap(),
            Flow::Continue
        );
        assert_eq!(
            handle_wire_message(&registry, &mut session, "#logoff").unwrap(),
            Flow::Close
        );
    }

    #[test]
    fn duplicate_login_ids_are_admitted() {
        let registry = Registry::new();
        let (mut first, _rx_a) = registered(&registry);
        let (mut second, _rx_b) = registered(&registry);

        handle_wire_message(&registry, &mut first, "#login alice").unwrap();
        let flow = handle_wire_message(&registry, &mut second, "#login alice").unwrap();

        // Uniqueness is not enforced; both sessions stay up under one name.
        assert_eq!(flow, Flow::Continue);
        assert_eq!(registry.len().unwrap(), 2);
    }
}
