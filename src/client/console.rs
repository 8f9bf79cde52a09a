//! Chat console for the client process. `#`-lines are interpreted locally;
//! anything else goes to the server as chat payload.

use crate::client::ChatClient;
use crate::command::{ClientCommand, is_command, parse_port};
use crate::errors::client_error::ClientError;
use log::error;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Reads console lines until end-of-input or `#quit`.
pub async fn run(client: &mut ChatClient) -> Result<(), ClientError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.map_err(ClientError::Console)? {
        if is_command(&line) {
            if dispatch(client, &line).await? == Flow::Quit {
                break;
            }
        } else if client.is_connected() {
            if let Err(error) = client.send(&line).await {
                error!("{error}");
            }
        } else {
            println!("Not connected to a server. Use #login to connect.");
        }
    }

    Ok(())
}

async fn dispatch(client: &mut ChatClient, line: &str) -> Result<Flow, ClientError> {
    match ClientCommand::classify(line) {
        ClientCommand::Quit => {
            println!("Quitting");
            if client.is_connected() {
                let _ = client.send("#quitting").await;
            }
            client.disconnect().await;
            return Ok(Flow::Quit);
        }

        ClientCommand::Logoff => {
            println!(
                "Closing connection to server host {} on port {}.",
                client.host(),
                client.port()
            );
            if client.is_connected() {
                let _ = client.send("#logoff").await;
            }
            client.disconnect().await;
        }

        ClientCommand::SetHost(value) => {
            if client.is_connected() {
                println!("Close connection to host before changing hostname");
            } else if let Some(host) = value {
                client.set_host(host.clone());
                println!("Host set to {host}.");
            } else {
                println!("No host value given.");
            }
        }

        ClientCommand::SetPort(value) => {
            if client.is_connected() {
                println!("Close connection to host before changing port");
            } else {
                match parse_port(value.as_deref()) {
                    Ok(port) => {
                        client.set_port(port);
                        println!("Port set to {port}.");
                    }
                    Err(error) => println!("{error}"),
                }
            }
        }

        ClientCommand::Login => {
            if client.is_connected() {
                println!("You are already connected to server");
            } else {
                client.connect().await?;
            }
        }

        ClientCommand::GetHost => println!("Connected via host {}", client.host()),

        ClientCommand::GetPort => println!("Connected via port {}", client.port()),

        ClientCommand::Unknown => (),
    }

    Ok(Flow::Continue)
}
