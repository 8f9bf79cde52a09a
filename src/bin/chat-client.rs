use chat_relay::client::{ChatClient, console};
use chat_relay::server::DEFAULT_PORT;
use dotenvy::dotenv;
use env_logger::Env;
use log::error;
use std::{env, process};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let mut args = env::args().skip(1);
    let Some(login_id) = args.next() else {
        eprintln!("No loginID given");
        process::exit(1);
    };

    let host = args
        .next()
        .or_else(|| env::var("CHAT_HOST").ok())
        .unwrap_or_else(|| "localhost".to_string());
    let port = args
        .next()
        .and_then(|value| value.parse().ok())
        .or_else(|| env::var("CHAT_PORT").ok().and_then(|value| value.parse().ok()))
        .unwrap_or(DEFAULT_PORT);

    let mut client = ChatClient::new(host, port, login_id);
    if let Err(error) = client.connect().await {
        error!("{error}");
        eprintln!("Error: Can't setup connection! Terminating client.");
        process::exit(1);
    }

    if let Err(error) = console::run(&mut client).await {
        error!("{error}");
        process::exit(1);
    }
}
