use chat_relay::server::{ChatServer, DEFAULT_PORT, console};
use dotenvy::dotenv;
use env_logger::Env;
use log::error;
use std::{env, sync::Arc};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let port = env::args()
        .nth(1)
        .and_then(|value| value.parse().ok())
        .or_else(|| env::var("CHAT_PORT").ok().and_then(|value| value.parse().ok()))
        .unwrap_or(DEFAULT_PORT);

    let server = Arc::new(ChatServer::new(port));
    if let Err(error) = server.listen().await {
        error!("ERROR - Could not listen for clients! {error}");
    }

    if let Err(error) = console::run(server).await {
        error!("{error}");
        std::process::exit(1);
    }
}
