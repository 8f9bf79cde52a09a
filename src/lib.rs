pub mod client;
pub mod command;
pub mod errors;
pub mod server;
