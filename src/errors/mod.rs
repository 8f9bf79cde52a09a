pub mod client_error;
pub mod command_error;
pub mod server_error;
