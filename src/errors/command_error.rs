use std::num::ParseIntError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid port value: {0}")]
    InvalidPort(ParseIntError),
    #[error("Command doesn't have enough arguments")]
    MissingArgument,
}
