//! Classification of `#`-prefixed control lines.
//!
//! Commands are recognized by substring containment rather than structural
//! parsing, so a token appearing anywhere in the line matches and branch
//! order decides between overlapping tokens. All of that fragility is
//! confined to this module; the state machines only ever see the classified
//! variants.

use crate::errors::command_error::CommandError;

/// Marker that distinguishes a control line from chat payload.
pub const COMMAND_MARKER: char = '#';

/// Reserved wire token sent by a client to claim its identity.
pub const LOGIN_TOKEN: &str = "#login";

/// True when a console line should be routed to a command interpreter.
pub fn is_command(line: &str) -> bool {
    line.trim_start().starts_with(COMMAND_MARKER)
}

/// Commands accepted on the client console.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientCommand {
    Quit,
    Logoff,
    SetHost(Option<String>),
    SetPort(Option<String>),
    Login,
    GetHost,
    GetPort,
    Unknown,
}

impl ClientCommand {
    pub fn classify(line: &str) -> Self {
        // Order matters: "#quitting" also contains "#quit".
        if line.contains("#quit") {
            Self::Quit
        } else if line.contains("#logoff") {
            Self::Logoff
        } else if line.contains("#sethost") {
            Self::SetHost(argument(line))
        } else if line.contains("#setport") {
            Self::SetPort(argument(line))
        } else if line.contains("#login") {
            Self::Login
        } else if line.contains("#gethost") {
            Self::GetHost
        } else if line.contains("#getport") {
            Self::GetPort
        } else {
            Self::Unknown
        }
    }
}

/// Commands accepted on the server console.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerCommand {
    Quit,
    Stop,
    Close,
    SetPort(Option<String>),
    Start,
    GetPort,
    Unknown,
}

impl ServerCommand {
    pub fn classify(line: &str) -> Self {
        if line.contains("#quit") {
            Self::Quit
        } else if line.contains("#stop") {
            Self::Stop
        } else if line.contains("#close") {
            Self::Close
        } else if line.contains("#setport") {
            Self::SetPort(argument(line))
        } else if line.contains("#start") {
            Self::Start
        } else if line.contains("#getport") {
            Self::GetPort
        } else {
            Self::Unknown
        }
    }
}

/// Classification of a line arriving from a client connection. Anything that
/// does not contain a reserved token is chat payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WireMessage {
    Login(Option<String>),
    Quitting,
    Logoff,
    Payload,
}

impl WireMessage {
    pub fn classify(line: &str) -> Self {
        if line.contains(LOGIN_TOKEN) {
            Self::Login(line.split_whitespace().nth(1).map(str::to_string))
        } else if line.contains("#quitting") {
            Self::Quitting
        } else if line.contains("#logoff") {
            Self::Logoff
        } else {
            Self::Payload
        }
    }
}

/// Parses a console-supplied port value.
pub fn parse_port(value: Option<&str>) -> Result<u16, CommandError> {
    value
        .ok_or(CommandError::MissingArgument)?
        .parse()
        .map_err(CommandError::InvalidPort)
}

/// Second whitespace token of the line, stripped of the `<`/`>` the client
/// console traditionally wraps values in.
fn argument(line: &str) -> Option<String> {
    let token = line
        .split_whitespace()
        .nth(1)?
        .trim_start_matches('<')
        .trim_end_matches('>');

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
