//! Error Module
//!
//! Error taxonomy for the whole crate, plus the decoder that turns an X11
//! error code into a readable diagnostic.

use thiserror::Error;
use x11rb::errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError};
use x11rb::x11_utils::X11Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong talking to the display server
#[derive(Debug, Error)]
pub enum Error {
    /// Handshake, screen selection or keymap load failed. Fatal for the connection.
    #[error("connection error: {0}")]
    Connection(String),

    /// A checked request was rejected by the server
    #[error("{operation} failed: {description}")]
    Resource {
        /// Request (and argument) that failed, e.g. `alloc_color(#ff0000ff)`
        operation: String,
        /// Output of [`describe`]
        description: String,
    },

    /// The operation exists in the API but has no implementation
    #[error("{0} is not supported")]
    Unsupported(&'static str),

    /// The surface or graphics context was already closed
    #[error("{0} is closed")]
    Closed(&'static str),

    /// The socket to the server broke or a request could not be sent
    #[error(transparent)]
    Transport(#[from] ConnectionError),
}

impl Error {
    /// Build a resource error from a raw X11 error code
    pub fn resource(operation: impl Into<String>, error_code: u8, minor_opcode: u16) -> Self {
        Error::Resource {
            operation: operation.into(),
            description: describe(error_code, minor_opcode),
        }
    }

    /// Build a resource error from a decoded x11rb error
    pub fn from_x11(operation: impl Into<String>, error: &X11Error) -> Self {
        Self::resource(operation, error.error_code, error.minor_opcode)
    }

    /// Map the error half of a checked request.
    pub fn from_reply(operation: impl Into<String>, error: ReplyError) -> Self {
        match error {
            ReplyError::X11Error(e) => Self::from_x11(operation, &e),
            ReplyError::ConnectionError(e) => Error::Transport(e),
        }
    }

    pub fn from_reply_or_id(operation: impl Into<String>, error: ReplyOrIdError) -> Self {
        match error {
            ReplyOrIdError::X11Error(e) => Self::from_x11(operation, &e),
            ReplyOrIdError::ConnectionError(e) => Error::Transport(e),
            ReplyOrIdError::IdsExhausted => Error::Resource {
                operation: operation.into(),
                description: "no more resource ids available".to_string(),
            },
        }
    }

    /// True for errors the server raised against a single request
    pub fn is_resource(&self) -> bool {
        matches!(self, Error::Resource { .. })
    }
}

impl From<ConnectError> for Error {
    fn from(e: ConnectError) -> Self {
        Error::Connection(e.to_string())
    }
}

/// Core protocol error codes
pub mod code {
    pub const REQUEST: u8 = 1;
    pub const VALUE: u8 = 2;
    pub const WINDOW: u8 = 3;
    pub const PIXMAP: u8 = 4;
    pub const ATOM: u8 = 5;
    pub const CURSOR: u8 = 6;
    pub const FONT: u8 = 7;
    pub const MATCH: u8 = 8;
    pub const DRAWABLE: u8 = 9;
    pub const ACCESS: u8 = 10;
    pub const ALLOC: u8 = 11;
    pub const COLORMAP: u8 = 12;
    pub const GCONTEXT: u8 = 13;
    pub const ID_CHOICE: u8 = 14;
    pub const NAME: u8 = 15;
    pub const LENGTH: u8 = 16;
    pub const IMPLEMENTATION: u8 = 17;
}

/// Turn an error code and minor opcode into a readable diagnostic.
///
/// Resource-id errors (window, pixmap, atom, cursor, font, drawable,
/// colormap, gc, id-choice) get the minor opcode appended; the others don't.
pub fn describe(error_code: u8, minor_opcode: u16) -> String {
    let resource = |what: &str| format!("Bad {} (minor opcode {})", what, minor_opcode);

    match error_code {
        code::REQUEST => "Bad request".to_string(),
        code::VALUE => "Bad value".to_string(),
        code::WINDOW => resource("window"),
        code::PIXMAP => resource("pixmap"),
        code::ATOM => resource("atom"),
        code::CURSOR => resource("cursor"),
        code::FONT => resource("font"),
        code::MATCH => "Bad match".to_string(),
        code::DRAWABLE => resource("drawable"),
        code::ACCESS => "Bad access".to_string(),
        code::ALLOC => "Bad alloc (server out of memory)".to_string(),
        code::COLORMAP => resource("colormap"),
        code::GCONTEXT => resource("graphics context"),
        code::ID_CHOICE => resource("id choice"),
        code::NAME => "Bad name (font or color does not exist)".to_string(),
        code::LENGTH => "Bad length".to_string(),
        code::IMPLEMENTATION => "Bad implementation".to_string(),
        other => format!("Unknown error code {}", other),
    }
}
