use std::num::ParseIntError;

/// Errors raised while dispatching a decoded command.
///
/// None of these are fatal: the decoder reports them and keeps reading.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No handler is registered for the command name.
    #[error("unrecognized command {name:?}")]
    UnknownCommand { name: String },

    /// An argument could not be converted to the type the handler expects.
    #[error("argument {position} of {name:?} is not an integer ({value:?}): {source}")]
    InvalidArgument {
        name: String,
        position: usize,
        value: String,
        source: ParseIntError,
    },

    /// A handler refused the command for its own reasons.
    #[error("command {name:?} rejected: {reason}")]
    Rejected { name: String, reason: String },
}

/// Errors from the blocking read loop.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The byte source failed.
    #[error("protocol I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte source reached end of stream.
    #[error("byte source closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
