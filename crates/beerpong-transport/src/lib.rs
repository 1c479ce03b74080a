//! Byte sources feeding the beerpong command decoder.
//!
//! Everything here is a plain [`std::io::Read`]: the decoder never assumes
//! a read returns a whole command, or even a whole line.
//! - [`SerialPort`]: a TTY device in raw mode (Unix)
//! - [`MockSerial`]: replays a fixed list of chunks, one per read

pub mod error;
pub mod mock;

#[cfg(unix)]
pub mod serial;

pub use error::{Result, TransportError};
pub use mock::{MockSerial, DEFAULT_SCRIPT};

#[cfg(unix)]
pub use serial::{SerialPort, SUPPORTED_BAUD_RATES};
