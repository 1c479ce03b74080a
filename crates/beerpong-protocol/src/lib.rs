//! Streaming decoder for the microcontroller command protocol.
//!
//! The device writes commands shaped like `sensor(15, 25, 55);` followed by
//! `\r\n`, but the serial driver hands them over in arbitrary chunks. The
//! pipeline is:
//! - [`tokenize`] splits a chunk on CR and drops LF
//! - [`FragmentQueue`] keeps fragments until they complete a command
//! - [`Command`] is the parsed `name(args);` expression
//! - [`Dispatcher`] routes a command to its registered [`CommandHandler`]
//! - [`SensorState`] holds the latest decoded sensor reading
//!
//! [`Decoder`] wires these together per chunk and [`CommandReader`] drives it
//! from any `Read` source.

pub mod command;
pub mod config;
pub mod decoder;
pub mod dispatch;
pub mod error;
pub mod matcher;
pub mod queue;
pub mod reader;
pub mod sensor;
pub mod tokenizer;

pub use command::Command;
pub use config::{DecoderConfig, ReaderConfig, DEFAULT_MAX_BUFFERED_BYTES};
pub use decoder::{DecodeEvent, Decoder};
pub use dispatch::{CommandHandler, Dispatcher, SensorHandler, SENSOR};
pub use error::{DispatchError, ProtocolError, Result};
pub use matcher::{is_command_expression, ExpressionMatcher};
pub use queue::FragmentQueue;
pub use reader::CommandReader;
pub use sensor::SensorState;
pub use tokenizer::{tokenize, Fragment, IGNORED, RECORD_SEPARATOR};
