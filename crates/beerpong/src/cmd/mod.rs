use clap::{Args, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};

use beerpong_protocol::{DecoderConfig, DEFAULT_MAX_BUFFERED_BYTES};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod mock;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode the serial line and serve the HTTP API.
    Serve(ServeArgs),
    /// Decode a file, device or stdin and print every event.
    Decode(DecodeArgs),
    /// Replay scripted chunks through the decoder.
    Mock(MockArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Decode(args) => decode::run(args, format),
        Command::Mock(args) => mock::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Any byte source the decode loop can run on.
pub type SourceBox = Box<dyn Read + Send>;

/// Open `path` as a raw serial line at `baud_rate`.
#[cfg(unix)]
pub fn open_serial(path: &Path, baud_rate: u32) -> CliResult<SourceBox> {
    let port = beerpong_transport::SerialPort::open(path, baud_rate)
        .map_err(|err| crate::exit::transport_error("failed to open serial port", err))?;
    tracing::info!(port = %path.display(), baud_rate, "serial port opened");
    Ok(Box::new(port))
}

#[cfg(not(unix))]
pub fn open_serial(path: &Path, _baud_rate: u32) -> CliResult<SourceBox> {
    Err(crate::exit::CliError::new(
        crate::exit::USAGE,
        format!(
            "serial ports are not supported on this platform: {}",
            path.display()
        ),
    ))
}

/// Decoder knobs shared by every decoding subcommand.
#[derive(Args, Debug, Clone)]
pub struct DecoderArgs {
    /// Bound on buffered unterminated input in bytes (0 = unbounded).
    #[arg(
        long,
        env = "BEERPONG_MAX_BUFFERED",
        value_name = "BYTES",
        default_value_t = DEFAULT_MAX_BUFFERED_BYTES
    )]
    pub max_buffered: usize,
}

impl DecoderArgs {
    pub fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig {
            max_buffered_bytes: (self.max_buffered > 0).then_some(self.max_buffered),
        }
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Serial device the microcontroller is attached to.
    #[arg(long, env = "BEERPONG_USB_PORT", default_value = "/dev/ttyACM0")]
    pub usb_port: PathBuf,
    /// Serial line speed.
    #[arg(long, env = "BEERPONG_BAUD_RATE", default_value_t = 115200)]
    pub baud_rate: u32,
    /// Front-end files served outside the API.
    #[arg(long, env = "BEERPONG_PUBLIC_HTML", default_value = "../rpi-front/dist")]
    pub public_html: PathBuf,
    /// Replay the built-in mock script instead of opening the serial port.
    #[arg(long, env = "BEERPONG_MOCK", default_value_t = false, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    pub mock: bool,
    /// HTTP port.
    #[arg(long, env = "BEERPONG_LISTEN_PORT", default_value_t = beerpong_http::DEFAULT_LISTEN_PORT)]
    pub listen_port: u16,
    /// Score database file.
    #[arg(long, env = "BEERPONG_DB_PATH", default_value = "./scores.json")]
    pub db_path: PathBuf,
    #[command(flatten)]
    pub decoder: DecoderArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File or device to read (default: stdin).
    pub input: Option<PathBuf>,
    /// Treat the input as a serial device and configure this line speed.
    #[arg(long)]
    pub baud_rate: Option<u32>,
    /// Exit after N successfully dispatched commands. The input is then read
    /// one byte at a time, so commands after the Nth are never dispatched.
    #[arg(long)]
    pub count: Option<usize>,
    /// Do not print the final sensor reading.
    #[arg(long)]
    pub no_reading: bool,
    #[command(flatten)]
    pub decoder: DecoderArgs,
}

#[derive(Args, Debug)]
pub struct MockArgs {
    /// Chunk to replay, in order; `\r`, `\n` and `\\` escapes are honored.
    /// Defaults to the built-in script.
    #[arg(long = "chunk", value_name = "TEXT")]
    pub chunks: Vec<String>,
    #[command(flatten)]
    pub decoder: DecoderArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
