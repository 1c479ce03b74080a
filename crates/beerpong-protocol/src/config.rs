use std::time::Duration;

/// Default bound on bytes held by the fragment queue: 64 KiB.
pub const DEFAULT_MAX_BUFFERED_BYTES: usize = 64 * 1024;

/// Configuration for [`Decoder`](crate::Decoder).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Bound on unmatched bytes kept between chunks. When exceeded, the
    /// oldest fragments are dropped. `None` keeps everything.
    pub max_buffered_bytes: Option<usize>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_buffered_bytes: Some(DEFAULT_MAX_BUFFERED_BYTES),
        }
    }
}

/// Configuration for [`CommandReader`](crate::CommandReader).
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Bytes requested per read.
    pub read_size: usize,
    /// Pause before retrying after a failed read.
    pub retry_delay: Duration,
    /// End [`run`](crate::CommandReader::run) at the first zero-byte read.
    /// Otherwise EOF is treated as a read failure and retried, which is what
    /// a serial line that hangs up and comes back needs.
    pub stop_on_eof: bool,
    /// Decoder settings.
    pub decoder: DecoderConfig,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            read_size: 128,
            retry_delay: Duration::from_millis(100),
            stop_on_eof: false,
            decoder: DecoderConfig::default(),
        }
    }
}
