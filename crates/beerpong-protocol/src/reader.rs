use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info};

use crate::config::ReaderConfig;
use crate::decoder::{DecodeEvent, Decoder};
use crate::dispatch::Dispatcher;
use crate::error::{ProtocolError, Result};
use crate::sensor::SensorState;

/// Drives a [`Decoder`] from any blocking `Read` source.
///
/// One read, one chunk: whatever the source returns is decoded and every
/// completed command dispatched before the next read is issued.
pub struct CommandReader<T> {
    inner: T,
    decoder: Decoder,
    config: ReaderConfig,
    buf: Vec<u8>,
}

impl<T: Read> CommandReader<T> {
    /// Create a reader with default configuration.
    pub fn new(inner: T, dispatcher: Dispatcher) -> Self {
        Self::with_config(inner, dispatcher, ReaderConfig::default())
    }

    /// Create a reader with explicit configuration.
    pub fn with_config(inner: T, dispatcher: Dispatcher, config: ReaderConfig) -> Self {
        Self {
            inner,
            decoder: Decoder::with_config(dispatcher, config.decoder),
            buf: vec![0u8; config.read_size.max(1)],
            config,
        }
    }

    /// Create a reader that only understands `sensor`, writing into `state`.
    pub fn for_sensor(inner: T, state: SensorState) -> Self {
        Self::new(inner, Dispatcher::with_sensor(state))
    }

    /// Read one chunk (blocking) and decode it.
    ///
    /// Returns `Err(ProtocolError::ConnectionClosed)` when EOF is reached.
    /// A failed read leaves the decoder untouched.
    pub fn read_chunk(&mut self) -> Result<Vec<DecodeEvent>> {
        loop {
            let read = match self.inner.read(&mut self.buf) {
                Ok(0) => return Err(ProtocolError::ConnectionClosed),
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(ProtocolError::Io(err)),
            };

            let chunk = &self.buf[..read];
            debug!(buffer = %String::from_utf8_lossy(chunk).escape_debug(), "buffer read");
            return Ok(self.decoder.feed(chunk));
        }
    }

    /// Decode until `running` is cleared, or until the source closes when
    /// [`ReaderConfig::stop_on_eof`] is set.
    ///
    /// Read errors are logged and retried after the configured delay.
    /// Returns the number of successfully dispatched commands.
    pub fn run(&mut self, running: &AtomicBool) -> usize {
        self.run_with(running, |_| {})
    }

    /// Like [`run`](Self::run), handing every decode event to `on_event`.
    pub fn run_with<F>(&mut self, running: &AtomicBool, mut on_event: F) -> usize
    where
        F: FnMut(&DecodeEvent),
    {
        let mut dispatched = 0usize;

        while running.load(Ordering::SeqCst) {
            match self.read_chunk() {
                Ok(events) => {
                    for event in &events {
                        if matches!(event, DecodeEvent::Dispatched(_)) {
                            dispatched = dispatched.saturating_add(1);
                        }
                        on_event(event);
                    }
                }
                Err(ProtocolError::ConnectionClosed) if self.config.stop_on_eof => {
                    info!(dispatched, "byte source closed, decode loop stopping");
                    break;
                }
                Err(ProtocolError::Io(err))
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    continue;
                }
                Err(err) => {
                    error!(error = %err, "error when reading from byte source");
                    if !self.config.retry_delay.is_zero() {
                        std::thread::sleep(self.config.retry_delay);
                    }
                }
            }
        }

        dispatched
    }

    /// Borrow the decoder.
    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Mutably borrow the decoder.
    pub fn decoder_mut(&mut self) -> &mut Decoder {
        &mut self.decoder
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner source.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current reader configuration.
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;
    use std::time::Duration;

    use beerpong_transport::{MockSerial, DEFAULT_SCRIPT};

    use super::*;

    fn quick_config() -> ReaderConfig {
        ReaderConfig {
            retry_delay: Duration::ZERO,
            stop_on_eof: true,
            ..ReaderConfig::default()
        }
    }

    #[test]
    fn replays_default_script() {
        let state = SensorState::new();
        let mut reader = CommandReader::with_config(
            MockSerial::default_script(),
            Dispatcher::with_sensor(state.clone()),
            quick_config(),
        );

        let running = AtomicBool::new(true);
        let dispatched = reader.run(&running);

        assert_eq!(dispatched, 17);
        assert_eq!(state.get().as_deref(), Some(&[15, 2, 5, 85, 9, 4][..]));
        assert!(reader.decoder().queue().is_empty());
        assert_eq!(reader.get_ref().replayed(), DEFAULT_SCRIPT.len());
    }

    #[test]
    fn reading_follows_each_chunk_of_the_script() {
        let state = SensorState::new();
        let mut reader = CommandReader::for_sensor(MockSerial::default_script(), state.clone());

        let mut readings = Vec::new();
        loop {
            match reader.read_chunk() {
                Ok(events) => {
                    for event in events {
                        assert!(matches!(event, DecodeEvent::Dispatched(_)));
                        readings.push(state.get().unwrap().to_vec());
                    }
                }
                Err(ProtocolError::ConnectionClosed) => break,
                Err(err) => panic!("unexpected error: {err}"),
            }
        }

        let expected: Vec<Vec<i64>> = vec![
            vec![15, 25, 55, 85, 95, 45],
            vec![15, 25, 55, 85, 95, 45],
            vec![15, 25, 55, 85, 95, 45],
            vec![15, 25, 55, 85, 95, 45],
            vec![15, 25, 55, 85, 95, 45],
            vec![15, 25, 55, 85, 95, 45],
            vec![15, 25, 55, 85, 95, 4],
            vec![15, 25, 55, 85, 95, 4],
            vec![15, 25, 55, 85, 9, 4],
            vec![15, 25, 5, 85, 9, 4],
            vec![15, 2, 5, 85, 9, 4],
            vec![15, 2, 5, 85, 9, 4],
            vec![15, 2, 5, 85, 9, 4],
            vec![15, 2, 5, 85, 9, 4],
            vec![15, 2, 5, 85, 9, 4],
            vec![15, 2, 5, 85, 9, 4],
            vec![15, 2, 5, 85, 9, 4],
        ];
        assert_eq!(readings, expected);
    }

    #[test]
    fn empty_source_is_connection_closed() {
        let mut reader = CommandReader::for_sensor(Cursor::new(Vec::<u8>::new()), SensorState::new());
        assert!(matches!(
            reader.read_chunk(),
            Err(ProtocolError::ConnectionClosed)
        ));
    }

    #[test]
    fn small_read_size_still_decodes() {
        let state = SensorState::new();
        let config = ReaderConfig {
            read_size: 1,
            ..quick_config()
        };
        let mut reader = CommandReader::with_config(
            Cursor::new(b"sensor(8, 9);\r\n".to_vec()),
            Dispatcher::with_sensor(state.clone()),
            config,
        );

        assert_eq!(reader.run(&AtomicBool::new(true)), 1);
        assert_eq!(state.get().as_deref(), Some(&[8, 9][..]));
    }

    #[test]
    fn read_errors_are_retried_without_decoding() {
        let state = SensorState::new();
        let source = FailingThenData {
            failures: 3,
            data: Cursor::new(b"sensor(1);\r\n".to_vec()),
        };
        let mut reader =
            CommandReader::with_config(source, Dispatcher::with_sensor(state.clone()), quick_config());

        assert!(matches!(reader.read_chunk(), Err(ProtocolError::Io(_))));
        assert!(reader.decoder().queue().is_empty());

        assert_eq!(reader.run(&AtomicBool::new(true)), 1);
        assert_eq!(state.get().as_deref(), Some(&[1][..]));
        assert_eq!(reader.get_ref().failures, 0);
    }

    #[test]
    fn interrupted_read_retries() {
        let state = SensorState::new();
        let source = InterruptedThenData {
            interrupted: false,
            data: Cursor::new(b"sensor(2);\r\n".to_vec()),
        };
        let mut reader = CommandReader::for_sensor(source, state.clone());

        let events = reader.read_chunk().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(state.get().as_deref(), Some(&[2][..]));
    }

    #[test]
    fn cleared_flag_stops_before_reading() {
        let state = SensorState::new();
        let mut reader = CommandReader::for_sensor(MockSerial::default_script(), state.clone());

        assert_eq!(reader.run(&AtomicBool::new(false)), 0);
        assert!(state.get().is_none());
        assert_eq!(reader.into_inner().replayed(), 0);
    }

    #[test]
    fn run_with_reports_diagnostics() {
        let mut reader = CommandReader::with_config(
            MockSerial::new(["foo(1,2);\r\n", "sensor(1,x,3);\r\n", "sensor(4);\r\n"]),
            Dispatcher::with_sensor(SensorState::new()),
            quick_config(),
        );

        let mut diagnostics = 0;
        let dispatched = reader.run_with(&AtomicBool::new(true), |event| {
            if event.is_diagnostic() {
                diagnostics += 1;
            }
        });

        assert_eq!(dispatched, 1);
        assert_eq!(diagnostics, 2);
    }

    #[test]
    fn zero_byte_read_is_retried_by_default() {
        let state = SensorState::new();
        let running = Arc::new(AtomicBool::new(true));
        let source = HangupThenData {
            hung_up: false,
            data: Cursor::new(b"sensor(9);\r\n".to_vec()),
            running: Arc::clone(&running),
        };
        let config = ReaderConfig {
            retry_delay: Duration::ZERO,
            ..ReaderConfig::default()
        };
        assert!(!config.stop_on_eof);
        let mut reader =
            CommandReader::with_config(source, Dispatcher::with_sensor(state.clone()), config);

        assert_eq!(reader.run(&running), 1);
        assert_eq!(state.get().as_deref(), Some(&[9][..]));
    }

    #[test]
    fn stop_on_eof_ends_at_first_zero_byte_read() {
        let state = SensorState::new();
        let running = Arc::new(AtomicBool::new(true));
        let source = HangupThenData {
            hung_up: false,
            data: Cursor::new(b"sensor(9);\r\n".to_vec()),
            running: Arc::clone(&running),
        };
        let mut reader =
            CommandReader::with_config(source, Dispatcher::with_sensor(state.clone()), quick_config());

        assert_eq!(reader.run(&running), 0);
        assert!(state.get().is_none());
        assert!(running.load(Ordering::SeqCst));
    }

    /// Returns EOF once, then its data, then clears `running` at the real end.
    struct HangupThenData {
        hung_up: bool,
        data: Cursor<Vec<u8>>,
        running: Arc<AtomicBool>,
    }

    impl Read for HangupThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.hung_up {
                self.hung_up = true;
                return Ok(0);
            }
            let read = self.data.read(buf)?;
            if read == 0 {
                self.running.store(false, Ordering::SeqCst);
            }
            Ok(read)
        }
    }

    struct FailingThenData {
        failures: usize,
        data: Cursor<Vec<u8>>,
    }

    impl Read for FailingThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(std::io::Error::other("device hiccup"));
            }
            self.data.read(buf)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        data: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.read(buf)
        }
    }
}
