use beerpong_protocol::{DecodeEvent, Decoder, Dispatcher, SensorState};
use beerpong_transport::DEFAULT_SCRIPT;
use tracing::{info, warn};

use crate::cmd::MockArgs;
use crate::exit::{CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_event, print_reading, OutputFormat};

/// Last reading the built-in script leaves behind.
const DEFAULT_SCRIPT_READING: &[i64] = &[15, 2, 5, 85, 9, 4];

pub fn run(args: MockArgs, format: OutputFormat) -> CliResult<i32> {
    let scripted = args.chunks.is_empty();
    let chunks: Vec<Vec<u8>> = if scripted {
        DEFAULT_SCRIPT.iter().map(|chunk| chunk.as_bytes().to_vec()).collect()
    } else {
        args.chunks.iter().map(|chunk| unescape(chunk)).collect()
    };

    let sensor = SensorState::new();
    let mut decoder = Decoder::with_config(
        Dispatcher::with_sensor(sensor.clone()),
        args.decoder.decoder_config(),
    );

    let mut dispatched = 0usize;
    let mut diagnostics = 0usize;
    for chunk in &chunks {
        for event in decoder.feed(chunk) {
            match event {
                DecodeEvent::Dispatched(_) => dispatched += 1,
                _ => diagnostics += 1,
            }
            print_event(&event, format);
        }
    }

    let reading = sensor.get();
    print_reading(reading.as_deref(), format);
    info!(
        chunks = chunks.len(),
        dispatched,
        diagnostics,
        pending = decoder.queue().buffered_bytes(),
        "mock replay finished"
    );

    if scripted && reading.as_deref() != Some(DEFAULT_SCRIPT_READING) {
        warn!(expected = ?DEFAULT_SCRIPT_READING, actual = ?reading.as_deref(), "unexpected final reading");
        return Err(CliError::new(
            DATA_INVALID,
            format!(
                "mock script ended with {:?}, expected {DEFAULT_SCRIPT_READING:?}",
                reading.as_deref()
            ),
        ));
    }

    Ok(SUCCESS)
}

/// Expand `\r`, `\n` and `\\`; any other backslash is kept as-is.
fn unescape(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut bytes = text.bytes();
    while let Some(byte) = bytes.next() {
        if byte != b'\\' {
            out.push(byte);
            continue;
        }
        match bytes.next() {
            Some(b'r') => out.push(b'\r'),
            Some(b'n') => out.push(b'\n'),
            Some(b'\\') => out.push(b'\\'),
            Some(other) => out.extend_from_slice(&[b'\\', other]),
            None => out.push(b'\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_expands_line_endings() {
        assert_eq!(unescape(r"sensor(1);\r\n"), b"sensor(1);\r\n".to_vec());
        assert_eq!(unescape(r"a\\b"), b"a\\b".to_vec());
    }

    #[test]
    fn unescape_keeps_unknown_and_trailing_backslashes() {
        assert_eq!(unescape(r"\t"), b"\\t".to_vec());
        assert_eq!(unescape("x\\"), b"x\\".to_vec());
        assert_eq!(unescape(""), Vec::<u8>::new());
    }
}
