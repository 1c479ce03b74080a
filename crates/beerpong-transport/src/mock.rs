use std::collections::VecDeque;
use std::io::Read;

use tracing::debug;

/// Chunks replayed by [`MockSerial::default_script`].
///
/// Commands are split at awkward offsets: inside the name, inside the
/// argument list, between `;` and the line ending, and between CR and LF.
/// The last complete command leaves the reading at `[15, 2, 5, 85, 9, 4]`.
pub const DEFAULT_SCRIPT: &[&str] = &[
    "sensor(15, 25, 55, ",
    "85, 95, 45);\r\n",
    "sensor(15, 25, 55, 85, 95, 45);\r\n",
    "sensor(15, 25, 55, 85, 95, 45",
    ");\r\n",
    "sensor(15, 25, 55, 85, 95, 45);\r\n",
    "senso",
    "r(15, 25, 55, 85, 95, 45);\r\n",
    "sensor(15, 25, 55, 85, 95, 45);\r\n",
    "sensor(1",
    "5, 25, 55, 85, 95, 4);\r\n",
    "sensor(15, 25, 55, 85, 95, 4);\r\n",
    "sensor(15, 25, 55, 85, 9, 4);\r\n",
    "sensor(15, 25, 5, 85, 9, 4);\r\n",
    "sensor(15, 2, 5, 85, 9, 4);\r\n",
    "sensor(15, 2, 5, 85, 9, 4);",
    "\r\nsensor(15, 2, 5, 85, 9, 4);\r",
    "\nsensor(15, 2, 5, 85, 9, 4);\r\nsensor(15, 2",
    ", 5, 85, 9, 4);\r\nsensor(15, 2, 5, 85, 9, 4);\r\nsensor(15, 2, 5, 85, 9, 4);\r\n",
];

/// A scripted byte source standing in for the serial port.
///
/// Each `read()` returns at most one scripted chunk, so chunk boundaries are
/// exactly the ones in the script. A chunk larger than the caller's buffer is
/// handed out over several reads. Reads return `Ok(0)` once the script is
/// exhausted.
#[derive(Debug, Clone, Default)]
pub struct MockSerial {
    chunks: VecDeque<Vec<u8>>,
    replayed: usize,
}

impl MockSerial {
    /// Create a source replaying `chunks` in order.
    pub fn new<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        Self {
            chunks: chunks.into_iter().map(|c| c.as_ref().to_vec()).collect(),
            replayed: 0,
        }
    }

    /// Create a source replaying [`DEFAULT_SCRIPT`].
    pub fn default_script() -> Self {
        Self::new(DEFAULT_SCRIPT.iter().map(|s| s.as_bytes()))
    }

    /// Number of chunks not yet fully handed out.
    pub fn remaining(&self) -> usize {
        self.chunks.len()
    }

    /// Number of chunks fully handed out so far.
    pub fn replayed(&self) -> usize {
        self.replayed
    }
}

impl Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let Some(chunk) = self.chunks.front_mut() else {
            return Ok(0);
        };

        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n == chunk.len() {
            self.chunks.pop_front();
            self.replayed += 1;
            debug!(replayed = self.replayed, len = n, "mock chunk replayed");
        } else {
            chunk.drain(..n);
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_chunk_per_read() {
        let mut source = MockSerial::new(["ab", "cde"]);
        let mut buf = [0u8; 16];

        assert_eq!(source.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ab");
        assert_eq!(source.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"cde");
        assert_eq!(source.read(&mut buf).unwrap(), 0);
        assert_eq!(source.replayed(), 2);
    }

    #[test]
    fn oversized_chunk_spans_reads() {
        let mut source = MockSerial::new(["abcdef"]);
        let mut buf = [0u8; 4];

        assert_eq!(source.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(source.remaining(), 1);
        assert_eq!(source.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn empty_source_is_eof() {
        let mut source = MockSerial::default();
        let mut buf = [0u8; 8];
        assert_eq!(source.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn default_script_is_replayed_verbatim() {
        let mut source = MockSerial::default_script();
        let mut replayed = Vec::new();
        source.read_to_end(&mut replayed).unwrap();

        let expected: String = DEFAULT_SCRIPT.concat();
        assert_eq!(replayed, expected.as_bytes());
        assert_eq!(source.replayed(), DEFAULT_SCRIPT.len());
    }
}
