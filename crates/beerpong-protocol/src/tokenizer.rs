use bytes::{Bytes, BytesMut};

/// Byte that terminates a fragment (CR).
pub const RECORD_SEPARATOR: u8 = b'\r';

/// Byte elided from fragments without terminating them (LF).
pub const IGNORED: u8 = b'\n';

/// A CR-delimited, LF-elided piece of the byte stream.
pub type Fragment = Bytes;

/// Split one raw chunk into fragments.
///
/// Every CR ends the fragment accumulated since the previous CR (or the start
/// of the chunk) and is discarded. LF bytes are discarded without ending a
/// fragment. Fragments that end up empty are never emitted, so `"ab\r"`
/// yields `["ab"]` and `"\r\n"` yields nothing.
///
/// This looks at `chunk` alone; fragments that belong to a command started
/// in an earlier chunk are stitched together by the queue.
pub fn tokenize(chunk: &[u8]) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut current = BytesMut::with_capacity(chunk.len());

    for &byte in chunk {
        match byte {
            RECORD_SEPARATOR => {
                if !current.is_empty() {
                    fragments.push(current.split().freeze());
                }
            }
            IGNORED => {}
            other => current.extend_from_slice(&[other]),
        }
    }

    if !current.is_empty() {
        fragments.push(current.freeze());
    }

    fragments
}
