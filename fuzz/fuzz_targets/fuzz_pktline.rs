//! Fuzz target for the pkt-line reader.
//!
//! Arbitrary input must never panic, and every data packet read back must
//! re-encode to the exact bytes it was framed from.

#![no_main]

use gitway_git::{PktLine, PktLineReader};
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let mut reader = PktLineReader::new(Cursor::new(data));
    let mut offset = 0usize;

    // bounded so crafted input cannot spin forever
    for _ in 0..256 {
        match reader.read() {
            Ok(Some(pkt)) => {
                let consumed = reader_position(&reader) - offset;
                if let (PktLine::Data(_), Ok(encoded)) = (&pkt, pkt.encode()) {
                    assert_eq!(encoded.len(), consumed);
                    assert!(data[offset..offset + consumed].eq_ignore_ascii_case(&encoded));
                }
                offset += consumed;
            }
            Ok(None) | Err(_) => break,
        }
    }
});

fn reader_position(reader: &PktLineReader<Cursor<&[u8]>>) -> usize {
    reader.get_ref().position() as usize
}
