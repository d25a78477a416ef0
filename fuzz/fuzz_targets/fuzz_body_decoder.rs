//! Fuzz target for incremental gzip request-body decoding.
//!
//! Split points are taken from the first input byte; whatever the input, the
//! decoder must return an error rather than panic.

#![no_main]

use bytes::Bytes;
use gitway_git::BodyDecoder;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&split, body)) = data.split_first() else {
        return;
    };
    let chunk = (split as usize).max(1);

    let mut decoder = BodyDecoder::new(Some("gzip"));
    for part in body.chunks(chunk) {
        if decoder.feed(Bytes::copy_from_slice(part)).is_err() {
            return;
        }
    }
    let _ = decoder.finish();
});
