//! Incremental request-body decoding.
//!
//! Smart-protocol clients may gzip their request bodies. The body arrives as
//! a stream of chunks, so decoding is driven chunk by chunk: compressed bytes
//! are pushed into a write-side decoder and whatever it has inflated so far is
//! drained back out.

use crate::{GitError, Result};
use bytes::Bytes;
use flate2::write::GzDecoder;
use std::io::Write;

/// Decoder for a request body with an optional `Content-Encoding`.
pub struct BodyDecoder {
    gzip: Option<GzDecoder<Vec<u8>>>,
}

impl BodyDecoder {
    /// Creates a decoder for the given `Content-Encoding` header value.
    ///
    /// Only `gzip` triggers decoding; any other value passes bytes through.
    pub fn new(content_encoding: Option<&str>) -> Self {
        let gzip = match content_encoding {
            Some("gzip") => Some(GzDecoder::new(Vec::new())),
            _ => None,
        };
        Self { gzip }
    }

    /// Returns true when the body is being inflated.
    pub fn is_gzip(&self) -> bool {
        self.gzip.is_some()
    }

    /// Feeds one chunk of the body and returns the decoded bytes available.
    pub fn feed(&mut self, chunk: Bytes) -> Result<Bytes> {
        match self.gzip.as_mut() {
            None => Ok(chunk),
            Some(decoder) => {
                decoder
                    .write_all(&chunk)
                    .and_then(|()| decoder.flush())
                    .map_err(|e| GitError::InvalidBody(e.to_string()))?;
                Ok(Bytes::from(std::mem::take(decoder.get_mut())))
            }
        }
    }

    /// Signals the end of the body and returns any remaining decoded bytes.
    pub fn finish(&mut self) -> Result<Bytes> {
        match self.gzip.as_mut() {
            None => Ok(Bytes::new()),
            Some(decoder) => {
                decoder
                    .try_finish()
                    .map_err(|e| GitError::InvalidBody(e.to_string()))?;
                Ok(Bytes::from(std::mem::take(decoder.get_mut())))
            }
        }
    }
}
