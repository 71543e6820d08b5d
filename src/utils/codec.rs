//! Gzip helpers for slot payloads
//!
//! Slot files carry no magic flag for compression. Readers probe by
//! attempting decompression and fall back to the raw bytes when that fails.

use std::borrow::Cow;
use std::io::{self, Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

/// Gzip-compress `bytes` with the default compression level
pub fn gzip(bytes: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(bytes.len() / 2), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

/// Try to gunzip `bytes`; any failure yields an error
pub fn gunzip(bytes: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::with_capacity(bytes.len() * 4);
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Decompress if the input is a valid gzip stream, otherwise borrow it as-is
pub fn decode_payload(bytes: &[u8]) -> Cow<'_, [u8]> {
    match gunzip(bytes) {
        Ok(decoded) => Cow::Owned(decoded),
        Err(e) => {
            log::trace!("payload is not gzip ({}), treating as raw", e);
            Cow::Borrowed(bytes)
        }
    }
}
