//! Response body decoding by declared content encoding

use crate::error::FetchError;
use flate2::read::{GzDecoder, ZlibDecoder};
use std::io::Read;

const BROTLI_BUFFER_SIZE: usize = 4096;

/// Encoding declared by a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentEncoding {
    Brotli,
    Gzip,
    Deflate,
    #[default]
    Identity,
}

impl ContentEncoding {
    /// Anything unrecognized, or no header at all, is treated as raw bytes.
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("br") => ContentEncoding::Brotli,
            Some("gzip") => ContentEncoding::Gzip,
            Some("deflate") => ContentEncoding::Deflate,
            _ => ContentEncoding::Identity,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentEncoding::Brotli => "br",
            ContentEncoding::Gzip => "gzip",
            ContentEncoding::Deflate => "deflate",
            ContentEncoding::Identity => "identity",
        }
    }
}

/// Decode `body` according to `encoding`
pub fn decode_body(encoding: ContentEncoding, body: &[u8]) -> Result<Vec<u8>, FetchError> {
    let mut out = Vec::new();
    let result = match encoding {
        ContentEncoding::Identity => return Ok(body.to_vec()),
        ContentEncoding::Brotli => {
            brotli::Decompressor::new(body, BROTLI_BUFFER_SIZE).read_to_end(&mut out)
        }
        ContentEncoding::Gzip => GzDecoder::new(body).read_to_end(&mut out),
        ContentEncoding::Deflate => ZlibDecoder::new(body).read_to_end(&mut out),
    };

    result.map_err(|source| FetchError::Decode {
        encoding: encoding.as_str(),
        source,
    })?;
    Ok(out)
}
