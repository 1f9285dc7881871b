//! Serialization Codec
//!
//! Turns values into the string payload stored in both tiers. Payloads at or
//! above the configured threshold are gzip-compressed and base64-packed so the
//! stored form stays a string; the `compressed` flag recorded next to the
//! payload decides how it is read back.

use std::io::{Read, Write};

use base64::{engine::general_purpose::STANDARD, Engine};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{de::DeserializeOwned, Serialize};

use crate::config::CompressionConfig;
use crate::error::Result;

/// Encodes and decodes cache payloads.
#[derive(Debug, Clone)]
pub struct Codec {
    compression: bool,
    threshold: usize,
}

impl Codec {
    pub fn new(config: &CompressionConfig) -> Self {
        Self {
            compression: config.enabled,
            threshold: config.threshold,
        }
    }

    /// Serializes `value` to JSON, packing it when it is large enough.
    ///
    /// Returns the payload and whether it was compressed.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<(String, bool)> {
        let json = serde_json::to_string(value)?;

        if self.compression && json.len() >= self.threshold {
            Ok((pack(json.as_bytes())?, true))
        } else {
            Ok((json, false))
        }
    }

    /// Exact inverse of [`encode`](Self::encode), driven by the stored flag.
    pub fn decode<T: DeserializeOwned>(&self, data: &str, compressed: bool) -> Result<T> {
        if compressed {
            let json = unpack(data)?;
            Ok(serde_json::from_slice(&json)?)
        } else {
            Ok(serde_json::from_str(data)?)
        }
    }
}

fn pack(bytes: &[u8]) -> Result<String> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    let gz = encoder.finish()?;
    Ok(STANDARD.encode(gz))
}

fn unpack(data: &str) -> Result<Vec<u8>> {
    let gz = STANDARD.decode(data)?;
    let mut decoder = GzDecoder::new(gz.as_slice());
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
