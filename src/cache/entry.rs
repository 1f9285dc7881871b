//! Cache Entry Module
//!
//! Defines the stored form of a cached value, shared by both tiers, and its
//! flat record encoding for the distributed store.

use std::collections::HashMap;

use crate::error::{CacheError, Result};

// == Record Field Names ==
pub const FIELD_VALUE: &str = "value";
pub const FIELD_COMPRESSED: &str = "compressed";
pub const FIELD_TTL: &str = "ttl";
pub const FIELD_CREATED_AT: &str = "createdAt";

/// Longest accepted ttl in seconds (100 years). Keeps `ttl * 1000` inside an
/// i64 timestamp and inside the range Redis accepts for EXPIRE.
pub const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Accepts ttls in `1..=MAX_TTL_SECS`.
pub fn check_ttl(ttl: u64) -> Result<u64> {
    if ttl == 0 || ttl > MAX_TTL_SECS {
        return Err(CacheError::InvalidTtl(ttl));
    }
    Ok(ttl)
}

// == Cache Entry ==
/// A serialized payload plus the metadata needed to expire and decode it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Codec output (plain JSON or packed form)
    pub value: String,
    /// True if the codec compressed `value`
    pub compressed: bool,
    /// TTL in seconds assigned at write time
    pub ttl: u64,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry stamped with the current time.
    pub fn new(value: String, compressed: bool, ttl: u64) -> Self {
        Self {
            value,
            compressed,
            ttl,
            created_at: current_timestamp_ms(),
        }
    }

    /// Unix milliseconds after which the entry must not be served.
    pub fn expires_at(&self) -> i64 {
        self.created_at
            .saturating_add((self.ttl as i64).saturating_mul(1000))
    }

    // == Is Expired ==
    /// An entry is expired once `now > created_at + ttl * 1000`.
    pub fn is_expired(&self) -> bool {
        current_timestamp_ms() > self.expires_at()
    }

    /// Milliseconds left before expiry, 0 once expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        (self.expires_at() - current_timestamp_ms()).max(0) as u64
    }

    /// Whole seconds left before expiry, rounded up so a live entry never
    /// reports 0.
    pub fn ttl_remaining(&self) -> u64 {
        self.ttl_remaining_ms().div_ceil(1000)
    }

    // == Record Encoding ==
    /// Flattens the entry into the field/value pairs stored in the distributed
    /// tier. Every field is a string.
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            (FIELD_VALUE, self.value.clone()),
            (FIELD_COMPRESSED, self.compressed.to_string()),
            (FIELD_TTL, self.ttl.to_string()),
            (FIELD_CREATED_AT, self.created_at.to_string()),
        ]
    }

    /// Rebuilds an entry from a stored record.
    ///
    /// Returns `Ok(None)` for an empty record (key absent) and a codec error
    /// for a record with missing or malformed fields.
    pub fn from_fields(mut fields: HashMap<String, String>) -> Result<Option<Self>> {
        if fields.is_empty() {
            return Ok(None);
        }

        let value = fields
            .remove(FIELD_VALUE)
            .ok_or_else(|| malformed("missing value"))?;
        let compressed = match fields.get(FIELD_COMPRESSED).map(String::as_str) {
            Some("true") => true,
            Some("false") | None => false,
            Some(other) => return Err(malformed(&format!("bad compressed flag '{}'", other))),
        };
        let ttl = parse_field(&fields, FIELD_TTL)?;
        let created_at = parse_field(&fields, FIELD_CREATED_AT)?;

        Ok(Some(Self {
            value,
            compressed,
            ttl,
            created_at,
        }))
    }
}

fn parse_field<T: std::str::FromStr>(fields: &HashMap<String, String>, name: &str) -> Result<T> {
    fields
        .get(name)
        .ok_or_else(|| malformed(&format!("missing {}", name)))?
        .parse()
        .map_err(|_| malformed(&format!("bad {}", name)))
}

fn malformed(reason: &str) -> CacheError {
    CacheError::Compression(format!("malformed cache record: {}", reason))
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
