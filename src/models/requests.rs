//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::cache::MAX_TTL_SECS;

const MAX_KEY_LEN: usize = 256;

fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LEN {
        return Some(format!(
            "Key exceeds maximum length of {} characters",
            MAX_KEY_LEN
        ));
    }
    None
}

fn validate_ttl(ttl: Option<u64>) -> Option<String> {
    match ttl {
        Some(0) => Some("TTL must be at least 1 second".to_string()),
        Some(ttl) if ttl > MAX_TTL_SECS => Some(format!(
            "TTL must be at most {} seconds",
            MAX_TTL_SECS
        )),
        _ => None,
    }
}

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: Any JSON value
/// - `ttl`: Optional TTL in seconds (uses the configured default if omitted)
/// - `tags`: Invalidation tags to register the key under
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SetRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if let Some(msg) = validate_key(&self.key) {
            return Some(msg);
        }
        if let Some(msg) = validate_ttl(self.ttl) {
            return Some(msg);
        }
        if self.tags.iter().any(|tag| tag.is_empty()) {
            return Some("Tags cannot be empty".to_string());
        }
        None
    }

    pub fn tag_refs(&self) -> Vec<&str> {
        self.tags.iter().map(String::as_str).collect()
    }
}

/// Request body for POST /incr/:key. An empty body increments by 1.
#[derive(Debug, Clone, Deserialize)]
pub struct IncrementRequest {
    #[serde(default = "default_amount")]
    pub amount: i64,
    #[serde(default)]
    pub ttl: Option<u64>,
}

fn default_amount() -> i64 {
    1
}

impl Default for IncrementRequest {
    fn default() -> Self {
        Self {
            amount: default_amount(),
            ttl: None,
        }
    }
}

impl IncrementRequest {
    pub fn validate(&self, key: &str) -> Option<String> {
        if let Some(msg) = validate_key(key) {
            return Some(msg);
        }
        validate_ttl(self.ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_request_deserialize() {
        let json = r#"{"key": "test", "value": {"name": "Ada"}}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.key, "test");
        assert_eq!(req.value, json!({"name": "Ada"}));
        assert!(req.ttl.is_none());
        assert!(req.tags.is_empty());
    }

    #[test]
    fn test_set_request_with_ttl_and_tags() {
        let json = r#"{"key": "test", "value": 1, "ttl": 60, "tags": ["user"]}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ttl, Some(60));
        assert_eq!(req.tag_refs(), vec!["user"]);
    }

    #[test]
    fn test_validate_empty_key() {
        let req = SetRequest {
            key: "".to_string(),
            value: json!("test"),
            ttl: None,
            tags: Vec::new(),
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_zero_ttl() {
        let req = SetRequest {
            key: "k".to_string(),
            value: json!("test"),
            ttl: Some(0),
            tags: Vec::new(),
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_ttl_above_bound() {
        let mut req = SetRequest {
            key: "k".to_string(),
            value: json!("test"),
            ttl: Some(MAX_TTL_SECS + 1),
            tags: Vec::new(),
        };
        assert!(req.validate().is_some());

        req.ttl = Some(MAX_TTL_SECS);
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_validate_valid_request() {
        let req = SetRequest {
            key: "valid_key".to_string(),
            value: json!("test"),
            ttl: Some(60),
            tags: vec!["t".to_string()],
        };
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_increment_request_defaults() {
        let req: IncrementRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.amount, 1);
        assert!(req.ttl.is_none());
        assert!(req.validate("hits").is_none());
        assert!(req.validate("").is_some());
    }

    #[test]
    fn test_increment_request_default_adds_one() {
        let req = IncrementRequest::default();
        assert_eq!(req.amount, 1);
        assert!(req.ttl.is_none());
    }

    #[test]
    fn test_increment_request_ttl_bounds() {
        let req: IncrementRequest = serde_json::from_str(r#"{"ttl": 0}"#).unwrap();
        assert!(req.validate("hits").is_some());

        let req: IncrementRequest =
            serde_json::from_str(r#"{"amount": 2, "ttl": 18446744073709551615}"#).unwrap();
        assert!(req.validate("hits").is_some());
    }
}
