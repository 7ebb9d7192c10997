//! Content hashing utilities for cache keys.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// SHA256 of the JSON serialization of `value`. Deterministic for any two
/// equal values, which is all the template cache needs from a key.
pub fn compute_hash<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deterministic_for_equal_inputs() {
        let value = json!({"text": "{{table}}", "dialect": "SqlServer"});
        assert_eq!(compute_hash(&value).unwrap(), compute_hash(&value).unwrap());
    }

    #[test]
    fn differs_for_different_inputs() {
        let a = json!({"text": "{{table}}"});
        let b = json!({"text": "{{columns:auto}}"});
        assert_ne!(compute_hash(&a).unwrap(), compute_hash(&b).unwrap());
    }
}
