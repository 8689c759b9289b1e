// checksum.rs — SHA-256 seal over the task collection.
//
// The seal is computed over a canonical rendering of `{"tasks": [...]}`:
// object keys sorted, `,` and `:` separators with no whitespace, UTF-8 text
// without ASCII escaping. Field insertion order in the file therefore never
// affects the checksum; only content does.
//
// SHA-256 produces a 32-byte digest, encoded as a 64-character lowercase
// hex string for JSON compatibility.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::TaskError;
use crate::task::Task;

/// The only checksum algorithm this crate writes or accepts.
pub const CHECKSUM_ALGO: &str = "sha256";

/// Hash arbitrary bytes, returning a lowercase hex-encoded SHA-256 string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Canonical text hashed by [`tasks_checksum`].
pub fn canonical_payload(tasks: &[Task]) -> Result<String, TaskError> {
    let mut root = Map::new();
    root.insert("tasks".to_string(), serde_json::to_value(tasks)?);
    let canonical = sort_keys(Value::Object(root));
    Ok(serde_json::to_string(&canonical)?)
}

/// Checksum of a task collection, as stored in `meta.checksum`.
pub fn tasks_checksum(tasks: &[Task]) -> Result<String, TaskError> {
    Ok(hash_bytes(canonical_payload(tasks)?.as_bytes()))
}

// serde_json's map may preserve insertion order depending on enabled
// features, so ordering is imposed explicitly.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sort_keys(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_known_value() {
        // SHA-256("") = e3b0c442...
        assert_eq!(
            hash_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn canonical_payload_is_compact_and_sorted() {
        let task: Task =
            serde_json::from_value(json!({"title": "Ünïcode", "id": "T-1", "extra": {"b": 1, "a": 2}}))
                .unwrap();
        assert_eq!(
            canonical_payload(&[task]).unwrap(),
            r#"{"tasks":[{"extra":{"a":2,"b":1},"id":"T-1","title":"Ünïcode"}]}"#
        );
    }

    #[test]
    fn checksum_ignores_key_order() {
        let a: Task = serde_json::from_str(r#"{"id":"T-1","title":"x","zeta":1,"alpha":2}"#).unwrap();
        let b: Task = serde_json::from_str(r#"{"alpha":2,"title":"x","zeta":1,"id":"T-1"}"#).unwrap();
        assert_eq!(tasks_checksum(&[a]).unwrap(), tasks_checksum(&[b]).unwrap());
    }

    #[test]
    fn checksum_tracks_content() {
        let a = Task::new("T-1", "First");
        let b = Task::new("T-1", "First!");
        assert_ne!(tasks_checksum(&[a]).unwrap(), tasks_checksum(&[b]).unwrap());
        assert_eq!(tasks_checksum(&[]).unwrap().len(), 64);
    }
}
