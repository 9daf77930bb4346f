//! Content digest helpers shared by config hashing and the artifact manifest.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::constants::manifest::HASH_READ_CHUNK;

/// Serialize a JSON value with recursively sorted object keys.
///
/// Two configs that differ only in key order hash identically.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (idx, key) in keys.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

/// SHA-256 of `input`, truncated to the first 8 hex characters.
pub fn short_digest(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
    hex[..8].to_string()
}

/// Streaming SHA-256 of a file's contents as a full hex string.
pub fn file_digest(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; HASH_READ_CHUNK];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    let digest = hasher.finalize();
    Ok(digest.iter().map(|byte| format!("{byte:02x}")).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_json_sorts_keys_recursively() {
        let scrambled = json!({"b": {"d": 2, "c": 1}, "a": [1, {"z": 0, "y": 9}]});
        assert_eq!(
            canonical_json(&scrambled),
            r#"{"a":[1,{"y":9,"z":0}],"b":{"c":1,"d":2}}"#
        );
    }

    #[test]
    fn key_order_does_not_change_digest() {
        let one = json!({"alpha": 1, "beta": 2});
        let two = json!({"beta": 2, "alpha": 1});
        assert_eq!(
            short_digest(&canonical_json(&one)),
            short_digest(&canonical_json(&two))
        );
    }

    #[test]
    fn short_digest_is_eight_hex_chars() {
        let digest = short_digest("anything");
        assert_eq!(digest.len(), 8);
        assert!(digest.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn file_digest_matches_known_vector() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("payload.bin");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(
            file_digest(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
