// src/utils/serialization.rs
//! JSON helpers used when loading certificate documents.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;

/// Deserializes a value from a JSON string.
///
/// # Note
/// The lifetime parameter lets the deserialized value borrow from the input.
pub fn deserialize<'a, T: Deserialize<'a>>(data: &'a str) -> Result<T, serde_json::Error> {
    serde_json::from_str(data)
}

/// Reads and deserializes a JSON file.
///
/// # Errors
/// Returns a message naming the file if it can't be read or parsed.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    deserialize(&text).map_err(|e| format!("failed to parse {}: {}", path.display(), e))
}
