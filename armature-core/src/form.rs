//! Form and structured body parsing

use crate::Error;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Parse URL-encoded form data
pub fn parse_form<T: DeserializeOwned>(body: &[u8]) -> Result<T, Error> {
    serde_urlencoded::from_bytes(body)
        .map_err(|e| Error::BadRequest(format!("Failed to parse form data: {}", e)))
}

/// Parse a request body into named fields.
///
/// JSON object bodies keep their member types; form bodies yield string
/// values only. A content type naming either encoding restricts parsing to
/// it, otherwise JSON is tried before form data. Returns `None` when the body
/// is empty, is `multipart/form-data`, or cannot be read as either.
pub fn parse_body_fields(content_type: Option<&str>, body: &[u8]) -> Option<Map<String, Value>> {
    if body.is_empty() {
        return None;
    }

    let content_type = content_type.map(str::to_ascii_lowercase);
    let (try_json, try_form) = match content_type.as_deref() {
        Some(ct) if ct.starts_with("multipart/") => return None,
        Some(ct) if ct.contains("json") => (true, false),
        Some(ct) if ct.contains("application/x-www-form-urlencoded") => (false, true),
        _ => (true, true),
    };

    if try_json {
        if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) {
            return Some(map);
        }
    }

    if try_form {
        if let Ok(pairs) = parse_form::<Vec<(String, String)>>(body) {
            // First occurrence wins for repeated keys
            let mut map = Map::new();
            for (key, value) in pairs {
                map.entry(key).or_insert(Value::String(value));
            }
            return Some(map);
        }
    }

    None
}
