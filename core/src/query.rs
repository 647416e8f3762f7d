//! Query-string encoding for list filters.
//!
//! Filters are plain `Serialize` structs whose optional fields are skipped
//! when unset, so only the keys the caller filled in reach the URL. Pairs
//! keep the struct's declaration order (`serde_json` is built with
//! `preserve_order`) and are form-urlencoded the same way `URLSearchParams`
//! encodes them.

use serde::Serialize;
use serde_json::Value;
use url::form_urlencoded;

use crate::error::ApiError;

/// Encode `filter` as `key=value&...`. Returns an empty string when no field
/// is set.
pub fn encode<F: Serialize>(filter: &F) -> Result<String, ApiError> {
    let value = serde_json::to_value(filter).map_err(|e| ApiError::Serialization(e.to_string()))?;
    let fields = match value {
        Value::Object(fields) => fields,
        Value::Null => return Ok(String::new()),
        other => {
            return Err(ApiError::Serialization(format!(
                "query filter must serialize to an object, got {other}"
            )))
        }
    };

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        match value {
            Value::Null => {}
            Value::String(s) => {
                serializer.append_pair(&key, &s);
            }
            other => {
                serializer.append_pair(&key, &other.to_string());
            }
        }
    }
    Ok(serializer.finish())
}

/// Append the encoded filter to `endpoint`, omitting the `?` when empty.
pub fn with_query<F: Serialize>(endpoint: &str, filter: &F) -> Result<String, ApiError> {
    let query = encode(filter)?;
    if query.is_empty() {
        Ok(endpoint.to_string())
    } else {
        Ok(format!("{endpoint}?{query}"))
    }
}
