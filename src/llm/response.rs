use serde_json::{Map, Value};

/// Outcome of trying to pull one JSON object out of free-form model text.
#[derive(Debug, Clone, PartialEq)]
pub enum Salvaged {
    Recovered(Map<String, Value>),
    Unrecoverable,
}

/// Strict parse first; failing that, parse the first `{` … last `}` span.
/// Anything that is not a JSON object is unrecoverable.
pub fn salvage_object(raw: &str) -> Salvaged {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw.trim()) {
        return Salvaged::Recovered(map);
    }

    let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) else {
        return Salvaged::Unrecoverable;
    };
    if end <= start {
        return Salvaged::Unrecoverable;
    }
    match serde_json::from_str::<Value>(&raw[start..=end]) {
        Ok(Value::Object(map)) => Salvaged::Recovered(map),
        _ => Salvaged::Unrecoverable,
    }
}

/// Why a model-derived result was replaced by the deterministic fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    /// The backend call itself failed (transport, HTTP status, missing credentials).
    Backend(String),
    /// The reply held no usable JSON object.
    Unparseable,
    /// A JSON object came back but required fields were missing or invalid.
    Invalid(String),
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackReason::Backend(e) => write!(f, "reasoning backend failed: {e}"),
            FallbackReason::Unparseable => f.write_str("response contained no JSON object"),
            FallbackReason::Invalid(why) => write!(f, "response rejected: {why}"),
        }
    }
}

/// Read a string field; numbers and booleans are stringified, anything else is ignored.
pub(crate) fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Read an array of strings, dropping non-string entries. Missing or non-array yields empty.
pub(crate) fn string_list_field(map: &Map<String, Value>, key: &str) -> Vec<String> {
    map.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
