use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Outcome of a normalization pass. `was_fallback` is true only when the
/// caller's fallback was substituted wholesale.
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    pub value: T,
    pub was_fallback: bool,
}

/// Recover the JSON span from a model reply that may be wrapped in prose
/// or fenced-code markers. Slices from the first structural opener to the
/// matching last closer; returns the cleaned text otherwise.
pub fn repair_json(raw: &str) -> String {
    let fence = Regex::new(r"(?i)```json").unwrap();
    let cleaned = fence.replace_all(raw.trim(), "");
    let cleaned = cleaned.replace("```", "");
    let cleaned = cleaned.trim();

    let first_brace = cleaned.find('{');
    let first_bracket = cleaned.find('[');
    let start = match (first_brace, first_bracket) {
        (Some(b), Some(k)) => Some(b.min(k)),
        (Some(b), None) => Some(b),
        (None, Some(k)) => Some(k),
        (None, None) => None,
    };

    if let Some(start) = start {
        let last_brace = cleaned.rfind('}');
        let last_bracket = cleaned.rfind(']');
        let end = last_brace.max(last_bracket);
        if let Some(end) = end {
            if end >= start {
                return cleaned[start..=end].to_string();
            }
        }
    }
    cleaned.to_string()
}

/// Parse a reply into the caller's expected shape, never failing. Records
/// are shallow-merged over the fallback (parsed fields win, missing fields
/// keep their defaults); an array fallback only accepts an array reply.
pub fn parse<T>(raw: Option<&str>, fallback: T) -> Parsed<T>
where
    T: Serialize + DeserializeOwned,
{
    let give_up = |value: T| Parsed {
        value,
        was_fallback: true,
    };

    let raw = match raw {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return give_up(fallback),
    };

    let repaired = repair_json(raw);
    let parsed: Value = match serde_json::from_str(&repaired) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("reply is not valid JSON, using fallback: {e}");
            return give_up(fallback);
        }
    };

    let fallback_value = match serde_json::to_value(&fallback) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("fallback failed to serialize: {e}");
            return give_up(fallback);
        }
    };

    let merged = match (&fallback_value, parsed) {
        (Value::Array(_), Value::Array(items)) => Value::Array(items),
        (Value::Array(_), other) => {
            tracing::warn!(got = %kind_of(&other), "expected array reply, using fallback");
            return give_up(fallback);
        }
        (Value::Object(base), Value::Object(overlay)) => {
            let mut merged = base.clone();
            for (key, value) in overlay {
                merged.insert(key, value);
            }
            Value::Object(merged)
        }
        (Value::Object(_), other) => {
            tracing::warn!(got = %kind_of(&other), "expected object reply, using fallback");
            return give_up(fallback);
        }
        (_, other) => other,
    };

    match serde_json::from_value(merged) {
        Ok(value) => Parsed {
            value,
            was_fallback: false,
        },
        Err(e) => {
            tracing::warn!("merged reply did not match expected shape, using fallback: {e}");
            give_up(fallback)
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
