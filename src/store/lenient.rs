//! Tolerant field decoders for records written by older versions of the
//! service, which stored whatever the client sent.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Strings as-is, numbers and booleans as their text, anything else as "".
pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

/// Like [`text`], but null and non-scalar values are `None`.
pub fn optional_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(scalar_text(Value::deserialize(deserializer)?))
}

/// An integer or a numeric string; anything else is `None`.
pub fn optional_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Splits `"Rust, SQL,,Go "` into `["Rust", "SQL", "Go"]`.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// A list of strings, or one comma-separated string. Other shapes are empty.
pub fn string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => split_list(&s),
        Value::Array(items) => items.into_iter().filter_map(scalar_text).collect(),
        _ => Vec::new(),
    })
}

/// An integer, or a string holding one; anything else is 1.
pub fn course<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().unwrap_or(1),
        Value::String(s) => s.trim().parse().unwrap_or(1),
        _ => 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "text")]
        name: String,
        #[serde(default, deserialize_with = "string_list")]
        tags: Vec<String>,
        #[serde(default = "one", deserialize_with = "course")]
        course: i64,
        #[serde(default, deserialize_with = "optional_int")]
        owner: Option<i64>,
        #[serde(default, deserialize_with = "optional_text")]
        link: Option<String>,
    }

    fn one() -> i64 {
        1
    }

    fn decode(v: Value) -> Sample {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn text_accepts_scalars_and_blanks_the_rest() {
        assert_eq!(decode(json!({ "name": "Ada" })).name, "Ada");
        assert_eq!(decode(json!({ "name": 42 })).name, "42");
        assert_eq!(decode(json!({ "name": null })).name, "");
        assert_eq!(decode(json!({ "name": { "x": 1 } })).name, "");
        assert_eq!(decode(json!({})).name, "");
    }

    #[test]
    fn string_list_accepts_string_or_array() {
        assert_eq!(decode(json!({ "tags": "Rust, Go" })).tags, vec!["Rust", "Go"]);
        assert_eq!(decode(json!({ "tags": ["Rust", 1, null] })).tags, vec!["Rust", "1"]);
        assert!(decode(json!({ "tags": null })).tags.is_empty());
        assert!(decode(json!({ "tags": { "a": 1 } })).tags.is_empty());
    }

    #[test]
    fn course_falls_back_to_one() {
        assert_eq!(decode(json!({ "course": 3 })).course, 3);
        assert_eq!(decode(json!({ "course": "2" })).course, 2);
        assert_eq!(decode(json!({ "course": "second" })).course, 1);
        assert_eq!(decode(json!({ "course": null })).course, 1);
        assert_eq!(decode(json!({})).course, 1);
    }

    #[test]
    fn optional_fields_keep_what_they_can() {
        assert_eq!(decode(json!({ "owner": "7" })).owner, Some(7));
        assert_eq!(decode(json!({ "owner": [7] })).owner, None);
        assert_eq!(decode(json!({ "link": "https://x" })).link.as_deref(), Some("https://x"));
        assert_eq!(decode(json!({ "link": null })).link, None);
    }
}
