//! Forgiving serde helpers for catalog DTOs.
//!
//! Catalog APIs are loose about types: ids flip between strings and numbers,
//! Archive.org returns either a string or an array for the same field. A type
//! mismatch on one field must not sink the whole response, so DTO fields that
//! are known to wobble go through these instead of plain `String`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::domain::value_text;

/// Any JSON value, read as display text. Non-text shapes become `None`.
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value_text(value.as_ref()))
}

/// A list of strings; anything else (including a single string) is tolerated.
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| value_text(Some(v)))
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    })
}

/// A nested object that may be missing, null or the wrong type.
pub fn opt_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// A list of records where individual entries may be malformed; bad entries
/// are dropped rather than failing the whole list.
pub fn lossy_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "opt_string")]
        name: Option<String>,
        #[serde(default, deserialize_with = "string_list")]
        tags: Vec<String>,
        #[serde(default, deserialize_with = "lossy_list")]
        items: Vec<Item>,
    }

    #[derive(Debug, Deserialize)]
    struct Item {
        n: u32,
    }

    #[test]
    fn test_wrong_types_do_not_fail() {
        let probe: Probe =
            serde_json::from_value(json!({"name": 12, "tags": "solo", "items": [{"n": 1}, {"n": "x"}, 3]}))
                .unwrap();
        assert_eq!(probe.name.as_deref(), Some("12"));
        assert_eq!(probe.tags, vec!["solo"]);
        assert_eq!(probe.items.len(), 1);
        assert_eq!(probe.items[0].n, 1);
    }

    #[test]
    fn test_missing_fields_default() {
        let probe: Probe = serde_json::from_value(json!({})).unwrap();
        assert!(probe.name.is_none());
        assert!(probe.tags.is_empty());
        assert!(probe.items.is_empty());
    }

    #[test]
    fn test_null_fields_default() {
        let probe: Probe =
            serde_json::from_value(json!({"name": null, "tags": null, "items": null})).unwrap();
        assert!(probe.name.is_none());
        assert!(probe.tags.is_empty());
    }
}
