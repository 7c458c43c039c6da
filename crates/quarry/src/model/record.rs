//! Text records as they arrive from the queue.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fields every record carries, in the order they are written.
pub const CANONICAL_FIELDS: [&str; 6] = ["id", "ts", "text", "source", "domain", "category"];

/// One text unit to be judged.
///
/// Every canonical field is optional: producers are free to omit any of
/// them and the record still shares one schema with the rest of the batch.
/// Keys outside the canonical set are kept in [`Record::extra`] so the
/// bronze copy holds everything that arrived.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    /// Opaque identifier assigned by the producer.
    pub id: Option<String>,
    /// Origination timestamp (ISO-8601, UTC).
    pub ts: Option<String>,
    /// Raw text payload.
    pub text: Option<String>,
    /// Where the text came from (e.g. "web", "doc", "code").
    pub source: Option<String>,
    /// Content domain (e.g. "news", "social").
    pub domain: Option<String>,
    /// Topic category (e.g. "ai", "finance").
    pub category: Option<String>,
    /// Non-canonical keys, untouched.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl Record {
    /// Create a record holding only a text payload.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Set the identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the origination timestamp.
    pub fn with_ts(mut self, ts: impl Into<String>) -> Self {
        self.ts = Some(ts.into());
        self
    }

    /// Set the source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Decode one queue message.
    ///
    /// Returns `None` for anything that is not a JSON object; callers treat
    /// that as a malformed message and skip it.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice::<Value>(bytes)
            .ok()
            .and_then(Self::from_value)
    }

    /// Normalize an arbitrary JSON object into a record.
    ///
    /// Strings are kept verbatim, `null` becomes `None`, and any other
    /// scalar or nested value is kept as its JSON text.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(map) = value else {
            return None;
        };

        let mut record = Record::default();
        for (key, value) in map {
            let slot = match key.as_str() {
                "id" => &mut record.id,
                "ts" => &mut record.ts,
                "text" => &mut record.text,
                "source" => &mut record.source,
                "domain" => &mut record.domain,
                "category" => &mut record.category,
                _ => {
                    record.extra.insert(key, value);
                    continue;
                }
            };
            *slot = normalize_field(value);
        }

        Some(record)
    }
}

fn normalize_field(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_full_record() {
        let bytes = br#"{"id":"a1","ts":"2024-05-01T10:00:00","text":"hello","source":"web","domain":"news","category":"ai"}"#;
        let record = Record::decode(bytes).unwrap();

        assert_eq!(record.id.as_deref(), Some("a1"));
        assert_eq!(record.text.as_deref(), Some("hello"));
        assert_eq!(record.category.as_deref(), Some("ai"));
        assert!(record.extra.is_empty());
    }

    #[test]
    fn test_missing_fields_default_to_none() {
        let record = Record::decode(br#"{"text":"short"}"#).unwrap();

        assert_eq!(record.text.as_deref(), Some("short"));
        assert!(record.id.is_none());
        assert!(record.ts.is_none());
        assert!(record.source.is_none());
        assert!(record.domain.is_none());
        assert!(record.category.is_none());
    }

    #[test]
    fn test_heterogeneous_values_are_stringified() {
        let record = Record::from_value(json!({
            "id": 42,
            "text": null,
            "source": true,
            "domain": ["a", "b"],
        }))
        .unwrap();

        assert_eq!(record.id.as_deref(), Some("42"));
        assert!(record.text.is_none());
        assert_eq!(record.source.as_deref(), Some("true"));
        assert_eq!(record.domain.as_deref(), Some(r#"["a","b"]"#));
    }

    #[test]
    fn test_extra_keys_are_kept() {
        let record = Record::from_value(json!({"text": "x", "lang_hint": "en"})).unwrap();
        assert_eq!(record.extra.get("lang_hint"), Some(&json!("en")));

        let line = serde_json::to_string(&record).unwrap();
        let back: Record = serde_json::from_str(&line).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_malformed_messages() {
        assert!(Record::decode(b"not json").is_none());
        assert!(Record::decode(b"[1, 2, 3]").is_none());
        assert!(Record::decode(b"\"text\"").is_none());
        assert!(Record::decode(&[0xff, 0xfe]).is_none());
    }

    #[test]
    fn test_serialized_schema_is_uniform() {
        let value = serde_json::to_value(Record::new("x")).unwrap();
        let object = value.as_object().unwrap();
        for field in CANONICAL_FIELDS {
            assert!(object.contains_key(field), "missing {field}");
        }
        assert_eq!(object["id"], Value::Null);
    }
}
