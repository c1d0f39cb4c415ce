//! Normalisation of raw caller options into a [`TuningRequest`].

use serde_json::Value;
use tracing::warn;

use crate::catalog::RequestedType;
use crate::error::{TuningError, TuningResult};

/// Everything a single tuning call operates on. Built fresh per request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TuningRequest {
    pub section: Option<String>,
    pub metadata_type: Option<RequestedType>,
    /// 0 means "not set".
    pub identifier: u64,
    pub key: Option<Value>,
    pub value: Option<Value>,
    /// The value exactly as the caller sent it, for config-file writes.
    pub raw_value: Option<String>,
}

/// Parse `raw` as JSON, falling back to the raw string.
pub fn decode_json_or_raw(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_identifier(raw: &str) -> TuningResult<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse::<u64>()
        .map_err(|_| TuningError::InvalidIdentifier(raw.to_string()))
}

fn non_empty(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl TuningRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a request from caller options, see [`TuningRequest::set_tuning_values`].
    pub fn from_options<I, K, V>(opts: I) -> TuningResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut req = Self::new();
        req.set_tuning_values(opts)?;
        Ok(req)
    }

    /// Apply caller options. Option names are matched case-insensitively
    /// against `section|s`, `type|t`, `id|i`, `key|k` and `val|v`; anything
    /// else is logged and ignored.
    ///
    /// Returns whether at least one recognised option was present.
    pub fn set_tuning_values<I, K, V>(&mut self, opts: I) -> TuningResult<bool>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut recognised = false;
        for (name, raw) in opts {
            let (name, raw) = (name.as_ref(), raw.as_ref());
            match name.to_ascii_lowercase().as_str() {
                "section" | "s" => self.section = non_empty(raw).map(str::to_string),
                "type" | "t" => {
                    self.metadata_type = match non_empty(raw) {
                        Some(token) => Some(token.parse()?),
                        None => None,
                    }
                }
                "id" | "i" => self.identifier = parse_identifier(raw)?,
                "key" | "k" => self.key = non_empty(raw).map(decode_json_or_raw),
                "val" | "v" => {
                    self.value = Some(decode_json_or_raw(raw));
                    self.raw_value = Some(raw.to_string());
                }
                _ => {
                    warn!(option = name, "ignoring unrecognised tuning option");
                    continue;
                }
            }
            recognised = true;
        }
        Ok(recognised)
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn with_type(mut self, metadata_type: RequestedType) -> Self {
        self.metadata_type = Some(metadata_type);
        self
    }

    pub fn with_identifier(mut self, id: u64) -> Self {
        self.identifier = id;
        self
    }

    pub fn with_key(mut self, key: impl Into<Value>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self.raw_value = None;
        self
    }

    /// The key as a plain name, if it is a scalar.
    pub fn key_text(&self) -> Option<String> {
        self.key.as_ref().and_then(scalar_text)
    }

    /// The value as config-file text. Caller text is used verbatim; a value
    /// set programmatically renders scalars as-is and structures as JSON.
    pub fn value_text(&self) -> String {
        if let Some(raw) = &self.raw_value {
            return raw.clone();
        }
        match &self.value {
            None | Some(Value::Null) => String::new(),
            Some(v) => scalar_text(v).unwrap_or_else(|| v.to_string()),
        }
    }

    /// Field names carried by the key: `{"fields": [..]}`, a bare array, or
    /// a single name.
    pub fn field_list(&self) -> Vec<String> {
        let items = match &self.key {
            Some(Value::Object(map)) => match map.get("fields") {
                Some(Value::Array(items)) => items.as_slice(),
                Some(single) => return scalar_text(single).into_iter().collect(),
                None => return Vec::new(),
            },
            Some(Value::Array(items)) => items.as_slice(),
            Some(other) => return scalar_text(other).into_iter().collect(),
            None => return Vec::new(),
        };
        items.iter().filter_map(scalar_text).collect()
    }

    /// Values carried by the value: `{"values": [..]}`, a bare array, or a
    /// single scalar.
    pub fn value_list(&self) -> Vec<Value> {
        match &self.value {
            Some(Value::Object(map)) => match map.get("values") {
                Some(Value::Array(items)) => items.clone(),
                Some(single) => vec![single.clone()],
                None => Vec::new(),
            },
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Null) | None => Vec::new(),
            Some(scalar) => vec![scalar.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::catalog::MetadataType;

    #[test]
    fn test_unrecognised_options_only() {
        let mut req = TuningRequest::new();
        assert!(!req.set_tuning_values([("j", "x")]).unwrap());
        assert_eq!(req, TuningRequest::default());
    }

    #[test]
    fn test_all_type() {
        let req = TuningRequest::from_options([("t", "all")]).unwrap();
        assert_eq!(req.metadata_type.unwrap().token(), "all");
    }

    #[test]
    fn test_long_and_short_aliases() {
        let long = TuningRequest::from_options([
            ("section", "mysql_database"),
            ("type", "cfg"),
            ("id", "4"),
            ("key", "db_host"),
            ("val", "10.0.0.1"),
        ])
        .unwrap();
        let short = TuningRequest::from_options([
            ("s", "mysql_database"),
            ("t", "cfg"),
            ("i", "4"),
            ("k", "db_host"),
            ("v", "10.0.0.1"),
        ])
        .unwrap();
        assert_eq!(long, short);
        assert_eq!(long.section.as_deref(), Some("mysql_database"));
        assert_eq!(long.metadata_type, Some(RequestedType::Cfg));
        assert_eq!(long.identifier, 4);
        assert_eq!(long.key_text().as_deref(), Some("db_host"));
        assert_eq!(long.value_text(), "10.0.0.1");
    }

    #[test]
    fn test_option_names_are_case_insensitive() {
        let req = TuningRequest::from_options([("TYPE", "parser"), ("I", "2")]).unwrap();
        assert_eq!(req.metadata_type, Some(RequestedType::Metadata(MetadataType::Parser)));
        assert_eq!(req.identifier, 2);
    }

    #[test]
    fn test_mixed_known_and_unknown() {
        let mut req = TuningRequest::new();
        assert!(req.set_tuning_values([("j", "x"), ("t", "regex")]).unwrap());
    }

    #[test]
    fn test_invalid_type_and_identifier() {
        assert!(matches!(
            TuningRequest::from_options([("t", "invalidMetadataType")]),
            Err(TuningError::InvalidType(_))
        ));
        assert!(matches!(
            TuningRequest::from_options([("i", "abc")]),
            Err(TuningError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            TuningRequest::from_options([("i", "-1")]),
            Err(TuningError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_empty_id_is_unset() {
        let req = TuningRequest::from_options([("i", "")]).unwrap();
        assert_eq!(req.identifier, 0);
    }

    #[test]
    fn test_json_key_and_value() {
        let req = TuningRequest::from_options([
            ("k", r#"{"fields":["parser_name","parser_desc"]}"#),
            ("v", r#"{"values":["apache",null]}"#),
        ])
        .unwrap();
        assert_eq!(req.field_list(), vec!["parser_name", "parser_desc"]);
        assert_eq!(req.value_list(), vec![json!("apache"), Value::Null]);
        assert_eq!(req.key_text(), None);
    }

    #[test]
    fn test_raw_strings_stay_raw() {
        let req = TuningRequest::from_options([("k", "host_val"), ("v", "not {json")]).unwrap();
        assert_eq!(req.key, Some(json!("host_val")));
        assert_eq!(req.value, Some(json!("not {json")));
        assert_eq!(req.field_list(), vec!["host_val"]);
        assert_eq!(req.value_list(), vec![json!("not {json")]);
    }

    #[test]
    fn test_numeric_value_text() {
        let req = TuningRequest::from_options([("v", "6380")]).unwrap();
        assert_eq!(req.value, Some(json!(6380)));
        assert_eq!(req.value_text(), "6380");
    }

    #[test]
    fn test_value_text_keeps_caller_spelling() {
        for raw in ["1e3", "1.10", "18446744073709551616", "007", " padded "] {
            let req = TuningRequest::from_options([("v", raw)]).unwrap();
            assert_eq!(req.value_text(), raw);
        }
        let req = TuningRequest::from_options([("v", "1e3")]).unwrap();
        assert_eq!(req.value, Some(json!(1000.0)));
    }

    #[test]
    fn test_bare_arrays() {
        let req = TuningRequest::new()
            .with_key(json!(["a", "b"]))
            .with_value(json!(["x"]));
        assert_eq!(req.field_list().len(), 2);
        assert_eq!(req.value_list().len(), 1);
    }
}
