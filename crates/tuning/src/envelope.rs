//! Uniform `{status, data_source, data}` response wrapper.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_DATA_SOURCE: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Fail,
}

/// Either one payload or one payload per type name, never a mix.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EnvelopeData {
    Single(Value),
    FanOut(IndexMap<String, Value>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEnvelope {
    pub status: Status,
    pub data_source: String,
    pub data: EnvelopeData,
}

impl ResultEnvelope {
    pub fn single(data: Value) -> Self {
        Self {
            status: Status::Success,
            data_source: DEFAULT_DATA_SOURCE.to_string(),
            data: EnvelopeData::Single(data),
        }
    }

    pub fn fan_out(entries: IndexMap<String, Value>) -> Self {
        Self {
            status: Status::Success,
            data_source: DEFAULT_DATA_SOURCE.to_string(),
            data: EnvelopeData::FanOut(entries),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.data_source = source.into();
        self
    }

    /// `null`, `[]` or `{}` as the whole payload. A fan-out is never empty
    /// since it always carries the `cfg` entry.
    pub fn is_empty(&self) -> bool {
        match &self.data {
            EnvelopeData::Single(Value::Null) => true,
            EnvelopeData::Single(Value::Array(a)) => a.is_empty(),
            EnvelopeData::Single(Value::Object(o)) => o.is_empty(),
            EnvelopeData::Single(_) => false,
            EnvelopeData::FanOut(entries) => entries.is_empty(),
        }
    }

    pub fn data_value(&self) -> Value {
        match &self.data {
            EnvelopeData::Single(v) => v.clone(),
            EnvelopeData::FanOut(entries) => {
                Value::Object(entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            }
        }
    }
}

/// Accumulates fan-out results keyed by type name.
#[derive(Debug, Default)]
pub struct FanOutBuilder {
    entries: IndexMap<String, Value>,
}

impl FanOutBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `payload` under `type_name`; a repeated name replaces its entry
    /// in place.
    pub fn append(&mut self, type_name: impl Into<String>, payload: Value) {
        self.entries.insert(type_name.into(), payload);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn finish(self) -> ResultEnvelope {
        ResultEnvelope::fan_out(self.entries)
    }
}
