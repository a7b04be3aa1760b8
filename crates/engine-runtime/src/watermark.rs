use model::records::record::ConformedRecord;
use serde_json::Value as JsonValue;
use std::cmp::Ordering;

/// Highest replication-key value seen in a run.
///
/// Numbers compare numerically and strings lexically (ISO-8601 values sort
/// correctly that way). Nulls are ignored. Values of differing types cannot
/// be ordered, so the later one wins, matching the order the statement
/// returns rows in.
#[derive(Debug, Clone)]
pub struct Watermark {
    key: String,
    max: Option<JsonValue>,
}

impl Watermark {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            max: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn observe(&mut self, record: &ConformedRecord) {
        let Some(value) = record.get(&self.key).filter(|v| !v.is_null()) else {
            return;
        };

        let advance = match &self.max {
            None => true,
            Some(current) => !matches!(compare(value, current), Some(Ordering::Less | Ordering::Equal)),
        };
        if advance {
            self.max = Some(value.clone());
        }
    }

    pub fn value(&self) -> Option<&JsonValue> {
        self.max.as_ref()
    }

    pub fn into_value(self) -> Option<JsonValue> {
        self.max
    }
}

fn compare(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    match (a, b) {
        (JsonValue::Number(a), JsonValue::Number(b)) => {
            if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
                Some(a.cmp(&b))
            } else if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
                Some(a.cmp(&b))
            } else {
                a.as_f64()?.partial_cmp(&b.as_f64()?)
            }
        }
        (JsonValue::String(a), JsonValue::String(b)) => Some(a.cmp(b)),
        (JsonValue::Bool(a), JsonValue::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
