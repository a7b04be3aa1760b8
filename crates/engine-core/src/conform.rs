//! Schema-driven conformance of raw rows into JSON-safe records.
//!
//! Values are coerced by walking the declared [`SchemaType`] tree: temporal
//! values become ISO-8601 strings, nested JSON documents are conformed
//! property by property, and anything the schema does not declare is dropped.
//! A second pass rewrites fixed-point decimals and identifiers, which the
//! generic walk only renders textually.

use bigdecimal::ToPrimitive;
use chrono::{DateTime, NaiveTime, SecondsFormat, Timelike, Utc};
use futures::{Stream, StreamExt};
use model::{
    core::{
        schema::{ObjectSchema, SchemaType, TypeKind},
        value::Value,
    },
    execution::stream::StreamDefinition,
    records::record::{ConformedRecord, RawRecord},
};
use serde_json::{Number, Value as JsonValue};
use std::collections::HashSet;
use tracing::warn;

/// Conforms records for one sync run.
///
/// Remembers which unmapped property names it has already warned about, so
/// each name is reported once per run no matter how many rows carry it.
#[derive(Debug, Default)]
pub struct RecordConformer {
    warned: HashSet<String>,
}

impl RecordConformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names reported as unmapped so far.
    pub fn unmapped(&self) -> impl Iterator<Item = &str> {
        self.warned.iter().map(String::as_str)
    }

    pub fn conform(
        &mut self,
        stream: &str,
        schema: &ObjectSchema,
        record: &RawRecord,
    ) -> ConformedRecord {
        let mut conformed = ConformedRecord::new();

        for (name, value) in record.iter() {
            match schema.get(name) {
                Some(property) => {
                    let value = self.conform_value(stream, name, value, property);
                    conformed.insert(name.to_string(), value);
                }
                None => self.warn_unmapped(stream, name),
            }
        }

        normalize_special_values(record, &mut conformed);
        conformed
    }

    fn warn_unmapped(&mut self, stream: &str, path: &str) {
        if self.warned.insert(path.to_string()) {
            warn!(
                "Property '{}' was present in the '{}' stream but not found in catalog schema. Ignoring.",
                path, stream
            );
        }
    }

    fn conform_value(
        &mut self,
        stream: &str,
        path: &str,
        value: &Value,
        schema: &SchemaType,
    ) -> JsonValue {
        match value {
            Value::Null => JsonValue::Null,
            Value::Timestamp(ts) => JsonValue::String(iso8601(ts)),
            Value::Date(date) => JsonValue::String(iso8601(&date.and_time(NaiveTime::MIN).and_utc())),
            Value::Duration(delta) => DateTime::UNIX_EPOCH
                .checked_add_signed(*delta)
                .map_or(JsonValue::Null, |ts| JsonValue::String(iso8601(&ts))),
            Value::Time(time) => JsonValue::String(time_of_day(time)),
            Value::Bytes(bytes) => {
                if schema.is_boolean() {
                    JsonValue::Bool(bytes.as_slice() != [0u8])
                } else {
                    JsonValue::String(value.to_string())
                }
            }
            Value::Int(i) if schema.is_boolean() => JsonValue::Bool(*i != 0),
            Value::Uint(u) if schema.is_boolean() => JsonValue::Bool(*u != 0),
            Value::Int(i) => JsonValue::from(*i),
            Value::Uint(u) => JsonValue::from(*u),
            Value::Float(f) => float(*f),
            Value::Boolean(b) => JsonValue::Bool(*b),
            Value::String(s) => match &schema.kind {
                TypeKind::Object(_) | TypeKind::Array(_) => match serde_json::from_str(s) {
                    Ok(doc) => self.conform_json(stream, path, doc, schema),
                    Err(_) => JsonValue::String(s.clone()),
                },
                _ => JsonValue::String(s.clone()),
            },
            Value::Json(doc) => self.conform_json(stream, path, doc.clone(), schema),
            // rewritten by `normalize_special_values`
            Value::Decimal(_) | Value::Uuid(_) => JsonValue::String(value.to_string()),
        }
    }

    fn conform_json(
        &mut self,
        stream: &str,
        path: &str,
        value: JsonValue,
        schema: &SchemaType,
    ) -> JsonValue {
        match (&schema.kind, value) {
            (TypeKind::Object(object), JsonValue::Object(map)) => {
                let mut conformed = serde_json::Map::new();
                for (key, child) in map {
                    let child_path = format!("{path}.{key}");
                    match object.get(&key) {
                        Some(child_schema) => {
                            let child = self.conform_json(stream, &child_path, child, child_schema);
                            conformed.insert(key, child);
                        }
                        None => self.warn_unmapped(stream, &child_path),
                    }
                }
                JsonValue::Object(conformed)
            }
            (TypeKind::Array(items), JsonValue::Array(elements)) => JsonValue::Array(
                elements
                    .into_iter()
                    .map(|element| self.conform_json(stream, path, element, items))
                    .collect(),
            ),
            (TypeKind::Boolean, JsonValue::Number(n)) => {
                JsonValue::Bool(n.as_f64().is_some_and(|f| f != 0.0))
            }
            (_, other) => other,
        }
    }
}

/// Decimals become floats and identifiers their canonical hyphenated form,
/// for the properties that survived conformance.
fn normalize_special_values(record: &RawRecord, conformed: &mut ConformedRecord) {
    for (name, value) in record.iter() {
        let Some(slot) = conformed.get_mut(name) else {
            continue;
        };
        match value {
            Value::Uuid(id) => *slot = JsonValue::String(id.hyphenated().to_string()),
            Value::Decimal(d) => *slot = d.to_f64().map_or(JsonValue::Null, float),
            _ => {}
        }
    }
}

fn float(f: f64) -> JsonValue {
    Number::from_f64(f).map_or(JsonValue::Null, JsonValue::Number)
}

/// `2023-07-24T01:12:34+00:00`, with microseconds only when present.
pub fn iso8601(ts: &DateTime<Utc>) -> String {
    let format = if ts.nanosecond() == 0 {
        SecondsFormat::Secs
    } else {
        SecondsFormat::Micros
    };
    ts.to_rfc3339_opts(format, false)
}

fn time_of_day(time: &NaiveTime) -> String {
    if time.nanosecond() == 0 {
        time.format("%H:%M:%S").to_string()
    } else {
        time.format("%H:%M:%S%.6f").to_string()
    }
}

/// Lazily conform every row of `rows` against the stream's schema.
pub fn conform_records<'a, S, E>(
    rows: S,
    conformer: &'a mut RecordConformer,
    stream: &'a StreamDefinition,
) -> impl Stream<Item = Result<ConformedRecord, E>> + Send + 'a
where
    S: Stream<Item = Result<RawRecord, E>> + Send + 'a,
    E: Send + 'a,
{
    rows.map(move |row| {
        row.map(|raw| conformer.conform(&stream.tap_stream_id, &stream.schema, &raw))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::{NaiveDate, TimeDelta};
    use serde_json::json;
    use std::str::FromStr;
    use tracing_test::traced_test;
    use uuid::Uuid;

    fn temporal_schema() -> ObjectSchema {
        ObjectSchema::default()
            .with_property("timestamp_col", SchemaType::date_time())
            .with_property("date_col", SchemaType::date())
            .with_property("datetime_col", SchemaType::date_time())
            .with_property("time_col", SchemaType::time())
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2023, 7, 24)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn temporal_values_become_iso8601() {
        let record = RawRecord::default()
            .with("timestamp_col", Value::Timestamp(at(1, 12, 34)))
            .with("date_col", Value::Date(NaiveDate::from_ymd_opt(2023, 7, 24).unwrap()))
            .with("datetime_col", Value::Timestamp(at(1, 12, 34)))
            .with("time_col", Value::Duration(TimeDelta::seconds(3600 + 12 * 60 + 34)));

        let conformed = RecordConformer::new().conform("db-t", &temporal_schema(), &record);

        assert_eq!(
            JsonValue::Object(conformed),
            json!({
                "timestamp_col": "2023-07-24T01:12:34+00:00",
                "date_col": "2023-07-24T00:00:00+00:00",
                "datetime_col": "2023-07-24T01:12:34+00:00",
                "time_col": "1970-01-01T01:12:34+00:00",
            })
        );
    }

    #[test]
    fn nulls_stay_null_regardless_of_declared_type() {
        let schema = ObjectSchema::default()
            .with_property("id", SchemaType::integer().with_nullable(false))
            .with_property("name", SchemaType::string());
        let record = RawRecord::default()
            .with("id", Value::Null)
            .with("name", Value::Null);

        let conformed = RecordConformer::new().conform("db-t", &schema, &record);
        assert_eq!(conformed["id"], JsonValue::Null);
        assert_eq!(conformed["name"], JsonValue::Null);
    }

    #[test]
    fn decimal_becomes_float() {
        let schema = ObjectSchema::default().with_property("amount", SchemaType::number());
        let record = RawRecord::default().with(
            "amount",
            Value::Decimal(BigDecimal::from_str("12345.6789").unwrap()),
        );

        let conformed = RecordConformer::new().conform("db-t", &schema, &record);
        let amount = conformed["amount"].as_f64().unwrap();
        assert!(conformed["amount"].is_f64());
        assert!((amount - 12345.6789).abs() < 1e-9);
    }

    #[test]
    fn uuid_becomes_lowercase_hyphenated_string() {
        let id = Uuid::new_v4();
        let schema = ObjectSchema::default().with_property("id", SchemaType::string());
        let record = RawRecord::default().with("id", Value::Uuid(id));

        let conformed = RecordConformer::new().conform("db-t", &schema, &record);
        let rendered = conformed["id"].as_str().unwrap();
        assert_eq!(rendered, id.hyphenated().to_string());
        assert_eq!(rendered, rendered.to_lowercase());
        assert_eq!(rendered.len(), 36);
    }

    #[test]
    fn special_values_outside_schema_are_not_reintroduced() {
        let schema = ObjectSchema::default().with_property("id", SchemaType::integer());
        let record = RawRecord::default()
            .with("id", Value::Int(1))
            .with("token", Value::Uuid(Uuid::new_v4()))
            .with("price", Value::Decimal(BigDecimal::from(3)));

        let conformed = RecordConformer::new().conform("db-t", &schema, &record);
        assert_eq!(conformed.keys().collect::<Vec<_>>(), vec!["id"]);
    }

    #[traced_test]
    #[test]
    fn unmapped_property_is_warned_once_per_run() {
        let schema = ObjectSchema::default().with_property("id", SchemaType::integer());
        let mut conformer = RecordConformer::new();

        for i in 0..5 {
            let record = RawRecord::default()
                .with("id", Value::Int(i))
                .with("extra", Value::from("x"));
            let conformed = conformer.conform("db-t", &schema, &record);
            assert!(!conformed.contains_key("extra"));
        }

        logs_assert(|lines: &[&str]| {
            let hits = lines
                .iter()
                .filter(|line| line.contains("'extra'") && line.contains("not found in catalog schema"))
                .count();
            match hits {
                1 => Ok(()),
                n => Err(format!("expected 1 warning, saw {n}")),
            }
        });
        assert_eq!(conformer.unmapped().collect::<Vec<_>>(), vec!["extra"]);
    }

    #[test]
    fn booleans_from_bits_and_integers() {
        let schema = ObjectSchema::default()
            .with_property("bit_on", SchemaType::boolean())
            .with_property("bit_off", SchemaType::boolean())
            .with_property("tiny", SchemaType::boolean())
            .with_property("raw", SchemaType::string());
        let record = RawRecord::default()
            .with("bit_on", Value::Bytes(vec![1]))
            .with("bit_off", Value::Bytes(vec![0]))
            .with("tiny", Value::Int(0))
            .with("raw", Value::Bytes(vec![0xca, 0xfe]));

        let conformed = RecordConformer::new().conform("db-t", &schema, &record);
        assert_eq!(conformed["bit_on"], json!(true));
        assert_eq!(conformed["bit_off"], json!(false));
        assert_eq!(conformed["tiny"], json!(false));
        assert_eq!(conformed["raw"], json!("cafe"));
    }

    #[test]
    fn nested_documents_are_conformed_recursively() {
        let item = ObjectSchema::default()
            .with_property("sku", SchemaType::string())
            .with_property("gift", SchemaType::boolean());
        let schema = ObjectSchema::default().with_property(
            "items",
            SchemaType::array(SchemaType::object(item)),
        );
        let record = RawRecord::default().with(
            "items",
            Value::String(r#"[{"sku": "a-1", "gift": 1, "note": "drop me"}]"#.into()),
        );

        let conformed = RecordConformer::new().conform("db-t", &schema, &record);
        assert_eq!(conformed["items"], json!([{"sku": "a-1", "gift": true}]));
    }

    #[test]
    fn time_of_day_and_fractional_seconds() {
        let schema = ObjectSchema::default()
            .with_property("t", SchemaType::time())
            .with_property("ts", SchemaType::date_time());
        let ts = at(1, 12, 34) + TimeDelta::microseconds(500_000);
        let record = RawRecord::default()
            .with("t", Value::Time(NaiveTime::from_hms_opt(1, 12, 34).unwrap()))
            .with("ts", Value::Timestamp(ts));

        let conformed = RecordConformer::new().conform("db-t", &schema, &record);
        assert_eq!(conformed["t"], json!("01:12:34"));
        assert_eq!(conformed["ts"], json!("2023-07-24T01:12:34.500000+00:00"));
    }

    #[tokio::test]
    async fn conform_records_is_lazy_and_ordered() {
        use model::execution::stream::ReplicationMethod;

        let stream = StreamDefinition {
            tap_stream_id: "db-t".into(),
            name: "t".into(),
            sql: "SELECT id FROM t ORDER BY id".into(),
            key_properties: vec!["id".into()],
            replication_key: None,
            replication_method: ReplicationMethod::FullTable,
            replication_key_value_start: None,
            schema: ObjectSchema::default().with_property("id", SchemaType::integer()),
        };
        let rows = futures::stream::iter(
            (1..=3).map(|i| Ok::<_, ()>(RawRecord::default().with("id", Value::Int(i)))),
        );
        let mut conformer = RecordConformer::new();

        let out: Vec<_> = conform_records(rows, &mut conformer, &stream)
            .map(|r| r.unwrap()["id"].clone())
            .collect()
            .await;
        assert_eq!(out, vec![json!(1), json!(2), json!(3)]);
    }
}
