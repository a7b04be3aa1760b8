use crate::sql::base::error::DbError;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, TimeDelta};
use model::{
    core::value::Value,
    records::record::{FieldValue, RawRecord},
};
use mysql_async::{Row, Value as MySqlValue, consts::ColumnType};
use std::str::FromStr;
use tracing::warn;

/// Collation id MySQL reports for binary strings and blobs.
const BINARY_CHARSET: u16 = 63;

pub fn decode_row(row: &Row) -> Result<RawRecord, DbError> {
    row.columns_ref()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let name = column.name_str().into_owned();
            let raw = row.as_ref(idx).cloned().unwrap_or(MySqlValue::NULL);
            let value = decode_value(&name, column.column_type(), column.character_set(), raw)?;
            Ok(FieldValue { name, value })
        })
        .collect::<Result<Vec<_>, DbError>>()
        .map(RawRecord::new)
}

/// Map a binary-protocol value to a native [`Value`], using the column type
/// where the wire value alone is ambiguous (decimals and dates travel as
/// bytes and datetimes respectively).
pub fn decode_value(
    column: &str,
    column_type: ColumnType,
    character_set: u16,
    value: MySqlValue,
) -> Result<Value, DbError> {
    let decoded = match value {
        MySqlValue::NULL => Value::Null,
        MySqlValue::Int(i) => Value::Int(i),
        MySqlValue::UInt(u) => Value::Uint(u),
        MySqlValue::Float(f) => Value::Float(widen_float(f)),
        MySqlValue::Double(d) => Value::Float(d),
        MySqlValue::Date(year, month, day, hour, minute, second, micros) => {
            let Some(date) = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
            else {
                warn!("Column '{column}' holds an invalid date {year:04}-{month:02}-{day:02}, emitting null");
                return Ok(Value::Null);
            };

            match column_type {
                ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => Value::Date(date),
                _ => date
                    .and_hms_micro_opt(hour as u32, minute as u32, second as u32, micros)
                    .map(|dt| Value::Timestamp(dt.and_utc()))
                    .ok_or_else(|| DbError::Decode {
                        column: column.to_string(),
                        reason: format!("invalid time {hour:02}:{minute:02}:{second:02}"),
                    })?,
            }
        }
        MySqlValue::Time(negative, days, hours, minutes, seconds, micros) => {
            let total_secs = days as i64 * 86_400
                + hours as i64 * 3_600
                + minutes as i64 * 60
                + seconds as i64;
            let delta = TimeDelta::seconds(total_secs) + TimeDelta::microseconds(micros as i64);
            Value::Duration(if negative { -delta } else { delta })
        }
        MySqlValue::Bytes(bytes) => decode_bytes(column, column_type, character_set, bytes)?,
    };

    Ok(decoded)
}

/// Widen through the shortest decimal form of `f` so `1.1f32` stays `1.1`.
fn widen_float(f: f32) -> f64 {
    f.to_string().parse().unwrap_or(f as f64)
}

fn decode_bytes(
    column: &str,
    column_type: ColumnType,
    character_set: u16,
    bytes: Vec<u8>,
) -> Result<Value, DbError> {
    match column_type {
        ColumnType::MYSQL_TYPE_NEWDECIMAL | ColumnType::MYSQL_TYPE_DECIMAL => {
            let text = String::from_utf8(bytes)?;
            BigDecimal::from_str(&text)
                .map(Value::Decimal)
                .map_err(|err| DbError::Decode {
                    column: column.to_string(),
                    reason: format!("'{text}' is not a decimal: {err}"),
                })
        }
        ColumnType::MYSQL_TYPE_BIT => Ok(Value::Bytes(bytes)),
        ColumnType::MYSQL_TYPE_JSON => Ok(Value::String(String::from_utf8(bytes)?)),
        _ if character_set == BINARY_CHARSET => Ok(Value::Bytes(bytes)),
        _ => Ok(Value::String(String::from_utf8(bytes)?)),
    }
}
