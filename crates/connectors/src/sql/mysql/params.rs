use crate::sql::base::{error::DbError, params::QueryParams};
use mysql_async::{Params, Value as MySqlValue};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

pub struct MySqlParam(MySqlValue);

impl MySqlParam {
    /// Convert a scalar starting value into its MySQL wire representation.
    /// The column type decides how MySQL compares it, so strings stay strings.
    pub fn from_json(value: &JsonValue) -> Result<Self, DbError> {
        let param = match value {
            JsonValue::Null => MySqlValue::NULL,
            JsonValue::Bool(b) => MySqlValue::Int(if *b { 1 } else { 0 }),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    MySqlValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    MySqlValue::UInt(u)
                } else {
                    let f = n
                        .as_f64()
                        .ok_or_else(|| DbError::UnsupportedParam(n.to_string()))?;
                    MySqlValue::Double(f)
                }
            }
            JsonValue::String(s) => MySqlValue::Bytes(s.clone().into_bytes()),
            JsonValue::Array(_) | JsonValue::Object(_) => {
                return Err(DbError::UnsupportedParam(value.to_string()));
            }
        };
        Ok(MySqlParam(param))
    }
}

pub struct MySqlParamStore {
    pub params: Vec<(String, MySqlParam)>,
}

impl MySqlParamStore {
    pub fn from_query_params(params: &QueryParams) -> Result<Self, DbError> {
        let params = match params {
            QueryParams::Empty => Vec::new(),
            QueryParams::Named(named) => named
                .iter()
                .map(|(name, value)| Ok((name.clone(), MySqlParam::from_json(value)?)))
                .collect::<Result<Vec<_>, DbError>>()?,
        };
        Ok(MySqlParamStore { params })
    }

    pub fn params(&self) -> Params {
        if self.params.is_empty() {
            return Params::Empty;
        }

        let named: HashMap<Vec<u8>, MySqlValue> = self
            .params
            .iter()
            .map(|(name, p)| (name.as_bytes().to_vec(), p.0.clone()))
            .collect();
        Params::Named(named)
    }
}
