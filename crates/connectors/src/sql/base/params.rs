use crate::sql::base::error::BindError;
use model::execution::stream::{ReplicationMethod, StreamDefinition};
use serde_json::Value as JsonValue;

/// Name of the placeholder stream SQL uses for the starting value, i.e.
/// `WHERE updated_at > :rep_key_val`.
pub const REP_KEY_PARAM: &str = "rep_key_val";

/// Parameters bound to a stream's statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum QueryParams {
    #[default]
    Empty,
    Named(Vec<(String, JsonValue)>),
}

impl QueryParams {
    fn starting_value(value: JsonValue) -> Self {
        QueryParams::Named(vec![(REP_KEY_PARAM.to_string(), value)])
    }

    pub fn is_empty(&self) -> bool {
        match self {
            QueryParams::Empty => true,
            QueryParams::Named(params) => params.is_empty(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        match self {
            QueryParams::Empty => None,
            QueryParams::Named(params) => params.iter().find(|(n, _)| n == name).map(|(_, v)| v),
        }
    }
}

fn non_null(value: Option<JsonValue>) -> Option<JsonValue> {
    value.filter(|v| !v.is_null())
}

/// Decide what, if anything, gets bound to the stream's statement.
///
/// `state_value` is the persisted replication-key value for incremental
/// streams. It takes precedence over the configured start value.
pub fn bind_params(
    stream: &StreamDefinition,
    state_value: Option<JsonValue>,
) -> Result<QueryParams, BindError> {
    if stream.sql.trim().is_empty() {
        return Err(BindError::EmptySql(stream.tap_stream_id.clone()));
    }

    let configured_start = non_null(stream.replication_key_value_start.clone());

    match stream.replication_method {
        ReplicationMethod::Incremental => {
            let key = stream
                .replication_key
                .as_deref()
                .ok_or_else(|| BindError::MissingReplicationKey(stream.tap_stream_id.clone()))?;

            let value = non_null(state_value).or(configured_start).ok_or_else(|| {
                BindError::NoStartingValue {
                    stream: stream.tap_stream_id.clone(),
                    key: key.to_string(),
                }
            })?;

            Ok(QueryParams::starting_value(value))
        }
        ReplicationMethod::FullTable => match (&stream.replication_key, configured_start) {
            (_, Some(value)) => Ok(QueryParams::starting_value(value)),
            (Some(key), None) => Err(BindError::FullTableWithoutStart {
                stream: stream.tap_stream_id.clone(),
                key: key.clone(),
            }),
            (None, None) => Ok(QueryParams::Empty),
        },
    }
}
