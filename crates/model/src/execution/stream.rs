use crate::core::schema::ObjectSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplicationMethod {
    Incremental,
    FullTable,
}

impl ReplicationMethod {
    /// Incremental when a replication key is declared, full-table otherwise.
    pub fn infer(replication_key: Option<&str>) -> Self {
        match replication_key {
            Some(_) => ReplicationMethod::Incremental,
            None => ReplicationMethod::FullTable,
        }
    }
}

impl fmt::Display for ReplicationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicationMethod::Incremental => write!(f, "INCREMENTAL"),
            ReplicationMethod::FullTable => write!(f, "FULL_TABLE"),
        }
    }
}

/// Immutable description of one extractable stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDefinition {
    /// Unique identifier, `<database>-<name>`.
    pub tap_stream_id: String,
    pub name: String,
    pub sql: String,
    pub key_properties: Vec<String>,
    pub replication_key: Option<String>,
    pub replication_method: ReplicationMethod,
    /// Configured fallback starting value, bound when no state exists.
    pub replication_key_value_start: Option<serde_json::Value>,
    pub schema: ObjectSchema,
}

impl StreamDefinition {
    pub fn is_incremental(&self) -> bool {
        self.replication_method == ReplicationMethod::Incremental
    }
}
