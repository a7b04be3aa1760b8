use crate::error::ConfigError;
use model::execution::stream::ReplicationMethod;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;

fn default_nullable() -> bool {
    true
}

/// One operator-authored stream: a SQL statement plus the columns it yields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    pub name: String,
    pub sql: String,
    pub key_properties: Vec<String>,

    #[serde(default)]
    pub replication_key: Option<String>,

    /// Bound as `:rep_key_val` when no bookmark exists.
    #[serde(default)]
    pub replication_key_value_start: Option<JsonValue>,

    /// Overrides the method inferred from `replication_key`.
    #[serde(default)]
    pub replication_method: Option<ReplicationMethod>,

    pub columns: Vec<ColumnConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

impl StreamConfig {
    pub fn replication_method(&self) -> ReplicationMethod {
        self.replication_method
            .unwrap_or_else(|| ReplicationMethod::infer(self.replication_key.as_deref()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidStream {
            stream: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name is empty".into()));
        }
        if self.sql.trim().is_empty() {
            return Err(invalid("sql is empty".into()));
        }
        if self.columns.is_empty() {
            return Err(invalid("no columns declared".into()));
        }
        if self.key_properties.is_empty() {
            return Err(invalid("key_properties must name at least one column".into()));
        }

        let declared = |name: &str| self.columns.iter().any(|c| c.name == name);
        for key in self.key_properties.iter().filter(|k| !declared(k.as_str())) {
            warn!(
                "Stream '{}': key property '{}' is not a declared column",
                self.name, key
            );
        }

        if self.replication_method() == ReplicationMethod::Incremental
            && self.replication_key.is_none()
        {
            return Err(invalid("INCREMENTAL replication requires a replication_key".into()));
        }

        Ok(())
    }
}
