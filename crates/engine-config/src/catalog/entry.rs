use crate::error::ConfigError;
use model::{
    core::schema::ObjectSchema,
    execution::stream::{ReplicationMethod, StreamDefinition},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

/// Per-stream catalog record, as printed by `discover` and accepted back
/// through `--catalog`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub tap_stream_id: String,
    pub stream: String,
    pub table_name: String,
    pub key_properties: Vec<String>,
    pub schema: JsonValue,
    pub replication_method: ReplicationMethod,
    #[serde(default)]
    pub replication_key: Option<String>,
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub breadcrumb: Vec<String>,
    pub metadata: serde_json::Map<String, JsonValue>,
}

impl CatalogEntry {
    pub fn from_definition(def: &StreamDefinition) -> Self {
        let valid_keys: Vec<&str> = def.replication_key.as_deref().into_iter().collect();

        let mut metadata = vec![MetadataEntry {
            breadcrumb: vec![],
            metadata: object(json!({
                "inclusion": "available",
                "selected": true,
                "schema-name": def.name,
                "table-key-properties": def.key_properties,
                "forced-replication-method": def.replication_method,
                "valid-replication-keys": valid_keys,
            })),
        }];

        metadata.extend(def.schema.names().map(|name| {
            let automatic = def.key_properties.iter().any(|k| k == name)
                || def.replication_key.as_deref() == Some(name);
            MetadataEntry {
                breadcrumb: vec!["properties".to_string(), name.to_string()],
                metadata: object(json!({
                    "inclusion": if automatic { "automatic" } else { "available" },
                })),
            }
        }));

        Self {
            tap_stream_id: def.tap_stream_id.clone(),
            stream: def.tap_stream_id.clone(),
            table_name: def.name.clone(),
            key_properties: def.key_properties.clone(),
            schema: def.schema.to_json_schema(),
            replication_method: def.replication_method,
            replication_key: def.replication_key.clone(),
            metadata,
        }
    }

    /// Streams are selected unless their top-level metadata says otherwise.
    pub fn is_selected(&self) -> bool {
        self.metadata
            .iter()
            .find(|m| m.breadcrumb.is_empty())
            .and_then(|m| m.metadata.get("selected"))
            .and_then(JsonValue::as_bool)
            .unwrap_or(true)
    }

    pub fn object_schema(&self) -> Result<ObjectSchema, ConfigError> {
        Ok(ObjectSchema::from_json_schema(&self.schema, "")?)
    }
}

fn object(value: JsonValue) -> serde_json::Map<String, JsonValue> {
    match value {
        JsonValue::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}
