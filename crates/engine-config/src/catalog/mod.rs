use crate::{
    error::ConfigError,
    settings::{TapConfig, stream::StreamConfig},
};
use entry::CatalogEntry;
use model::{
    core::schema::{ObjectSchema, Property},
    execution::stream::StreamDefinition,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use types::schema_type_for;

pub mod entry;
pub mod types;

/// Stream identifier: `<database>-<name>`.
pub fn stream_id(database: &str, name: &str) -> String {
    format!("{database}-{name}")
}

/// Build the immutable definition for one configured stream.
///
/// Columns are nullable unless declared otherwise or used as a key or the
/// replication key.
pub fn stream_definition(database: &str, config: &StreamConfig) -> StreamDefinition {
    let properties = config
        .columns
        .iter()
        .map(|column| {
            let required = !column.nullable
                || config.key_properties.contains(&column.name)
                || config.replication_key.as_deref() == Some(column.name.as_str());
            Property {
                name: column.name.clone(),
                schema: schema_type_for(&column.type_name).with_nullable(!required),
            }
        })
        .collect();

    StreamDefinition {
        tap_stream_id: stream_id(database, &config.name),
        name: config.name.clone(),
        sql: config.sql.clone(),
        key_properties: config.key_properties.clone(),
        replication_key: config.replication_key.clone(),
        replication_method: config.replication_method(),
        replication_key_value_start: config.replication_key_value_start.clone(),
        schema: ObjectSchema::new(properties),
    }
}

/// Definitions for every configured stream, in configuration order.
pub fn discover(config: &TapConfig) -> Vec<StreamDefinition> {
    let defs: Vec<_> = config
        .streams
        .iter()
        .map(|s| stream_definition(&config.connection.database, s))
        .collect();
    info!("Discovered {} stream(s)", defs.len());
    defs
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub streams: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn from_definitions(defs: &[StreamDefinition]) -> Self {
        Self {
            streams: defs.iter().map(CatalogEntry::from_definition).collect(),
        }
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
        Ok(serde_json::from_str(&source)?)
    }

    pub fn get(&self, tap_stream_id: &str) -> Option<&CatalogEntry> {
        self.streams.iter().find(|e| e.tap_stream_id == tap_stream_id)
    }

    /// Apply a supplied catalog to discovered definitions: deselected
    /// streams are dropped, and the catalog's schema, replication method and
    /// replication key replace the discovered ones. Streams the catalog does
    /// not mention are kept as discovered.
    pub fn apply(&self, defs: Vec<StreamDefinition>) -> Result<Vec<StreamDefinition>, ConfigError> {
        let mut selected = Vec::with_capacity(defs.len());

        for mut def in defs {
            let Some(entry) = self.get(&def.tap_stream_id) else {
                selected.push(def);
                continue;
            };

            if !entry.is_selected() {
                info!("Stream '{}' is not selected, skipping", def.tap_stream_id);
                continue;
            }

            def.schema = entry.object_schema()?;
            def.replication_method = entry.replication_method;
            def.replication_key = entry.replication_key.clone();
            debug!(
                "Using catalog schema for '{}' ({} properties)",
                def.tap_stream_id,
                def.schema.properties.len()
            );
            selected.push(def);
        }

        Ok(selected)
    }
}
