#![allow(dead_code)]

use async_trait::async_trait;
use connectors::sql::base::{
    error::DbError,
    executor::{QueryExecutor, RowStream},
    params::QueryParams,
};
use engine_config::{catalog::discover, settings::TapConfig};
use engine_core::{
    batch::storage::{BatchFs, LocalFs},
    state::StateStore,
};
use engine_runtime::{
    error::SyncError,
    runner::{StreamSummary, SyncOptions, SyncRunner},
};
use flate2::read::GzDecoder;
use futures::{StreamExt, stream};
use model::records::record::RawRecord;
use serde_json::Value as JsonValue;
use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};


/// Serves canned rows per SQL statement and records every execution.
#[derive(Default)]
pub struct FixtureExecutor {
    tables: HashMap<String, Vec<RawRecord>>,
    pub executed: Vec<(String, QueryParams)>,
}

impl FixtureExecutor {
    pub fn with_rows(mut self, sql: &str, rows: Vec<RawRecord>) -> Self {
        self.tables.insert(sql.to_string(), rows);
        self
    }
}

#[async_trait]
impl QueryExecutor for FixtureExecutor {
    async fn execute<'a>(
        &'a mut self,
        sql: &'a str,
        params: QueryParams,
    ) -> Result<RowStream<'a>, DbError> {
        self.executed.push((sql.to_string(), params));
        let rows = self
            .tables
            .get(sql)
            .cloned()
            .ok_or_else(|| DbError::Unknown(format!("no fixture for '{sql}'")))?;
        Ok(stream::iter(rows.into_iter().map(Ok)).boxed())
    }
}

/// Connection block shared by fixture configurations.
pub fn connection_json() -> JsonValue {
    serde_json::json!({
        "host": "localhost",
        "port": 3306,
        "user": "root",
        "password": "secret",
        "database": "testdb",
    })
}

/// Merge `extra` into the connection block and parse it as a configuration.
pub fn config(extra: JsonValue) -> TapConfig {
    let mut doc = connection_json();
    if let (Some(doc), JsonValue::Object(extra)) = (doc.as_object_mut(), extra) {
        doc.extend(extra);
    }
    TapConfig::from_json(&doc.to_string()).expect("valid fixture configuration")
}

/// Run every configured stream the way `sqlbatch sync` does, returning the
/// emitted message lines.
pub async fn sync(
    config: &TapConfig,
    executor: &mut FixtureExecutor,
    state: &dyn StateStore,
    fs: &dyn BatchFs,
) -> Result<(Vec<StreamSummary>, Vec<JsonValue>), SyncError> {
    let batch = config.batch();
    let options = SyncOptions {
        app_name: "sqlbatch".to_string(),
        batch_size: config.batch_size()?,
        encoding: batch.encoding.resolve()?,
        prefix: batch.storage.prefix().to_string(),
    };

    let streams = discover(config);
    let mut out = Vec::<u8>::new();
    let summaries = SyncRunner::new(state, fs, options)
        .run(executor, &streams, &mut out)
        .await?;

    let messages = String::from_utf8_lossy(&out)
        .lines()
        .map(|line| serde_json::from_str(line).expect("message line is JSON"))
        .collect();
    Ok((summaries, messages))
}

pub fn storage(dir: &Path) -> LocalFs {
    LocalFs::open(dir).expect("open storage root")
}

/// Decompress one chunk file and parse its lines.
pub fn read_chunk(url: &str) -> Vec<JsonValue> {
    let path = url.strip_prefix("file://").unwrap_or(url);
    let file = File::open(path).expect("chunk file exists");
    BufReader::new(GzDecoder::new(file))
        .lines()
        .map(|line| serde_json::from_str(&line.expect("readable line")).expect("JSON line"))
        .collect()
}

/// File locations announced by BATCH messages, in emission order.
pub fn manifest_urls(messages: &[JsonValue]) -> Vec<String> {
    messages
        .iter()
        .filter(|m| m["type"] == "BATCH")
        .flat_map(|m| m["manifest"].as_array().cloned().unwrap_or_default())
        .filter_map(|url| url.as_str().map(str::to_string))
        .collect()
}
