use crate::sql::base::{
    error::{DbError, ExtractError},
    params::{QueryParams, bind_params},
};
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use model::{execution::stream::StreamDefinition, records::record::RawRecord};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

/// Lazy, single-pass sequence of source rows.
pub type RowStream<'a> = BoxStream<'a, Result<RawRecord, DbError>>;

/// Runs one statement and exposes its rows as they arrive from the cursor.
#[async_trait]
pub trait QueryExecutor: Send {
    async fn execute<'a>(
        &'a mut self,
        sql: &'a str,
        params: QueryParams,
    ) -> Result<RowStream<'a>, DbError>;
}

/// Bind the stream's parameters and execute its statement exactly once.
///
/// Binding problems surface before the executor is touched.
pub async fn extract_records<'a, E>(
    executor: &'a mut E,
    stream: &'a StreamDefinition,
    state_value: Option<JsonValue>,
) -> Result<RowStream<'a>, ExtractError>
where
    E: QueryExecutor + ?Sized,
{
    let params = bind_params(stream, state_value)?;

    info!(
        "Extracting stream '{}' ({})",
        stream.tap_stream_id, stream.replication_method
    );
    debug!("SQL: {}", stream.sql);
    debug!("Parameters: {:?}", params);

    Ok(executor.execute(&stream.sql, params).await?)
}
