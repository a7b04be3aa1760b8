use crate::{error::SyncError, watermark::Watermark};
use connectors::sql::base::executor::{QueryExecutor, extract_records};
use engine_core::{
    batch::{chunker::BatchChunker, storage::BatchFs, sync_id},
    conform::{RecordConformer, conform_records},
    state::{Bookmark, StateStore},
};
use futures::StreamExt;
use model::{
    execution::stream::StreamDefinition,
    records::batch::{BatchEncoding, BatchMessage},
};
use serde_json::{Map, Value as JsonValue, json};
use std::{
    io::Write,
    num::NonZeroUsize,
    time::{Duration, Instant},
};
use tracing::{info, warn};

/// Settings shared by every stream of a run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Leading component of every sync id.
    pub app_name: String,
    pub batch_size: NonZeroUsize,
    pub encoding: BatchEncoding,
    /// Prepended to every chunk file name.
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamSummary {
    pub stream: String,
    pub records: u64,
    pub chunks: usize,
    pub elapsed: Duration,
    /// Bookmark persisted at the end of the stream, if any.
    pub bookmark: Option<JsonValue>,
}

/// Runs streams one after another against a single executor, writing BATCH
/// and STATE messages as JSON lines to `out`.
pub struct SyncRunner<'a> {
    state: &'a dyn StateStore,
    fs: &'a dyn BatchFs,
    options: SyncOptions,
    conformer: RecordConformer,
}

impl<'a> SyncRunner<'a> {
    pub fn new(state: &'a dyn StateStore, fs: &'a dyn BatchFs, options: SyncOptions) -> Self {
        Self {
            state,
            fs,
            options,
            conformer: RecordConformer::new(),
        }
    }

    /// Sync every stream in order. The first failure aborts the run; streams
    /// already finished keep their emitted batches and bookmarks.
    pub async fn run<E>(
        &mut self,
        executor: &mut E,
        streams: &[StreamDefinition],
        out: &mut (dyn Write + Send),
    ) -> Result<Vec<StreamSummary>, SyncError>
    where
        E: QueryExecutor + ?Sized,
    {
        let mut summaries = Vec::with_capacity(streams.len());
        for stream in streams {
            summaries.push(self.run_stream(executor, stream, out).await?);
        }

        let unmapped: Vec<&str> = self.conformer.unmapped().collect();
        if !unmapped.is_empty() {
            warn!("Columns dropped for lack of a schema property: {:?}", unmapped);
        }

        Ok(summaries)
    }

    pub async fn run_stream<E>(
        &mut self,
        executor: &mut E,
        stream: &StreamDefinition,
        out: &mut (dyn Write + Send),
    ) -> Result<StreamSummary, SyncError>
    where
        E: QueryExecutor + ?Sized,
    {
        let started = Instant::now();
        let stream_id = stream.tap_stream_id.as_str();

        let state_value = if stream.is_incremental() {
            self.state.get_starting_value(stream_id).await?
        } else {
            None
        };

        let mut watermark = stream
            .replication_key
            .as_deref()
            .filter(|_| stream.is_incremental())
            .map(Watermark::new);
        let mut records = 0u64;
        let mut chunks = 0usize;

        {
            let rows = extract_records(executor, stream, state_value).await?;
            let conformed = conform_records(rows, &mut self.conformer, stream).inspect(|item| {
                if let Ok(record) = item {
                    records += 1;
                    if let Some(w) = watermark.as_mut() {
                        w.observe(record);
                    }
                }
            });

            let conformed = std::pin::pin!(conformed);

            let mut chunker = BatchChunker::new(
                conformed,
                self.fs,
                self.options.encoding,
                self.options.prefix.as_str(),
                sync_id(&self.options.app_name, stream_id),
                self.options.batch_size,
            );

            while let Some(entry) = chunker.next_manifest().await? {
                write_line(out, &BatchMessage::new(stream_id, &entry))?;
                chunks += 1;
            }
        }

        let bookmark = match watermark {
            Some(w) => self.persist_bookmark(stream, w, out).await?,
            None => None,
        };

        let summary = StreamSummary {
            stream: stream_id.to_string(),
            records,
            chunks,
            elapsed: started.elapsed(),
            bookmark,
        };
        info!(
            "Stream '{}' done: {} records in {} chunk(s), {:.2?}",
            summary.stream, summary.records, summary.chunks, summary.elapsed
        );

        Ok(summary)
    }

    /// Store the highest replication-key value of a completed stream and
    /// announce the resulting state. An empty run leaves the bookmark as is.
    async fn persist_bookmark(
        &self,
        stream: &StreamDefinition,
        watermark: Watermark,
        out: &mut (dyn Write + Send),
    ) -> Result<Option<JsonValue>, SyncError> {
        let key = watermark.key().to_string();
        let Some(value) = watermark.into_value() else {
            info!(
                "Stream '{}' produced no '{}' values, bookmark unchanged",
                stream.tap_stream_id, key
            );
            return Ok(None);
        };

        self.state
            .save_bookmark(&Bookmark::new(
                stream.tap_stream_id.as_str(),
                Some(key),
                value.clone(),
            ))
            .await?;
        info!("Bookmark for '{}' advanced to {}", stream.tap_stream_id, value);

        let state = self.state_document().await?;
        write_line(out, &json!({"type": "STATE", "value": state}))?;

        Ok(Some(value))
    }

    /// Every stored bookmark, in the shape a state file is read back from.
    async fn state_document(&self) -> Result<JsonValue, SyncError> {
        let bookmarks = self
            .state
            .bookmarks()
            .await?
            .into_iter()
            .map(|b| {
                (
                    b.stream_id,
                    json!({
                        "replication_key": b.replication_key,
                        "replication_key_value": b.replication_key_value,
                    }),
                )
            })
            .collect::<Map<_, _>>();

        Ok(json!({ "bookmarks": bookmarks }))
    }
}

fn write_line<T: serde::Serialize + ?Sized>(
    out: &mut (dyn Write + Send),
    message: &T,
) -> Result<(), SyncError> {
    serde_json::to_writer(&mut *out, message)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use connectors::sql::base::{
        error::{BindError, DbError, ExtractError},
        executor::RowStream,
        params::QueryParams,
    };
    use engine_core::{batch::storage::LocalFs, state::memory::MemoryStateStore};
    use futures::stream;
    use model::{
        core::{
            schema::{ObjectSchema, SchemaType},
            value::Value,
        },
        execution::stream::ReplicationMethod,
        records::record::RawRecord,
    };

    struct VecExecutor {
        rows: Vec<RawRecord>,
        calls: Vec<QueryParams>,
        fail_after: Option<usize>,
    }

    impl VecExecutor {
        fn new(rows: Vec<RawRecord>) -> Self {
            Self {
                rows,
                calls: Vec::new(),
                fail_after: None,
            }
        }
    }

    #[async_trait]
    impl QueryExecutor for VecExecutor {
        async fn execute<'a>(
            &'a mut self,
            _sql: &'a str,
            params: QueryParams,
        ) -> Result<RowStream<'a>, DbError> {
            self.calls.push(params);
            let mut items: Vec<Result<RawRecord, DbError>> =
                self.rows.iter().cloned().map(Ok).collect();
            if let Some(n) = self.fail_after {
                items.truncate(n);
                items.push(Err(DbError::Unknown("connection reset".into())));
            }
            Ok(stream::iter(items).boxed())
        }
    }

    fn orders() -> StreamDefinition {
        StreamDefinition {
            tap_stream_id: "shop-orders".into(),
            name: "orders".into(),
            sql: "SELECT id, note FROM orders WHERE id > :rep_key_val ORDER BY id".into(),
            key_properties: vec!["id".into()],
            replication_key: Some("id".into()),
            replication_method: ReplicationMethod::Incremental,
            replication_key_value_start: Some(serde_json::json!(0)),
            schema: ObjectSchema::default()
                .with_property("id", SchemaType::integer().with_nullable(false))
                .with_property("note", SchemaType::string()),
        }
    }

    fn rows(ids: std::ops::RangeInclusive<i64>) -> Vec<RawRecord> {
        ids.map(|i| {
            RawRecord::default()
                .with("id", Value::Int(i))
                .with("note", Value::String(format!("n{i}")))
        })
        .collect()
    }

    fn options(batch: usize) -> SyncOptions {
        SyncOptions {
            app_name: "sqlbatch".into(),
            batch_size: NonZeroUsize::new(batch).unwrap(),
            encoding: BatchEncoding::default(),
            prefix: String::new(),
        }
    }

    fn lines(out: &[u8]) -> Vec<JsonValue> {
        String::from_utf8(out.to_vec())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn emits_batches_and_advances_bookmark() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs::open(dir.path()).unwrap();
        let state = MemoryStateStore::new();
        let mut executor = VecExecutor::new(rows(1..=5));
        let mut out = Vec::new();

        let summary = SyncRunner::new(&state, &fs, options(2))
            .run_stream(&mut executor, &orders(), &mut out)
            .await
            .unwrap();

        assert_eq!(summary.records, 5);
        assert_eq!(summary.chunks, 3);
        assert_eq!(summary.bookmark, Some(json!(5)));
        assert_eq!(executor.calls[0].get("rep_key_val"), Some(&json!(0)));

        let messages = lines(&out);
        assert_eq!(messages.len(), 4);
        assert!(messages[..3].iter().all(|m| m["type"] == "BATCH"));
        assert_eq!(messages[0]["stream"], "shop-orders");
        assert_eq!(
            messages[0]["encoding"],
            json!({"format": "jsonl", "compression": "gzip"})
        );
        assert_eq!(messages[3]["type"], "STATE");
        assert_eq!(
            messages[3]["value"]["bookmarks"]["shop-orders"]["replication_key_value"],
            json!(5)
        );

        assert_eq!(
            state.get_starting_value("shop-orders").await.unwrap(),
            Some(json!(5))
        );
    }

    #[tokio::test]
    async fn stored_bookmark_takes_precedence_over_configured_start() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs::open(dir.path()).unwrap();
        let state = MemoryStateStore::new();
        state
            .save_bookmark(&Bookmark::new("shop-orders", Some("id".into()), json!(40)))
            .await
            .unwrap();
        let mut executor = VecExecutor::new(rows(41..=42));

        let summary = SyncRunner::new(&state, &fs, options(10))
            .run_stream(&mut executor, &orders(), &mut Vec::<u8>::new())
            .await
            .unwrap();

        assert_eq!(executor.calls[0].get("rep_key_val"), Some(&json!(40)));
        assert_eq!(summary.bookmark, Some(json!(42)));
    }

    #[tokio::test]
    async fn empty_run_keeps_bookmark_and_emits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs::open(dir.path()).unwrap();
        let state = MemoryStateStore::new();
        let mut executor = VecExecutor::new(vec![]);
        let mut out = Vec::new();

        let summary = SyncRunner::new(&state, &fs, options(10))
            .run_stream(&mut executor, &orders(), &mut out)
            .await
            .unwrap();

        assert_eq!(summary.chunks, 0);
        assert_eq!(summary.bookmark, None);
        assert!(out.is_empty());
        assert!(state.bookmarks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_stream_does_not_move_bookmark() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs::open(dir.path()).unwrap();
        let state = MemoryStateStore::new();
        let mut executor = VecExecutor::new(rows(1..=5));
        executor.fail_after = Some(3);
        let mut out = Vec::new();

        let err = SyncRunner::new(&state, &fs, options(2))
            .run_stream(&mut executor, &orders(), &mut out)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Batch(_)));
        // the first full chunk was already announced
        assert_eq!(lines(&out).len(), 1);
        assert!(state.bookmarks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_starting_value_fails_before_query() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs::open(dir.path()).unwrap();
        let state = MemoryStateStore::new();
        let mut executor = VecExecutor::new(rows(1..=2));
        let mut stream = orders();
        stream.replication_key_value_start = None;

        let err = SyncRunner::new(&state, &fs, options(2))
            .run_stream(&mut executor, &stream, &mut Vec::<u8>::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::Extract(ExtractError::Config(BindError::NoStartingValue { .. }))
        ));
        assert!(executor.calls.is_empty());
    }

    #[tokio::test]
    async fn full_table_streams_ignore_state() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs::open(dir.path()).unwrap();
        let state = MemoryStateStore::new();
        state
            .save_bookmark(&Bookmark::new("shop-orders", Some("id".into()), json!(99)))
            .await
            .unwrap();
        let mut executor = VecExecutor::new(rows(1..=3));
        let mut stream = orders();
        stream.replication_key = None;
        stream.replication_method = ReplicationMethod::FullTable;
        stream.replication_key_value_start = None;

        let summaries = SyncRunner::new(&state, &fs, options(10))
            .run(&mut executor, &[stream], &mut Vec::<u8>::new())
            .await
            .unwrap();

        assert_eq!(executor.calls[0], QueryParams::Empty);
        assert_eq!(summaries[0].records, 3);
        assert_eq!(summaries[0].bookmark, None);
        assert_eq!(
            state.get_starting_value("shop-orders").await.unwrap(),
            Some(json!(99))
        );
    }
}
