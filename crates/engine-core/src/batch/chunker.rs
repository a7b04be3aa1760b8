use crate::{batch::storage::BatchFs, error::BatchError};
use flate2::{Compression as GzipLevel, write::GzEncoder};
use futures::{Stream, StreamExt};
use model::records::{
    batch::{BatchEncoding, ManifestEntry},
    record::ConformedRecord,
};
use std::{
    io::{self, Write},
    num::NonZeroUsize,
};
use tracing::{debug, info};

/// The chunk currently being written.
struct OpenChunk {
    file_name: String,
    encoder: GzEncoder<Box<dyn Write + Send>>,
}

/// Groups conformed records into gzip-compressed JSONL files of at most
/// `batch_size` records each, yielding one [`ManifestEntry`] per sealed file.
///
/// Driven by the caller through [`BatchChunker::next_manifest`]; each call
/// pulls records until a chunk fills up or the source is exhausted.
pub struct BatchChunker<'a, S> {
    records: S,
    fs: &'a dyn BatchFs,
    encoding: BatchEncoding,
    prefix: String,
    sync_id: String,
    batch_size: NonZeroUsize,

    /// Index the next opened chunk gets, starting at 1.
    chunk_index: usize,
    /// Records written into `chunk`.
    pending: usize,
    chunk: Option<OpenChunk>,
    exhausted: bool,
}

impl<'a, S, E> BatchChunker<'a, S>
where
    S: Stream<Item = Result<ConformedRecord, E>> + Unpin,
    BatchError: From<E>,
{
    pub fn new(
        records: S,
        fs: &'a dyn BatchFs,
        encoding: BatchEncoding,
        prefix: impl Into<String>,
        sync_id: impl Into<String>,
        batch_size: NonZeroUsize,
    ) -> Self {
        Self {
            records,
            fs,
            encoding,
            prefix: prefix.into(),
            sync_id: sync_id.into(),
            batch_size,
            chunk_index: 1,
            pending: 0,
            chunk: None,
            exhausted: false,
        }
    }

    /// Pull records until the next chunk is sealed. `Ok(None)` once the
    /// source is exhausted and every chunk has been emitted.
    pub async fn next_manifest(&mut self) -> Result<Option<ManifestEntry>, BatchError> {
        if self.exhausted {
            return Ok(None);
        }

        while let Some(record) = self.records.next().await {
            self.append(&record?)?;

            if self.pending >= self.batch_size.get() {
                return self.seal().map(Some);
            }
        }

        self.exhausted = true;
        self.finish()
    }

    /// Drain the chunker, collecting every manifest entry.
    pub async fn collect(mut self) -> Result<Vec<ManifestEntry>, BatchError> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next_manifest().await? {
            entries.push(entry);
        }
        Ok(entries)
    }

    fn file_name(&self) -> String {
        format!(
            "{}{}-{}{}",
            self.prefix,
            self.sync_id,
            self.chunk_index,
            self.encoding.extension()
        )
    }

    fn open_chunk(&self) -> io::Result<OpenChunk> {
        let file_name = self.file_name();
        let writer = self.fs.open(&file_name)?;
        debug!("Opened chunk {} ({})", self.chunk_index, file_name);

        Ok(OpenChunk {
            file_name,
            encoder: GzEncoder::new(writer, GzipLevel::default()),
        })
    }

    fn append(&mut self, record: &ConformedRecord) -> Result<(), BatchError> {
        // A failed write drops the chunk, which closes its file handle.
        let mut chunk = match self.chunk.take() {
            Some(chunk) => chunk,
            None => self.open_chunk()?,
        };

        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        chunk.encoder.write_all(&line)?;

        self.chunk = Some(chunk);
        self.pending += 1;
        Ok(())
    }

    fn seal(&mut self) -> Result<ManifestEntry, BatchError> {
        let chunk = self.chunk.take().ok_or_else(|| {
            BatchError::InconsistentState(format!(
                "sealing chunk {} with {} pending records but no open file",
                self.chunk_index, self.pending
            ))
        })?;

        let mut writer = chunk.encoder.finish()?;
        writer.flush()?;
        drop(writer);

        let url = self.fs.url(&chunk.file_name)?;
        info!(
            "Sealed chunk {} with {} records: {}",
            self.chunk_index, self.pending, url
        );

        self.pending = 0;
        self.chunk_index += 1;

        Ok(ManifestEntry {
            encoding: self.encoding,
            manifest: vec![url],
        })
    }

    fn finish(&mut self) -> Result<Option<ManifestEntry>, BatchError> {
        match (self.pending, self.chunk.is_some()) {
            (0, false) => Ok(None),
            (n, true) if n > 0 => self.seal().map(Some),
            (n, open) => Err(BatchError::InconsistentState(format!(
                "end of input with {n} pending records and open file: {open}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::storage::LocalFs;
    use connectors::sql::base::error::DbError;
    use flate2::read::GzDecoder;
    use serde_json::{Value as JsonValue, json};
    use std::{
        io::{BufRead, BufReader},
        sync::{Arc, Mutex},
    };

    fn record(i: usize) -> ConformedRecord {
        match json!({"id": i, "name": format!("row-{i}")}) {
            JsonValue::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn records(n: usize) -> impl Stream<Item = Result<ConformedRecord, DbError>> + Unpin {
        futures::stream::iter((1..=n).map(|i| Ok(record(i))))
    }

    fn read_chunk(url: &str) -> Vec<JsonValue> {
        let path = url.strip_prefix("file://").unwrap();
        let file = std::fs::File::open(path).unwrap();
        BufReader::new(GzDecoder::new(file))
            .lines()
            .map(|line| serde_json::from_str(&line.unwrap()).unwrap())
            .collect()
    }

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    async fn run(n: usize, batch: usize, fs: &LocalFs) -> Vec<ManifestEntry> {
        BatchChunker::new(
            records(n),
            fs,
            BatchEncoding::default(),
            "",
            "app--db-t-run",
            size(batch),
        )
        .collect()
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn chunk_counts_follow_ceiling_division() {
        for (n, b) in [(0, 3), (1, 3), (3, 3), (4, 3), (7, 3), (10, 1), (5, 10_000)] {
            let dir = tempfile::tempdir().unwrap();
            let fs = LocalFs::open(dir.path()).unwrap();
            let entries = run(n, b, &fs).await;

            assert_eq!(entries.len(), n.div_ceil(b), "n={n} b={b}");

            let sizes: Vec<usize> = entries
                .iter()
                .map(|e| read_chunk(&e.manifest[0]).len())
                .collect();
            if n > 0 {
                let (last, full) = sizes.split_last().unwrap();
                assert!(full.iter().all(|s| *s == b));
                assert_eq!(*last, n - b * ((n - 1) / b));
            }
        }
    }

    #[tokio::test]
    async fn order_is_preserved_across_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs::open(dir.path()).unwrap();
        let entries = run(7, 3, &fs).await;

        let ids: Vec<JsonValue> = entries
            .iter()
            .flat_map(|e| read_chunk(&e.manifest[0]))
            .map(|r| r["id"].clone())
            .collect();
        assert_eq!(ids, (1..=7).map(|i| json!(i)).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn file_names_carry_prefix_sync_id_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs::open(dir.path()).unwrap();

        let entries = BatchChunker::new(
            records(5),
            &fs,
            BatchEncoding::default(),
            "exports/",
            "app--db-t-abc",
            size(2),
        )
        .collect()
        .await
        .unwrap();

        let names: Vec<String> = entries
            .iter()
            .map(|e| e.manifest[0].rsplit('/').next().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "app--db-t-abc-1.json.gz",
                "app--db-t-abc-2.json.gz",
                "app--db-t-abc-3.json.gz",
            ]
        );
        assert!(entries[0].manifest[0].contains("/exports/"));
        assert!(entries.iter().all(|e| e.encoding == BatchEncoding::default()));
    }

    #[tokio::test]
    async fn round_trip_preserves_records() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs::open(dir.path()).unwrap();
        let original = record(42);

        let entries = BatchChunker::new(
            futures::stream::iter(vec![Ok::<_, DbError>(original.clone())]),
            &fs,
            BatchEncoding::default(),
            "",
            "rt",
            size(10),
        )
        .collect()
        .await
        .unwrap();

        let lines = read_chunk(&entries[0].manifest[0]);
        assert_eq!(lines, vec![JsonValue::Object(original)]);
    }

    #[tokio::test]
    async fn source_errors_propagate_after_emitted_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs::open(dir.path()).unwrap();
        let items: Vec<Result<ConformedRecord, DbError>> = vec![
            Ok(record(1)),
            Ok(record(2)),
            Ok(record(3)),
            Err(DbError::Unknown("cursor closed".into())),
        ];

        let mut chunker = BatchChunker::new(
            futures::stream::iter(items),
            &fs,
            BatchEncoding::default(),
            "",
            "err",
            size(2),
        );

        assert!(chunker.next_manifest().await.unwrap().is_some());
        let err = chunker.next_manifest().await.unwrap_err();
        assert!(matches!(err, BatchError::Source(DbError::Unknown(_))));
    }

    #[tokio::test]
    async fn inconsistent_state_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs::open(dir.path()).unwrap();
        let mut chunker = BatchChunker::new(
            records(0),
            &fs,
            BatchEncoding::default(),
            "",
            "bad",
            size(2),
        );
        chunker.pending = 1;

        let err = chunker.next_manifest().await.unwrap_err();
        assert!(matches!(err, BatchError::InconsistentState(_)));
    }

    /// Storage that opens files fine but never accepts a byte.
    struct FailingFs {
        opened: Arc<Mutex<usize>>,
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("disk full"))
        }
    }

    impl BatchFs for FailingFs {
        fn open(&self, _name: &str) -> io::Result<Box<dyn Write + Send>> {
            *self.opened.lock().unwrap() += 1;
            Ok(Box::new(FailingWriter))
        }

        fn url(&self, name: &str) -> io::Result<String> {
            Ok(name.to_string())
        }
    }

    #[tokio::test]
    async fn sink_errors_propagate() {
        let fs = FailingFs {
            opened: Arc::new(Mutex::new(0)),
        };
        let result = BatchChunker::new(
            records(3),
            &fs,
            BatchEncoding::default(),
            "",
            "sink",
            size(3),
        )
        .collect()
        .await;

        assert!(matches!(result, Err(BatchError::Io(_))));
        assert_eq!(*fs.opened.lock().unwrap(), 1);
    }
}
