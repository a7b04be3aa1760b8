use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchFormat {
    #[default]
    Jsonl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Gzip,
}

/// Format and compression of the files listed in a manifest entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchEncoding {
    pub format: BatchFormat,
    pub compression: Compression,
}

impl BatchEncoding {
    /// File name suffix for chunks written with this encoding.
    pub fn extension(&self) -> &'static str {
        match (self.format, self.compression) {
            (BatchFormat::Jsonl, Compression::Gzip) => ".json.gz",
        }
    }
}

impl fmt::Display for BatchEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.format, self.compression) {
            (BatchFormat::Jsonl, Compression::Gzip) => write!(f, "jsonl+gzip"),
        }
    }
}

/// Describes one sealed chunk: its encoding and where its file(s) live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub encoding: BatchEncoding,
    pub manifest: Vec<String>,
}

/// Line-oriented BATCH message announcing a manifest entry for a stream.
#[derive(Debug, Clone, Serialize)]
pub struct BatchMessage<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub stream: &'a str,
    pub encoding: &'a BatchEncoding,
    pub manifest: &'a [String],
}

impl<'a> BatchMessage<'a> {
    pub fn new(stream: &'a str, entry: &'a ManifestEntry) -> Self {
        Self {
            kind: "BATCH",
            stream,
            encoding: &entry.encoding,
            manifest: &entry.manifest,
        }
    }
}
