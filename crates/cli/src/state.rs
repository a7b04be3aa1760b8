use crate::error::CliError;
use engine_core::state::{
    Bookmark, StateStore, memory::MemoryStateStore, sled_store::SledStateStore,
};
use serde_json::Value as JsonValue;
use std::path::PathBuf;
use tracing::info;

/// Resolve the state directory: the explicit one, else `~/.sqlbatch/state`.
pub fn state_dir(explicit: Option<&str>) -> Result<PathBuf, CliError> {
    match explicit {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => {
            let home = dirs::home_dir()
                .ok_or_else(|| CliError::Unexpected("Could not determine home directory".into()))?;
            Ok(home.join(".sqlbatch/state"))
        }
    }
}

pub fn open_state_store(explicit: Option<&str>) -> Result<SledStateStore, CliError> {
    let path = state_dir(explicit)?;
    let store = SledStateStore::open(&path)?;
    info!("Using state store at {}", path.display());
    Ok(store)
}

/// Either a JSON state file loaded into memory or the persistent store.
pub async fn resolve_state_store(
    state_file: Option<&str>,
    state_dir: Option<&str>,
) -> Result<Box<dyn StateStore>, CliError> {
    match state_file {
        Some(path) => {
            let source = tokio::fs::read_to_string(path).await?;
            let doc: JsonValue = serde_json::from_str(&source)?;
            info!("Loaded state from {}", path);
            Ok(Box::new(MemoryStateStore::from_state_json(&doc)?))
        }
        None => Ok(Box::new(open_state_store(state_dir)?)),
    }
}

/// Parse a value typed on the command line. Anything that is not valid JSON
/// is taken as a plain string, so `--value 2024-01-01` works unquoted.
pub fn parse_value(raw: &str) -> JsonValue {
    serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()))
}

pub async fn set_bookmark(
    store: &dyn StateStore,
    stream: &str,
    value: &str,
    replication_key: Option<String>,
) -> Result<Bookmark, CliError> {
    let bookmark = Bookmark::new(stream, replication_key, parse_value(value));
    store.save_bookmark(&bookmark).await?;
    Ok(bookmark)
}

pub async fn get_bookmark(store: &dyn StateStore, stream: &str) -> Result<Bookmark, CliError> {
    store
        .load_bookmark(stream)
        .await?
        .ok_or_else(|| CliError::NoBookmark(stream.to_string()))
}
