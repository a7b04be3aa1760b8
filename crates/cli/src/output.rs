use crate::error::CliError;
use serde::Serialize;

/// Pretty-print `value` as JSON to `path`, or to stdout when no path is given.
pub async fn write_json<T: Serialize>(value: &T, path: Option<&str>) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => tokio::fs::write(path, json).await?,
        None => println!("{json}"),
    }
    Ok(())
}
