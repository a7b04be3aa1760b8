use crate::error::CliError;
use connectors::sql::mysql::connector::{ConnectionConfig, MySqlConnector};
use tracing::{error, info};

/// Connect, ping and disconnect; any failure is logged and returned.
pub async fn test_connection(config: &ConnectionConfig) -> Result<(), CliError> {
    let target = format!("{}:{}/{}", config.host, config.port, config.database);
    info!("Pinging MySQL at '{}'", target);

    let mut conn = MySqlConnector::connect(config).await.map_err(|e| {
        error!("MySQL connection to '{}' failed: {}", target, e);
        e
    })?;

    conn.ping().await.map_err(|e| {
        error!("MySQL ping to '{}' failed: {}", target, e);
        e
    })?;

    conn.disconnect().await?;
    info!("MySQL ping to '{}' succeeded", target);
    Ok(())
}
