use crate::{
    commands::{Commands, StateCommand},
    error::CliError,
};
use clap::Parser;
use connectors::sql::mysql::connector::MySqlConnector;
use engine_config::{
    catalog::{Catalog, discover},
    settings::TapConfig,
};
use engine_core::state::StateStore;
use engine_runtime::runner::{SyncOptions, SyncRunner};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod conn;
mod error;
mod output;
mod state;

const APP_NAME: &str = "sqlbatch";

#[derive(Parser)]
#[command(
    name = "sqlbatch",
    version = "0.1.0",
    about = "Extract SQL query results into compressed JSONL batch files"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // stdout carries BATCH/STATE messages, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Discover { config, output } => {
            let config = TapConfig::load(&config).await?;
            let catalog = Catalog::from_definitions(&discover(&config));
            output::write_json(&catalog, output.as_deref()).await?;
        }
        Commands::Sync {
            config,
            catalog,
            state,
            state_dir,
        } => {
            run_sync(&config, catalog.as_deref(), state.as_deref(), state_dir.as_deref()).await?;
        }
        Commands::TestConn { config } => {
            let config = TapConfig::load(&config).await?;
            conn::test_connection(&config.connection).await?;
        }
        Commands::State { state_dir, command } => {
            let store = state::open_state_store(state_dir.as_deref())?;
            match command {
                StateCommand::List => {
                    output::write_json(&store.bookmarks().await?, None).await?;
                }
                StateCommand::Get { stream } => {
                    let bookmark = state::get_bookmark(&store, &stream).await?;
                    output::write_json(&bookmark, None).await?;
                }
                StateCommand::Set {
                    stream,
                    value,
                    replication_key,
                } => {
                    let bookmark =
                        state::set_bookmark(&store, &stream, &value, replication_key).await?;
                    info!(
                        "Bookmark for '{}' set to {}",
                        bookmark.stream_id, bookmark.replication_key_value
                    );
                }
                StateCommand::Clear { stream } => {
                    if store.clear_bookmark(&stream).await? {
                        info!("Cleared bookmark for '{}'", stream);
                    } else {
                        info!("No bookmark stored for '{}'", stream);
                    }
                }
            }
        }
    }

    Ok(())
}

async fn run_sync(
    config_path: &str,
    catalog_path: Option<&str>,
    state_file: Option<&str>,
    state_dir: Option<&str>,
) -> Result<(), CliError> {
    let config = TapConfig::load(config_path).await?;

    let mut streams = discover(&config);
    if let Some(path) = catalog_path {
        streams = Catalog::load(path).await?.apply(streams)?;
    }

    let store = state::resolve_state_store(state_file, state_dir).await?;

    let batch = config.batch();
    let fs = batch.storage.fs()?;
    let options = SyncOptions {
        app_name: APP_NAME.to_string(),
        batch_size: config.batch_size()?,
        encoding: batch.encoding.resolve()?,
        prefix: batch.storage.prefix().to_string(),
    };
    info!(
        "Syncing {} stream(s), {} records per {} chunk, into {}",
        streams.len(),
        options.batch_size,
        options.encoding,
        fs.root().display()
    );

    let mut conn = MySqlConnector::connect(&config.connection).await?;
    let mut out = std::io::stdout();

    let result = SyncRunner::new(store.as_ref(), &fs, options)
        .run(&mut conn, &streams, &mut out)
        .await;
    conn.disconnect().await?;

    let summaries = result?;
    let total: u64 = summaries.iter().map(|s| s.records).sum();
    info!("Synced {} stream(s), {} records", summaries.len(), total);

    Ok(())
}
