use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Print the catalog derived from the configured streams
    Discover {
        #[arg(long, help = "Config file path")]
        config: String,

        #[arg(
            long,
            help = "If specified, writes the catalog to this file instead of stdout"
        )]
        output: Option<String>,
    },
    /// Extract every selected stream into batch files
    Sync {
        #[arg(long, help = "Config file path")]
        config: String,

        #[arg(long, help = "Catalog file overriding discovered schemas and selection")]
        catalog: Option<String>,

        #[arg(
            long,
            conflicts_with = "state_dir",
            help = "JSON state file to resume from; bookmarks are kept in memory only"
        )]
        state: Option<String>,

        #[arg(long, help = "State store directory (default: ~/.sqlbatch/state)")]
        state_dir: Option<String>,
    },
    /// Open a connection to the configured database and ping it
    TestConn {
        #[arg(long, help = "Config file path")]
        config: String,
    },
    /// Inspect or edit stored bookmarks
    State {
        #[arg(long, global = true, help = "State store directory (default: ~/.sqlbatch/state)")]
        state_dir: Option<String>,

        #[command(subcommand)]
        command: StateCommand,
    },
}

#[derive(Subcommand)]
pub enum StateCommand {
    /// Print every stored bookmark
    List,
    /// Print one stream's bookmark
    Get {
        #[arg(long, help = "Stream id, e.g. mydb-orders")]
        stream: String,
    },
    /// Seed or overwrite a stream's bookmark
    Set {
        #[arg(long, help = "Stream id, e.g. mydb-orders")]
        stream: String,

        #[arg(long, help = "Replication key value as JSON, e.g. 42 or '\"2024-01-01\"'")]
        value: String,

        #[arg(long, help = "Replication key column the value belongs to")]
        replication_key: Option<String>,
    },
    /// Remove a stream's bookmark so the next run starts over
    Clear {
        #[arg(long, help = "Stream id, e.g. mydb-orders")]
        stream: String,
    },
}
