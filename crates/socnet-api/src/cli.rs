// Command line options
// Decision: Everything tunable lives in env vars; the CLI only carries one-off maintenance actions

use clap::Parser;
use socnet_storage::SearchIndex;

#[derive(Debug, Clone, Parser)]
#[command(name = "socnet-api", version, about = "socnet user service")]
pub struct Cli {
    /// Create an index before serving (known: names_search)
    #[arg(long = "index-add", value_name = "NAME")]
    pub index_add: Vec<SearchIndex>,

    /// Drop an index before serving (known: names_search)
    #[arg(long = "index-drop", value_name = "NAME")]
    pub index_drop: Vec<SearchIndex>,

    /// Apply database migrations before serving
    #[arg(long)]
    pub bootstrap_schema: bool,

    /// Serve from an in-memory store instead of Postgres
    #[arg(long, env = "DEV_MODE")]
    pub dev_mode: bool,
}
