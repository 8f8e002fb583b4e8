//! CLI argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory of workshop definition YAML files (one `<session_id>.yaml` per session)
    #[arg(short, long, value_name = "DIR", default_value = "workshops")]
    pub workshops: PathBuf,

    /// Snapshot database directory (defaults to the platform data dir)
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands
}

#[derive(Subcommand)]
pub enum Commands {
    /// Drive one session: read JSON actions from stdin (one per line) and
    /// print each correlated result as a JSON line on stdout
    Run {
        /// Session identifier; names the definition file and the snapshot key
        session_id: String
    },
    /// Follow a session's event stream, printing each event as a JSON line
    Watch {
        /// Session identifier
        session_id: String
    },
    /// Print system health (active session count, uptime)
    Health
}
