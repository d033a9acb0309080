use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Install downloaded Linux packages with desktop integration")]
pub struct Args {
    /// Path to configuration file (defaults to <config dir>/appdrop/config.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub sub: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Install a single package and wait for it (Exit 1 = failed)
    Install { file: PathBuf },
    /// Install several packages one after another (Exit 1 = any failed)
    Batch {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Queue packages and install them when `auto_start_queue` is set
    ///
    /// The queue lives only for this invocation. Without `auto_start_queue` the files
    /// are checked and listed, then discarded on exit; use `batch` to install them.
    Queue {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the detected package format of each file
    Detect {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show recent installation attempts, newest first
    History {
        #[arg(long, short = 'n', default_value_t = 20)]
        limit: usize,

        /// Emit the entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete the installation history
    HistoryClear,
    /// Report missing system tools (Exit 1 = something is missing)
    Check,
}
