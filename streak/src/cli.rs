use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[clap(name = "streak", version, about = "Keeps a GitHub contribution streak alive")]
pub struct Cli {
    /// Keep all state in memory; nothing survives the process
    #[clap(long, global = true)]
    pub memory: bool,

    #[clap(subcommand)]
    pub command: Option<Action>,
}

#[derive(Debug, Subcommand)]
pub enum Action {
    /// Run the scheduler; commands are read line by line from stdin
    Run {
        /// Store this configuration file before starting
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Run one scheduled tick now and exit
    Tick,
    /// Create one commit now, bypassing the schedule
    Force,
    /// Validate and store a JSON configuration file
    Configure { path: PathBuf },
    /// Print today's state and the last commit
    Status,
    /// Print the error log, newest first
    Errors,
}

impl Cli {
    pub fn into_action(self) -> Action {
        self.command.unwrap_or(Action::Run { config: None })
    }
}
