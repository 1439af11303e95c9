use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "amond", about = "Amon monitoring fabric master service", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the master HTTP service.
    Serve {
        /// Path to the bootstrap config file (§6).
        #[arg(long, short = 'c')]
        config: PathBuf,

        /// Run against in-memory directory/KV stores instead of the
        /// configured LDAP directory and Redis, for local demos and
        /// smoke tests. State does not survive process restart.
        #[arg(long)]
        ephemeral: bool,
    },
}
