//! CLI argument definitions.

use clap::{Parser, Subcommand};

pub mod connection;

#[derive(Parser)]
#[command(name = "rguard", version, about = "Business-relay reply guard")]
pub struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Machine-readable JSON output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the webhook server
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = 8000, env = "PORT")]
        port: u16,

        /// Host address to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
    },

    /// Show registry and detector statistics
    Status,

    /// List active business connections
    Connections,
}
