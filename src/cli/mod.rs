pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "blingo")]
#[command(about = "API-key-gated GitHub README summarization service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },

    /// Run database migrations
    Migrate,

    /// Create an API key for a user
    CreateKey {
        /// Owner email (opaque identity from the provider)
        #[arg(long)]
        email: String,

        /// Display name for the key
        #[arg(long)]
        name: Option<String>,
    },

    /// List a user's API keys with usage
    ListKeys {
        /// Owner email
        #[arg(long)]
        email: String,
    },

    /// Reset the usage counter on a key (e.g. monthly reset)
    ResetUsage {
        /// Key ID
        #[arg(long)]
        id: i64,
    },
}
