//! SyncBridge CLI
//!
//! Diagnostic tools for operating a SyncBridge gateway.
//!
//! # Commands
//!
//! - `assertion` - Decode an identity assertion and show its timestamps
//! - `id-to-uuid` - Convert a sync record id into its client UUID
//! - `uuid-to-id` - Convert a client UUID back into a sync record id
//! - `cache-key` - Compute the credential cache key of an assertion
//! - `heartbeat` - Check that a token server is up

mod commands;

use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the server secret for `cache-key`.
const SECRET_ENV: &str = "SYNCBRIDGE_SECRET";

/// SyncBridge diagnostic tools.
#[derive(Parser)]
#[command(name = "syncbridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode an identity assertion and show its timestamps
    Assertion {
        /// The assertion, with or without the `BrowserID ` prefix
        assertion: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Convert a sync record id into its client UUID
    IdToUuid {
        /// Base64url sync record id
        id: String,
    },

    /// Convert a client UUID back into a sync record id
    UuidToId {
        /// UUID4 record id
        uuid: String,
    },

    /// Compute the credential cache key of an assertion
    CacheKey {
        /// The assertion, with or without the `BrowserID ` prefix
        assertion: String,

        /// Server secret (defaults to $SYNCBRIDGE_SECRET)
        #[arg(short, long)]
        secret: Option<String>,
    },

    /// Check that a token server is up
    Heartbeat {
        /// Token server base URL
        #[arg(short, long, default_value = syncbridge_auth::DEFAULT_TOKEN_SERVER_URL)]
        url: String,

        /// Heartbeat timeout in seconds
        #[arg(short, long, default_value = "5")]
        timeout: u64,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Assertion { assertion, format } => {
            commands::assertion::run(&assertion, &format)?;
        }
        Commands::IdToUuid { id } => {
            commands::ids::to_uuid(&id)?;
        }
        Commands::UuidToId { uuid } => {
            commands::ids::to_sync_id(&uuid)?;
        }
        Commands::CacheKey { assertion, secret } => {
            let secret = secret
                .or_else(|| std::env::var(SECRET_ENV).ok())
                .ok_or("Server secret required: pass --secret or set SYNCBRIDGE_SECRET")?;
            commands::cache_key::run(&assertion, secret.as_bytes())?;
        }
        Commands::Heartbeat { url, timeout } => {
            commands::heartbeat::run(&url, Duration::from_secs(timeout))?;
        }
        Commands::Version => {
            println!("SyncBridge CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
