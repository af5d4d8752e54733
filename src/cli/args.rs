//! CLI argument definitions using clap
//!
//! Commands:
//! - aerodoc init
//! - aerodoc meta
//! - aerodoc create <collection> --owner <id> [--file <path>]
//! - aerodoc put <uri> --owner <id> [--token <t>] [--file <path>]
//! - aerodoc get <uri> --owner <id>
//! - aerodoc get-version <uri> <token> --owner <id>
//! - aerodoc update <uri> --owner <id> --token <t> [--file <path>]
//! - aerodoc delete <uri> --owner <id> --token <t>
//! - aerodoc history <uri> --owner <id> [query flags]
//! - aerodoc scan <collection> --owner <id> [query flags]
//!
//! Every command accepts `--config <path>` (default `./aerodoc.json`).
//! Content is read from `--file`, or from stdin when omitted.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// aerodoc - a versioned, owner-scoped document store
#[derive(Parser, Debug)]
#[command(name = "aerodoc")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "./aerodoc.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize the journal directory
    Init,

    /// List hosted collection uris
    Meta,

    /// Create a document at a fresh uri
    Create {
        collection: String,
        #[arg(long)]
        owner: String,
        /// Content file (stdin if omitted)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Create at a chosen uri, or update with a token
    Put {
        uri: String,
        #[arg(long)]
        owner: String,
        #[arg(long)]
        token: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Read the current version
    Get {
        uri: String,
        #[arg(long)]
        owner: String,
    },

    /// Read one specific version
    GetVersion {
        uri: String,
        token: String,
        #[arg(long)]
        owner: String,
    },

    /// Append a new content version
    Update {
        uri: String,
        #[arg(long)]
        owner: String,
        #[arg(long)]
        token: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Append a tombstone
    Delete {
        uri: String,
        #[arg(long)]
        owner: String,
        #[arg(long)]
        token: Option<String>,
    },

    /// List every version of a document, newest first
    History {
        uri: String,
        #[arg(long)]
        owner: String,
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Query the live documents of a collection
    Scan {
        collection: String,
        #[arg(long)]
        owner: String,
        #[command(flatten)]
        query: QueryArgs,
    },
}

/// Structured query flags
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// `--filter rating ">=" 4`; repeatable, all must match
    #[arg(long = "filter", num_args = 3, value_names = ["PROPERTY", "OP", "VALUE"])]
    pub filter: Vec<String>,

    /// `--sort name` or `--sort issued:desc`; repeatable, in priority order
    #[arg(long)]
    pub sort: Vec<String>,

    /// Index of the first result
    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    /// Index one past the last result
    #[arg(long)]
    pub end: Option<usize>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
