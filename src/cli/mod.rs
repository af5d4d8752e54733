//! CLI module for aerodoc
//!
//! Provides a command-line interface for:
//! - init: create the journal directory
//! - meta: list hosted collections
//! - create / put / get / get-version / update / delete: document operations
//! - history / scan: queries with structured filter, sort and window flags

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, QueryArgs};
pub use commands::{build_query, execute, init, load_config, open_store, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{document_json, read_content, result_json, write_response};
