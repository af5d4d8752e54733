//! CLI command implementations
//!
//! Each invocation loads the configuration, opens the store, runs one
//! operation, prints its result and shuts the store down. A durable store
//! must be initialized with `init` first.

use std::path::Path;

use serde_json::{json, Value};

use crate::config::StoreConfig;
use crate::mvcc::VersionToken;
use crate::observability::{log_event_with_fields, Event, Logger};
use crate::query::{
    ComparisonOp, Literal, Predicate, Query, Slice, SortDirection, SortField, SortKey,
};
use crate::storage::JOURNAL_FILE;
use crate::store::{DocumentStore, StoreResult};

use super::args::{Command, QueryArgs};
use super::errors::{CliError, CliResult};
use super::io::{read_content, result_json, write_response};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(&cli.config, cli.command)
}

/// Run one command against the configured store
pub fn run_command(config_path: &Path, cmd: Command) -> CliResult<()> {
    let config = load_config(config_path)?;

    match cmd {
        Command::Init => {
            let data_dir = init(&config)?;
            write_response(&json!({"initialized": true, "data_dir": data_dir}))
        }
        Command::Meta => {
            let store = open_store(&config)?;
            let meta = store.meta();
            close_store(&store)?;
            write_response(&json!({"collections": meta}))
        }
        cmd => {
            let store = open_store(&config)?;
            let result = execute(&store, cmd);
            close_store(&store)?;

            let result = result?;
            write_response(&result_json(&result))?;
            if result.is_success() {
                Ok(())
            } else {
                Err(CliError::refused(result.status))
            }
        }
    }
}

/// Load, validate and apply the configuration.
pub fn load_config(config_path: &Path) -> CliResult<StoreConfig> {
    let config = StoreConfig::load(config_path)?;
    Logger::set_min_severity(config.severity()?);
    log_event_with_fields(
        Event::ConfigLoaded,
        &[("path", config_path.display().to_string().as_str())],
    );
    Ok(config)
}

/// Create the journal directory and an empty journal.
///
/// Returns the data directory.
pub fn init(config: &StoreConfig) -> CliResult<String> {
    let data_dir = config
        .data_dir
        .as_deref()
        .ok_or_else(|| CliError::config_error("data_dir is not set; nothing to initialize"))?;

    if is_initialized(data_dir) {
        return Err(CliError::already_initialized());
    }

    let store =
        DocumentStore::open(config).map_err(|e| CliError::open_failed(e.to_string()))?;
    close_store(&store)?;

    Ok(data_dir.display().to_string())
}

/// Open the configured store; a durable store needs an existing journal.
pub fn open_store(config: &StoreConfig) -> CliResult<DocumentStore> {
    if let Some(data_dir) = &config.data_dir {
        if !is_initialized(data_dir) {
            return Err(CliError::not_initialized());
        }
    }
    DocumentStore::open(config).map_err(|e| CliError::open_failed(e.to_string()))
}

fn close_store(store: &DocumentStore) -> CliResult<()> {
    store
        .shutdown()
        .map_err(|e| CliError::io_error(format!("Failed to flush store: {}", e)))
}

/// Run a document command. `init` and `meta` are handled by `run_command`.
pub fn execute(store: &DocumentStore, cmd: Command) -> CliResult<StoreResult> {
    let result = match cmd {
        Command::Create {
            collection,
            owner,
            file,
        } => store.create(&collection, &owner, &read_content(file.as_deref())?),
        Command::Put {
            uri,
            owner,
            token,
            file,
        } => {
            let content = read_content(file.as_deref())?;
            store.put(&uri, &owner, &content, token.map(VersionToken::new).as_ref())
        }
        Command::Get { uri, owner } => store.read(&uri, &owner),
        Command::GetVersion { uri, token, owner } => {
            store.read_version(&uri, &owner, &VersionToken::new(token))
        }
        Command::Update {
            uri,
            owner,
            token,
            file,
        } => {
            let content = read_content(file.as_deref())?;
            store.update(&uri, &owner, &content, token.map(VersionToken::new).as_ref())
        }
        Command::Delete { uri, owner, token } => {
            store.delete(&uri, &owner, token.map(VersionToken::new).as_ref())
        }
        Command::History { uri, owner, query } => store.history(&uri, &owner, &build_query(&query)?),
        Command::Scan {
            collection,
            owner,
            query,
        } => store.scan(&collection, &owner, &build_query(&query)?),
        Command::Init | Command::Meta => {
            return Err(CliError::invalid_argument(
                "init and meta do not operate on documents",
            ))
        }
    };
    Ok(result)
}

/// Build a query tree from structured flags.
///
/// Filters are ANDed. Each filter value is read as a JSON scalar when it
/// parses as one (`4`, `true`, `"4"`), and as a plain string otherwise.
pub fn build_query(args: &QueryArgs) -> CliResult<Query> {
    let mut query = Query::new();

    if args.filter.len() % 3 != 0 {
        return Err(CliError::invalid_argument(
            "--filter takes PROPERTY OP VALUE",
        ));
    }
    let mut clauses = args
        .filter
        .chunks(3)
        .map(|chunk| -> CliResult<Predicate> {
            let op = chunk[1].parse::<ComparisonOp>().map_err(CliError::invalid_argument)?;
            Ok(Predicate::compare(chunk[0].as_str(), op, parse_literal(&chunk[2])))
        })
        .collect::<CliResult<Vec<_>>>()?;
    let filter = match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(Predicate::and(clauses)),
    };
    if let Some(filter) = filter {
        query = query.with_filter(filter);
    }

    for spec in &args.sort {
        query = query.with_sort(parse_sort_key(spec)?);
    }

    query = query.with_slice(match args.end {
        Some(end) => Slice::new(args.offset, end),
        None => Slice::starting_at(args.offset),
    });

    Ok(query)
}

fn parse_literal(raw: &str) -> Literal {
    serde_json::from_str::<Value>(raw)
        .ok()
        .as_ref()
        .and_then(Literal::from_json)
        .unwrap_or_else(|| Literal::String(raw.to_string()))
}

fn parse_sort_key(spec: &str) -> CliResult<SortKey> {
    let (name, direction) = match spec.rsplit_once(':') {
        Some((name, "asc")) => (name, SortDirection::Asc),
        Some((name, "desc")) => (name, SortDirection::Desc),
        Some((_, other)) => {
            return Err(CliError::invalid_argument(format!(
                "unknown sort direction '{}' (expected asc or desc)",
                other
            )))
        }
        None => (spec, SortDirection::Asc),
    };
    if name.is_empty() {
        return Err(CliError::invalid_argument("empty sort property"));
    }
    Ok(SortKey {
        field: SortField::named(name),
        direction,
    })
}

fn is_initialized(data_dir: &Path) -> bool {
    data_dir.join(JOURNAL_FILE).exists()
}
