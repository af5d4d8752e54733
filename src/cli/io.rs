//! JSON I/O handling for CLI
//!
//! - Input: document content from a file or stdin, passed through as bytes
//! - Output: one JSON object per command on stdout
//! - Logs go to stderr and never mix with results

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use serde_json::{json, Value};

use super::errors::{CliError, CliResult};
use crate::query::ResultDocument;
use crate::store::StoreResult;

/// Read document content from `file`, or all of stdin.
pub fn read_content(file: Option<&Path>) -> CliResult<Vec<u8>> {
    match file {
        Some(path) => fs::read(path).map_err(|e| {
            CliError::io_error(format!("Failed to read {}: {}", path.display(), e))
        }),
        None => {
            let mut content = Vec::new();
            io::stdin().lock().read_to_end(&mut content)?;
            Ok(content)
        }
    }
}

/// JSON form of one document. JSON content is embedded as-is, anything
/// else as a lossy UTF-8 string.
pub fn document_json(document: &ResultDocument) -> Value {
    let content = if document.deleted {
        Value::Null
    } else {
        document
            .json()
            .unwrap_or_else(|| Value::String(String::from_utf8_lossy(&document.content).into_owned()))
    };
    json!({
        "uri": document.uri,
        "version": document.version_token.as_str(),
        "last_modified": document.last_modified.to_rfc3339(),
        "deleted": document.deleted,
        "content": content,
    })
}

/// JSON form of a store result
pub fn result_json(result: &StoreResult) -> Value {
    let mut value = json!({
        "status": result.status,
        "total": result.total,
        "offset": result.offset,
        "documents": result.documents.iter().map(document_json).collect::<Vec<_>>(),
    });
    if let Some(error) = &result.error {
        value["error"] = Value::String(error.clone());
    }
    value
}

/// Write one JSON object as a line on stdout
pub fn write_response(data: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, data)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}
