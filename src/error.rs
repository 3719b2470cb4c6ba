// error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading gene tables, prediction tables and target lists.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Gene table {} is empty (no header row).", .0.display())]
    MissingHeader(PathBuf),
    #[error(
        "Malformed row at {}:{line}: expected at least {expected} fields, found {found}.",
        path.display()
    )]
    MalformedRow {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ToolError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ToolError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        ToolError::Csv {
            path: path.into(),
            source,
        }
    }
}

pub type ToolResult<T> = std::result::Result<T, ToolError>;
