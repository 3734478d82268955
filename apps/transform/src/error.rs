use std::path::PathBuf;

use thiserror::Error;

/// Any fault aborts the whole run. Output files are only renamed into place
/// once every artifact has been built and staged.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed CSV in {}: {source}", .path.display())]
    Csv { path: PathBuf, source: csv::Error },

    #[error("table '{table}' has no column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("merge would produce duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize {}: {source}", .path.display())]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, TransformError>;
