use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("source document not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("unsupported source format (expected .txt or .json): {0}")]
    UnsupportedFormat(PathBuf),

    #[error("source document has no pages: {0}")]
    NoPages(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
