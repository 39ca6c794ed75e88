use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Failures raised by [`crate::Store`] operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("book {0} not found")]
    BookNotFound(Uuid),

    #[error("reading log {0} not found")]
    LogNotFound(Uuid),

    #[error("failed to access store file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize store file {path}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
