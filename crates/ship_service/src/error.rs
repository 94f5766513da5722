//! Error types for the ship service.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("geo index is empty, range search cannot be performed")]
    IndexNotReady,

    #[error("bounding box out of range")]
    BboxOutOfRange,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
