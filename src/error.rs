use thiserror::Error;

use crate::models::MAX_FOLDER_DEPTH;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not create data directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("database lock poisoned")]
    Poisoned,

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("folders cannot be nested deeper than {} levels", MAX_FOLDER_DEPTH)]
    FolderDepthExceeded,

    #[error("{entity} {id} belongs to another user")]
    ForeignOwner { entity: &'static str, id: i64 },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("invalid extraction payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("extraction returned no pages for document {0}")]
    EmptyExtraction(i64),

    #[error("database not initialised")]
    NotInitialised,
}
