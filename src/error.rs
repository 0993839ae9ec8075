use thiserror::Error;

use crate::source::{Procedure, RecordSet};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Fixture error: {0}")]
    Fixture(String),

    #[error("Procedure '{name}' is not available")]
    UnknownProcedure { name: String },
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to fetch {set} at offset {offset}: {source}")]
    Query {
        set: RecordSet,
        offset: i64,
        #[source]
        source: SourceError,
    },

    #[error("Malformed {set} row at index {index}: {source}")]
    Decode {
        set: RecordSet,
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum CheckInvocationError {
    #[error("Procedure '{procedure}' failed: {source}")]
    Invoke {
        procedure: Procedure,
        #[source]
        source: SourceError,
    },

    #[error("Procedure '{procedure}' returned an unexpected payload: {source}")]
    Decode {
        procedure: Procedure,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("A {0} run is already in progress")]
    Busy(&'static str),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Check(#[from] CheckInvocationError),
}

pub type SourceResult<T> = Result<T, SourceError>;
