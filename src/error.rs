//! Error types for sentinel-registry

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Record not found: {0}")]
    NotFound(u64),

    #[error("Already voted: record {id}, voter {voter}")]
    AlreadyVoted { id: u64, voter: String },

    #[error("Submitter cannot vote on own record: {id}")]
    SelfVoteForbidden { id: u64 },

    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Encoding error: {0}")]
    Encoding(String),
}
