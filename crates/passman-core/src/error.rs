use thiserror::Error;

use crate::codec::CodecError;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("entry already exists for {service}/{username}")]
    DuplicateEntry { service: String, username: String },

    #[error("no entry for {service}/{username}")]
    NotFound { service: String, username: String },

    #[error("invalid entry: {0}")]
    InvalidEntry(String),

    #[error("vault is locked")]
    Locked,

    #[error("vault is already locked")]
    AlreadyLocked,

    #[error("invalid master password")]
    InvalidMasterPassword,

    #[error("vault store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] CodecError),

    #[error("unexpected response from daemon: {0}")]
    UnexpectedResponse(String),

    #[error("daemon rejected request: {0}")]
    Rejected(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl VaultError {
    pub(crate) fn not_found(service: &str, username: &str) -> Self {
        VaultError::NotFound {
            service: service.to_string(),
            username: username.to_string(),
        }
    }

    pub(crate) fn duplicate(service: &str, username: &str) -> Self {
        VaultError::DuplicateEntry {
            service: service.to_string(),
            username: username.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
