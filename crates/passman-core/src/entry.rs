use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored credential. `(service, username)` identifies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub service: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Advisory only; the store never acts on it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl Entry {
    pub fn new(service: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            username: username.into(),
            password: password.into(),
            notes: None,
            expiry: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }
}
