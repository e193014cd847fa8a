//! SQLite-backed vault store.
//!
//! Uniqueness of `(service, username)` is a table constraint, so two racing
//! inserts for the same key are decided by SQLite and the loser surfaces as
//! [`VaultError::DuplicateEntry`]. Every operation is a single statement.

use crate::entry::Entry;
use crate::error::{Result, VaultError};
use crate::lock::LockGate;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use tracing::debug;

const SCHEMA_VERSION: i32 = 1;

const ENTRY_COLUMNS: &str = "service, username, password, notes, expiry";

/// Operations the dispatcher needs from a credential store.
pub trait EntryStore: Send + Sync {
    fn add(&self, entry: &Entry) -> Result<()>;
    fn get(&self, service: &str, username: &str) -> Result<Entry>;
    /// Entries in insertion order; an empty query matches everything.
    fn list(&self, query: &str) -> Result<Vec<Entry>>;
    fn update(&self, service: &str, username: &str, password: &str, notes: Option<&str>) -> Result<()>;
    /// Deleting a missing key is not an error.
    fn delete(&self, service: &str, username: &str) -> Result<()>;
    fn lock(&self, password: &str) -> Result<()>;
    fn unlock(&self, password: &str) -> Result<()>;
    fn is_locked(&self) -> bool;
}

pub struct VaultStore {
    conn: Mutex<Connection>,
    gate: LockGate,
}

impl VaultStore {
    /// Opens or creates the database at `path` and brings the schema up to date.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(unavailable)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(unavailable)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(unavailable)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        migrate(&conn).map_err(unavailable)?;
        Ok(Self {
            conn: Mutex::new(conn),
            gate: LockGate::new(),
        })
    }
}

fn unavailable(err: rusqlite::Error) -> VaultError {
    VaultError::StoreUnavailable(err.to_string())
}

fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        [],
    )?;
    let current: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    if current < 1 {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS passwords (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                service TEXT NOT NULL,
                username TEXT NOT NULL,
                password TEXT NOT NULL DEFAULT '',
                notes TEXT,
                expiry TEXT,
                UNIQUE (service, username)
            );
            INSERT OR REPLACE INTO schema_version (version) VALUES (1);",
        )?;
        debug!(version = SCHEMA_VERSION, "vault schema created");
    }
    Ok(())
}

fn validate(entry: &Entry) -> Result<()> {
    if entry.service.trim().is_empty() {
        return Err(VaultError::InvalidEntry("service must not be empty".into()));
    }
    if entry.username.trim().is_empty() {
        return Err(VaultError::InvalidEntry("username must not be empty".into()));
    }
    Ok(())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<Entry> {
    let expiry: Option<String> = row.get(4)?;
    Ok(Entry {
        service: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        notes: row.get(3)?,
        expiry: expiry.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        }),
    })
}

impl EntryStore for VaultStore {
    fn add(&self, entry: &Entry) -> Result<()> {
        self.gate.ensure_unlocked()?;
        validate(entry)?;
        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT INTO passwords (service, username, password, notes, expiry)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.service,
                entry.username,
                entry.password,
                entry.notes,
                entry.expiry.map(|t| t.to_rfc3339()),
            ],
        );
        match inserted {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(VaultError::duplicate(&entry.service, &entry.username))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get(&self, service: &str, username: &str) -> Result<Entry> {
        self.gate.ensure_unlocked()?;
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM passwords WHERE service = ?1 AND username = ?2"),
            params![service, username],
            row_to_entry,
        )
        .optional()?
        .ok_or_else(|| VaultError::not_found(service, username))
    }

    fn list(&self, query: &str) -> Result<Vec<Entry>> {
        self.gate.ensure_unlocked()?;
        let conn = self.conn.lock();
        // instr() keeps the match case-sensitive; LIKE would fold ASCII case.
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM passwords
             WHERE ?1 = '' OR instr(service, ?1) > 0 OR instr(username, ?1) > 0
             ORDER BY id ASC"
        ))?;
        let entries = stmt
            .query_map(params![query], row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    fn update(&self, service: &str, username: &str, password: &str, notes: Option<&str>) -> Result<()> {
        self.gate.ensure_unlocked()?;
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE passwords SET password = ?3, notes = ?4
             WHERE service = ?1 AND username = ?2",
            params![service, username, password, notes],
        )?;
        if changed == 0 {
            return Err(VaultError::not_found(service, username));
        }
        Ok(())
    }

    fn delete(&self, service: &str, username: &str) -> Result<()> {
        self.gate.ensure_unlocked()?;
        let conn = self.conn.lock();
        let removed = conn.execute(
            "DELETE FROM passwords WHERE service = ?1 AND username = ?2",
            params![service, username],
        )?;
        debug!(service, username, removed, "delete");
        Ok(())
    }

    fn lock(&self, password: &str) -> Result<()> {
        self.gate.lock(password)
    }

    fn unlock(&self, password: &str) -> Result<()> {
        self.gate.unlock(password)
    }

    fn is_locked(&self) -> bool {
        self.gate.is_locked()
    }
}
