//! Persistent store for the clinical-history registry.
//!
//! This module provides the key-value persistence behind the in-memory
//! collections: one SQLite table of string slots, one slot per collection,
//! each holding a JSON snapshot. Slots are read once at startup and written
//! after every mutation of the corresponding collection. The in-memory state
//! is the source of truth for the session; slot writes are best-effort and a
//! failed write is logged, never surfaced to the user.

use crate::models::{Role, User, DEFAULT_ADMIN};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

/// The name of the database file.
pub const DB_NAME: &str = "historial.db";

/// Slot keys, kept identical to the original deployment's storage keys so an
/// exported data file remains loadable.
pub const USERS_SLOT: &str = "clinicalHistoryUsers";
pub const RECORDS_SLOT: &str = "clinicalHistoryRecords";
pub const DETAILS_SLOT: &str = "clinicalHistoryDetails";
pub const REQUESTS_SLOT: &str = "clinicalHistoryRequests";
pub const TRANSFERS_SLOT: &str = "clinicalHistoryTransfers";
pub const NOTIFICATIONS_SLOT: &str = "clinicalHistoryNotifications";

/// Handle to the slot table.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (or creates) the store at the given path and ensures the schema
    /// exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open the data file")?;
        conn.execute_batch(include_str!("schema.sql"))
            .context("Failed to execute schema")?;
        Ok(Self { conn })
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory store")?;
        conn.execute_batch(include_str!("schema.sql"))
            .context("Failed to execute schema")?;
        Ok(Self { conn })
    }

    /// Reads the raw snapshot held by a slot, if any.
    pub fn read_slot(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM slots WHERE key = ?")?;
        let value = stmt
            .query_row(params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    /// Writes the raw snapshot for a slot, replacing any previous value.
    pub fn write_slot(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO slots (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Loads a collection from its slot. A missing or corrupt snapshot
    /// yields the empty default; corruption is logged and the session simply
    /// starts over for that collection.
    pub fn load_collection<T>(&self, key: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        let raw = match self.read_slot(key) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(slot = key, %err, "failed to read slot, starting empty");
                return T::default();
            }
        };
        match raw {
            None => T::default(),
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(err) => {
                    warn!(slot = key, %err, "corrupt slot snapshot, starting empty");
                    T::default()
                }
            },
        }
    }

    /// Loads the user collection, seeding the default administrator account
    /// when the slot is missing, corrupt or empty.
    pub fn load_users(&self) -> Vec<User> {
        let users: Vec<User> = self.load_collection(USERS_SLOT);
        if !users.is_empty() {
            return users;
        }
        let seeded = vec![User {
            username: DEFAULT_ADMIN.to_string(),
            password: "admin".to_string(),
            role: Role::Admin,
            service: None,
        }];
        self.mirror(USERS_SLOT, &seeded);
        seeded
    }

    /// Mirrors a collection into its slot. Fire-and-forget: serialization or
    /// write failures are logged and the in-memory collection stays
    /// authoritative.
    pub fn mirror<T: Serialize>(&self, key: &str, value: &T) {
        let snapshot = match serde_json::to_string(value) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(slot = key, %err, "failed to serialize collection");
                return;
            }
        };
        if let Err(err) = self.write_slot(key, &snapshot) {
            warn!(slot = key, %err, "failed to persist collection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;

    #[test]
    fn missing_slot_loads_default() {
        let store = Store::open_in_memory().unwrap();
        let records: Vec<Record> = store.load_collection(RECORDS_SLOT);
        assert!(records.is_empty());
    }

    #[test]
    fn corrupt_slot_loads_default() {
        let store = Store::open_in_memory().unwrap();
        store.write_slot(RECORDS_SLOT, "{not json").unwrap();
        let records: Vec<Record> = store.load_collection(RECORDS_SLOT);
        assert!(records.is_empty());
    }

    #[test]
    fn empty_users_slot_seeds_default_admin() {
        let store = Store::open_in_memory().unwrap();
        let users = store.load_users();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, DEFAULT_ADMIN);
        assert_eq!(users[0].role, Role::Admin);

        // The seed is written back so the next load finds it.
        let reloaded: Vec<User> = store.load_collection(USERS_SLOT);
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn mirror_round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.db");

        let notifications = vec![crate::models::Notification {
            id: 7,
            user_id: "maria".into(),
            message: "hola".into(),
            timestamp: 1_700_000_000_000,
            is_read: false,
            kind: crate::models::NotificationKind::Approval,
        }];

        {
            let store = Store::open(&path).unwrap();
            store.mirror(NOTIFICATIONS_SLOT, &notifications);
        }

        let store = Store::open(&path).unwrap();
        let loaded: Vec<crate::models::Notification> =
            store.load_collection(NOTIFICATIONS_SLOT);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].user_id, "maria");
        assert!(!loaded[0].is_read);
    }
}
