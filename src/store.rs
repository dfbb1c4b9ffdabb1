//! Task and user persistence over redb.
//!
//! redb is the system of record: rows are postcard-encoded, one write
//! transaction per mutation. Opening the file creates the tables — that
//! is the whole migration step, and the server must not bind if it fails.

use crate::model::{Task, User};
use chrono::Utc;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::sync::Arc;
use uuid::Uuid;

const TASKS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("tasks");
const USERS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("users");
const USERNAME_INDEX: TableDefinition<&str, &[u8]> = TableDefinition::new("username_index");

/// Thin handle to the redb file. Cloneable (Arc inside).
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
}

impl Store {
    /// Open (or create) the database at the given path and ensure all
    /// tables exist. Fatal at boot if this fails.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let db = Database::create(path)?;

        let txn = db.begin_write()?;
        {
            let _ = txn.open_table(TASKS)?;
            let _ = txn.open_table(USERS)?;
            let _ = txn.open_table(USERNAME_INDEX)?;
        }
        txn.commit()?;

        Ok(Store { db: Arc::new(db) })
    }

    // ── Users ──────────────────────────────────────────────────

    pub fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut users = txn.open_table(USERS)?;
            let mut index = txn.open_table(USERNAME_INDEX)?;

            let bytes = postcard::to_allocvec(user)
                .map_err(|e| StoreError::Encode(e.to_string()))?;
            let id_bytes = user.id.as_bytes();

            users.insert(id_bytes.as_slice(), bytes.as_slice())?;
            index.insert(user.username.as_str(), id_bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let txn = self.db.begin_read()?;
        let users = txn.open_table(USERS)?;

        match users.get(id.as_bytes().as_slice())? {
            Some(data) => {
                let user: User = postcard::from_bytes(data.value())
                    .map_err(|e| StoreError::Decode(e.to_string()))?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let txn = self.db.begin_read()?;
        let index = txn.open_table(USERNAME_INDEX)?;

        match index.get(username)? {
            Some(id_data) => {
                let users = txn.open_table(USERS)?;
                match users.get(id_data.value())? {
                    Some(data) => {
                        let user: User = postcard::from_bytes(data.value())
                            .map_err(|e| StoreError::Decode(e.to_string()))?;
                        Ok(Some(user))
                    }
                    None => Ok(None),
                }
            }
            None => Ok(None),
        }
    }

    fn count_users(&self) -> Result<u64, StoreError> {
        let txn = self.db.begin_read()?;
        let users = txn.open_table(USERS)?;
        Ok(users.len()?)
    }

    /// Seed a default admin account if no users exist yet.
    /// Returns true if one was created.
    pub fn ensure_default_user(&self, password_hash: String) -> Result<bool, StoreError> {
        if self.count_users()? > 0 {
            return Ok(false);
        }

        let admin = User {
            id: Uuid::new_v4(),
            username: "admin".to_string(),
            password_hash,
            created_at: Utc::now(),
        };
        self.create_user(&admin)?;
        Ok(true)
    }

    // ── Tasks ──────────────────────────────────────────────────

    /// Insert or overwrite a task row. Create and update share this path;
    /// redb's insert is an upsert on the id key.
    pub fn put_task(&self, task: &Task) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut tasks = txn.open_table(TASKS)?;
            let bytes = postcard::to_allocvec(task)
                .map_err(|e| StoreError::Encode(e.to_string()))?;
            tasks.insert(task.id.as_bytes().as_slice(), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let txn = self.db.begin_read()?;
        let tasks = txn.open_table(TASKS)?;

        match tasks.get(id.as_bytes().as_slice())? {
            Some(data) => {
                let task: Task = postcard::from_bytes(data.value())
                    .map_err(|e| StoreError::Decode(e.to_string()))?;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    /// All tasks owned by one user, unordered. The query pipeline sorts.
    pub fn tasks_for_user(&self, owner: Uuid) -> Result<Vec<Task>, StoreError> {
        let txn = self.db.begin_read()?;
        let tasks = txn.open_table(TASKS)?;

        let mut out = Vec::new();
        for entry in tasks.iter()? {
            let (_, value) = entry?;
            let task: Task = postcard::from_bytes(value.value())
                .map_err(|e| StoreError::Decode(e.to_string()))?;
            if task.owner == owner {
                out.push(task);
            }
        }
        Ok(out)
    }

    /// Hard delete. Returns whether a row was actually removed.
    pub fn delete_task(&self, id: Uuid) -> Result<bool, StoreError> {
        let txn = self.db.begin_write()?;
        let deleted;
        {
            let mut tasks = txn.open_table(TASKS)?;
            deleted = tasks.remove(id.as_bytes().as_slice())?.is_some();
        }
        txn.commit()?;
        Ok(deleted)
    }
}

// ── Errors ─────────────────────────────────────────────────────

#[derive(Debug)]
pub enum StoreError {
    Redb(String),
    Decode(String),
    Encode(String),
}

// redb 2.x has many error types. Blanket them all into StoreError::Redb.
macro_rules! from_redb {
    ($($t:ty),*) => {
        $(impl From<$t> for StoreError {
            fn from(e: $t) -> Self { StoreError::Redb(e.to_string()) }
        })*
    };
}

from_redb!(
    redb::Error,
    redb::DatabaseError,
    redb::TableError,
    redb::TransactionError,
    redb::StorageError,
    redb::CommitError
);

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Redb(e) => write!(f, "redb: {e}"),
            StoreError::Decode(e) => write!(f, "decode: {e}"),
            StoreError::Encode(e) => write!(f, "encode: {e}"),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────
