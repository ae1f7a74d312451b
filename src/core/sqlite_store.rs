//! Relational store backend: one SQLite file, one logical table.
//!
//! A single connection handle is opened at construction and reused for
//! the life of the process; the mutex around it serializes writes per the
//! concurrency contract, and WAL mode lets the OS-level readers of the
//! same file proceed. Each upsert is one transactional statement, so a
//! torn write can never land.

use crate::core::db;
use crate::core::error::LedgerError;
use crate::core::store::{CollectionStat, EntityStore, merge_patch, stamp};
use crate::core::time;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self, LedgerError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = db::db_connect(db_path)?;
        db::initialize_entities(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn parse_row(collection: &str, id: &str, data: &str) -> Option<Value> {
        match serde_json::from_str::<Value>(data) {
            Ok(v) => Some(v),
            Err(e) => {
                eprintln!(
                    "warning: STORE.CORRUPT row '{}' in collection '{}': {}; skipping",
                    id, collection, e
                );
                None
            }
        }
    }
}

impl EntityStore for SqliteStore {
    fn list(&self, collection: &str) -> Result<Vec<Value>, LedgerError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, data FROM entities WHERE collection = ?1 ORDER BY updated_at DESC",
        )?;
        let rows = stmt.query_map(params![collection], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (id, data) = row?;
            if let Some(item) = Self::parse_row(collection, &id, &data) {
                out.push(item);
            }
        }
        Ok(out)
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, LedgerError> {
        let conn = self.conn.lock().unwrap();
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM entities WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(data.and_then(|d| Self::parse_row(collection, id, &d)))
    }

    fn upsert(&self, collection: &str, id: &str, mut item: Value) -> Result<Value, LedgerError> {
        let conn = self.conn.lock().unwrap();
        let existing_created: Option<String> = conn
            .query_row(
                "SELECT created_at FROM entities WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;

        let now = time::now_iso();
        let created = existing_created.clone().unwrap_or_else(|| now.clone());
        stamp(&mut item, Some(created.clone()), &now);

        conn.execute(
            "INSERT INTO entities (collection, id, data, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(collection, id) DO UPDATE SET
                 data = excluded.data,
                 updated_at = excluded.updated_at",
            params![collection, id, serde_json::to_string(&item)?, created, now],
        )?;
        Ok(item)
    }

    fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> Result<Option<Value>, LedgerError> {
        // The merge cycle holds the handle for its whole read-modify-write
        // so a concurrent update cannot slip between the read and write.
        let conn = self.conn.lock().unwrap();
        let existing: Option<(String, String)> = conn
            .query_row(
                "SELECT data, created_at FROM entities WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((data, created)) = existing else {
            return Ok(None);
        };
        let Some(existing) = Self::parse_row(collection, id, &data) else {
            return Err(LedgerError::domain(
                crate::core::error::ErrorCode::StoreCorrupt,
                format!("refusing to patch corrupt record '{}' in '{}'", id, collection),
            ));
        };

        let now = time::now_iso();
        let mut next = merge_patch(&existing, patch, id);
        stamp(&mut next, Some(created.clone()), &now);
        conn.execute(
            "UPDATE entities SET data = ?3, updated_at = ?4 WHERE collection = ?1 AND id = ?2",
            params![collection, id, serde_json::to_string(&next)?, now],
        )?;
        Ok(Some(next))
    }

    fn remove(&self, collection: &str, id: &str) -> Result<bool, LedgerError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "DELETE FROM entities WHERE collection = ?1 AND id = ?2",
            params![collection, id],
        )?;
        Ok(changed > 0)
    }

    fn stats(&self) -> Result<Vec<CollectionStat>, LedgerError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT collection, COUNT(*) FROM entities GROUP BY collection ORDER BY collection",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CollectionStat {
                collection: row.get(0)?,
                count: row.get::<_, i64>(1)? as u64,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn drain(&self) {
        drop(self.conn.lock().unwrap());
    }
}
