//! Store abstraction for the entity ledger.
//!
//! Records are JSON-shaped; the typed layer ([`Entity`]) validates shape
//! at the boundary, while the backends persist `serde_json::Value` bodies
//! under `(collection, id)` with timestamp bookkeeping.
//!
//! Two interchangeable backends implement [`EntityStore`]:
//! - [`crate::core::json_store::JsonStore`]: one durable JSON-array file
//!   per collection, whole-file atomic replace-on-write.
//! - [`crate::core::sqlite_store::SqliteStore`]: a single relational file
//!   with one logical `entities` table.

use crate::core::error::LedgerError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A typed ledger record. Implementations declare their collection name
/// and expose their id; `created_at`/`updated_at` are stamped by the
/// store on write and must deserialize from whatever the store returns.
pub trait Entity: Serialize + DeserializeOwned {
    const COLLECTION: &'static str;
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionStat {
    pub collection: String,
    pub count: u64,
}

/// Generic, collection-namespaced persistence contract.
///
/// `list` returns items ordered most-recently-updated first; downstream
/// consumers rely on that for "latest state" semantics. `upsert` is
/// idempotent by id: inserts stamp `created_at = updated_at = now`,
/// replacements preserve the original `created_at` and bump `updated_at`.
/// Writes to the same collection are serialized by the backend; malformed
/// persisted data degrades to an empty read with a warning, never a crash.
pub trait EntityStore: Send + Sync {
    fn list(&self, collection: &str) -> Result<Vec<Value>, LedgerError>;
    fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, LedgerError>;
    fn upsert(&self, collection: &str, id: &str, item: Value) -> Result<Value, LedgerError>;
    fn update(&self, collection: &str, id: &str, patch: Value)
    -> Result<Option<Value>, LedgerError>;
    fn remove(&self, collection: &str, id: &str) -> Result<bool, LedgerError>;
    fn stats(&self) -> Result<Vec<CollectionStat>, LedgerError>;
    /// Block until in-flight writes have completed (shutdown drain).
    fn drain(&self);
}

/// Stamp timestamp bookkeeping into a record body before persisting.
pub(crate) fn stamp(item: &mut Value, existing_created_at: Option<String>, now: &str) {
    if let Some(obj) = item.as_object_mut() {
        let created = existing_created_at.unwrap_or_else(|| now.to_string());
        obj.insert("created_at".into(), Value::String(created));
        obj.insert("updated_at".into(), Value::String(now.to_string()));
    }
}

pub(crate) fn created_at_of(item: &Value) -> Option<String> {
    item.get("created_at")
        .and_then(|v| v.as_str())
        .map(String::from)
}

pub(crate) fn updated_at_of(item: &Value) -> &str {
    item.get("updated_at").and_then(|v| v.as_str()).unwrap_or("")
}

/// Shallow field merge for `update`. The id is pinned: a patch cannot
/// re-key a record.
pub(crate) fn merge_patch(existing: &Value, patch: Value, id: &str) -> Value {
    let mut merged = existing.clone();
    if let (Some(base), Some(fields)) = (merged.as_object_mut(), patch.as_object()) {
        for (k, v) in fields {
            base.insert(k.clone(), v.clone());
        }
        base.insert("id".into(), Value::String(id.to_string()));
    }
    merged
}
