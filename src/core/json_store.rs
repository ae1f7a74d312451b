//! Flat-file store backend: one JSON-array file per collection.
//!
//! Crash consistency comes from whole-file atomic replace-on-write (write
//! to a temp path, then rename over the target); lost-update protection
//! comes from a per-collection mutex around the read-modify-write cycle.
//! Readers never take the lock: a rename is atomic, so they observe
//! either the old or the new file, never a torn one.

use crate::core::error::{ErrorCode, LedgerError};
use crate::core::store::{
    CollectionStat, EntityStore, created_at_of, merge_patch, stamp, updated_at_of,
};
use crate::core::time;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use ulid::Ulid;

pub struct JsonStore {
    data_dir: PathBuf,
    locks: Mutex<FxHashMap<String, Arc<Mutex<()>>>>,
}

impl JsonStore {
    pub fn open(data_dir: &Path) -> Result<Self, LedgerError> {
        fs::create_dir_all(data_dir)?;
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            locks: Mutex::new(FxHashMap::default()),
        })
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", collection))
    }

    fn lock_for(&self, collection: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks
            .entry(collection.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Read a collection file. A corrupt-but-present file (from a partial
    /// prior failure) degrades to an empty collection with a warning; the
    /// payload is left in place until the next successful write.
    fn load_all(&self, collection: &str) -> Result<Vec<Value>, LedgerError> {
        let path = self.collection_path(collection);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(items) => Ok(items),
            Err(e) => {
                eprintln!(
                    "warning: STORE.CORRUPT collection '{}' at {}: {}; treating as empty",
                    collection,
                    path.display(),
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    /// Strict variant for the write path: a corrupt-but-present file is an
    /// error here, because rewriting over it would silently drop whatever
    /// records it still holds.
    fn load_for_write(&self, collection: &str) -> Result<Vec<Value>, LedgerError> {
        let path = self.collection_path(collection);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str::<Vec<Value>>(&raw).map_err(|e| {
            LedgerError::domain(
                ErrorCode::StoreCorrupt,
                format!(
                    "collection '{}' at {} failed to parse ({}); refusing to overwrite",
                    collection,
                    path.display(),
                    e
                ),
            )
        })
    }

    fn save_all(&self, collection: &str, items: &[Value]) -> Result<(), LedgerError> {
        let path = self.collection_path(collection);
        let tmp = self
            .data_dir
            .join(format!("{}.json.tmp-{}", collection, Ulid::new()));
        let body = serde_json::to_string_pretty(items)?;
        let mut file = fs::File::create(&tmp)?;
        file.write_all(body.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl EntityStore for JsonStore {
    fn list(&self, collection: &str) -> Result<Vec<Value>, LedgerError> {
        let mut items = self.load_all(collection)?;
        items.sort_by(|a, b| updated_at_of(b).cmp(updated_at_of(a)));
        Ok(items)
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, LedgerError> {
        let items = self.load_all(collection)?;
        Ok(items
            .into_iter()
            .find(|item| item.get("id").and_then(|v| v.as_str()) == Some(id)))
    }

    fn upsert(&self, collection: &str, id: &str, mut item: Value) -> Result<Value, LedgerError> {
        let lock = self.lock_for(collection);
        let _guard = lock.lock().unwrap();

        let mut items = self.load_for_write(collection)?;
        let idx = items
            .iter()
            .position(|x| x.get("id").and_then(|v| v.as_str()) == Some(id));
        let existing_created = idx.and_then(|i| created_at_of(&items[i]));
        stamp(&mut item, existing_created, &time::now_iso());
        match idx {
            Some(i) => items[i] = item.clone(),
            None => items.push(item.clone()),
        }
        self.save_all(collection, &items)?;
        Ok(item)
    }

    fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> Result<Option<Value>, LedgerError> {
        let lock = self.lock_for(collection);
        let _guard = lock.lock().unwrap();

        let mut items = self.load_for_write(collection)?;
        let Some(idx) = items
            .iter()
            .position(|x| x.get("id").and_then(|v| v.as_str()) == Some(id))
        else {
            return Ok(None);
        };
        let mut next = merge_patch(&items[idx], patch, id);
        let created = created_at_of(&items[idx]);
        stamp(&mut next, created, &time::now_iso());
        items[idx] = next.clone();
        self.save_all(collection, &items)?;
        Ok(Some(next))
    }

    fn remove(&self, collection: &str, id: &str) -> Result<bool, LedgerError> {
        let lock = self.lock_for(collection);
        let _guard = lock.lock().unwrap();

        let mut items = self.load_for_write(collection)?;
        let before = items.len();
        items.retain(|x| x.get("id").and_then(|v| v.as_str()) != Some(id));
        let changed = items.len() != before;
        if changed {
            self.save_all(collection, &items)?;
        }
        Ok(changed)
    }

    fn stats(&self) -> Result<Vec<CollectionStat>, LedgerError> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(collection) = name.strip_suffix(".json") else {
                continue;
            };
            let count = self.load_all(collection)?.len() as u64;
            out.push(CollectionStat {
                collection: collection.to_string(),
                count,
            });
        }
        out.sort_by(|a, b| a.collection.cmp(&b.collection));
        Ok(out)
    }

    fn drain(&self) {
        let locks: Vec<Arc<Mutex<()>>> = {
            let map = self.locks.lock().unwrap();
            map.values().cloned().collect()
        };
        for lock in locks {
            drop(lock.lock().unwrap());
        }
    }
}
