//! Database schema definitions for the relational store backend.
//!
//! The SQLite backend keeps every collection in one logical table keyed by
//! `(collection, id)`; record bodies are stored as JSON text alongside the
//! timestamp columns the list ordering relies on.

pub const LEDGER_DB_NAME: &str = "ledger.db";

pub const ENTITIES_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS entities (
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (collection, id)
    )
";

pub const ENTITIES_COLLECTION_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_entities_collection ON entities(collection)";

pub const ENTITIES_UPDATED_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_entities_updated ON entities(collection, updated_at DESC)";
