use crate::core::error::LedgerError;
use crate::core::schemas;
use rusqlite::Connection;
use std::path::Path;

/// Open the ledger database with the pragmas every handle relies on:
/// WAL for concurrent readers, a busy timeout instead of immediate
/// SQLITE_BUSY, and enforced foreign keys.
pub fn db_connect(db_path: &Path) -> Result<Connection, LedgerError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
    conn.execute("PRAGMA foreign_keys=ON;", [])?;
    Ok(conn)
}

pub fn initialize_entities(conn: &Connection) -> Result<(), LedgerError> {
    conn.execute(schemas::ENTITIES_SCHEMA, [])?;
    conn.execute(schemas::ENTITIES_COLLECTION_INDEX, [])?;
    conn.execute(schemas::ENTITIES_UPDATED_INDEX, [])?;
    Ok(())
}
