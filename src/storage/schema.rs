//! Database schema definitions
//!
//! All documents live in one table; grouping index definitions are recorded
//! alongside so grouped queries can tell a missing index from an empty one.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Flat keyed namespace of JSON documents
CREATE TABLE IF NOT EXISTS documents (
    key TEXT PRIMARY KEY,
    body TEXT NOT NULL,
    version TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Materialized grouping indexes (fields is a JSON array of dotted paths)
CREATE TABLE IF NOT EXISTS grouping_indexes (
    name TEXT PRIMARY KEY,
    fields TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
