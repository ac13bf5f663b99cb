//! SQLite storage implementation
//!
//! This module provides a SQLite-backed implementation of the DocumentStore
//! trait. Document bodies are JSON text; field paths are resolved with
//! SQLite's built-in `json_extract`.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    Document, DocumentStore, FieldFilter, GroupCount, SortOrder, StoreError, StoreResult,
    VersionToken,
};
use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite document store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates a store at the given path
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StoreError)` - Failed to open database
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory store (for testing and dry runs)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Corrupt("connection mutex poisoned".to_string()))
    }

    fn index_fields(conn: &Connection, index: &str) -> StoreResult<Option<Vec<String>>> {
        let fields: Option<String> = conn
            .query_row(
                "SELECT fields FROM grouping_indexes WHERE name = ?1",
                params![index],
                |row| row.get(0),
            )
            .optional()?;

        match fields {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }
}

impl DocumentStore for SqliteStore {
    fn get(&self, key: &str) -> StoreResult<Option<Document>> {
        let conn = self.lock()?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT body, version FROM documents WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((body, version)) => Ok(Some(Document {
                key: key.to_string(),
                body: serde_json::from_str(&body)?,
                version: VersionToken::from(version),
            })),
            None => Ok(None),
        }
    }

    fn put(
        &self,
        key: &str,
        body: &Value,
        expected: Option<&VersionToken>,
    ) -> StoreResult<VersionToken> {
        let text = serde_json::to_string(body)?;
        let next = VersionToken::next(expected, &text);
        let now = Utc::now().to_rfc3339();
        let conn = self.lock()?;

        let changed = match expected {
            None => conn.execute(
                "INSERT OR IGNORE INTO documents (key, body, version, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![key, text, next.as_str(), now],
            )?,
            Some(current) => conn.execute(
                "UPDATE documents SET body = ?1, version = ?2, updated_at = ?3
                 WHERE key = ?4 AND version = ?5",
                params![text, next.as_str(), now, key, current.as_str()],
            )?,
        };

        if changed == 0 {
            return Err(StoreError::Conflict {
                key: key.to_string(),
            });
        }

        Ok(next)
    }

    fn delete(&self, key: &str, expected: &VersionToken) -> StoreResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "DELETE FROM documents WHERE key = ?1 AND version = ?2",
            params![key, expected.as_str()],
        )?;

        if changed == 0 {
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM documents WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            return Err(match exists {
                Some(_) => StoreError::Conflict {
                    key: key.to_string(),
                },
                None => StoreError::NotFound(key.to_string()),
            });
        }

        Ok(())
    }

    fn list_keys(&self) -> StoreResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT key FROM documents ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    fn define_grouping_index(&self, name: &str, fields: &[&str]) -> StoreResult<()> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(StoreError::InvalidField(format!("index name '{}'", name)));
        }
        if fields.is_empty() {
            return Err(StoreError::InvalidField(format!(
                "index '{}' has no fields",
                name
            )));
        }

        let exprs = fields
            .iter()
            .map(|field| json_expr(field))
            .collect::<StoreResult<Vec<_>>>()?;
        let field_list = serde_json::to_string(fields)?;
        let now = Utc::now().to_rfc3339();

        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO grouping_indexes (name, fields, created_at) VALUES (?1, ?2, ?3)",
            params![name, field_list, now],
        )?;
        conn.execute_batch(&format!(
            "CREATE INDEX IF NOT EXISTS \"gidx_{}\" ON documents({});",
            name.replace('-', "_"),
            exprs.join(", ")
        ))?;

        tracing::debug!("Grouping index '{}' defined over {:?}", name, fields);
        Ok(())
    }

    fn query_grouped(&self, index: &str, prefix: Option<&[&str]>) -> StoreResult<Vec<GroupCount>> {
        let conn = self.lock()?;
        let fields = Self::index_fields(&conn, index)?
            .ok_or_else(|| StoreError::MissingIndex(index.to_string()))?;

        let prefix = prefix.unwrap_or(&[]);
        if prefix.len() > fields.len() {
            return Err(StoreError::InvalidField(format!(
                "prefix of {} components for index '{}' with {} fields",
                prefix.len(),
                index,
                fields.len()
            )));
        }

        let exprs = fields
            .iter()
            .map(|field| json_expr(field))
            .collect::<StoreResult<Vec<_>>>()?;

        let columns = exprs
            .iter()
            .map(|expr| format!("CAST({} AS TEXT)", expr))
            .collect::<Vec<_>>()
            .join(", ");
        let mut conditions = exprs
            .iter()
            .map(|expr| format!("{} IS NOT NULL", expr))
            .collect::<Vec<_>>();
        for (position, expr) in exprs.iter().take(prefix.len()).enumerate() {
            conditions.push(format!("{} = ?{}", expr, position + 1));
        }
        let positions = (1..=exprs.len())
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!(
            "SELECT {}, COUNT(*) FROM documents WHERE {} GROUP BY {} ORDER BY {}",
            columns,
            conditions.join(" AND "),
            positions,
            positions
        );

        let width = exprs.len();
        let mut stmt = conn.prepare(&sql)?;
        let groups = stmt
            .query_map(params_from_iter(prefix.iter()), |row| {
                let mut key = Vec::with_capacity(width);
                for column in 0..width {
                    key.push(row.get::<_, Option<String>>(column)?.unwrap_or_default());
                }
                let count: i64 = row.get(width)?;
                Ok(GroupCount {
                    key,
                    count: count as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(groups)
    }

    fn query_by_fields(&self, filter: &FieldFilter) -> StoreResult<Vec<Document>> {
        let mut conditions = Vec::new();
        let mut values = Vec::new();
        for (field, value) in &filter.equals {
            let expr = json_expr(field)?;
            match to_sql_value(value) {
                Some(value) => {
                    values.push(value);
                    conditions.push(format!("{} = ?{}", expr, values.len()));
                }
                None => conditions.push(format!("{} IS NULL", expr)),
            }
        }

        let mut sql = "SELECT key, body, version FROM documents".to_string();
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        if let Some((field, order)) = &filter.sort {
            let direction = match order {
                SortOrder::Ascending => "ASC",
                SortOrder::Descending => "DESC",
            };
            sql.push_str(&format!(" ORDER BY {} {}, key", json_expr(field)?, direction));
        } else {
            sql.push_str(" ORDER BY key");
        }
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(key, body, version)| {
                Ok(Document {
                    key,
                    body: serde_json::from_str(&body)?,
                    version: VersionToken::from(version),
                })
            })
            .collect()
    }
}

/// Turns a dotted field path into a `json_extract` expression
///
/// Paths are inlined into SQL, so only `[A-Za-z0-9_.]` segments are accepted.
fn json_expr(field: &str) -> StoreResult<String> {
    let valid = !field.is_empty()
        && field.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        });

    if !valid {
        return Err(StoreError::InvalidField(field.to_string()));
    }

    Ok(format!("json_extract(body, '$.{}')", field))
}

/// Maps a JSON scalar to the value `json_extract` would yield; `None` for null
fn to_sql_value(value: &Value) -> Option<SqlValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        }),
        Value::String(s) => Some(SqlValue::Text(s.clone())),
        other => Some(SqlValue::Text(other.to_string())),
    }
}
