use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use chrono::Utc;
use coffer_quota_core::{Storage, StorageError};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::schema::init_database;
use super::QUOTA_DB_FILENAME;

/// SQLite-backed implementation of the storage contract. One connection,
/// serialized behind a mutex; WAL keeps readers unblocked.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)?;
        let db_path = data_dir.join(QUOTA_DB_FILENAME);
        let is_new = !db_path.exists();
        let conn = Connection::open(&db_path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        if is_new {
            init_database(&conn)?;
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::backend("connection poisoned".to_string()))
    }
}

impl Storage for SqliteStorage {
    fn get(
        &self,
        namespace: &str,
        parent_id: &str,
        object_id: &str,
    ) -> Result<Value, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                r#"
                SELECT data
                FROM quota_objects
                WHERE namespace = ?1 AND parent_id = ?2 AND object_id = ?3
                "#,
            )
            .map_err(StorageError::backend)?;

        let raw: Option<String> = stmt
            .query_row(params![namespace, parent_id, object_id], |row| row.get(0))
            .optional()
            .map_err(StorageError::backend)?;

        match raw {
            Some(raw) => serde_json::from_str(&raw).map_err(StorageError::backend),
            None => Err(StorageError::not_found(parent_id, object_id)),
        }
    }

    fn set(
        &self,
        namespace: &str,
        parent_id: &str,
        object_id: &str,
        value: &Value,
    ) -> Result<(), StorageError> {
        let conn = self.lock()?;
        let data = serde_json::to_string(value).map_err(StorageError::backend)?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            r#"
            INSERT INTO quota_objects (namespace, parent_id, object_id, data, last_updated)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(namespace, parent_id, object_id) DO UPDATE SET
                data = excluded.data,
                last_updated = excluded.last_updated
            "#,
            params![namespace, parent_id, object_id, data, now],
        )
        .map_err(StorageError::backend)?;

        Ok(())
    }

    fn delete(
        &self,
        namespace: &str,
        parent_id: &str,
        object_id: &str,
    ) -> Result<(), StorageError> {
        let conn = self.lock()?;
        let affected = conn
            .execute(
                r#"
                DELETE FROM quota_objects
                WHERE namespace = ?1 AND parent_id = ?2 AND object_id = ?3
                "#,
                params![namespace, parent_id, object_id],
            )
            .map_err(StorageError::backend)?;

        if affected == 0 {
            return Err(StorageError::not_found(parent_id, object_id));
        }
        Ok(())
    }

    fn delete_matching(
        &self,
        namespace: &str,
        parent_pattern: &str,
    ) -> Result<usize, StorageError> {
        let conn = self.lock()?;
        let affected = conn
            .execute(
                r#"
                DELETE FROM quota_objects
                WHERE namespace = ?1 AND parent_id LIKE ?2 ESCAPE '\'
                "#,
                params![namespace, like_pattern(parent_pattern)],
            )
            .map_err(StorageError::backend)?;

        Ok(affected)
    }

    fn list(&self, namespace: &str, parent_id: &str) -> Result<Vec<Value>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                r#"
                SELECT data
                FROM quota_objects
                WHERE namespace = ?1 AND parent_id = ?2
                ORDER BY object_id
                "#,
            )
            .map_err(StorageError::backend)?;

        let rows = stmt
            .query_map(params![namespace, parent_id], |row| {
                row.get::<_, String>(0)
            })
            .map_err(StorageError::backend)?;

        let mut objects = Vec::new();
        for row in rows {
            let raw = row.map_err(StorageError::backend)?;
            objects.push(serde_json::from_str(&raw).map_err(StorageError::backend)?);
        }
        Ok(objects)
    }
}

/// Translates a trailing-`*` glob into a LIKE pattern, escaping the LIKE
/// metacharacters that may appear in URIs.
fn like_pattern(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for ch in pattern.chars() {
        match ch {
            '\\' | '%' | '_' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            '*' => escaped.push('%'),
            _ => escaped.push(ch),
        }
    }
    escaped
}
