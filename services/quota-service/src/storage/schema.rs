use anyhow::Result;
use rusqlite::Connection;

pub const OBJECTS_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS quota_objects (
    namespace TEXT NOT NULL,
    parent_id TEXT NOT NULL,
    object_id TEXT NOT NULL,
    data TEXT NOT NULL,
    last_updated TEXT NOT NULL,
    PRIMARY KEY (namespace, parent_id, object_id)
);
"#;

pub const OBJECTS_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_objects_parent ON quota_objects(namespace, parent_id);
"#;

pub fn init_database(conn: &Connection) -> Result<()> {
    conn.execute_batch(OBJECTS_TABLE_SCHEMA)?;
    conn.execute_batch(OBJECTS_INDEXES)?;
    Ok(())
}
