use rusqlite::Connection;

/// Creates the authority's tables if they don't already exist. Safe to call
/// on every startup.
pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS entries (
            instance_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value_json TEXT NOT NULL,
            attributes_json TEXT NOT NULL,
            last_writer TEXT NOT NULL,
            revision INTEGER NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (instance_id, key)
        );

        CREATE TABLE IF NOT EXISTS doc_ops (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            instance_id TEXT NOT NULL,
            key TEXT NOT NULL,
            actor TEXT NOT NULL,
            seq INTEGER NOT NULL,
            op_bytes BLOB NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_doc_ops_instance_key
            ON doc_ops (instance_id, key, id);
        ",
    )
}
