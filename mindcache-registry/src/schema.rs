use rusqlite::Connection;

pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            subject_id TEXT PRIMARY KEY,
            profile_json TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS instances (
            id TEXT PRIMARY KEY,
            owner_user_id TEXT NOT NULL,
            parent_instance_id TEXT,
            readonly INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS delegates (
            id TEXT PRIMARY KEY,
            owner_user_id TEXT NOT NULL,
            secret_hash TEXT NOT NULL,
            capabilities_json TEXT NOT NULL,
            expires_at TEXT
        );

        CREATE TABLE IF NOT EXISTS permissions (
            instance_id TEXT NOT NULL,
            actor_id TEXT NOT NULL,
            permission TEXT NOT NULL,
            PRIMARY KEY (instance_id, actor_id, permission)
        );
        ",
    )
}
