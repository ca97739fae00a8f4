use rusqlite::Connection;

/// Applies the pragma set every connection in the pool runs under: WAL
/// journaling, normal sync, a generous mmap/page cache, a busy timeout so
/// concurrent readers don't fail outright under writer contention, foreign
/// keys on, and incremental auto-vacuum so the file doesn't need periodic
/// full vacuums.
pub fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "mmap_size", 256 * 1024 * 1024i64)?;
    conn.pragma_update(None, "cache_size", -64 * 1024i64)?;
    conn.pragma_update(None, "busy_timeout", 5000i64)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "auto_vacuum", "INCREMENTAL")?;
    Ok(())
}

/// Confirms the connection actually entered WAL mode — `journal_mode`
/// silently falls back for in-memory databases and some filesystems.
pub fn verify_wal_mode(conn: &Connection) -> rusqlite::Result<bool> {
    let mode: String = conn.pragma_query_value(None, "journal_mode", |row| row.get(0))?;
    Ok(mode.eq_ignore_ascii_case("wal"))
}
