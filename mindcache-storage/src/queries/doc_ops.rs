use rusqlite::{params, Connection};
use tracing::instrument;

#[instrument(skip(conn, op_bytes))]
pub fn append_doc_op(
    conn: &Connection,
    instance_id: &str,
    key: &str,
    actor: &str,
    seq: u64,
    op_bytes: &[u8],
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO doc_ops (instance_id, key, actor, seq, op_bytes) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![instance_id, key, actor, seq as i64, op_bytes],
    )?;
    Ok(())
}

/// Returns every op recorded for `key` since `after_id` (exclusive), used
/// to catch a reconnecting client up beyond the last snapshot it saw.
#[instrument(skip(conn))]
pub fn ops_since(
    conn: &Connection,
    instance_id: &str,
    key: &str,
    after_id: i64,
) -> rusqlite::Result<Vec<(i64, Vec<u8>)>> {
    let mut stmt = conn.prepare(
        "SELECT id, op_bytes FROM doc_ops
         WHERE instance_id = ?1 AND key = ?2 AND id > ?3
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![instance_id, key, after_id], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
    })?;
    rows.collect()
}
