use mindcache_core::{Attributes, Entry, EntryKey, EntryMeta, Value};
use rusqlite::{params, Connection};
use tracing::instrument;

#[instrument(skip(conn, entry))]
pub fn upsert_entry(
    conn: &Connection,
    instance_id: &str,
    key: &EntryKey,
    entry: &Entry,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO entries (instance_id, key, value_json, attributes_json, last_writer, revision, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(instance_id, key) DO UPDATE SET
            value_json = excluded.value_json,
            attributes_json = excluded.attributes_json,
            last_writer = excluded.last_writer,
            revision = excluded.revision,
            updated_at = excluded.updated_at",
        params![
            instance_id,
            key.as_str(),
            serde_json::to_string(&entry.value).unwrap_or_default(),
            serde_json::to_string(&entry.attributes).unwrap_or_default(),
            entry.meta.last_writer,
            entry.meta.revision as i64,
            entry.meta.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

#[instrument(skip(conn))]
pub fn delete_entry(conn: &Connection, instance_id: &str, key: &EntryKey) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM entries WHERE instance_id = ?1 AND key = ?2",
        params![instance_id, key.as_str()],
    )?;
    Ok(())
}

#[instrument(skip(conn))]
pub fn load_entries(conn: &Connection, instance_id: &str) -> rusqlite::Result<Vec<(EntryKey, Entry)>> {
    let mut stmt = conn.prepare(
        "SELECT key, value_json, attributes_json, last_writer, revision, updated_at
         FROM entries WHERE instance_id = ?1",
    )?;
    let rows = stmt.query_map(params![instance_id], |row| {
        let key: String = row.get(0)?;
        let value_json: String = row.get(1)?;
        let attributes_json: String = row.get(2)?;
        let last_writer: String = row.get(3)?;
        let revision: i64 = row.get(4)?;
        let updated_at: String = row.get(5)?;
        Ok((key, value_json, attributes_json, last_writer, revision, updated_at))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (key, value_json, attributes_json, last_writer, revision, updated_at) = row?;
        let value: Value = serde_json::from_str(&value_json).unwrap_or(Value::Text(String::new()));
        let attributes: Attributes =
            serde_json::from_str(&attributes_json).unwrap_or_else(|_| Attributes::new(value.kind()));
        let updated_at = chrono::DateTime::parse_from_rfc3339(&updated_at)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now());
        let Ok(entry_key) = EntryKey::new(key) else {
            continue;
        };
        out.push((
            entry_key,
            Entry {
                value,
                attributes,
                tags: Default::default(),
                meta: EntryMeta {
                    last_writer,
                    revision: revision as u64,
                    updated_at,
                },
            },
        ));
    }
    Ok(out)
}
