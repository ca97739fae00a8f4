use crate::models::{Credential, PermissionLevel};
use crate::schema;
use chrono::Utc;
use mindcache_core::errors::RegistryError;
use mindcache_core::ActorId;
use mindcache_storage::{queries, WriteConnection};
use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, instrument, warn};

/// The global registry (L4'): users, instances, delegates, and
/// instance×actor permission grants. One registry serves every instance on
/// an authority process; it is a small relational store that sits outside
/// any single instance's single-writer actor.
pub struct Registry {
    conn: Mutex<Connection>,
}

fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl Registry {
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    #[instrument(skip(self, credential))]
    pub fn authenticate(
        &self,
        credential: &Credential,
    ) -> Result<ActorId, RegistryError> {
        let conn = self.conn.lock().expect("registry mutex poisoned");
        match credential {
            Credential::Bearer { token } => {
                let subject: Option<String> = conn
                    .query_row(
                        "SELECT subject_id FROM users WHERE subject_id = ?1",
                        params![token],
                        |row| row.get(0),
                    )
                    .ok();
                subject
                    .map(ActorId::new)
                    .ok_or(RegistryError::InvalidCredential)
            }
            Credential::Delegate { delegate_id, secret } => {
                let row: Option<(String, Option<String>)> = conn
                    .query_row(
                        "SELECT secret_hash, expires_at FROM delegates WHERE id = ?1",
                        params![delegate_id],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .ok();
                let Some((secret_hash, expires_at)) = row else {
                    return Err(RegistryError::NotFound {
                        kind: "delegate",
                        id: delegate_id.clone(),
                    });
                };
                if let Some(expires_at) = expires_at {
                    if let Ok(expires_at) = chrono::DateTime::parse_from_rfc3339(&expires_at) {
                        if expires_at.with_timezone(&Utc) < Utc::now() {
                            warn!(delegate_id, "delegate expired");
                            return Err(RegistryError::DelegateExpired {
                                id: delegate_id.clone(),
                            });
                        }
                    }
                }
                if hash_secret(secret) != secret_hash {
                    return Err(RegistryError::InvalidCredential);
                }
                Ok(ActorId::new(delegate_id.clone()))
            }
        }
    }

    #[instrument(skip(self))]
    pub fn permissions_for(
        &self,
        instance_id: &str,
        actor_id: &ActorId,
    ) -> Result<HashSet<PermissionLevel>, RegistryError> {
        let conn = self.conn.lock().expect("registry mutex poisoned");
        let mut stmt = conn
            .prepare("SELECT permission FROM permissions WHERE instance_id = ?1 AND actor_id = ?2")
            .map_err(|_| RegistryError::InvalidCredential)?;
        let rows = stmt
            .query_map(params![instance_id, actor_id.as_str()], |row| {
                row.get::<_, String>(0)
            })
            .map_err(|_| RegistryError::InvalidCredential)?;
        let mut set = HashSet::new();
        for row in rows {
            match row.ok().as_deref() {
                Some("read") => {
                    set.insert(PermissionLevel::Read);
                }
                Some("write") => {
                    set.insert(PermissionLevel::Write);
                }
                Some("system") => {
                    set.insert(PermissionLevel::System);
                }
                _ => {}
            }
        }
        Ok(set)
    }

    #[instrument(skip(self))]
    pub fn grant(
        &self,
        instance_id: &str,
        actor_id: &ActorId,
        permission: PermissionLevel,
    ) -> Result<(), RegistryError> {
        let conn = self.conn.lock().expect("registry mutex poisoned");
        let permission_str = match permission {
            PermissionLevel::Read => "read",
            PermissionLevel::Write => "write",
            PermissionLevel::System => "system",
        };
        conn.execute(
            "INSERT OR IGNORE INTO permissions (instance_id, actor_id, permission) VALUES (?1, ?2, ?3)",
            params![instance_id, actor_id.as_str(), permission_str],
        )
        .map_err(|_| RegistryError::InvalidCredential)?;
        Ok(())
    }

    /// Clones an instance's entries at the moment of the call, stamping
    /// `parent_instance_id` for provenance. The clone is a snapshot, not an
    /// ongoing link — entries diverge from there.
    ///
    /// `entries` is the same `mindcache-storage` connection the authority
    /// writes instance entries through; instance/permission bookkeeping
    /// lives in this registry's own database, but entry rows live in the
    /// authority's, so copying them takes a handle to both.
    #[instrument(skip(self, entries))]
    pub fn clone_instance(
        &self,
        source_instance_id: &str,
        new_owner: &str,
        entries: &WriteConnection,
    ) -> Result<String, RegistryError> {
        let new_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        {
            let conn = self.conn.lock().expect("registry mutex poisoned");
            conn.execute(
                "INSERT INTO instances (id, owner_user_id, parent_instance_id, readonly, created_at)
                 VALUES (?1, ?2, ?3, 0, ?4)",
                params![new_id, new_owner, source_instance_id, now],
            )
            .map_err(|_| RegistryError::NotFound {
                kind: "instance",
                id: source_instance_id.to_string(),
            })?;
        }

        entries
            .with_conn(|conn| {
                let loaded = queries::entries::load_entries(conn, source_instance_id)?;
                for (key, entry) in loaded {
                    queries::entries::upsert_entry(conn, &new_id, &key, &entry)?;
                }
                Ok(())
            })
            .map_err(|_| RegistryError::NotFound {
                kind: "instance",
                id: source_instance_id.to_string(),
            })?;

        info!(source_instance_id, new_id, "instance cloned");
        Ok(new_id)
    }
}
