mod pragmas;
mod read_pool;

pub use pragmas::{apply_pragmas, verify_wal_mode};
pub use read_pool::{ReadPool, DEFAULT_POOL_SIZE, MAX_POOL_SIZE};

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// The single writer connection for a database file. The authority holds
/// exactly one of these per instance — there is never more than one writer
/// in flight, matching the single-writer-per-instance actor model.
pub struct WriteConnection {
    conn: Mutex<Connection>,
}

impl WriteConnection {
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        apply_pragmas(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_pragmas(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> rusqlite::Result<T> {
        let conn = self.conn.lock().expect("write connection mutex poisoned");
        f(&conn)
    }
}

/// Combines a writer and a read pool against the same database file.
pub struct ConnectionPool {
    pub writer: WriteConnection,
    pub readers: ReadPool,
    pub db_path: PathBuf,
}

impl ConnectionPool {
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        let writer = WriteConnection::open(path)?;
        let readers = ReadPool::open(path, DEFAULT_POOL_SIZE)?;
        Ok(Self {
            writer,
            readers,
            db_path: path.to_path_buf(),
        })
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        let writer = WriteConnection::open_in_memory()?;
        let readers = ReadPool::open_in_memory(DEFAULT_POOL_SIZE)?;
        Ok(Self {
            writer,
            readers,
            db_path: PathBuf::from(":memory:"),
        })
    }
}
