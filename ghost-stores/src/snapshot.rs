/*!
Private, read-only copies of live SQLite databases.

Applications keep their databases open (and locked) while running. Scanning
a copy never contends with the owner and can never modify the original. The
copy lives in a temporary directory that is removed when the snapshot drops.
*/

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use tempfile::TempDir;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Companion files SQLite keeps next to a database in WAL mode. Copying them
/// keeps committed-but-not-checkpointed rows visible in the snapshot.
const COMPANION_SUFFIXES: &[&str] = &["-wal", "-shm"];

pub struct Snapshot {
    conn: Connection,
    source: PathBuf,
    // Field order matters: the connection must close before the directory
    // is removed.
    _dir: TempDir,
}

impl Snapshot {
    /// Copy `db_path` (and its WAL companions) and open the copy read-only.
    pub fn of<P: AsRef<Path>>(db_path: P) -> StoreResult<Self> {
        let source = db_path.as_ref();
        let dir = TempDir::new().map_err(|e| StoreError::io(std::env::temp_dir(), e))?;
        let file_name = source.file_name().ok_or_else(|| StoreError::Malformed {
            what: "database path",
            detail: source.display().to_string(),
        })?;

        let copy = dir.path().join(file_name);
        fs::copy(source, &copy).map_err(|e| StoreError::io(source, e))?;

        for suffix in COMPANION_SUFFIXES {
            let mut companion = source.as_os_str().to_owned();
            companion.push(suffix);
            let companion = PathBuf::from(companion);
            if companion.exists() {
                let mut target = copy.as_os_str().to_owned();
                target.push(suffix);
                fs::copy(&companion, PathBuf::from(target)).map_err(|e| StoreError::io(&companion, e))?;
            }
        }

        // Read-write on the private copy so SQLite can replay the WAL; the
        // original is never opened.
        let conn = Connection::open_with_flags(
            &copy,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        debug!("Snapshot of {} at {}", source.display(), copy.display());
        Ok(Self {
            conn,
            source: source.to_path_buf(),
            _dir: dir,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Whether `table` exists in the snapshot.
    pub fn has_table(&self, table: &str) -> StoreResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
