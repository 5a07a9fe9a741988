//! `Store` implementation over an embedded SQLite database.
//!
//! Records live in a single table with schema
//! `key TEXT PRIMARY KEY NOT NULL, value INTEGER NOT NULL`. Only the public
//! SQL interface of the engine is used.

use crate::config::{validate_identifier, EngineOptions};
use crate::error::{Error, Result};
use crate::store::{OpenMode, Store};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Open SQLite database holding key/value records
pub struct SqliteStore {
    conn: Connection,
    table: String,
    path: PathBuf,
    mode: OpenMode,
}

/// A user table and its row count, as reported by `inspect`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub rows: i64,
}

impl SqliteStore {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Number of pages in the database file
    pub fn page_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("PRAGMA page_count", [], |row| row.get(0))?)
    }

    /// User tables with their row counts, in name order
    pub fn tables(&self) -> Result<Vec<TableInfo>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(&name));
            let rows: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
            tables.push(TableInfo { name, rows });
        }
        Ok(tables)
    }

    fn configure_writer(conn: &Connection, table: &str, options: &EngineOptions) -> Result<()> {
        // journal_mode answers with the mode actually in effect
        let journal: String = conn.query_row(
            &format!("PRAGMA journal_mode = {}", options.journal_mode.as_str()),
            [],
            |row| row.get(0),
        )?;
        if !journal.eq_ignore_ascii_case(options.journal_mode.as_str()) {
            log::warn!(
                "Requested journal mode {} but engine is using {journal}",
                options.journal_mode.as_str()
            );
        }
        conn.execute_batch(&format!(
            "PRAGMA synchronous = {};\n\
             CREATE TABLE IF NOT EXISTS {table} (\
                key TEXT PRIMARY KEY NOT NULL, \
                value INTEGER NOT NULL\
             );",
            options.synchronous.as_str()
        ))?;
        Ok(())
    }
}

impl Store for SqliteStore {
    fn open(path: &Path, table: &str, mode: OpenMode, options: &EngineOptions) -> Result<Self> {
        validate_identifier(table)?;

        let conn = match mode {
            OpenMode::ReadOnly => Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?,
            OpenMode::ReadWriteCreate => {
                if let Some(dir) = path.parent() {
                    if !dir.as_os_str().is_empty() {
                        std::fs::create_dir_all(dir)?;
                    }
                }
                Connection::open_with_flags(
                    path,
                    OpenFlags::SQLITE_OPEN_READ_WRITE
                        | OpenFlags::SQLITE_OPEN_CREATE
                        | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )?
            }
        };
        conn.busy_timeout(Duration::from_millis(options.busy_timeout_ms))?;

        if mode == OpenMode::ReadWriteCreate {
            Self::configure_writer(&conn, table, options)?;
        }

        log::debug!("Opened {} ({:?})", path.display(), mode);
        Ok(Self {
            conn,
            table: table.to_string(),
            path: path.to_path_buf(),
            mode,
        })
    }

    fn has_table(&self) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![self.table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn get(&self, key: &str) -> Result<Option<i64>> {
        let sql = format!("SELECT value FROM {} WHERE key = ?1", self.table);
        Ok(self
            .conn
            .query_row(&sql, params![key], |row| row.get(0))
            .optional()?)
    }

    fn put(&mut self, key: &str, value: i64) -> Result<()> {
        let sql = upsert_sql(&self.table);
        self.conn.execute(&sql, params![key, value])?;
        Ok(())
    }

    fn put_batch(&mut self, entries: &[(String, i64)]) -> Result<()> {
        let sql = upsert_sql(&self.table);
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for (key, value) in entries {
                stmt.execute(params![key, value])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE key = ?1", self.table);
        let removed = self.conn.execute(&sql, params![key])?;
        Ok(removed > 0)
    }

    fn entries(&self) -> Result<Vec<(String, i64)>> {
        let sql = format!("SELECT key, value FROM {} ORDER BY key", self.table);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn check_integrity(&self) -> Result<()> {
        let mut stmt = self.conn.prepare("PRAGMA integrity_check")?;
        let problems = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        if problems.len() == 1 && problems[0] == "ok" {
            Ok(())
        } else {
            Err(Error::Corrupted(format!(
                "{}: {}",
                self.path.display(),
                problems.join("; ")
            )))
        }
    }

    fn close(self) -> Result<()> {
        let path = self.path;
        self.conn.close().map_err(|(_, err)| Error::Sqlite(err))?;
        log::debug!("Closed {}", path.display());
        Ok(())
    }

    fn destroy(path: &Path) -> Result<()> {
        remove_if_exists(path)?;
        for suffix in JOURNAL_SUFFIXES {
            let mut side = path.as_os_str().to_owned();
            side.push(suffix);
            remove_if_exists(Path::new(&side))?;
        }
        Ok(())
    }
}

/// Side files SQLite may keep next to a database
const JOURNAL_SUFFIXES: [&str; 3] = ["-journal", "-wal", "-shm"];

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(Error::Io(err)),
    }
}

fn upsert_sql(table: &str) -> String {
    format!(
        "INSERT INTO {table} (key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value"
    )
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_rw(path: &Path) -> SqliteStore {
        SqliteStore::open(path, "kv", OpenMode::ReadWriteCreate, &EngineOptions::default())
            .unwrap()
    }

    #[test]
    fn test_has_table() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tables.sqlite");
        open_rw(&path).close()?;

        let store = SqliteStore::open(&path, "kv", OpenMode::ReadOnly, &EngineOptions::default())?;
        assert!(store.has_table()?);
        let other =
            SqliteStore::open(&path, "other", OpenMode::ReadOnly, &EngineOptions::default())?;
        assert!(!other.has_table()?);
        Ok(())
    }

    #[test]
    fn test_put_get_delete() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let mut store = open_rw(&dir.path().join("crud.sqlite"));

        assert_eq!(store.get("k1")?, None);
        store.put("k1", 42)?;
        assert_eq!(store.get("k1")?, Some(42));

        // Overwrite is an upsert, not a constraint error
        store.put("k1", 43)?;
        assert_eq!(store.get("k1")?, Some(43));

        assert!(store.delete("k1")?);
        assert!(!store.delete("k1")?);
        assert_eq!(store.get("k1")?, None);

        store.close()
    }

    #[test]
    fn test_put_batch_and_entries() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let mut store = open_rw(&dir.path().join("batch.sqlite"));

        let entries = vec![
            ("b".to_string(), 2),
            ("a".to_string(), 1),
            ("c".to_string(), 3),
        ];
        store.put_batch(&entries)?;

        assert_eq!(
            store.entries()?,
            vec![
                ("a".to_string(), 1),
                ("b".to_string(), 2),
                ("c".to_string(), 3)
            ]
        );
        Ok(())
    }

    #[test]
    fn test_open_creates_parent_directories() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("scratch.native");
        let store = open_rw(&path);
        store.close()?;
        assert!(path.exists());
        Ok(())
    }

    #[test]
    fn test_read_only_rejects_writes() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ro.sqlite");
        {
            let mut store = open_rw(&path);
            store.put("k1", 42)?;
        }

        let mut store =
            SqliteStore::open(&path, "kv", OpenMode::ReadOnly, &EngineOptions::default())?;
        assert_eq!(store.mode(), OpenMode::ReadOnly);
        assert_eq!(store.get("k1")?, Some(42));
        let err = store.put("k2", 7).unwrap_err();
        assert!(matches!(err, Error::Sqlite(_)));
        Ok(())
    }

    #[test]
    fn test_read_only_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let result = SqliteStore::open(
            &dir.path().join("absent.sqlite"),
            "kv",
            OpenMode::ReadOnly,
            &EngineOptions::default(),
        );
        assert!(matches!(result, Err(Error::Sqlite(_))));
    }

    #[test]
    fn test_integrity_check_on_healthy_file() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let mut store = open_rw(&dir.path().join("healthy.sqlite"));
        store.put("k1", 42)?;
        store.check_integrity()
    }

    #[test]
    fn test_garbage_file_is_an_engine_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.sqlite");
        std::fs::write(&path, vec![0x5A; 4096]).unwrap();

        // Depending on when the engine reads the header, either step may fail
        let err = match SqliteStore::open(&path, "kv", OpenMode::ReadOnly, &EngineOptions::default())
        {
            Ok(store) => store.check_integrity().unwrap_err(),
            Err(err) => err,
        };
        assert_eq!(err.kind(), crate::error::FailureKind::Engine);
    }

    #[test]
    fn test_tables_and_page_count() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let mut store = open_rw(&dir.path().join("tables.sqlite"));
        store.put("k1", 1)?;
        store.put("k2", 2)?;

        let tables = store.tables()?;
        assert_eq!(
            tables,
            vec![TableInfo {
                name: "kv".to_string(),
                rows: 2
            }]
        );
        assert!(store.page_count()? >= 1);
        Ok(())
    }

    #[test]
    fn test_destroy_removes_side_files() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.sqlite");
        let journal = dir.path().join("gone.sqlite-journal");
        open_rw(&path).close()?;
        std::fs::write(&journal, b"stale").unwrap();

        SqliteStore::destroy(&path)?;
        assert!(!path.exists());
        assert!(!journal.exists());

        // Destroying again is a no-op
        SqliteStore::destroy(&path)
    }

    #[test]
    fn test_rejects_bad_table_name() {
        let dir = TempDir::new().unwrap();
        let result = SqliteStore::open(
            &dir.path().join("bad.sqlite"),
            "kv; --",
            OpenMode::ReadWriteCreate,
            &EngineOptions::default(),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
