//! Building the read fixture and looking inside database files.

use crate::config::{EngineOptions, Probe};
use crate::error::{Error, Result};
use crate::sqlite_store::{SqliteStore, TableInfo};
use crate::store::{OpenMode, Store};
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Create a fixture database at `path` holding `probe` in `table`.
///
/// An existing file is only replaced when `force` is set.
pub fn create_fixture(
    path: &Path,
    table: &str,
    probe: &Probe,
    options: &EngineOptions,
    force: bool,
) -> Result<()> {
    if path.exists() {
        if !force {
            return Err(Error::AlreadyExists(path.to_path_buf()));
        }
        log::warn!("Replacing existing fixture {}", path.display());
        SqliteStore::destroy(path)?;
    }

    let mut store = SqliteStore::open(path, table, OpenMode::ReadWriteCreate, options)?;
    store.put(&probe.key, probe.value)?;
    store.check_integrity()?;
    store.close()?;

    log::info!(
        "Created fixture {} with {} = {}",
        path.display(),
        probe.key,
        probe.value
    );
    Ok(())
}

/// What `inspect` found in a database file
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub path: PathBuf,
    pub page_count: i64,
    pub tables: Vec<TableInfo>,
    /// Records of the record table, `None` when the file has no such table
    pub records: Option<Vec<(String, i64)>>,
}

/// Open `path` read-only, check integrity, and list its tables and records.
pub fn inspect(path: &Path, table: &str, options: &EngineOptions) -> Result<Inspection> {
    if !path.is_file() {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }

    let store = SqliteStore::open(path, table, OpenMode::ReadOnly, options)?;
    store.check_integrity()?;

    let page_count = store.page_count()?;
    let tables = store.tables()?;
    let records = if store.has_table()? {
        Some(store.entries()?)
    } else {
        None
    };
    store.close()?;

    Ok(Inspection {
        path: path.to_path_buf(),
        page_count,
        tables,
        records,
    })
}

impl fmt::Display for Inspection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Database: {}", self.path.display())?;
        writeln!(f, "Pages:    {}", self.page_count)?;
        writeln!(f, "Tables:   {}", self.tables.len())?;
        for table in &self.tables {
            writeln!(f, "  {:20} {} rows", table.name, table.rows)?;
        }
        match &self.records {
            None => writeln!(f, "No record table")?,
            Some(records) if records.is_empty() => writeln!(f, "No records")?,
            Some(records) => {
                writeln!(f, "Records:")?;
                for (key, value) in records {
                    writeln!(f, "  {key} = {value}")?;
                }
            }
        }
        Ok(())
    }
}
