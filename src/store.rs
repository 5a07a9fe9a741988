use crate::config::EngineOptions;
use crate::error::Result;
use std::path::Path;

/// How a database file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Open an existing file without write access
    ReadOnly,
    /// Open for writing, creating the file and record table if absent
    ReadWriteCreate,
}

/// Engine operations the harness relies on.
///
/// A store owns one open database resource. Dropping it releases the
/// resource; `close` does the same but reports errors.
pub trait Store {
    /// Open the database at `path`, keeping records in `table`
    fn open(path: &Path, table: &str, mode: OpenMode, options: &EngineOptions) -> Result<Self>
    where
        Self: Sized;

    /// Whether the record table exists
    fn has_table(&self) -> Result<bool>;

    /// Look up a key, `None` when absent
    fn get(&self, key: &str) -> Result<Option<i64>>;

    /// Insert or overwrite a record
    fn put(&mut self, key: &str, value: i64) -> Result<()>;

    /// Insert or overwrite many records atomically
    fn put_batch(&mut self, entries: &[(String, i64)]) -> Result<()>;

    /// Remove a record, returning whether one existed
    fn delete(&mut self, key: &str) -> Result<bool>;

    /// All records in key order
    fn entries(&self) -> Result<Vec<(String, i64)>>;

    /// Ask the engine to verify its on-disk structures
    fn check_integrity(&self) -> Result<()>;

    /// Release the resource
    fn close(self) -> Result<()>
    where
        Self: Sized;

    /// Remove the database at `path` and any side files the engine keeps.
    /// Removing a database that does not exist is not an error.
    fn destroy(path: &Path) -> Result<()>
    where
        Self: Sized;
}
