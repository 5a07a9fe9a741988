//! Smoke cases run against a [`Store`].
//!
//! Each case opens its own database handle, performs one representative
//! operation, checks the answer and closes the handle. Any error ends the
//! case; nothing is retried. Handles are dropped on every early return, so a
//! failing case never leaves a database open.

use crate::config::{HarnessConfig, Probe, BULK_KEY_PREFIX, MAX_BULK_RECORDS};
use crate::error::{Error, Result};
use crate::report::{CaseOutcome, RunReport};
use crate::sqlite_store::SqliteStore;
use crate::store::{OpenMode, Store};
use serde::Serialize;
use std::fmt;
use std::io;
use std::marker::PhantomData;
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;

/// The smoke cases, in the order `run_all` executes them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Case {
    Read,
    Write,
    Delete,
    Bulk,
}

impl Case {
    pub const ALL: [Case; 4] = [Case::Read, Case::Write, Case::Delete, Case::Bulk];

    pub fn name(&self) -> &'static str {
        match self {
            Case::Read => "read",
            Case::Write => "write",
            Case::Delete => "delete",
            Case::Bulk => "bulk",
        }
    }
}

impl fmt::Display for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Case {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "read" => Ok(Case::Read),
            "write" => Ok(Case::Write),
            "delete" => Ok(Case::Delete),
            "bulk" => Ok(Case::Bulk),
            other => Err(format!(
                "unknown case '{other}' (expected read, write, delete or bulk)"
            )),
        }
    }
}

/// Runs smoke cases with one engine and one configuration
pub struct Harness<S: Store = SqliteStore> {
    config: HarnessConfig,
    _store: PhantomData<S>,
}

impl Harness<SqliteStore> {
    /// Harness over the SQLite engine
    pub fn new(config: HarnessConfig) -> Self {
        Self::with_store(config)
    }
}

impl<S: Store> Harness<S> {
    /// Harness over any store implementation
    pub fn with_store(config: HarnessConfig) -> Self {
        Self {
            config,
            _store: PhantomData,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Read the known record from the fixture database.
    ///
    /// The fixture must exist and be non-empty. It is opened read-only and
    /// the engine's integrity check runs before the lookup.
    pub fn test_read(&self) -> Result<()> {
        let path = self.config.fixture_path()?;
        ensure_fixture(path)?;

        let store = self.open(path, OpenMode::ReadOnly)?;
        store.check_integrity()?;
        if !store.has_table()? {
            return Err(Error::MissingTable {
                path: path.to_path_buf(),
                table: self.config.table.clone(),
            });
        }
        expect_value(&store, &self.config.probes.read)?;
        store.close()
    }

    /// Write the known record to the write-scratch file and read it back,
    /// first through the same handle and then after reopening.
    pub fn test_write(&self) -> Result<()> {
        let path = &self.config.write_path;
        let probe = &self.config.probes.write;
        self.prepare_scratch(path)?;

        let mut store = self.open(path, OpenMode::ReadWriteCreate)?;
        store.put(&probe.key, probe.value)?;
        expect_value(&store, probe)?;
        store.close()?;

        let store = self.open(path, OpenMode::ReadWriteCreate)?;
        expect_value(&store, probe)?;
        store.close()
    }

    /// Insert then delete the known record in the delete-scratch file and
    /// check it is gone, immediately and after reopening.
    pub fn test_delete(&self) -> Result<()> {
        let path = &self.config.delete_path;
        let probe = &self.config.probes.delete;
        self.prepare_scratch(path)?;

        let mut store = self.open(path, OpenMode::ReadWriteCreate)?;
        store.put(&probe.key, probe.value)?;
        expect_value(&store, probe)?;

        if !store.delete(&probe.key)? {
            return Err(Error::NothingDeleted(probe.key.clone()));
        }
        expect_absent(&store, &probe.key)?;
        store.close()?;

        let store = self.open(path, OpenMode::ReadWriteCreate)?;
        expect_absent(&store, &probe.key)?;
        store.close()
    }

    /// Write `tables x rows` records in one batch to the write-scratch file,
    /// verify every one after reopening, then remove them again.
    pub fn test_bulk_write(&self) -> Result<()> {
        let path = &self.config.write_path;
        let bulk = &self.config.bulk;
        if bulk.records().is_none() {
            return Err(Error::Config(format!(
                "Bulk size {} x {} exceeds {MAX_BULK_RECORDS} records",
                bulk.tables, bulk.rows
            )));
        }
        let expected = bulk_entries(bulk.tables, bulk.rows);

        let mut store = self.open(path, OpenMode::ReadWriteCreate)?;
        store.put_batch(&expected)?;
        store.close()?;

        let mut store = self.open(path, OpenMode::ReadWriteCreate)?;
        for (key, value) in &expected {
            match store.get(key)? {
                Some(actual) if actual == *value => {}
                actual => {
                    return Err(Error::ValueMismatch {
                        key: key.clone(),
                        expected: *value,
                        actual,
                    })
                }
            }
        }

        // Sweep every bulk key, including ones left behind by larger runs
        let written: Vec<String> = store
            .entries()?
            .into_iter()
            .map(|(key, _)| key)
            .filter(|key| key.starts_with(BULK_KEY_PREFIX))
            .collect();
        log::debug!("Verified {} bulk records, removing {}", expected.len(), written.len());
        for key in &written {
            store.delete(key)?;
        }

        if let Some((key, value)) = store
            .entries()?
            .into_iter()
            .find(|(key, _)| key.starts_with(BULK_KEY_PREFIX))
        {
            return Err(Error::StillPresent { key, value });
        }
        store.close()
    }

    /// Run one case and record how it went
    pub fn run_case(&self, case: Case) -> CaseOutcome {
        log::info!("Running {case} case");
        let start = Instant::now();
        let result = match case {
            Case::Read => self.test_read(),
            Case::Write => self.test_write(),
            Case::Delete => self.test_delete(),
            Case::Bulk => self.test_bulk_write(),
        };
        let elapsed = start.elapsed();

        match &result {
            Ok(()) => log::info!("{case} case passed in {elapsed:?}"),
            Err(err) => log::error!("{case} case failed ({}): {err}", err.kind()),
        }
        CaseOutcome::new(case, elapsed, result)
    }

    /// Run the given cases in order. A failing case does not stop the others.
    pub fn run(&self, cases: &[Case]) -> RunReport {
        let mut report = RunReport::start();
        for &case in cases {
            report.push(self.run_case(case));
        }
        report
    }

    pub fn run_all(&self) -> RunReport {
        self.run(&Case::ALL)
    }

    fn open(&self, path: &Path, mode: OpenMode) -> Result<S> {
        S::open(path, &self.config.table, mode, &self.config.engine)
    }

    fn prepare_scratch(&self, path: &Path) -> Result<()> {
        if self.config.reset_scratch {
            log::debug!("Resetting scratch file {}", path.display());
            S::destroy(path)?;
        }
        Ok(())
    }
}

/// The fixture must be a regular, non-empty file before the engine sees it.
fn ensure_fixture(path: &Path) -> Result<()> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(Error::MissingFixture(path.to_path_buf()))
        }
        Err(err) => return Err(Error::Io(err)),
    };
    if !metadata.is_file() {
        return Err(Error::MissingFixture(path.to_path_buf()));
    }
    if metadata.len() == 0 {
        return Err(Error::EmptyFixture(path.to_path_buf()));
    }
    Ok(())
}

fn expect_value<S: Store>(store: &S, probe: &Probe) -> Result<()> {
    match store.get(&probe.key)? {
        Some(actual) if actual == probe.value => Ok(()),
        actual => Err(Error::ValueMismatch {
            key: probe.key.clone(),
            expected: probe.value,
            actual,
        }),
    }
}

fn expect_absent<S: Store>(store: &S, key: &str) -> Result<()> {
    match store.get(key)? {
        None => Ok(()),
        Some(value) => Err(Error::StillPresent {
            key: key.to_string(),
            value,
        }),
    }
}

/// Keys `bulk:<table>:<row>`, zero-padded so key order matches write order
pub fn bulk_entries(tables: usize, rows: usize) -> Vec<(String, i64)> {
    let mut entries = Vec::with_capacity(tables * rows);
    for table in 0..tables {
        for row in 0..rows {
            let key = format!("{BULK_KEY_PREFIX}{table:04}:{row:04}");
            entries.push((key, (table * rows + row) as i64));
        }
    }
    entries
}
