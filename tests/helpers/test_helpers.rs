#![allow(dead_code)]

//! Shared helpers for the integration tests

use smokedb::config::EngineOptions;
use smokedb::fixture::create_fixture;
use smokedb::{HarnessConfig, Probe};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway directory holding a fixture and both scratch files
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    /// Empty workspace, no fixture yet
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Workspace whose fixture holds `k1 = 42`
    pub fn with_fixture() -> Self {
        let ws = Self::empty();
        create_fixture(
            &ws.fixture_path(),
            "kv",
            &Probe::new("k1", 42),
            &EngineOptions::default(),
            false,
        )
        .expect("Failed to create fixture");
        ws
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn fixture_path(&self) -> PathBuf {
        self.dir.path().join("testdb.sqlite")
    }

    pub fn write_path(&self) -> PathBuf {
        self.dir.path().join("write.native")
    }

    pub fn delete_path(&self) -> PathBuf {
        self.dir.path().join("delete.native")
    }

    /// Config pointing every path into this workspace
    pub fn config(&self) -> HarnessConfig {
        HarnessConfig {
            fixture_path: Some(self.fixture_path()),
            write_path: self.write_path(),
            delete_path: self.delete_path(),
            ..HarnessConfig::default()
        }
    }
}
