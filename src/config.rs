use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default record table name
pub const DEFAULT_TABLE: &str = "kv";
/// File names used for the scratch databases inside the temp directory
pub const DEFAULT_WRITE_FILE: &str = "write.native";
pub const DEFAULT_DELETE_FILE: &str = "delete.native";
/// Key prefix reserved for the bulk-write case
pub const BULK_KEY_PREFIX: &str = "bulk:";
/// Upper bound on records written by the bulk case
pub const MAX_BULK_RECORDS: usize = 1_000_000;

/// Run-time configuration for the harness.
///
/// Loaded from an optional TOML file and then overridden by environment
/// variables and command-line flags (see [`ConfigOverrides`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Pre-populated database read by the read case
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixture_path: Option<PathBuf>,

    /// Scratch database for the write and bulk cases
    #[serde(default = "default_write_path")]
    pub write_path: PathBuf,

    /// Scratch database for the delete case
    #[serde(default = "default_delete_path")]
    pub delete_path: PathBuf,

    /// Table holding the key/value records
    #[serde(default = "default_table")]
    pub table: String,

    /// Remove scratch files before a case opens them
    #[serde(default)]
    pub reset_scratch: bool,

    /// Known records used by each case
    #[serde(default)]
    pub probes: ProbeConfig,

    /// Bulk write sizing
    #[serde(default)]
    pub bulk: BulkConfig,

    /// Connection settings passed to the engine
    #[serde(default)]
    pub engine: EngineOptions,
}

/// A known record a case writes or expects to find.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    pub key: String,
    pub value: i64,
}

impl Probe {
    pub fn new(key: impl Into<String>, value: i64) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_read_probe")]
    pub read: Probe,
    #[serde(default = "default_write_probe")]
    pub write: Probe,
    #[serde(default = "default_delete_probe")]
    pub delete: Probe,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkConfig {
    /// Number of key groups written by the bulk case
    #[serde(default = "default_bulk_tables")]
    pub tables: usize,
    /// Records per group
    #[serde(default = "default_bulk_rows")]
    pub rows: usize,
}

impl BulkConfig {
    /// Total records, or `None` when `tables * rows` overflows or exceeds
    /// [`MAX_BULK_RECORDS`]
    pub fn records(&self) -> Option<usize> {
        self.tables
            .checked_mul(self.rows)
            .filter(|total| *total <= MAX_BULK_RECORDS)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineOptions {
    /// How long a connection waits on a locked database
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Journal mode set on read-write connections
    #[serde(default)]
    pub journal_mode: JournalMode,
    /// Synchronous level set on read-write connections
    #[serde(default)]
    pub synchronous: Synchronous,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    #[default]
    Delete,
    Truncate,
    Persist,
    Memory,
    Wal,
}

impl JournalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Truncate => "TRUNCATE",
            JournalMode::Persist => "PERSIST",
            JournalMode::Memory => "MEMORY",
            JournalMode::Wal => "WAL",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Synchronous {
    Off,
    Normal,
    #[default]
    Full,
}

impl Synchronous {
    pub fn as_str(&self) -> &'static str {
        match self {
            Synchronous::Off => "OFF",
            Synchronous::Normal => "NORMAL",
            Synchronous::Full => "FULL",
        }
    }
}

/// Values supplied on the command line or through the environment.
/// Every `Some` field replaces what the config file said.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub fixture_path: Option<PathBuf>,
    pub write_path: Option<PathBuf>,
    pub delete_path: Option<PathBuf>,
    pub table: Option<String>,
    pub reset_scratch: Option<bool>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            fixture_path: None,
            write_path: default_write_path(),
            delete_path: default_delete_path(),
            table: default_table(),
            reset_scratch: false,
            probes: ProbeConfig::default(),
            bulk: BulkConfig::default(),
            engine: EngineOptions::default(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            read: default_read_probe(),
            write: default_write_probe(),
            delete: default_delete_probe(),
        }
    }
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            tables: default_bulk_tables(),
            rows: default_bulk_rows(),
        }
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: JournalMode::default(),
            synchronous: Synchronous::default(),
        }
    }
}

fn default_write_path() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_WRITE_FILE)
}

fn default_delete_path() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_DELETE_FILE)
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_read_probe() -> Probe {
    Probe::new("k1", 42)
}

fn default_write_probe() -> Probe {
    Probe::new("k2", 7)
}

fn default_delete_probe() -> Probe {
    Probe::new("k3", 1)
}

fn default_bulk_tables() -> usize {
    10
}

fn default_bulk_rows() -> usize {
    10
}

fn default_busy_timeout_ms() -> u64 {
    1_000
}

impl HarnessConfig {
    /// Load config from TOML file.
    ///
    /// Relative paths inside the file are resolved against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut config: HarnessConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.fixture_path = config.fixture_path.map(|p| resolve_against(base, p));
        config.write_path = resolve_against(base, config.write_path);
        config.delete_path = resolve_against(base, config.delete_path);

        Ok(config)
    }

    /// Build the effective config: defaults or file, then overrides, then validation.
    pub fn load(config_file: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply(overrides);
        config.validate()?;
        log::debug!("Effective config: {config:?}");
        Ok(config)
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(path) = overrides.fixture_path {
            self.fixture_path = Some(path);
        }
        if let Some(path) = overrides.write_path {
            self.write_path = path;
        }
        if let Some(path) = overrides.delete_path {
            self.delete_path = path;
        }
        if let Some(table) = overrides.table {
            self.table = table;
        }
        if let Some(reset) = overrides.reset_scratch {
            self.reset_scratch = reset;
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_identifier(&self.table)?;

        if self.write_path == self.delete_path {
            return Err(Error::Config(format!(
                "Write and delete scratch files must differ: {}",
                self.write_path.display()
            )));
        }
        if let Some(fixture) = &self.fixture_path {
            if fixture == &self.write_path || fixture == &self.delete_path {
                return Err(Error::Config(format!(
                    "Fixture database must not double as a scratch file: {}",
                    fixture.display()
                )));
            }
        }

        for probe in [&self.probes.read, &self.probes.write, &self.probes.delete] {
            if probe.key.is_empty() {
                return Err(Error::Config("Probe keys must not be empty".to_string()));
            }
            if probe.key.starts_with(BULK_KEY_PREFIX) {
                return Err(Error::Config(format!(
                    "Probe key '{}' uses the reserved prefix '{BULK_KEY_PREFIX}'",
                    probe.key
                )));
            }
        }

        if self.bulk.tables == 0 || self.bulk.rows == 0 {
            return Err(Error::Config(
                "Bulk tables and rows must both be at least 1".to_string(),
            ));
        }
        if self.bulk.records().is_none() {
            return Err(Error::Config(format!(
                "Bulk size {} x {} exceeds {MAX_BULK_RECORDS} records",
                self.bulk.tables, self.bulk.rows
            )));
        }

        Ok(())
    }

    /// Fixture path, or a config error naming how to supply it
    pub fn fixture_path(&self) -> Result<&Path> {
        self.fixture_path.as_deref().ok_or_else(|| {
            Error::Config(
                "No fixture database configured (use --fixture or SMOKEDB_FIXTURE)".to_string(),
            )
        })
    }
}

fn resolve_against(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Table names are spliced into SQL, so only plain identifiers are accepted.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::Config(format!("Invalid table name: '{name}'")))
    }
}
