pub mod config;
mod error;
pub mod fixture;
pub mod harness;
pub mod logging;
pub mod report;
pub mod sqlite_store;
pub mod store;

pub use config::{ConfigOverrides, HarnessConfig, Probe};
pub use error::{Error, FailureKind, Result};
pub use harness::{Case, Harness};
pub use report::{CaseOutcome, OutputFormat, RunReport};
pub use sqlite_store::SqliteStore;
pub use store::{OpenMode, Store};
