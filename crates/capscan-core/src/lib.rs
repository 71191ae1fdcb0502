pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod naming;
pub mod persist;
pub mod platform;
pub mod progress;
pub mod record;
pub mod report;
pub mod scanner;
pub mod tags;

pub use config::AppConfig;
pub use engine::{RunPlan, RunSummary, ScanEngine};
pub use error::Error;
pub use ledger::{CsvLedger, HistoryEntry, RunLedger};
pub use progress::{ProgressReporter, SilentReporter};
pub use record::{MatchStatus, ScanRecord};
