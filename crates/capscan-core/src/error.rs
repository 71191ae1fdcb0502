use thiserror::Error;

use crate::ledger::LedgerError;
use crate::scanner::WalkError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] WalkError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("{0}")]
    Other(String),
}
