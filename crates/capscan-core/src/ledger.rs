//! Run history ledger: a CSV table with one row per processed folder,
//! rewritten in full on every flush.

use chrono::Local;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::naming::{fallback_file_name, file_stamp, snapshot_file_name, LEDGER_FILE_NAME};
use crate::persist::{Artifact, DurableSaver};
use crate::platform::display_path;
use crate::record::{ArtifactPath, FileLink, NOT_AVAILABLE};
use crate::report::{Cell, Sheet};

pub const LEDGER_HEADERS: [&str; 9] = [
    "Timestamp",
    "Scanned folder",
    "Total files",
    "Matched",
    "Unmatched",
    "Log file",
    "Log link",
    "Report file",
    "Report link",
];

const HISTORY_TITLE: &str = "Run history";

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("cannot delete ledger {} (is it open in another program?): {source}", display_path(.path))]
    DeleteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("ledger could not be saved to {} or its fallback location", display_path(.path))]
    SaveFailed { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Summary of one folder run as persisted in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub folder: PathBuf,
    pub total: u64,
    pub matched: u64,
    pub unmatched: u64,
    pub log: ArtifactPath,
    pub report: ArtifactPath,
}

/// Where a flush ended up.
#[derive(Debug, Clone)]
pub struct FlushOutcome {
    pub saved: PathBuf,
    pub used_fallback: bool,
    /// Point-in-time copy in the cache directory, if one could be written.
    pub snapshot: Option<PathBuf>,
}

/// Persistent record of past runs.
///
/// `record` only touches memory; nothing reaches disk until `flush`.
pub trait RunLedger {
    /// Replace the in-memory entries with the persisted ones. Returns the
    /// number of entries loaded.
    fn load(&mut self) -> Result<usize, LedgerError>;

    fn record(&mut self, entry: HistoryEntry);

    fn flush(&mut self) -> Result<FlushOutcome, LedgerError>;

    fn entries(&self) -> &[HistoryEntry];
}

/// Column positions resolved from a ledger file's header row.
struct ColumnMap {
    timestamp: Option<usize>,
    folder: Option<usize>,
    total: Option<usize>,
    matched: Option<usize>,
    unmatched: Option<usize>,
    log: Option<usize>,
    report: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        Self {
            timestamp: find(LEDGER_HEADERS[0]),
            folder: find(LEDGER_HEADERS[1]),
            total: find(LEDGER_HEADERS[2]),
            matched: find(LEDGER_HEADERS[3]),
            unmatched: find(LEDGER_HEADERS[4]),
            log: find(LEDGER_HEADERS[5]),
            report: find(LEDGER_HEADERS[7]),
        }
    }

    fn entry(&self, row: &csv::StringRecord) -> HistoryEntry {
        let text = |idx: Option<usize>| idx.and_then(|i| row.get(i)).unwrap_or("").trim();
        let count = |idx: Option<usize>| text(idx).parse::<u64>().unwrap_or(0);
        HistoryEntry {
            timestamp: text(self.timestamp).to_string(),
            folder: PathBuf::from(text(self.folder)),
            total: count(self.total),
            matched: count(self.matched),
            unmatched: count(self.unmatched),
            log: ArtifactPath::from_cell(text(self.log)),
            report: ArtifactPath::from_cell(text(self.report)),
        }
    }
}

fn link_cell(artifact: &ArtifactPath, open_text: &str, missing_text: &str) -> Cell {
    match artifact.path() {
        Some(path) => Cell::from_link(FileLink::to_existing(path, open_text).as_ref(), missing_text),
        None => Cell::text(NOT_AVAILABLE),
    }
}

/// The ledger as written to disk. Link cells reflect file existence at
/// write time.
struct LedgerTable<'a> {
    entries: &'a [HistoryEntry],
}

impl Artifact for LedgerTable<'_> {
    fn write_into(&self, out: &mut dyn Write) -> io::Result<()> {
        let mut wtr = csv::Writer::from_writer(out);
        wtr.write_record(LEDGER_HEADERS)?;
        for entry in self.entries {
            wtr.write_record([
                entry.timestamp.clone(),
                display_path(&entry.folder),
                entry.total.to_string(),
                entry.matched.to_string(),
                entry.unmatched.to_string(),
                entry.log.to_cell(),
                link_cell(&entry.log, "Open log", "Log file not found").to_field(),
                entry.report.to_cell(),
                link_cell(&entry.report, "Open report", "Report file not found").to_field(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// CSV-backed [`RunLedger`].
pub struct CsvLedger {
    path: PathBuf,
    fallback_path: PathBuf,
    cache_dir: PathBuf,
    saver: DurableSaver,
    entries: Vec<HistoryEntry>,
}

impl CsvLedger {
    pub fn new(
        path: impl Into<PathBuf>,
        fallback_path: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
        saver: DurableSaver,
    ) -> Self {
        Self {
            path: path.into(),
            fallback_path: fallback_path.into(),
            cache_dir: cache_dir.into(),
            saver,
            entries: Vec::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Path::new(&config.history_dir).join(LEDGER_FILE_NAME),
            Path::new(&config.log_dir).join(fallback_file_name(LEDGER_FILE_NAME)),
            &config.cache_dir,
            DurableSaver::from_config(&config.save),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fixed-width text table of all entries, newest last.
    pub fn render_text(&self, width: usize) -> String {
        let mut sheet = Sheet::new(
            HISTORY_TITLE,
            &[
                LEDGER_HEADERS[0],
                LEDGER_HEADERS[1],
                LEDGER_HEADERS[2],
                LEDGER_HEADERS[3],
                LEDGER_HEADERS[4],
                LEDGER_HEADERS[5],
                LEDGER_HEADERS[7],
            ],
        );
        for entry in &self.entries {
            sheet.rows.push(vec![
                Cell::text(entry.timestamp.as_str()),
                Cell::text(display_path(&entry.folder)),
                Cell::Count(entry.total),
                Cell::Count(entry.matched),
                Cell::Count(entry.unmatched),
                Cell::text(entry.log.to_cell()),
                Cell::text(entry.report.to_cell()),
            ]);
        }
        sheet.render_text(width, None)
    }

    fn delete_existing(&self) -> Result<(), LedgerError> {
        // also covers a parent that is not a directory
        if fs::symlink_metadata(&self.path).is_err() {
            return Ok(());
        }
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Deleted old ledger {}", display_path(&self.path));
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => {
                error!(
                    critical = true,
                    "Cannot delete ledger {}: {}. Close it and try again; {} entries kept in memory",
                    display_path(&self.path),
                    source,
                    self.entries.len()
                );
                Err(LedgerError::DeleteFailed {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }

    fn snapshot(&self, saved: &Path) -> Option<PathBuf> {
        let target = self
            .cache_dir
            .join(snapshot_file_name(&file_stamp(&Local::now())));
        let copied = fs::create_dir_all(&self.cache_dir).and_then(|_| fs::copy(saved, &target));
        match copied {
            Ok(_) => {
                info!("Ledger snapshot written to {}", display_path(&target));
                Some(target)
            }
            Err(e) => {
                warn!("Failed to write ledger snapshot {}: {}", display_path(&target), e);
                None
            }
        }
    }
}

impl RunLedger for CsvLedger {
    fn load(&mut self) -> Result<usize, LedgerError> {
        self.entries.clear();
        if !self.path.exists() {
            info!("No ledger at {}; starting empty", display_path(&self.path));
            return Ok(0);
        }

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)?;
        let headers = rdr.headers()?.clone();
        if !headers.iter().map(str::trim).eq(LEDGER_HEADERS.iter().copied()) {
            warn!(
                "Ledger {} has unexpected columns {:?}; loading what can be matched by name",
                display_path(&self.path),
                headers.iter().collect::<Vec<_>>()
            );
        }

        let columns = ColumnMap::from_headers(&headers);
        for (line, row) in rdr.records().enumerate() {
            match row {
                Ok(row) => self.entries.push(columns.entry(&row)),
                Err(e) => warn!("Skipping unreadable ledger row {}: {}", line + 2, e),
            }
        }

        info!(
            "Loaded {} ledger entries from {}",
            self.entries.len(),
            display_path(&self.path)
        );
        Ok(self.entries.len())
    }

    fn record(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    fn flush(&mut self) -> Result<FlushOutcome, LedgerError> {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(
                    "Cannot create ledger directory {}: {}",
                    display_path(parent),
                    e
                );
            }
        }
        self.delete_existing()?;

        let table = LedgerTable {
            entries: &self.entries,
        };
        let outcome = self.saver.save(&table, &self.path, &self.fallback_path);
        let saved = match outcome.saved_path() {
            Some(path) => path.to_path_buf(),
            None => {
                return Err(LedgerError::SaveFailed {
                    path: self.path.clone(),
                })
            }
        };
        info!(
            "Ledger with {} entries saved to {}",
            self.entries.len(),
            display_path(&saved)
        );

        let snapshot = self.snapshot(&saved);
        Ok(FlushOutcome {
            saved,
            used_fallback: outcome.used_fallback(),
            snapshot,
        })
    }

    fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }
}
