use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::Error;
use crate::ledger::HistoryEntry;
use crate::naming;
use crate::persist::{DurableSaver, SaveOutcome};
use crate::platform::display_path;
use crate::progress::ProgressReporter;
use crate::record::ArtifactPath;
use crate::report::{Report, ReportBuilder};
use crate::scanner::{self, FolderScanner};

/// Where one folder run will put its artifacts. Computed before the scan so
/// the caller can point its run log at `log_path`.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub root: PathBuf,
    pub prefix: String,
    /// File-name timestamp shared by every artifact of the run.
    pub stamp: String,
    /// Ledger timestamp.
    pub timestamp: String,
    pub report_path: PathBuf,
    pub fallback_report_path: PathBuf,
    pub log_path: PathBuf,
}

#[derive(Debug)]
pub struct RunSummary {
    pub folder: PathBuf,
    pub timestamp: String,
    pub total: usize,
    pub matched: usize,
    /// Includes read errors.
    pub unmatched: usize,
    pub read_errors: usize,
    pub walk_errors: usize,
    pub skipped_dirs: usize,
    pub save: SaveOutcome,
    pub log: ArtifactPath,
    pub table: Report,
}

impl RunSummary {
    pub fn report(&self) -> ArtifactPath {
        self.save.artifact_path()
    }

    pub fn to_history_entry(&self) -> HistoryEntry {
        HistoryEntry {
            timestamp: self.timestamp.clone(),
            folder: self.folder.clone(),
            total: self.total as u64,
            matched: self.matched as u64,
            unmatched: self.unmatched as u64,
            log: self.log.clone(),
            report: self.report(),
        }
    }
}

/// Runs the per-folder pipeline: walk, match, clean, classify, count, build
/// the report and save it.
pub struct ScanEngine {
    config: AppConfig,
    scanner: FolderScanner,
    builder: ReportBuilder,
    saver: DurableSaver,
}

impl ScanEngine {
    pub fn new(config: AppConfig) -> Self {
        Self {
            scanner: FolderScanner::new(&config),
            builder: ReportBuilder::new(config.report.column_width),
            saver: DurableSaver::from_config(&config.save),
            config,
        }
    }

    /// Validate `root` and name the run's artifacts. Names already taken by
    /// an earlier run get a counter suffix.
    pub fn plan_run(&self, root: &Path) -> Result<RunPlan, Error> {
        let root = scanner::validate_root(root)?;
        let now = Local::now();
        let prefix = naming::folder_prefix(&root);

        let output_dir = Path::new(&self.config.output_dir);
        let log_dir = Path::new(&self.config.log_dir);
        let stamp = naming::free_stamp(output_dir, log_dir, &prefix, &naming::file_stamp(&now));
        let report_name = naming::report_file_name(&prefix, &stamp);
        let fallback_report_path = log_dir.join(naming::fallback_file_name(&report_name));

        Ok(RunPlan {
            report_path: output_dir.join(&report_name),
            fallback_report_path,
            log_path: output_dir.join(naming::run_log_file_name(&prefix, &stamp)),
            timestamp: naming::ledger_stamp(&now),
            root,
            prefix,
            stamp,
        })
    }

    pub fn execute(&self, plan: &RunPlan, reporter: &dyn ProgressReporter) -> Result<RunSummary, Error> {
        if let Err(e) = fs::create_dir_all(&self.config.output_dir) {
            warn!(
                "Cannot create output directory {}: {}",
                self.config.output_dir, e
            );
        }

        let scan = self.scanner.scan(&plan.root, reporter);
        let table = self.builder.build(&scan.records, &scan.tags);

        info!("Saving report to {}", display_path(&plan.report_path));
        reporter.on_save_start(&plan.report_path);
        let save = self
            .saver
            .save(&table, &plan.report_path, &plan.fallback_report_path);
        reporter.on_save_complete(save.saved_path());

        let log = if plan.log_path.exists() {
            ArtifactPath::Saved(plan.log_path.clone())
        } else {
            ArtifactPath::NotProduced
        };

        Ok(RunSummary {
            folder: plan.root.clone(),
            timestamp: plan.timestamp.clone(),
            total: scan.total(),
            matched: scan.matched(),
            unmatched: scan.unmatched(),
            read_errors: scan.read_errors(),
            walk_errors: scan.walk_errors.len(),
            skipped_dirs: scan.skipped_dirs.len(),
            save,
            log,
            table,
        })
    }

    /// Plan and execute a run for one folder.
    pub fn run_folder(&self, root: &Path, reporter: &dyn ProgressReporter) -> Result<RunSummary, Error> {
        let plan = self.plan_run(root)?;
        self.execute(&plan, reporter)
    }
}
