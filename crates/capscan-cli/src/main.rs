mod commands;
mod input;
mod logging;
mod opener;
mod progress;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use capscan_core::config::{load_configuration, AppConfig};
use capscan_core::ledger::{CsvLedger, RunLedger};
use capscan_core::platform::display_path;
use capscan_core::{RunSummary, ScanEngine};
use clap::Parser;
use colored::*;
use commands::{Cli, Commands, ScanArgs};
use dotenv::dotenv;
use logging::{Logging, RunLogSink};
use progress::CliReporter;
use tracing::{error, info, warn};

const PREVIEW_ROWS: usize = 10;

fn main() -> Result<()> {
    dotenv().ok();

    let args = Cli::parse();

    let loaded = load_configuration(args.config.as_deref());
    let log_dir = match &loaded {
        Ok(config) => config.log_dir.clone(),
        Err(_) => AppConfig::default().log_dir,
    };
    let logs = logging::init_logger(Path::new(&log_dir));

    let config = match loaded {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            return Err(anyhow::Error::new(err).context("loading configuration"));
        }
    };

    match args
        .command
        .unwrap_or_else(|| Commands::Scan(ScanArgs::default()))
    {
        Commands::Scan(scan) => run_scan(&config, &scan, &logs)?,
        Commands::History => print_history(&config)?,
        Commands::PrintConfig => {
            println!("{}", config.to_toml().context("serializing configuration")?);
        }
    }

    Ok(())
}

/// Command-line roots, then the batch file, then configured roots, then
/// whatever the user types.
fn resolve_roots(config: &AppConfig, args: &ScanArgs) -> Result<Vec<PathBuf>> {
    if !args.roots.is_empty() {
        return Ok(input::valid_roots(args.roots.iter().cloned()));
    }

    let batch_file = args
        .batch_file
        .clone()
        .or_else(|| config.batch_file.as_ref().map(PathBuf::from));
    if let Some(batch_file) = batch_file {
        return input::read_batch_file(&batch_file)
            .with_context(|| format!("reading batch file {}", display_path(&batch_file)));
    }

    if !config.root_paths.is_empty() {
        return Ok(input::valid_roots(config.root_paths.iter().map(PathBuf::from)));
    }

    let answer = input::prompt_line(&format!(
        "Folder to scan (enter {} to scan the folders listed in {})",
        input::BATCH_CHOICE,
        input::DEFAULT_BATCH_FILE
    ))?;
    if answer == input::BATCH_CHOICE {
        let batch_file = Path::new(input::DEFAULT_BATCH_FILE);
        return input::read_batch_file(batch_file)
            .with_context(|| format!("reading batch file {}", display_path(batch_file)));
    }
    if answer.is_empty() {
        return Ok(Vec::new());
    }
    Ok(input::valid_roots([PathBuf::from(answer)]))
}

fn run_scan(config: &AppConfig, args: &ScanArgs, logs: &Logging) -> Result<()> {
    let roots = resolve_roots(config, args)?;
    if roots.is_empty() {
        warn!("No valid folders to scan");
        return Ok(());
    }
    let auto_open = args.open || config.auto_open;

    let mut ledger = CsvLedger::from_config(config);
    if let Err(e) = ledger.load() {
        warn!(
            "Could not load run history {}: {}. Starting with an empty history",
            display_path(ledger.path()),
            e
        );
    }

    let engine = ScanEngine::new(config.clone());
    let reporter = CliReporter::new();
    let mut last_snapshot = None;

    for root in &roots {
        println!();
        let summary = match run_folder(&engine, root, &reporter, &logs.run_sink) {
            Ok(summary) => summary,
            Err(e) => {
                error!("Failed to process {}: {}", display_path(root), e);
                continue;
            }
        };

        print_summary(&summary);
        if args.preview {
            println!("{}", summary.table.render_text(Some(PREVIEW_ROWS)));
        }

        ledger.record(summary.to_history_entry());
        match ledger.flush() {
            Ok(outcome) => last_snapshot = outcome.snapshot.or(last_snapshot),
            Err(e) => error!(critical = true, "Run history not saved: {}", e),
        }

        if auto_open {
            let report = summary.report();
            let mut to_open: Vec<&Path> = Vec::new();
            if let Some(path) = report.path() {
                to_open.push(path);
            }
            if let Some(path) = summary.log.path() {
                to_open.push(path);
            }
            opener::open_all(&to_open);
        }
    }

    if auto_open {
        let mut to_open: Vec<&Path> = vec![logs.warnings_path.as_path()];
        if let Some(snapshot) = &last_snapshot {
            to_open.push(snapshot);
        }
        opener::open_all(&to_open);
    }

    info!("All {} folders processed", roots.len());
    Ok(())
}

/// Process one folder with its run log attached for the duration.
fn run_folder(
    engine: &ScanEngine,
    root: &Path,
    reporter: &CliReporter,
    run_sink: &RunLogSink,
) -> Result<RunSummary, capscan_core::Error> {
    let plan = engine.plan_run(root)?;
    if let Err(e) = run_sink.attach(&plan.log_path) {
        warn!("Cannot open run log {}: {}", display_path(&plan.log_path), e);
    }

    info!("Processing folder {}", display_path(&plan.root));
    let result = engine.execute(&plan, reporter);
    if result.is_ok() {
        info!("Finished processing folder {}", display_path(&plan.root));
    }
    run_sink.detach();
    result
}

fn print_summary(summary: &RunSummary) {
    info!(
        "{}: {} files, {} matched, {} unmatched ({} read errors)",
        display_path(&summary.folder),
        format!("{}", summary.total).cyan(),
        format!("{}", summary.matched).green(),
        format!("{}", summary.unmatched).red(),
        format!("{}", summary.read_errors).yellow(),
    );
    if summary.walk_errors > 0 || summary.skipped_dirs > 0 {
        info!(
            "{} unreadable directories, {} skipped directories",
            summary.walk_errors, summary.skipped_dirs
        );
    }
    match summary.report().path() {
        Some(path) if summary.save.used_fallback() => warn!(
            "Report saved to fallback location {}",
            display_path(path).yellow()
        ),
        Some(path) => info!("Report saved to {}", display_path(path).green()),
        None => error!(critical = true, "{}", "No report was produced".red()),
    }
}

fn print_history(config: &AppConfig) -> Result<()> {
    let mut ledger = CsvLedger::from_config(config);
    let count = ledger.load().context("loading run history")?;
    if count == 0 {
        println!("No runs recorded in {}", display_path(ledger.path()));
        return Ok(());
    }
    println!("{}", ledger.render_text(config.report.column_width));
    Ok(())
}
